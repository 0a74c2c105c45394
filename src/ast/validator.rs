use crate::ast::parser::Rule;
use crate::ast::{Operator, UnaryOperator};
use crate::error::EvalError;
use log::debug;
use pest::iterators::Pair;

/// Walks every pair of a parse tree and rejects anything outside the
/// arithmetic whitelist. Runs on the raw parse tree, independently of the
/// grammar, so widening the grammar cannot leak new constructs through.
pub(crate) fn validate(expression: &Pair<Rule>) -> Result<(), EvalError> {
    check_element(expression.as_rule(), expression.as_str())?;
    if expression.as_rule() != Rule::expression {
        return Err(EvalError::UnsupportedOperation(format!(
            "expected an expression, found {:?}",
            expression.as_rule()
        )));
    }

    let mut visited = 0usize;
    for pair in expression.clone().into_inner().flatten() {
        check_element(pair.as_rule(), pair.as_str())?;
        visited += 1;
    }
    debug!("Validated {} parse tree elements", visited);
    Ok(())
}

fn check_element(rule: Rule, text: &str) -> Result<(), EvalError> {
    match rule {
        Rule::expression
        | Rule::sum
        | Rule::product
        | Rule::unary
        | Rule::power
        | Rule::group
        | Rule::number
        | Rule::EOI => Ok(()),
        Rule::identifier => check_identifier(text),
        Rule::PLUS => check_operator(text, Operator::Add),
        Rule::MINUS => check_operator(text, Operator::Subtract),
        Rule::STAR => check_operator(text, Operator::Multiply),
        Rule::SLASH => check_operator(text, Operator::Divide),
        Rule::POW => check_operator(text, Operator::Power),
        Rule::NEG => UnaryOperator::try_from(text).map(|_| ()),
        other => Err(EvalError::UnsupportedOperation(format!(
            "unsupported expression element {:?} ('{}')",
            other, text
        ))),
    }
}

fn check_operator(text: &str, expected: Operator) -> Result<(), EvalError> {
    let operator = Operator::try_from(text)?;
    if operator == expected {
        Ok(())
    } else {
        Err(EvalError::UnsupportedOperation(format!(
            "operator '{}' found where {:?} was expected",
            text, expected
        )))
    }
}

fn check_identifier(text: &str) -> Result<(), EvalError> {
    let mut chars = text.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(EvalError::UnsupportedOperation(format!(
            "'{}' is not a variable name",
            text
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Parser;
    use pest::Parser as _;

    #[test]
    fn test_parsed_trees_pass_validation() {
        for input in ["1", "x", "-(x + 1) * 2 ^ -y / 3", "((a))", "2**3"] {
            let expression = Parser::parse(Rule::expression, input)
                .unwrap()
                .next()
                .unwrap();
            assert!(validate(&expression).is_ok(), "{} should validate", input);
        }
    }

    #[test]
    fn test_non_expression_root_is_rejected() {
        let sum = Parser::parse(Rule::sum, "1 + 2").unwrap().next().unwrap();
        assert!(matches!(
            validate(&sum),
            Err(EvalError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_elements_outside_whitelist_are_rejected() {
        assert!(check_element(Rule::WHITESPACE, " ").is_err());
        assert!(check_element(Rule::primary, "1").is_err());
    }

    #[test]
    fn test_operator_text_must_match_rule() {
        assert!(check_element(Rule::PLUS, "+").is_ok());
        assert!(check_element(Rule::POW, "**").is_ok());
        assert!(check_element(Rule::POW, "^").is_ok());
        assert!(matches!(
            check_element(Rule::PLUS, "-"),
            Err(EvalError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            check_element(Rule::STAR, "%"),
            Err(EvalError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            check_element(Rule::NEG, "!"),
            Err(EvalError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_identifier_shape_is_checked() {
        assert!(check_element(Rule::identifier, "x_1").is_ok());
        assert!(check_element(Rule::identifier, "1x").is_err());
        assert!(check_element(Rule::identifier, "os.system").is_err());
        assert!(check_element(Rule::identifier, "").is_err());
    }
}
