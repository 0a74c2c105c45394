use crate::ast::validator::validate;
use crate::ast::{ASTNode, Operator, UnaryOperator};
use crate::error::EvalError;
use log::debug;
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

/// Deepest combined nesting of parentheses, power operators and unary
/// minus runs accepted.
/// Inputs beyond it are rejected before parsing so recursion stays bounded.
pub const MAX_NESTING_DEPTH: usize = 100;

#[derive(Parser)]
#[grammar = "./expression.pest"]
pub struct ExpressionParser;

impl ExpressionParser {
    pub fn parse_expression(input: &str) -> Result<ASTNode, EvalError> {
        debug!("Parsing expression: {}", input);
        check_nesting(input)?;

        let expression = ExpressionParser::parse(Rule::expression, input)
            .map_err(|e| EvalError::Syntax(e.renamed_rules(rule_name).to_string()))?
            .next()
            .ok_or_else(|| EvalError::Syntax("failed to parse expression".to_string()))?;

        validate(&expression)?;

        let mut pairs = expression.into_inner();
        let ast = Self::build_sum(next_pair(&mut pairs, "expression")?)?;
        debug!("Parsed AST: {}", ast);
        Ok(ast)
    }

    fn build_sum(pair: Pair<Rule>) -> Result<ASTNode, EvalError> {
        expect_rule(&pair, Rule::sum)?;
        Self::build_chain(pair, &[Rule::PLUS, Rule::MINUS], Self::build_product)
    }

    fn build_product(pair: Pair<Rule>) -> Result<ASTNode, EvalError> {
        expect_rule(&pair, Rule::product)?;
        Self::build_chain(pair, &[Rule::STAR, Rule::SLASH], Self::build_unary)
    }

    /// Folds `operand (op operand)*` to the left.
    fn build_chain(
        pair: Pair<Rule>,
        operators: &[Rule],
        build_operand: fn(Pair<Rule>) -> Result<ASTNode, EvalError>,
    ) -> Result<ASTNode, EvalError> {
        let mut pairs = pair.into_inner();
        let mut node = build_operand(next_pair(&mut pairs, "operand")?)?;

        while let Some(operator_pair) = pairs.next() {
            if !operators.contains(&operator_pair.as_rule()) {
                return Err(unexpected(&operator_pair));
            }
            let operator = Operator::try_from(operator_pair.as_str())?;
            let right = build_operand(next_pair(&mut pairs, "right operand")?)?;
            node = ASTNode::binary(node, operator, right);
        }

        Ok(node)
    }

    fn build_unary(pair: Pair<Rule>) -> Result<ASTNode, EvalError> {
        expect_rule(&pair, Rule::unary)?;
        let mut prefixes = Vec::new();
        let mut operand = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::NEG if operand.is_none() => {
                    prefixes.push(UnaryOperator::try_from(inner.as_str())?)
                }
                Rule::power if operand.is_none() => operand = Some(Self::build_power(inner)?),
                _ => return Err(unexpected(&inner)),
            }
        }

        let mut node =
            operand.ok_or_else(|| EvalError::Syntax("expected an operand".to_string()))?;
        for operator in prefixes.into_iter().rev() {
            node = ASTNode::UnaryOperation {
                operator,
                operand: Box::new(node),
            };
        }
        Ok(node)
    }

    fn build_power(pair: Pair<Rule>) -> Result<ASTNode, EvalError> {
        expect_rule(&pair, Rule::power)?;
        let mut pairs = pair.into_inner();
        let base = Self::build_primary(next_pair(&mut pairs, "operand")?)?;

        match pairs.next() {
            None => Ok(base),
            Some(operator_pair) if operator_pair.as_rule() == Rule::POW => {
                let operator = Operator::try_from(operator_pair.as_str())?;
                let exponent = Self::build_unary(next_pair(&mut pairs, "exponent")?)?;
                Ok(ASTNode::binary(base, operator, exponent))
            }
            Some(other) => Err(unexpected(&other)),
        }
    }

    fn build_primary(pair: Pair<Rule>) -> Result<ASTNode, EvalError> {
        match pair.as_rule() {
            Rule::number => {
                let value = pair.as_str().parse::<f64>().map_err(|e| {
                    EvalError::Syntax(format!("invalid number '{}': {}", pair.as_str(), e))
                })?;
                Ok(ASTNode::Number(value))
            }
            Rule::identifier => Ok(ASTNode::Identifier(pair.as_str().to_string())),
            Rule::group => {
                let mut inner = pair.into_inner();
                Self::build_sum(next_pair(&mut inner, "grouped expression")?)
            }
            _ => Err(unexpected(&pair)),
        }
    }
}

fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, what: &str) -> Result<Pair<'i, Rule>, EvalError> {
    pairs
        .next()
        .ok_or_else(|| EvalError::Syntax(format!("expected {}", what)))
}

fn expect_rule(pair: &Pair<Rule>, rule: Rule) -> Result<(), EvalError> {
    if pair.as_rule() == rule {
        Ok(())
    } else {
        Err(unexpected(pair))
    }
}

fn unexpected(pair: &Pair<Rule>) -> EvalError {
    EvalError::UnsupportedOperation(format!(
        "unexpected {:?} element '{}'",
        pair.as_rule(),
        pair.as_str()
    ))
}

fn rule_name(rule: &Rule) -> String {
    match rule {
        Rule::number => "number".to_string(),
        Rule::identifier => "variable".to_string(),
        Rule::PLUS => "`+`".to_string(),
        Rule::MINUS | Rule::NEG => "`-`".to_string(),
        Rule::STAR => "`*`".to_string(),
        Rule::SLASH => "`/`".to_string(),
        Rule::POW => "`^`".to_string(),
        Rule::group => "`(`".to_string(),
        Rule::EOI => "end of input".to_string(),
        other => format!("{:?}", other),
    }
}

/// Rejects inputs whose parentheses, power operators and runs of minus
/// signs nest deeper than `MAX_NESTING_DEPTH`. Power operators are counted
/// per group, so the bound is conservative for long flat power chains.
fn check_nesting(input: &str) -> Result<(), EvalError> {
    let bytes = input.as_bytes();
    // Nesting opened within each group, outermost first.
    let mut levels: Vec<usize> = vec![0];
    let mut depth = 0usize;
    let mut minus_run = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'-' => minus_run += 1,
            b' ' | b'\t' | b'\r' | b'\n' => {}
            c => {
                match c {
                    b'(' => {
                        // Negations right before a group wrap all of it.
                        levels.push(minus_run + 1);
                        depth += minus_run + 1;
                    }
                    b')' if levels.len() > 1 => {
                        if let Some(opened) = levels.pop() {
                            depth -= opened;
                        }
                    }
                    b'^' => bump_power(&mut levels, &mut depth),
                    b'*' if bytes.get(i + 1) == Some(&b'*') => {
                        i += 1;
                        bump_power(&mut levels, &mut depth);
                    }
                    _ => {}
                }
                minus_run = 0;
            }
        }
        if depth + minus_run > MAX_NESTING_DEPTH {
            return Err(EvalError::Syntax(format!(
                "expression is nested deeper than {} levels",
                MAX_NESTING_DEPTH
            )));
        }
        i += 1;
    }

    Ok(())
}

fn bump_power(levels: &mut [usize], depth: &mut usize) {
    if let Some(opened) = levels.last_mut() {
        *opened += 1;
        *depth += 1;
    }
}
