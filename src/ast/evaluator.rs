use crate::ast::{ASTNode, Context, Parser};
use crate::error::EvalError;
use log::debug;

/// Tree-walking evaluator. Holds no state, so one instance can be shared
/// freely across threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// Parse an expression string into an AST.
    pub fn parse_expression(&self, expression: &str) -> Result<ASTNode, EvalError> {
        Parser::parse_expression(expression)
    }

    /// Evaluates a given expression string against a provided context.
    ///
    /// # Arguments
    ///
    /// * `expression` - The formula to evaluate.
    /// * `context` - Variable bindings; only read, never modified.
    ///
    /// # Returns
    ///
    /// * `Ok(f64)` if parsing and evaluation succeed. Infinite and NaN
    ///   results are values, not failures.
    /// * `Err(EvalError)` on the first syntax, whitelist or lookup failure.
    pub fn evaluate_expression(
        &self,
        expression: &str,
        context: &Context,
    ) -> Result<f64, EvalError> {
        debug!(
            "Evaluating expression: {} with variables {:?}",
            expression, context
        );
        let ast = self.parse_expression(expression)?;
        self.evaluate(&ast, context)
    }

    /// Evaluates an `ASTNode` bottom-up. Binary operands are reduced left
    /// before right, so the leftmost failure is the one reported. Left-deep
    /// chains are folded in a loop; only right operands and groups recurse.
    pub fn evaluate(&self, ast: &ASTNode, context: &Context) -> Result<f64, EvalError> {
        match ast {
            ASTNode::Number(value) => Ok(*value),

            ASTNode::Identifier(name) => context
                .get(name)
                .copied()
                .ok_or_else(|| EvalError::undefined(name)),

            ASTNode::UnaryOperation { operator, operand } => {
                let value = self.evaluate(operand, context)?;
                Ok(operator.apply(value))
            }

            ASTNode::BinaryOperation { .. } => {
                let (leftmost, steps) = ast.left_spine();
                let mut value = self.evaluate(leftmost, context)?;
                for (operator, right) in steps {
                    let right_value = self.evaluate(right, context)?;
                    value = operator.apply(value, right_value);
                }
                Ok(value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Operator;

    fn context(pairs: &[(&str, f64)]) -> Context {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }

    fn eval(expression: &str) -> Result<f64, EvalError> {
        Evaluator::new().evaluate_expression(expression, &Context::new())
    }

    #[test]
    fn test_simple_binary_expression() {
        let evaluator = Evaluator::new();
        let context = context(&[("price", 100.0), ("volume", 50.0)]);

        assert_eq!(
            evaluator
                .evaluate_expression("price + volume", &context)
                .unwrap(),
            150.0
        );
        assert_eq!(
            evaluator
                .evaluate_expression("price - volume", &context)
                .unwrap(),
            50.0
        );
        assert_eq!(
            evaluator
                .evaluate_expression("price * volume", &context)
                .unwrap(),
            5000.0
        );
        assert_eq!(
            evaluator
                .evaluate_expression("price / volume", &context)
                .unwrap(),
            2.0
        );
        assert_eq!(
            evaluator
                .evaluate_expression("volume ^ 2", &context)
                .unwrap(),
            2500.0
        );
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(eval("2+3*4").unwrap(), 14.0);
        assert_eq!(eval("2*3+4").unwrap(), 10.0);
        assert_eq!(eval("2^3^2").unwrap(), 512.0);
        assert_eq!(eval("10-3-2").unwrap(), 5.0);
        assert_eq!(eval("100/10/5").unwrap(), 2.0);
        assert_eq!(eval("(2+3)*4").unwrap(), 20.0);
    }

    #[test]
    fn test_unary_minus_convention() {
        assert_eq!(eval("-2^2").unwrap(), -4.0);
        assert_eq!(eval("(-2)^2").unwrap(), 4.0);
        assert_eq!(eval("2^-1").unwrap(), 0.5);
        assert_eq!(eval("-3*-2").unwrap(), 6.0);
        assert_eq!(eval("--5").unwrap(), 5.0);
    }

    #[test]
    fn test_division_by_zero_is_not_an_error() {
        assert_eq!(eval("1/0").unwrap(), f64::INFINITY);
        assert_eq!(eval("-1/0").unwrap(), f64::NEG_INFINITY);
        assert!(eval("0/0").unwrap().is_nan());
    }

    #[test]
    fn test_non_real_power_is_nan() {
        assert!(eval("(-8)^(1/3)").unwrap().is_nan());
        assert_eq!(eval("0^-1").unwrap(), f64::INFINITY);
        assert_eq!(eval("10^400").unwrap(), f64::INFINITY);
        assert_eq!(eval("4^0.5").unwrap(), 2.0);
    }

    #[test]
    fn test_variable_substitution() {
        let evaluator = Evaluator::new();
        assert_eq!(
            evaluator
                .evaluate_expression("x+1", &context(&[("x", 4.0)]))
                .unwrap(),
            5.0
        );
    }

    #[test]
    fn test_variables_are_case_sensitive() {
        let result = Evaluator::new().evaluate_expression("X", &context(&[("x", 1.0)]));
        assert_eq!(
            result,
            Err(EvalError::UndefinedVariable {
                name: "X".to_string()
            })
        );
    }

    #[test]
    fn test_missing_identifier() {
        assert_eq!(
            eval("x + 1"),
            Err(EvalError::UndefinedVariable {
                name: "x".to_string()
            })
        );
        assert_eq!(
            eval("x + 1").unwrap_err().to_string(),
            "use of undefined variable 'x'"
        );
    }

    #[test]
    fn test_leftmost_error_is_reported() {
        let err = eval("a * (b + c)").unwrap_err();
        assert_eq!(
            err,
            EvalError::UndefinedVariable {
                name: "a".to_string()
            }
        );

        let err = Evaluator::new()
            .evaluate_expression("a * (b + c)", &context(&[("a", 1.0)]))
            .unwrap_err();
        assert_eq!(
            err,
            EvalError::UndefinedVariable {
                name: "b".to_string()
            }
        );
    }

    #[test]
    fn test_evaluate_pre_parsed_ast() {
        let evaluator = Evaluator::new();
        let ast = ASTNode::binary(
            ASTNode::identifier("x"),
            Operator::Multiply,
            ASTNode::identifier("x"),
        );

        let ys: Vec<f64> = [-2.0, -1.0, 0.0, 1.0, 2.0]
            .iter()
            .map(|&x| evaluator.evaluate(&ast, &context(&[("x", x)])).unwrap())
            .collect();
        assert_eq!(ys, vec![4.0, 1.0, 0.0, 1.0, 4.0]);
    }

    #[test]
    fn test_context_is_not_modified() {
        let evaluator = Evaluator::new();
        let context = context(&[("x", 2.0)]);
        let before = context.clone();
        evaluator.evaluate_expression("x * y", &context).unwrap_err();
        evaluator.evaluate_expression("x * x", &context).unwrap();
        assert_eq!(context, before);
    }

    #[test]
    fn test_long_flat_chains() {
        let sum = format!("1{}", "+1".repeat(20_000));
        assert_eq!(eval(&sum).unwrap(), 20_001.0);

        let difference = format!("0{}", " - 1".repeat(20_000));
        assert_eq!(eval(&difference).unwrap(), -20_000.0);

        let product = format!("x{}", "*x".repeat(20_000));
        let result = Evaluator::new()
            .evaluate_expression(&product, &context(&[("x", 1.0)]))
            .unwrap();
        assert_eq!(result, 1.0);

        let mixed = format!("2{}", " * 3 / 3 + 1 - 1".repeat(10_000));
        assert_eq!(eval(&mixed).unwrap(), 2.0);
    }

    #[test]
    fn test_long_chain_reports_leftmost_error() {
        let expression = format!("1{} + a + b", "+1".repeat(20_000));
        assert_eq!(
            eval(&expression),
            Err(EvalError::UndefinedVariable {
                name: "a".to_string()
            })
        );
    }
}
