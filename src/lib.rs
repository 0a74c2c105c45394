pub mod ast;
pub mod error;
pub mod plot;

use std::collections::HashMap;

use ast::{Context, Evaluator};

pub use error::{EvalError, PlotError};

/// Evaluates `expression` with no variables bound.
pub fn evaluate(expression: &str) -> Result<f64, EvalError> {
    evaluate_expression(expression, &Context::new())
}

/// Parses, validates and evaluates `expression`, resolving variables from
/// `context`. Nothing is cached between calls.
pub fn evaluate_expression(
    expression: &str,
    context: &HashMap<String, f64>,
) -> Result<f64, EvalError> {
    Evaluator::new().evaluate_expression(expression, context)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(name: &str, value: f64) -> HashMap<String, f64> {
        HashMap::from([(name.to_string(), value)])
    }

    #[test]
    fn test_literal_round_trip() {
        for value in [0.0, 1.0, 42.0, 3.5, 0.1, 1e-7, 123456.789, 1e21, -2.5, -0.0] {
            let result = evaluate(&value.to_string()).unwrap();
            assert_eq!(result, value, "literal {}", value);
            let result = evaluate(&format!("{:?}", value)).unwrap();
            assert_eq!(result, value, "literal {:?}", value);
        }
    }

    #[test]
    fn test_precedence_examples() {
        assert_eq!(evaluate("2+3*4").unwrap(), 14.0);
        assert_eq!(evaluate("2*3+4").unwrap(), 10.0);
        assert_eq!(evaluate("2^3^2").unwrap(), 512.0);
        assert_eq!(evaluate("-2^2").unwrap(), -4.0);
        assert_eq!(evaluate("10-3-2").unwrap(), 5.0);
    }

    #[test]
    fn test_variable_binding() {
        assert_eq!(evaluate_expression("x+1", &bind("x", 4.0)).unwrap(), 5.0);
        assert_eq!(
            evaluate("x+1"),
            Err(EvalError::UndefinedVariable {
                name: "x".to_string()
            })
        );
    }

    #[test]
    fn test_code_injection_is_rejected() {
        for input in [
            "__import__('os')",
            "__import__('os').system('ls')",
            "1; 2",
            "sin(1)",
            "[1,2,3]",
            "[x for x in y]",
            "(lambda: 1)()",
            "open('/etc/passwd')",
            "x if y else z",
        ] {
            let result = evaluate_expression(input, &bind("x", 1.0));
            assert!(
                matches!(
                    result,
                    Err(EvalError::Syntax(_)) | Err(EvalError::UnsupportedOperation(_))
                ),
                "Input '{}' should be rejected, got {:?}",
                input,
                result
            );
        }
    }

    #[test]
    fn test_division_by_zero_returns_infinity() {
        assert_eq!(evaluate("1/0").unwrap(), f64::INFINITY);
    }

    #[test]
    fn test_repeated_evaluation_is_bit_identical() {
        let context = bind("x", 0.1);
        let first = evaluate_expression("x^x / 3 - 7 * x", &context).unwrap();
        for _ in 0..100 {
            let again = evaluate_expression("x^x / 3 - 7 * x", &context).unwrap();
            assert_eq!(first.to_bits(), again.to_bits());
        }
    }

    #[test]
    fn test_plotting_scenario() {
        let ys: Vec<f64> = [-2.0, -1.0, 0.0, 1.0, 2.0]
            .iter()
            .map(|&v| evaluate_expression("x*x", &bind("x", v)).unwrap())
            .collect();
        assert_eq!(ys, vec![4.0, 1.0, 0.0, 1.0, 4.0]);
    }

    #[test]
    fn test_concurrent_evaluation() {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                std::thread::spawn(move || {
                    let context = bind("x", i as f64);
                    evaluate_expression("x * 2 + 1", &context).unwrap()
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), i as f64 * 2.0 + 1.0);
        }
    }

    #[test]
    fn test_long_flat_chain_evaluates() {
        assert_eq!(evaluate(&format!("1{}", "+1".repeat(5_000))).unwrap(), 5_001.0);
        assert_eq!(
            evaluate(&format!("1{}", "+1".repeat(200_000))).unwrap(),
            200_001.0
        );
    }
}
