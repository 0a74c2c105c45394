use thiserror::Error;

/// Failure of a single `evaluate` call. Every variant is terminal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The input is not an expression of the arithmetic grammar.
    #[error("syntax error: {0}")]
    Syntax(String),
    /// The parse tree holds a construct outside the operator whitelist.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("use of undefined variable '{name}'")]
    UndefinedVariable { name: String },
}

impl EvalError {
    pub(crate) fn undefined(name: &str) -> Self {
        EvalError::UndefinedVariable {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlotError {
    #[error("invalid sample range: {0}")]
    InvalidRange(String),
    #[error("cannot graph expression: {0}")]
    Expression(#[from] EvalError),
    /// First sample, in ascending `x`, whose evaluation failed.
    #[error("cannot graph expression at x = {x}: {source}")]
    Sample {
        x: f64,
        #[source]
        source: EvalError,
    },
}
