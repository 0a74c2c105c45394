use std::collections::HashMap;
use std::fmt;

use crate::error::EvalError;

mod evaluator;
mod parser;
mod validator;

pub use evaluator::Evaluator;
pub use parser::{ExpressionParser as Parser, MAX_NESTING_DEPTH};

/// Variable bindings for one evaluation, looked up by exact name.
pub type Context = HashMap<String, f64>;

/// Parsed arithmetic expression. No other node kind exists, so every tree
/// that reaches the evaluator is within the whitelist.
#[derive(Debug, Clone, PartialEq)]
pub enum ASTNode {
    Number(f64),
    Identifier(String),
    UnaryOperation {
        operator: UnaryOperator,
        operand: Box<ASTNode>,
    },
    BinaryOperation {
        left: Box<ASTNode>,
        operator: Operator,
        right: Box<ASTNode>,
    },
}

impl ASTNode {
    pub fn number(value: f64) -> Self {
        ASTNode::Number(value)
    }

    pub fn identifier(name: &str) -> Self {
        ASTNode::Identifier(name.to_string())
    }

    pub fn negate(operand: ASTNode) -> Self {
        ASTNode::UnaryOperation {
            operator: UnaryOperator::Negate,
            operand: Box::new(operand),
        }
    }

    pub fn binary(left: ASTNode, operator: Operator, right: ASTNode) -> Self {
        ASTNode::BinaryOperation {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    /// Names of all variables referenced by the tree, in first-use order.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            ASTNode::Number(_) => {}
            ASTNode::Identifier(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name.as_str());
                }
            }
            ASTNode::UnaryOperation { operand, .. } => operand.collect_variables(names),
            ASTNode::BinaryOperation { .. } => {
                let (leftmost, steps) = self.left_spine();
                leftmost.collect_variables(names);
                for (_, right) in steps {
                    right.collect_variables(names);
                }
            }
        }
    }

    /// Unrolls a left-deep chain such as `((a + b) - c) * d` into its
    /// leftmost operand and the `(operator, right operand)` steps applied to
    /// it, innermost first.
    pub(crate) fn left_spine(&self) -> (&ASTNode, Vec<(Operator, &ASTNode)>) {
        let mut steps = Vec::new();
        let mut node = self;
        while let ASTNode::BinaryOperation {
            left,
            operator,
            right,
        } = node
        {
            steps.push((*operator, &**right));
            node = &**left;
        }
        steps.reverse();
        (node, steps)
    }

    /// Moves the direct children out of `self`, leaving leaves behind.
    fn take_children(&mut self, into: &mut Vec<ASTNode>) {
        match self {
            ASTNode::Number(_) | ASTNode::Identifier(_) => {}
            ASTNode::UnaryOperation { operand, .. } => {
                into.push(std::mem::replace(operand.as_mut(), ASTNode::Number(0.0)));
            }
            ASTNode::BinaryOperation { left, right, .. } => {
                into.push(std::mem::replace(left.as_mut(), ASTNode::Number(0.0)));
                into.push(std::mem::replace(right.as_mut(), ASTNode::Number(0.0)));
            }
        }
    }
}

/// Tears the tree down with an explicit stack instead of nested box drops.
impl Drop for ASTNode {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.take_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.take_children(&mut pending);
        }
    }
}

/// Fully parenthesised rendering, used by debug logging.
impl fmt::Display for ASTNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ASTNode::Number(value) => write!(f, "{}", value),
            ASTNode::Identifier(name) => write!(f, "{}", name),
            ASTNode::UnaryOperation { operator, operand } => {
                write!(f, "({}{})", operator.symbol(), operand)
            }
            ASTNode::BinaryOperation { .. } => {
                let (leftmost, steps) = self.left_spine();
                for _ in 0..steps.len() {
                    f.write_str("(")?;
                }
                write!(f, "{}", leftmost)?;
                for (operator, right) in steps {
                    write!(f, " {} {})", operator.symbol(), right)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Negate,
}

impl UnaryOperator {
    pub fn apply(&self, operand: f64) -> f64 {
        match self {
            UnaryOperator::Negate => -operand,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
        }
    }
}

impl TryFrom<&str> for UnaryOperator {
    type Error = EvalError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "-" => Ok(UnaryOperator::Negate),
            _ => Err(EvalError::UnsupportedOperation(format!(
                "unary operator '{}' is not allowed",
                value
            ))),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl Operator {
    /// Plain IEEE-754 arithmetic: division by zero gives an infinity or NaN
    /// and a negative base with a fractional exponent gives NaN.
    pub fn apply(&self, left: f64, right: f64) -> f64 {
        match self {
            Operator::Add => left + right,
            Operator::Subtract => left - right,
            Operator::Multiply => left * right,
            Operator::Divide => left / right,
            Operator::Power => left.powf(right),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Power => "^",
        }
    }
}

impl TryFrom<&str> for Operator {
    type Error = EvalError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "+" => Ok(Operator::Add),
            "-" => Ok(Operator::Subtract),
            "*" => Ok(Operator::Multiply),
            "/" => Ok(Operator::Divide),
            "^" | "**" => Ok(Operator::Power),
            _ => Err(EvalError::UnsupportedOperation(format!(
                "operator '{}' is not allowed",
                value
            ))),
        }
    }
}
