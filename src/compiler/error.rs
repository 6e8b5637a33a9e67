//! Error types for condition and selection compilation.

use std::fmt;
use thiserror::Error;

/// Classification of an operand sitting on the operand stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Column,
    Variable,
    Literal,
    Condition,
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperandKind::Column => "column reference",
            OperandKind::Variable => "runtime variable",
            OperandKind::Literal => "literal",
            OperandKind::Condition => "condition",
        };
        f.write_str(name)
    }
}

/// Structural errors raised while compiling an expression tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Unsupported composition: {0}")]
    UnsupportedComposition(String),

    #[error("Unsupported comparison {operator} between {left} and {right}")]
    UnsupportedComparison {
        operator: String,
        left: OperandKind,
        right: OperandKind,
    },

    #[error("Unsupported null check on {0}")]
    UnsupportedNullCheck(OperandKind),

    #[error("{0} is not supported in a HAVING clause")]
    UnsupportedInHaving(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Unsupported function: {0}")]
    UnsupportedFunction(String),

    #[error("{0} is not supported in a SET clause")]
    UnsupportedInSetClause(String),

    #[error("Internal compiler error: {0}")]
    Internal(String),

    #[error("No binding supplied for '{key}' (placeholder {placeholder})")]
    MissingBinding { placeholder: String, key: String },
}

/// Result type for compiler operations
pub type CompileResult<T> = std::result::Result<T, CompileError>;
