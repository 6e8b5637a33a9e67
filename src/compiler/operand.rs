//! Operands and the operand stack shared by every compiler variant.

use crate::compiler::error::{CompileError, CompileResult, OperandKind};

/// A filter expression that is complete on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Condition over exactly one field, `{'field': predicate}`
    Field {
        field: String,
        predicate: String,
        negated: bool,
    },
    /// Anything combining several conditions
    Compound(String),
}

impl Condition {
    pub fn field(field: impl Into<String>, predicate: impl Into<String>) -> Self {
        Condition::Field {
            field: field.into(),
            predicate: predicate.into(),
            negated: false,
        }
    }

    /// Negate a single-field condition in place of its predicate.
    /// Returns `None` for compound conditions.
    pub fn negate(self) -> Option<Condition> {
        match self {
            Condition::Field {
                field,
                predicate,
                negated,
            } => Some(Condition::Field {
                field,
                predicate,
                negated: !negated,
            }),
            Condition::Compound(_) => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Condition::Field {
                field,
                predicate,
                negated: false,
            } => format!("{{'{}': {}}}", field, predicate),
            Condition::Field {
                field,
                predicate,
                negated: true,
            } => format!("{{'{}': {{'$not': {}}}}}", field, predicate),
            Condition::Compound(text) => text.clone(),
        }
    }
}

/// One side of an operator, classified by where its value comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Column name, verbatim
    Column(String),
    /// Name of a runtime-variable placeholder
    Variable(String),
    /// Name of a literal placeholder
    Literal(String),
    Condition(Condition),
}

impl Operand {
    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::Column(_) => OperandKind::Column,
            Operand::Variable(_) => OperandKind::Variable,
            Operand::Literal(_) => OperandKind::Literal,
            Operand::Condition(_) => OperandKind::Condition,
        }
    }
}

/// LIFO stack of partially compiled operands.
///
/// Operators pop exactly their arity and push back one result; popping from
/// an empty stack means the driver broke the visitation protocol.
#[derive(Debug)]
pub struct OperandStack<T = Operand> {
    items: Vec<T>,
}

impl<T> OperandStack<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn pop(&mut self) -> CompileResult<T> {
        self.items
            .pop()
            .ok_or_else(|| CompileError::Internal("operand stack underflow".to_string()))
    }

    /// Pop the two operands of a binary operator, returned in source order
    pub fn pop_pair(&mut self) -> CompileResult<(T, T)> {
        if self.items.len() < 2 {
            return Err(CompileError::Internal(format!(
                "operand stack underflow: binary operator needs 2 operands, found {}",
                self.items.len()
            )));
        }
        let right = self.pop()?;
        let left = self.pop()?;
        Ok((left, right))
    }

    /// Remove every operand pushed after the stack reached `depth`
    pub fn split_off(&mut self, depth: usize) -> CompileResult<Vec<T>> {
        if depth > self.items.len() {
            return Err(CompileError::Internal(format!(
                "operand stack shrank below depth {} (now {})",
                depth,
                self.items.len()
            )));
        }
        Ok(self.items.split_off(depth))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the stack after a full traversal, yielding its only item
    pub fn into_root(mut self) -> CompileResult<T> {
        match self.items.len() {
            1 => self.pop(),
            0 => Err(CompileError::Internal(
                "traversal finished with an empty operand stack".to_string(),
            )),
            n => Err(CompileError::Internal(format!(
                "traversal finished with {} operands on the stack",
                n
            ))),
        }
    }
}

impl<T> Default for OperandStack<T> {
    fn default() -> Self {
        Self::new()
    }
}
