//! Expression tree definitions.

use crate::expression::operator::{CompareOp, MathOp};
use crate::value::{AttributeType, Value};
use serde::{Deserialize, Serialize};

/// Reference to a column of the stored table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    #[serde(default)]
    pub table_id: Option<String>,
    pub field: String,
    #[serde(rename = "type")]
    pub ty: AttributeType,
}

impl ColumnRef {
    pub fn new(field: impl Into<String>, ty: AttributeType) -> Self {
        Self {
            table_id: None,
            field: field.into(),
            ty,
        }
    }
}

/// Reference to a value supplied by the calling event at execution time
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    pub field: String,
    #[serde(rename = "type")]
    pub ty: AttributeType,
}

impl VariableRef {
    pub fn new(field: impl Into<String>, ty: AttributeType) -> Self {
        Self {
            id: None,
            source_id: None,
            field: field.into(),
            ty,
        }
    }
}

/// Constant value in an expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub value: Value,
    #[serde(rename = "type")]
    pub ty: AttributeType,
}

impl Constant {
    pub fn new(value: Value, ty: AttributeType) -> Self {
        Self { value, ty }
    }
}

/// Expression tree node as handed over by the host query engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expression {
    And {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Or {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Not {
        operand: Box<Expression>,
    },
    Compare {
        op: CompareOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    IsNull {
        operand: Box<Expression>,
    },
    /// Membership test against a named collection
    In {
        operand: Box<Expression>,
        source: String,
    },
    Math {
        op: MathOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Function {
        #[serde(default)]
        namespace: Option<String>,
        name: String,
        #[serde(default)]
        args: Vec<Expression>,
    },
    Column(ColumnRef),
    Variable(VariableRef),
    Constant(Constant),
}

impl Expression {
    pub fn column(field: impl Into<String>, ty: AttributeType) -> Self {
        Expression::Column(ColumnRef::new(field, ty))
    }

    pub fn variable(field: impl Into<String>, ty: AttributeType) -> Self {
        Expression::Variable(VariableRef::new(field, ty))
    }

    /// Create a constant, typed after the value itself (`Null` is typed as object)
    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        let ty = value.data_type().unwrap_or(AttributeType::Object);
        Expression::Constant(Constant::new(value, ty))
    }

    pub fn typed_constant(value: impl Into<Value>, ty: AttributeType) -> Self {
        Expression::Constant(Constant::new(value.into(), ty))
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(operand: Expression) -> Self {
        Expression::Not {
            operand: Box::new(operand),
        }
    }

    pub fn compare(op: CompareOp, left: Expression, right: Expression) -> Self {
        Expression::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(left: Expression, right: Expression) -> Self {
        Self::compare(CompareOp::Eq, left, right)
    }

    pub fn ne(left: Expression, right: Expression) -> Self {
        Self::compare(CompareOp::Ne, left, right)
    }

    pub fn lt(left: Expression, right: Expression) -> Self {
        Self::compare(CompareOp::Lt, left, right)
    }

    pub fn le(left: Expression, right: Expression) -> Self {
        Self::compare(CompareOp::Le, left, right)
    }

    pub fn gt(left: Expression, right: Expression) -> Self {
        Self::compare(CompareOp::Gt, left, right)
    }

    pub fn ge(left: Expression, right: Expression) -> Self {
        Self::compare(CompareOp::Ge, left, right)
    }

    pub fn is_null(operand: Expression) -> Self {
        Expression::IsNull {
            operand: Box::new(operand),
        }
    }

    pub fn in_source(operand: Expression, source: impl Into<String>) -> Self {
        Expression::In {
            operand: Box::new(operand),
            source: source.into(),
        }
    }

    pub fn math(op: MathOp, left: Expression, right: Expression) -> Self {
        Expression::Math {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create a call to a function outside any namespace
    pub fn function(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Function {
            namespace: None,
            name: name.into(),
            args,
        }
    }
}
