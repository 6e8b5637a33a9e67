//! Attribute types and literal values carried through compilation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Types the host engine attaches to attributes, variables and constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Int,
    Long,
    Float,
    Double,
    Bool,
    Object,
}

impl AttributeType {
    /// Whether values of this type are rendered inside single quotes
    pub fn is_string_like(&self) -> bool {
        matches!(self, AttributeType::String)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Int => "int",
            AttributeType::Long => "long",
            AttributeType::Float => "float",
            AttributeType::Double => "double",
            AttributeType::Bool => "bool",
            AttributeType::Object => "object",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete values: literals in an expression tree or live values bound at
/// execution time.
///
/// Deserialization is untagged, so JSON numbers without a fraction become
/// `Int`/`Long` and numbers with one become `Double`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Float(f32),
    String(String),
}

impl Value {
    /// Get the attribute type of this value
    pub fn data_type(&self) -> Option<AttributeType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(AttributeType::Bool),
            Value::Int(_) => Some(AttributeType::Int),
            Value::Long(_) => Some(AttributeType::Long),
            Value::Float(_) => Some(AttributeType::Float),
            Value::Double(_) => Some(AttributeType::Double),
            Value::String(_) => Some(AttributeType::String),
        }
    }

    /// Render this value as it should appear in a fragment, quoting it when
    /// `ty` is string-like.
    ///
    /// The text is not escaped: a string containing a single quote yields a
    /// fragment that no longer parses.
    pub fn render_as(&self, ty: AttributeType) -> String {
        match self {
            Value::Null => "null".to_string(),
            _ if ty.is_string_like() => format!("'{}'", self),
            _ => self.to_string(),
        }
    }

    /// Render this value using its own type to decide on quoting
    pub fn render(&self) -> String {
        match self.data_type() {
            Some(ty) => self.render_as(ty),
            None => "null".to_string(),
        }
    }
}

/// Raw textual form, never quoted
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
