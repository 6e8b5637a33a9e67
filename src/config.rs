//! Compiler configuration.

use serde::{Deserialize, Serialize};

/// Field name the document store uses for its object identifier
pub const DEFAULT_ID_FIELD: &str = "_id";

/// Accumulator used in the group stage for projections that are neither a
/// grouping key nor an aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GroupFallback {
    #[default]
    First,
    Last,
}

impl GroupFallback {
    pub fn accumulator(&self) -> &'static str {
        match self {
            GroupFallback::First => "$first",
            GroupFallback::Last => "$last",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Comparisons on this field use the object-id template
    pub id_field: String,
    pub group_fallback: GroupFallback,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            group_fallback: GroupFallback::default(),
        }
    }
}
