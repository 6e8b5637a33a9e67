//! `$set` documents for update queries.

use crate::compiler::{resolve, CompileError, CompileResult, CompiledFragment, Placeholders};
use crate::pipeline::stage::FieldList;
use crate::value::Value;
use log::debug;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDocument {
    pub fragment: String,
    pub placeholders: Placeholders,
}

impl UpdateDocument {
    pub fn resolve(&self, bindings: &HashMap<String, Value>) -> CompileResult<String> {
        resolve(&self.fragment, &self.placeholders, bindings)
    }
}

/// Build a `$set` document from `(column, compiled value)` pairs.
/// A column assigned twice keeps its last value.
pub fn assemble_update(
    assignments: Vec<(String, CompiledFragment)>,
) -> CompileResult<UpdateDocument> {
    if assignments.is_empty() {
        return Err(CompileError::UnsupportedOperation(
            "SET clause without assignments".to_string(),
        ));
    }

    let mut fields = FieldList::new();
    let mut placeholders = Placeholders::default();
    for (column, value) in assignments {
        placeholders.merge(value.placeholders)?;
        fields.insert(column, value.fragment);
    }

    let fragment = format!("{{'$set': {}}}", fields.render());
    debug!("assembled update: {}", fragment);
    Ok(UpdateDocument {
        fragment,
        placeholders,
    })
}
