//! Pipeline assembly for compiled queries.
//!
//! Turns the per-clause output of the compilers into:
//! 1. An ordered list of aggregation stages for SELECT-style queries
//! 2. A `$set` document for update queries
//!
//! [`QueryCompiler`] drives the whole process from expression trees.

pub mod assembler;
pub mod query;
pub mod stage;
pub mod update;

pub use assembler::{OutputAttribute, PipelineAssembler, Selection, SortKey};
pub use query::{OrderItem, Query, QueryCompiler, SelectItem};
pub use stage::{SortOrder, Stage};
pub use update::{assemble_update, UpdateDocument};

use crate::compiler::{CompileResult, Placeholders, Resolver};
use crate::value::Value;
use serde::Serialize;
use std::collections::HashMap;

/// Ordered stages of one compiled query plus the runtime placeholders they
/// reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pipeline {
    stages: Vec<Stage>,
    placeholders: Placeholders,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>, placeholders: Placeholders) -> Self {
        Self {
            stages,
            placeholders,
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn placeholders(&self) -> &Placeholders {
        &self.placeholders
    }

    /// Render every stage, leaving runtime placeholders in place
    pub fn render(&self) -> Vec<String> {
        self.stages.iter().map(Stage::render).collect()
    }

    /// Render every stage with runtime placeholders bound to `bindings`.
    /// Each placeholder must be bound in at least one stage.
    pub fn resolve(&self, bindings: &HashMap<String, Value>) -> CompileResult<Vec<String>> {
        let mut resolver = Resolver::new(&self.placeholders, bindings);
        let stages = self
            .stages
            .iter()
            .map(|stage| resolver.substitute(&stage.render()))
            .collect::<CompileResult<Vec<_>>>()?;
        resolver.finish()?;
        Ok(stages)
    }
}
