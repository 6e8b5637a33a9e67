//! Assembles per-clause fragments into an ordered pipeline.
//!
//! Stage order is fixed: match → group → project → having → sort → skip →
//! limit. Absent clauses produce no stage.

use crate::compiler::{CompileError, CompileResult, CompiledFragment, Placeholders, Projection};
use crate::config::CompilerConfig;
use crate::pipeline::stage::{FieldList, SortOrder, Stage};
use crate::pipeline::Pipeline;
use log::debug;

const GROUP_KEY: &str = "_id";

/// A named SELECT-list entry
#[derive(Debug, Clone, PartialEq)]
pub struct OutputAttribute {
    pub name: String,
    pub projection: Projection,
}

impl OutputAttribute {
    pub fn new(name: impl Into<String>, projection: Projection) -> Self {
        Self {
            name: name.into(),
            projection,
        }
    }
}

/// An ORDER BY key over an output attribute name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

/// Compiled clauses of one query
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub filter: Option<CompiledFragment>,
    pub attributes: Vec<OutputAttribute>,
    /// Grouping key columns
    pub group_by: Vec<String>,
    pub having: Option<CompiledFragment>,
    pub order_by: Vec<SortKey>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

pub struct PipelineAssembler<'a> {
    config: &'a CompilerConfig,
}

impl<'a> PipelineAssembler<'a> {
    pub fn new(config: &'a CompilerConfig) -> Self {
        Self { config }
    }

    pub fn assemble(&self, selection: Selection) -> CompileResult<Pipeline> {
        let mut stages = Vec::new();
        let mut placeholders = Placeholders::default();

        if let Some(filter) = selection.filter {
            placeholders.merge(filter.placeholders)?;
            stages.push(Stage::Match(filter.fragment));
        }

        let grouped = !selection.group_by.is_empty();
        if grouped {
            stages.push(Stage::Group(
                self.group_body(&selection.group_by, &selection.attributes)?,
            ));
        }

        if !selection.attributes.is_empty() {
            stages.push(Stage::Project(Self::project_body(
                &selection.group_by,
                &selection.attributes,
            )));
        }

        if let Some(having) = selection.having {
            placeholders.merge(having.placeholders)?;
            stages.push(Stage::Having(having.fragment));
        }

        if !selection.order_by.is_empty() {
            let mut keys = FieldList::new();
            for key in &selection.order_by {
                keys.insert(key.field.as_str(), key.order.direction().to_string());
            }
            stages.push(Stage::Sort(keys.render()));
        }

        if let Some(offset) = selection.offset {
            stages.push(Stage::Skip(offset));
        }
        if let Some(limit) = selection.limit {
            stages.push(Stage::Limit(limit));
        }

        debug!(
            "assembled pipeline: [{}]",
            stages
                .iter()
                .map(Stage::name)
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Pipeline::new(stages, placeholders))
    }

    fn group_body(
        &self,
        keys: &[String],
        attributes: &[OutputAttribute],
    ) -> CompileResult<String> {
        let mut body = FieldList::new();
        body.insert(GROUP_KEY, group_key(keys));

        for attribute in attributes {
            if is_group_key(keys, &attribute.projection) {
                continue;
            }
            if attribute.name == GROUP_KEY {
                return Err(CompileError::UnsupportedOperation(format!(
                    "output attribute '{}' collides with the group key",
                    GROUP_KEY
                )));
            }
            let accumulator = if attribute.projection.is_aggregate() {
                attribute.projection.render()
            } else {
                format!(
                    "{{'{}': {}}}",
                    self.config.group_fallback.accumulator(),
                    attribute.projection.render()
                )
            };
            body.insert(attribute.name.as_str(), accumulator);
        }

        Ok(body.render())
    }

    fn project_body(keys: &[String], attributes: &[OutputAttribute]) -> String {
        let mut body = FieldList::new();
        body.insert(GROUP_KEY, "0");

        for attribute in attributes {
            let value = if keys.is_empty() {
                attribute.projection.render()
            } else {
                match attribute.projection.column() {
                    Some(column) if keys.len() == 1 && keys[0] == column => {
                        format!("'${}'", GROUP_KEY)
                    }
                    Some(column) if keys.iter().any(|key| key == column) => {
                        format!("'${}.{}'", GROUP_KEY, column)
                    }
                    _ => format!("'${}'", attribute.name),
                }
            };
            body.insert(attribute.name.as_str(), value);
        }

        body.render()
    }
}

/// A single key is projected as a scalar, several keys as a compound
/// object keyed by column name
fn group_key(keys: &[String]) -> String {
    match keys {
        [key] => format!("'${}'", key),
        _ => {
            let mut compound = FieldList::new();
            for key in keys {
                compound.insert(key.as_str(), format!("'${}'", key));
            }
            compound.render()
        }
    }
}

fn is_group_key(keys: &[String], projection: &Projection) -> bool {
    projection
        .column()
        .map(|column| keys.iter().any(|key| key == column))
        .unwrap_or(false)
}
