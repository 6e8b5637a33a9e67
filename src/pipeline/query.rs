//! Whole-query compilation.
//!
//! A [`QueryCompiler`] creates one compiler per clause and carries the
//! placeholder sequence from each clause to the next, so WHERE and HAVING
//! never hand out the same placeholder name.

use crate::compiler::{
    walk, CompileError, CompileResult, CompiledFragment, FilterCompiler, PlaceholderSequence,
    Projection, ProjectionCompiler, SetClauseCompiler,
};
use crate::config::CompilerConfig;
use crate::expression::Expression;
use crate::pipeline::assembler::{OutputAttribute, PipelineAssembler, Selection, SortKey};
use crate::pipeline::stage::SortOrder;
use crate::pipeline::update::{assemble_update, UpdateDocument};
use crate::pipeline::Pipeline;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A SELECT-list entry before compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectItem {
    pub name: String,
    pub expression: Expression,
}

/// An ORDER BY entry before compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub expression: Expression,
    #[serde(default)]
    pub order: SortOrder,
}

/// Clauses of a selection query, as expression trees
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    #[serde(rename = "where")]
    pub filter: Option<Expression>,
    pub select: Vec<SelectItem>,
    pub group_by: Vec<Expression>,
    pub having: Option<Expression>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Query {
    /// Load a query description from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read query file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid query description in {}", path.display()))
    }
}

pub struct QueryCompiler {
    config: CompilerConfig,
    sequence: PlaceholderSequence,
}

impl QueryCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            sequence: PlaceholderSequence::default(),
        }
    }

    pub fn compile_filter(&mut self, expr: &Expression) -> CompileResult<CompiledFragment> {
        let compiler = FilterCompiler::new(&self.config).with_sequence(self.sequence);
        self.drive_filter(expr, compiler)
    }

    pub fn compile_having(&mut self, expr: &Expression) -> CompileResult<CompiledFragment> {
        let compiler = FilterCompiler::having(&self.config).with_sequence(self.sequence);
        self.drive_filter(expr, compiler)
    }

    pub fn compile_set_value(&mut self, expr: &Expression) -> CompileResult<CompiledFragment> {
        let mut compiler = SetClauseCompiler::new().with_sequence(self.sequence);
        walk(expr, &mut compiler)?;
        let compiled = compiler.finish()?;
        self.sequence = compiled.sequence;
        Ok(compiled)
    }

    pub fn compile_projection(&self, expr: &Expression) -> CompileResult<Projection> {
        let mut compiler = ProjectionCompiler::new();
        walk(expr, &mut compiler)?;
        compiler.finish()
    }

    /// Compile a GROUP BY or ORDER BY key, which must be a plain column
    pub fn compile_key(&self, expr: &Expression) -> CompileResult<String> {
        match self.compile_projection(expr)? {
            Projection::Column(field) => Ok(field),
            other => Err(CompileError::UnsupportedOperation(format!(
                "grouping and ordering keys must be columns, found {}",
                other.render()
            ))),
        }
    }

    pub fn compile_query(&mut self, query: &Query) -> CompileResult<Pipeline> {
        let filter = query
            .filter
            .as_ref()
            .map(|expr| self.compile_filter(expr))
            .transpose()?;

        let attributes = query
            .select
            .iter()
            .map(|item| -> CompileResult<OutputAttribute> {
                Ok(OutputAttribute::new(
                    item.name.as_str(),
                    self.compile_projection(&item.expression)?,
                ))
            })
            .collect::<CompileResult<Vec<_>>>()?;

        let group_by = query
            .group_by
            .iter()
            .map(|expr| self.compile_key(expr))
            .collect::<CompileResult<Vec<_>>>()?;

        let having = query
            .having
            .as_ref()
            .map(|expr| self.compile_having(expr))
            .transpose()?;

        let order_by = query
            .order_by
            .iter()
            .map(|item| -> CompileResult<SortKey> {
                Ok(SortKey::new(self.compile_key(&item.expression)?, item.order))
            })
            .collect::<CompileResult<Vec<_>>>()?;

        PipelineAssembler::new(&self.config).assemble(Selection {
            filter,
            attributes,
            group_by,
            having,
            order_by,
            offset: query.offset,
            limit: query.limit,
        })
    }

    /// Compile the assignments of an update into a `$set` document
    pub fn compile_update(
        &mut self,
        assignments: &[(String, Expression)],
    ) -> CompileResult<UpdateDocument> {
        let compiled = assignments
            .iter()
            .map(|(column, expr)| -> CompileResult<(String, CompiledFragment)> {
                Ok((column.clone(), self.compile_set_value(expr)?))
            })
            .collect::<CompileResult<Vec<_>>>()?;
        assemble_update(compiled)
    }

    fn drive_filter(
        &mut self,
        expr: &Expression,
        mut compiler: FilterCompiler,
    ) -> CompileResult<CompiledFragment> {
        walk(expr, &mut compiler)?;
        let compiled = compiler.finish()?;
        self.sequence = compiled.sequence;
        Ok(compiled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{AttributeType, Value};
    use std::collections::HashMap;

    fn column(name: &str, ty: AttributeType) -> Expression {
        Expression::column(name, ty)
    }

    #[test]
    fn test_where_and_having_do_not_collide() -> CompileResult<()> {
        let query = Query {
            filter: Some(Expression::eq(
                column("symbol", AttributeType::String),
                Expression::variable("symbol", AttributeType::String),
            )),
            select: vec![
                SelectItem {
                    name: "symbol".to_string(),
                    expression: column("symbol", AttributeType::String),
                },
                SelectItem {
                    name: "avgPrice".to_string(),
                    expression: Expression::function(
                        "avg",
                        vec![column("price", AttributeType::Double)],
                    ),
                },
            ],
            group_by: vec![column("symbol", AttributeType::String)],
            having: Some(Expression::gt(
                column("avgPrice", AttributeType::Double),
                Expression::variable("threshold", AttributeType::Double),
            )),
            ..Query::default()
        };

        let pipeline = QueryCompiler::new(CompilerConfig::default()).compile_query(&query)?;
        assert_eq!(pipeline.placeholders().len(), 2);
        assert_eq!(pipeline.placeholders().get("var1").unwrap().field, "symbol");
        assert_eq!(
            pipeline.placeholders().get("var2").unwrap().field,
            "threshold"
        );

        let mut bindings = HashMap::new();
        bindings.insert("symbol".to_string(), Value::from("IBM"));
        bindings.insert("threshold".to_string(), Value::Double(60.5));
        assert_eq!(
            pipeline.resolve(&bindings)?,
            vec![
                "{'$match': {'symbol': {'$eq': 'IBM'}}}",
                "{'$group': {'_id': '$symbol', 'avgPrice': {'$avg': '$price'}}}",
                "{'$project': {'_id': 0, 'symbol': '$_id', 'avgPrice': '$avgPrice'}}",
                "{'$match': {'avgPrice': {'$gt': 60.5}}}",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_keys_must_be_columns() {
        let compiler = QueryCompiler::new(CompilerConfig::default());
        let err = compiler
            .compile_key(&Expression::function(
                "sum",
                vec![column("price", AttributeType::Double)],
            ))
            .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedOperation(_)));

        assert_eq!(
            compiler
                .compile_key(&column("price", AttributeType::Double))
                .unwrap(),
            "price"
        );
    }

    #[test]
    fn test_compile_update() -> CompileResult<()> {
        let mut compiler = QueryCompiler::new(CompilerConfig::default());
        let update = compiler.compile_update(&[
            (
                "price".to_string(),
                Expression::variable("price", AttributeType::Double),
            ),
            ("symbol".to_string(), Expression::constant("IBM")),
        ])?;
        assert_eq!(update.fragment, "{'$set': {'price': var1, 'symbol': 'IBM'}}");

        let err = compiler
            .compile_update(&[(
                "price".to_string(),
                Expression::gt(
                    column("price", AttributeType::Double),
                    Expression::constant(1),
                ),
            )])
            .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedInSetClause(_)));
        Ok(())
    }

    #[test]
    fn test_query_from_path() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("query.json");
        std::fs::write(
            &path,
            r#"{
                "where": {
                    "kind": "ge", "op": "ge",
                    "left": {"kind": "column", "field": "price", "type": "double"},
                    "right": {"kind": "constant", "value": 57.6, "type": "double"}
                }
            }"#,
        )?;
        // "ge" is not a node kind
        assert!(Query::from_path(&path).is_err());

        std::fs::write(
            &path,
            r#"{
                "where": {
                    "kind": "compare", "op": "ge",
                    "left": {"kind": "column", "field": "price", "type": "double"},
                    "right": {"kind": "constant", "value": 57.6, "type": "double"}
                },
                "select": [
                    {"name": "price", "expression": {"kind": "column", "field": "price", "type": "double"}}
                ],
                "order_by": [
                    {"expression": {"kind": "column", "field": "price", "type": "double"}, "order": "desc"}
                ],
                "limit": 5
            }"#,
        )?;
        let query = Query::from_path(&path)?;
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.order_by[0].order, SortOrder::Desc);

        let pipeline = QueryCompiler::new(CompilerConfig::default()).compile_query(&query)?;
        assert_eq!(
            pipeline.render(),
            vec![
                "{'$match': {'price': {'$gte': 57.6}}}",
                "{'$project': {'_id': 0, 'price': '$price'}}",
                "{'$sort': {'price': -1}}",
                "{'$limit': 5}",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        assert!(Query::from_path("/nonexistent/query.json").is_err());
    }
}
