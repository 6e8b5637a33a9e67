//! Condition and selection compilers.
//!
//! This module provides:
//! - The visitor protocol the host driver uses to replay an expression tree
//! - The operand stack and placeholder table shared by all compilers
//! - Three compilers: filter conditions (WHERE / HAVING), SET values and
//!   SELECT-list projections
//! - Resolution of runtime placeholders against live values

pub mod driver;
pub mod error;
pub mod filter;
pub mod operand;
pub mod placeholder;
pub mod projection;
pub mod set_clause;
pub mod visitor;

pub use driver::walk;
pub use error::{CompileError, CompileResult, OperandKind};
pub use filter::FilterCompiler;
pub use operand::{Condition, Operand, OperandStack};
pub use placeholder::{
    resolve, PlaceholderSequence, PlaceholderTable, Placeholders, Resolver, RuntimeBinding,
};
pub use projection::{AggregateFunction, Projection, ProjectionCompiler};
pub use set_clause::SetClauseCompiler;
pub use visitor::ExpressionVisitor;

use crate::config::CompilerConfig;
use crate::expression::Expression;
use crate::value::Value;
use std::collections::HashMap;

/// Output of a finished filter or SET-value compiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFragment {
    /// Fragment text with literals inlined
    pub fragment: String,
    /// Runtime placeholders still present in `fragment`
    pub placeholders: Placeholders,
    /// Where the next compiler of the same query should continue numbering
    pub sequence: PlaceholderSequence,
    /// Set when the root comparison had its column operand on the right
    /// in source order
    pub mirrored: bool,
}

impl CompiledFragment {
    pub fn resolve(&self, bindings: &HashMap<String, Value>) -> CompileResult<String> {
        resolve(&self.fragment, &self.placeholders, bindings)
    }
}

/// Compile a WHERE condition
pub fn compile_filter(
    expr: &Expression,
    config: &CompilerConfig,
) -> CompileResult<CompiledFragment> {
    let mut compiler = FilterCompiler::new(config);
    walk(expr, &mut compiler)?;
    compiler.finish()
}

/// Compile a SET value
pub fn compile_set_value(expr: &Expression) -> CompileResult<CompiledFragment> {
    let mut compiler = SetClauseCompiler::new();
    walk(expr, &mut compiler)?;
    compiler.finish()
}

/// Compile a SELECT-list expression
pub fn compile_projection(expr: &Expression) -> CompileResult<Projection> {
    let mut compiler = ProjectionCompiler::new();
    walk(expr, &mut compiler)?;
    compiler.finish()
}
