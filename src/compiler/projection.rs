//! Compiler for SELECT-list expressions.
//!
//! Produces a [`Projection`] per output attribute. Literals are baked into
//! the projection rather than parameterized, and runtime variables are
//! masked since the store cannot see values of the calling event.

use crate::compiler::error::{CompileError, CompileResult};
use crate::compiler::filter::qualified_name;
use crate::compiler::operand::OperandStack;
use crate::compiler::visitor::ExpressionVisitor;
use crate::expression::{CompareOp, MathOp};
use crate::value::{AttributeType, Value};
use log::debug;

/// Marker rendered in place of a runtime variable
pub const MASKED_VALUE: &str = "'?'";

/// Supported aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    /// Look up a function by its exact lowercase name; namespaced names never
    /// match
    pub fn from_name(namespace: Option<&str>, name: &str) -> Option<Self> {
        if namespace.is_some() {
            return None;
        }
        match name {
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Avg),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }

    /// Accumulator operator in the query language
    pub fn operator(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "$sum",
            AggregateFunction::Avg => "$avg",
            AggregateFunction::Min => "$min",
            AggregateFunction::Max => "$max",
        }
    }
}

/// A compiled SELECT-list expression
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Column(String),
    /// Rendered constant value
    Constant(String),
    Masked,
    Aggregate {
        function: AggregateFunction,
        argument: Box<Projection>,
    },
}

impl Projection {
    pub fn render(&self) -> String {
        match self {
            Projection::Column(field) => format!("'${}'", field),
            Projection::Constant(value) => format!("{{'$literal': {}}}", value),
            Projection::Masked => format!("{{'$literal': {}}}", MASKED_VALUE),
            Projection::Aggregate { function, argument } => {
                format!("{{'{}': {}}}", function.operator(), argument.render())
            }
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Projection::Aggregate { .. })
    }

    /// Column name when this projection is a bare column reference
    pub fn column(&self) -> Option<&str> {
        match self {
            Projection::Column(field) => Some(field),
            _ => None,
        }
    }
}

#[derive(Default)]
pub struct ProjectionCompiler {
    stack: OperandStack<Projection>,
    /// Open aggregate calls with the stack depth at which they started
    calls: Vec<(AggregateFunction, usize)>,
}

impl ProjectionCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> CompileResult<Projection> {
        if !self.calls.is_empty() {
            return Err(CompileError::Internal(format!(
                "{} aggregate call(s) never exited",
                self.calls.len()
            )));
        }
        let projection = self.stack.into_root()?;
        debug!("compiled projection: {}", projection.render());
        Ok(projection)
    }
}

fn unsupported(construct: impl Into<String>) -> CompileResult<()> {
    Err(CompileError::UnsupportedOperation(format!(
        "{} in a projection",
        construct.into()
    )))
}

impl ExpressionVisitor for ProjectionCompiler {
    fn on_enter_and(&mut self) -> CompileResult<()> {
        unsupported("AND")
    }

    fn on_enter_or(&mut self) -> CompileResult<()> {
        unsupported("OR")
    }

    fn on_enter_not(&mut self) -> CompileResult<()> {
        unsupported("NOT")
    }

    fn on_enter_compare(&mut self, op: CompareOp) -> CompileResult<()> {
        unsupported(format!("comparison {}", op.as_str()))
    }

    fn on_enter_is_null(&mut self) -> CompileResult<()> {
        unsupported("IS NULL")
    }

    fn on_enter_in(&mut self, source: &str) -> CompileResult<()> {
        unsupported(format!("IN {}", source))
    }

    fn on_enter_math(&mut self, op: MathOp) -> CompileResult<()> {
        unsupported(format!("arithmetic operator {}", op.as_str()))
    }

    fn on_enter_function(&mut self, namespace: Option<&str>, name: &str) -> CompileResult<()> {
        let function = AggregateFunction::from_name(namespace, name)
            .ok_or_else(|| CompileError::UnsupportedFunction(qualified_name(namespace, name)))?;
        if let Some((outer, _)) = self.calls.last() {
            return Err(CompileError::UnsupportedFunction(format!(
                "{} nested inside {}",
                function.name(),
                outer.name()
            )));
        }
        self.calls.push((function, self.stack.len()));
        Ok(())
    }

    fn on_exit_function(&mut self, namespace: Option<&str>, name: &str) -> CompileResult<()> {
        let (function, depth) = self.calls.pop().ok_or_else(|| {
            CompileError::Internal(format!(
                "exit of {} without a matching enter",
                qualified_name(namespace, name)
            ))
        })?;
        let mut args = self.stack.split_off(depth)?;
        if args.len() != 1 {
            return Err(CompileError::UnsupportedFunction(format!(
                "{} expects 1 argument, got {}",
                function.name(),
                args.len()
            )));
        }
        let argument = Box::new(args.remove(0));
        self.stack.push(Projection::Aggregate { function, argument });
        Ok(())
    }

    fn on_column_reference(
        &mut self,
        _table_id: Option<&str>,
        field: &str,
        _ty: AttributeType,
    ) -> CompileResult<()> {
        self.stack.push(Projection::Column(field.to_string()));
        Ok(())
    }

    fn on_runtime_variable(
        &mut self,
        _id: Option<&str>,
        _source_id: Option<&str>,
        field: &str,
        _ty: AttributeType,
    ) -> CompileResult<()> {
        debug!("masking runtime variable '{}' in projection", field);
        self.stack.push(Projection::Masked);
        Ok(())
    }

    fn on_literal(&mut self, value: &Value, ty: AttributeType) -> CompileResult<()> {
        self.stack.push(Projection::Constant(value.render_as(ty)));
        Ok(())
    }
}
