//! Reference traversal driver.
//!
//! Walks an [`Expression`] tree and replays it against an
//! [`ExpressionVisitor`] in the fixed pre/in/post order the compilers expect.
//! The first callback error aborts the walk.

use crate::compiler::error::CompileResult;
use crate::compiler::visitor::ExpressionVisitor;
use crate::expression::Expression;

pub fn walk<V>(expr: &Expression, visitor: &mut V) -> CompileResult<()>
where
    V: ExpressionVisitor + ?Sized,
{
    match expr {
        Expression::And { left, right } => {
            visitor.on_enter_and()?;
            walk(left, visitor)?;
            visitor.on_and_right_operand()?;
            walk(right, visitor)?;
            visitor.on_exit_and()
        }

        Expression::Or { left, right } => {
            visitor.on_enter_or()?;
            walk(left, visitor)?;
            visitor.on_or_right_operand()?;
            walk(right, visitor)?;
            visitor.on_exit_or()
        }

        Expression::Not { operand } => {
            visitor.on_enter_not()?;
            walk(operand, visitor)?;
            visitor.on_exit_not()
        }

        Expression::Compare { op, left, right } => {
            visitor.on_enter_compare(*op)?;
            walk(left, visitor)?;
            visitor.on_compare_right_operand(*op)?;
            walk(right, visitor)?;
            visitor.on_exit_compare(*op)
        }

        Expression::IsNull { operand } => {
            visitor.on_enter_is_null()?;
            walk(operand, visitor)?;
            visitor.on_exit_is_null()
        }

        Expression::In { operand, source } => {
            visitor.on_enter_in(source)?;
            walk(operand, visitor)?;
            visitor.on_exit_in(source)
        }

        Expression::Math { op, left, right } => {
            visitor.on_enter_math(*op)?;
            walk(left, visitor)?;
            visitor.on_math_right_operand(*op)?;
            walk(right, visitor)?;
            visitor.on_exit_math(*op)
        }

        Expression::Function {
            namespace,
            name,
            args,
        } => {
            visitor.on_enter_function(namespace.as_deref(), name)?;
            for arg in args {
                walk(arg, visitor)?;
            }
            visitor.on_exit_function(namespace.as_deref(), name)
        }

        Expression::Column(col) => {
            visitor.on_column_reference(col.table_id.as_deref(), &col.field, col.ty)
        }

        Expression::Variable(var) => visitor.on_runtime_variable(
            var.id.as_deref(),
            var.source_id.as_deref(),
            &var.field,
            var.ty,
        ),

        Expression::Constant(constant) => visitor.on_literal(&constant.value, constant.ty),
    }
}
