//! Callback protocol between the host traversal driver and the compilers.
//!
//! For every operator node the driver calls `on_enter_*`, visits the
//! operands (calling the in-order callback between the two operands of a
//! binary operator), then calls `on_exit_*`. Leaves get exactly one call.
//! Unless a compiler overrides it, every operator callback is a no-op.

use crate::compiler::error::CompileResult;
use crate::expression::{CompareOp, MathOp};
use crate::value::{AttributeType, Value};

pub trait ExpressionVisitor {
    fn on_enter_and(&mut self) -> CompileResult<()> {
        Ok(())
    }

    fn on_and_right_operand(&mut self) -> CompileResult<()> {
        Ok(())
    }

    fn on_exit_and(&mut self) -> CompileResult<()> {
        Ok(())
    }

    fn on_enter_or(&mut self) -> CompileResult<()> {
        Ok(())
    }

    fn on_or_right_operand(&mut self) -> CompileResult<()> {
        Ok(())
    }

    fn on_exit_or(&mut self) -> CompileResult<()> {
        Ok(())
    }

    fn on_enter_not(&mut self) -> CompileResult<()> {
        Ok(())
    }

    fn on_exit_not(&mut self) -> CompileResult<()> {
        Ok(())
    }

    fn on_enter_compare(&mut self, _op: CompareOp) -> CompileResult<()> {
        Ok(())
    }

    fn on_compare_right_operand(&mut self, _op: CompareOp) -> CompileResult<()> {
        Ok(())
    }

    fn on_exit_compare(&mut self, _op: CompareOp) -> CompileResult<()> {
        Ok(())
    }

    fn on_enter_is_null(&mut self) -> CompileResult<()> {
        Ok(())
    }

    fn on_exit_is_null(&mut self) -> CompileResult<()> {
        Ok(())
    }

    fn on_enter_in(&mut self, _source: &str) -> CompileResult<()> {
        Ok(())
    }

    fn on_exit_in(&mut self, _source: &str) -> CompileResult<()> {
        Ok(())
    }

    fn on_enter_math(&mut self, _op: MathOp) -> CompileResult<()> {
        Ok(())
    }

    fn on_math_right_operand(&mut self, _op: MathOp) -> CompileResult<()> {
        Ok(())
    }

    fn on_exit_math(&mut self, _op: MathOp) -> CompileResult<()> {
        Ok(())
    }

    fn on_enter_function(&mut self, _namespace: Option<&str>, _name: &str) -> CompileResult<()> {
        Ok(())
    }

    fn on_exit_function(&mut self, _namespace: Option<&str>, _name: &str) -> CompileResult<()> {
        Ok(())
    }

    fn on_column_reference(
        &mut self,
        table_id: Option<&str>,
        field: &str,
        ty: AttributeType,
    ) -> CompileResult<()>;

    fn on_runtime_variable(
        &mut self,
        id: Option<&str>,
        source_id: Option<&str>,
        field: &str,
        ty: AttributeType,
    ) -> CompileResult<()>;

    fn on_literal(&mut self, value: &Value, ty: AttributeType) -> CompileResult<()>;
}
