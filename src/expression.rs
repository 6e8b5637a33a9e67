//! Expression trees handed over by the host query engine.
//!
//! The compilers never look at these nodes directly; the traversal driver in
//! [`crate::compiler::driver`] replays them as visitor callbacks.

pub mod expr;
pub mod operator;

pub use expr::{ColumnRef, Constant, Expression, VariableRef};
pub use operator::{CompareOp, MathOp};
