//! Compiler for the value side of a SET assignment.
//!
//! Only plain operands are legal here: a column, a runtime variable or a
//! literal. Every operator node is rejected as soon as it is entered.

use crate::compiler::error::{CompileError, CompileResult};
use crate::compiler::filter::qualified_name;
use crate::compiler::operand::{Operand, OperandStack};
use crate::compiler::placeholder::{PlaceholderSequence, PlaceholderTable, RuntimeBinding};
use crate::compiler::visitor::ExpressionVisitor;
use crate::compiler::CompiledFragment;
use crate::expression::{CompareOp, MathOp};
use crate::value::{AttributeType, Value};
use log::debug;

#[derive(Default)]
pub struct SetClauseCompiler {
    stack: OperandStack,
    placeholders: PlaceholderTable,
}

impl SetClauseCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sequence(mut self, sequence: PlaceholderSequence) -> Self {
        self.placeholders = PlaceholderTable::starting_at(sequence);
        self
    }

    /// Finish the traversal, rendering the single harvested operand.
    /// Columns render as field paths (`'$price'`).
    pub fn finish(self) -> CompileResult<CompiledFragment> {
        let sequence = self.placeholders.sequence();
        let text = match self.stack.into_root()? {
            Operand::Column(field) => format!("'${}'", field),
            Operand::Variable(name) | Operand::Literal(name) => name,
            Operand::Condition(_) => {
                return Err(CompileError::Internal(
                    "condition produced while compiling a SET value".to_string(),
                ))
            }
        };

        let (fragment, placeholders) = self.placeholders.finalize(&text)?;
        debug!("compiled SET value: {}", fragment);
        Ok(CompiledFragment {
            fragment,
            placeholders,
            sequence,
            mirrored: false,
        })
    }
}

fn rejected(construct: impl Into<String>) -> CompileResult<()> {
    Err(CompileError::UnsupportedInSetClause(construct.into()))
}

impl ExpressionVisitor for SetClauseCompiler {
    fn on_enter_and(&mut self) -> CompileResult<()> {
        rejected("AND")
    }

    fn on_enter_or(&mut self) -> CompileResult<()> {
        rejected("OR")
    }

    fn on_enter_not(&mut self) -> CompileResult<()> {
        rejected("NOT")
    }

    fn on_enter_compare(&mut self, op: CompareOp) -> CompileResult<()> {
        rejected(format!("comparison {}", op.as_str()))
    }

    fn on_enter_is_null(&mut self) -> CompileResult<()> {
        rejected("IS NULL")
    }

    fn on_enter_in(&mut self, source: &str) -> CompileResult<()> {
        rejected(format!("IN {}", source))
    }

    fn on_enter_math(&mut self, op: MathOp) -> CompileResult<()> {
        rejected(format!("arithmetic operator {}", op.as_str()))
    }

    fn on_enter_function(&mut self, namespace: Option<&str>, name: &str) -> CompileResult<()> {
        rejected(format!("function {}", qualified_name(namespace, name)))
    }

    fn on_column_reference(
        &mut self,
        _table_id: Option<&str>,
        field: &str,
        _ty: AttributeType,
    ) -> CompileResult<()> {
        self.stack.push(Operand::Column(field.to_string()));
        Ok(())
    }

    fn on_runtime_variable(
        &mut self,
        id: Option<&str>,
        source_id: Option<&str>,
        field: &str,
        ty: AttributeType,
    ) -> CompileResult<()> {
        let name = self.placeholders.allocate_runtime_placeholder(RuntimeBinding {
            variable_id: id.map(str::to_string),
            source_id: source_id.map(str::to_string),
            field: field.to_string(),
            ty,
        });
        self.stack.push(Operand::Variable(name));
        Ok(())
    }

    fn on_literal(&mut self, value: &Value, ty: AttributeType) -> CompileResult<()> {
        let name = self
            .placeholders
            .allocate_literal_placeholder(value.clone(), ty);
        self.stack.push(Operand::Literal(name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::driver::walk;
    use crate::expression::Expression;

    fn compile(expr: &Expression) -> CompileResult<CompiledFragment> {
        let mut compiler = SetClauseCompiler::new();
        walk(expr, &mut compiler)?;
        compiler.finish()
    }

    #[test]
    fn test_plain_operands() -> CompileResult<()> {
        let compiled = compile(&Expression::constant("IBM"))?;
        assert_eq!(compiled.fragment, "'IBM'");
        assert!(compiled.placeholders.is_empty());

        let compiled = compile(&Expression::constant(75.5))?;
        assert_eq!(compiled.fragment, "75.5");

        let compiled = compile(&Expression::column("volume", AttributeType::Long))?;
        assert_eq!(compiled.fragment, "'$volume'");

        let compiled = compile(&Expression::variable("price", AttributeType::Double))?;
        assert_eq!(compiled.fragment, "var1");
        assert_eq!(compiled.placeholders.get("var1").unwrap().field, "price");
        Ok(())
    }

    #[test]
    fn test_every_operator_is_rejected() {
        let price = || Expression::column("price", AttributeType::Double);
        let exprs = vec![
            Expression::and(
                Expression::eq(price(), Expression::constant(1)),
                Expression::eq(price(), Expression::constant(2)),
            ),
            Expression::or(
                Expression::eq(price(), Expression::constant(1)),
                Expression::eq(price(), Expression::constant(2)),
            ),
            Expression::not(Expression::eq(price(), Expression::constant(1))),
            Expression::gt(price(), Expression::constant(1)),
            Expression::is_null(price()),
            Expression::in_source(price(), "PriceTable"),
            Expression::math(MathOp::Add, price(), Expression::constant(1)),
            Expression::function("sum", vec![price()]),
        ];

        for expr in exprs {
            assert!(matches!(
                compile(&expr),
                Err(CompileError::UnsupportedInSetClause(_))
            ));
        }
    }

    #[test]
    fn test_sequence_continuation() -> CompileResult<()> {
        let first = compile(&Expression::variable("price", AttributeType::Double))?;
        let mut compiler = SetClauseCompiler::new().with_sequence(first.sequence);
        walk(
            &Expression::variable("volume", AttributeType::Long),
            &mut compiler,
        )?;
        assert_eq!(compiler.finish()?.fragment, "var2");
        Ok(())
    }
}
