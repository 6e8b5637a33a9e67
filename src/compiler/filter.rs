//! Compiler for WHERE-style and HAVING-style filter conditions.
//!
//! Supported grammar:
//! - `column op value` and `value op column` comparisons, where the value is
//!   a runtime variable or a literal
//! - `column IS NULL` (not in HAVING mode)
//! - AND / OR over conditions
//! - NOT over a condition on a single field
//!
//! Membership tests, arithmetic and function calls are rejected outright.

use crate::compiler::error::{CompileError, CompileResult};
use crate::compiler::operand::{Condition, Operand, OperandStack};
use crate::compiler::placeholder::{PlaceholderSequence, PlaceholderTable, RuntimeBinding};
use crate::compiler::visitor::ExpressionVisitor;
use crate::compiler::CompiledFragment;
use crate::config::CompilerConfig;
use crate::expression::{CompareOp, MathOp};
use crate::value::{AttributeType, Value};
use log::debug;

pub struct FilterCompiler {
    stack: OperandStack,
    placeholders: PlaceholderTable,
    id_field: String,
    having: bool,
    /// Whether the most recent comparison had its column on the right
    last_mirrored: bool,
}

impl FilterCompiler {
    /// Create a compiler for a WHERE clause
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            stack: OperandStack::new(),
            placeholders: PlaceholderTable::new(),
            id_field: config.id_field.clone(),
            having: false,
            last_mirrored: false,
        }
    }

    /// Create a compiler for a HAVING clause
    pub fn having(config: &CompilerConfig) -> Self {
        Self {
            having: true,
            ..Self::new(config)
        }
    }

    /// Continue placeholder numbering from a previously compiled clause
    pub fn with_sequence(mut self, sequence: PlaceholderSequence) -> Self {
        self.placeholders = PlaceholderTable::starting_at(sequence);
        self
    }

    /// Finish the traversal: the only operand left must be a condition
    pub fn finish(self) -> CompileResult<CompiledFragment> {
        let sequence = self.placeholders.sequence();
        let condition = match self.stack.into_root()? {
            Operand::Condition(condition) => condition,
            other => {
                return Err(CompileError::UnsupportedComposition(format!(
                    "a filter must be a condition, found a bare {}",
                    other.kind()
                )))
            }
        };
        let mirrored = matches!(condition, Condition::Field { .. }) && self.last_mirrored;

        let (fragment, placeholders) = self.placeholders.finalize(&condition.render())?;
        debug!("compiled filter: {}", fragment);
        Ok(CompiledFragment {
            fragment,
            placeholders,
            sequence,
            mirrored,
        })
    }

    fn combine(&mut self, combinator: &str) -> CompileResult<()> {
        let (left, right) = self.stack.pop_pair()?;
        match (left, right) {
            (Operand::Condition(left), Operand::Condition(right)) => {
                self.stack.push(Operand::Condition(Condition::Compound(format!(
                    "{{'{}': [{}, {}]}}",
                    combinator,
                    left.render(),
                    right.render()
                ))));
                Ok(())
            }
            (left, right) => Err(CompileError::UnsupportedComposition(format!(
                "{} needs two conditions, found {} and {}",
                combinator,
                left.kind(),
                right.kind()
            ))),
        }
    }

    fn comparison_predicate(&self, field: &str, op: CompareOp, value: &str) -> String {
        if field == self.id_field {
            format!("{{'{}': {{'$oid': {}}}}}", op.document_operator(), value)
        } else {
            format!("{{'{}': {}}}", op.document_operator(), value)
        }
    }
}

impl ExpressionVisitor for FilterCompiler {
    fn on_exit_and(&mut self) -> CompileResult<()> {
        self.combine("$and")
    }

    fn on_exit_or(&mut self) -> CompileResult<()> {
        self.combine("$or")
    }

    fn on_exit_not(&mut self) -> CompileResult<()> {
        match self.stack.pop()? {
            Operand::Condition(condition) => {
                let negated = condition.negate().ok_or_else(|| {
                    CompileError::UnsupportedComposition(
                        "NOT over a condition spanning several fields".to_string(),
                    )
                })?;
                self.stack.push(Operand::Condition(negated));
                Ok(())
            }
            other => Err(CompileError::UnsupportedComposition(format!(
                "NOT needs a condition, found {}",
                other.kind()
            ))),
        }
    }

    fn on_exit_compare(&mut self, op: CompareOp) -> CompileResult<()> {
        let (left, right) = self.stack.pop_pair()?;
        let (field, op, value, mirrored) = match (left, right) {
            (Operand::Column(field), Operand::Variable(value) | Operand::Literal(value)) => {
                (field, op, value, false)
            }
            (Operand::Variable(value) | Operand::Literal(value), Operand::Column(field)) => {
                (field, op.mirrored(), value, true)
            }
            (left, right) => {
                return Err(CompileError::UnsupportedComparison {
                    operator: op.as_str().to_string(),
                    left: left.kind(),
                    right: right.kind(),
                })
            }
        };

        let predicate = self.comparison_predicate(&field, op, &value);
        self.last_mirrored = mirrored;
        self.stack
            .push(Operand::Condition(Condition::field(field, predicate)));
        Ok(())
    }

    fn on_enter_is_null(&mut self) -> CompileResult<()> {
        if self.having {
            return Err(CompileError::UnsupportedInHaving("IS NULL".to_string()));
        }
        Ok(())
    }

    fn on_exit_is_null(&mut self) -> CompileResult<()> {
        match self.stack.pop()? {
            Operand::Column(field) => {
                self.stack
                    .push(Operand::Condition(Condition::field(field, "{'$eq': null}")));
                Ok(())
            }
            other => Err(CompileError::UnsupportedNullCheck(other.kind())),
        }
    }

    fn on_enter_in(&mut self, source: &str) -> CompileResult<()> {
        Err(CompileError::UnsupportedOperation(format!("IN {}", source)))
    }

    fn on_enter_math(&mut self, op: MathOp) -> CompileResult<()> {
        Err(CompileError::UnsupportedOperation(format!(
            "arithmetic operator {}",
            op.as_str()
        )))
    }

    fn on_enter_function(&mut self, namespace: Option<&str>, name: &str) -> CompileResult<()> {
        Err(CompileError::UnsupportedFunction(qualified_name(namespace, name)))
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

pub(crate) fn qualified_name(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{}:{}", ns, name),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::driver::walk;
    use crate::compiler::error::OperandKind;
    use crate::expression::Expression;
    use std::collections::HashMap;

    fn compile(expr: &Expression) -> CompileResult<CompiledFragment> {
        let mut compiler = FilterCompiler::new(&CompilerConfig::default());
        walk(expr, &mut compiler)?;
        compiler.finish()
    }

    fn compile_having(expr: &Expression) -> CompileResult<CompiledFragment> {
        let mut compiler = FilterCompiler::having(&CompilerConfig::default());
        walk(expr, &mut compiler)?;
        compiler.finish()
    }

    fn price() -> Expression {
        Expression::column("price", AttributeType::Double)
    }

    fn symbol() -> Expression {
        Expression::column("symbol", AttributeType::String)
    }

    #[test]
    fn test_compare_column_literal() -> CompileResult<()> {
        let compiled = compile(&Expression::ge(
            price(),
            Expression::typed_constant(57.6, AttributeType::Float),
        ))?;
        assert_eq!(compiled.fragment, "{'price': {'$gte': 57.6}}");
        assert!(compiled.placeholders.is_empty());
        assert!(!compiled.mirrored);
        Ok(())
    }

    #[test]
    fn test_compare_is_order_insensitive() -> CompileResult<()> {
        let forward = compile(&Expression::eq(symbol(), Expression::constant("IBM")))?;
        let backward = compile(&Expression::eq(Expression::constant("IBM"), symbol()))?;
        assert_eq!(forward.fragment, "{'symbol': {'$eq': 'IBM'}}");
        assert_eq!(forward.fragment, backward.fragment);
        assert!(!forward.mirrored);
        assert!(backward.mirrored);

        // 50 < price means price > 50
        let compiled = compile(&Expression::lt(Expression::constant(50), price()))?;
        assert_eq!(compiled.fragment, "{'price': {'$gt': 50}}");
        Ok(())
    }

    #[test]
    fn test_conjunction_of_literals() -> CompileResult<()> {
        let compiled = compile(&Expression::and(
            Expression::eq(symbol(), Expression::constant("IBM")),
            Expression::gt(price(), Expression::constant(50)),
        ))?;
        assert_eq!(
            compiled.fragment,
            "{'$and': [{'symbol': {'$eq': 'IBM'}}, {'price': {'$gt': 50}}]}"
        );
        assert!(compiled.placeholders.is_empty());
        Ok(())
    }

    #[test]
    fn test_runtime_variable_survives() -> CompileResult<()> {
        let compiled = compile(&Expression::or(
            Expression::eq(symbol(), Expression::variable("symbol", AttributeType::String)),
            Expression::is_null(price()),
        ))?;
        assert_eq!(
            compiled.fragment,
            "{'$or': [{'symbol': {'$eq': var1}}, {'price': {'$eq': null}}]}"
        );
        assert_eq!(compiled.placeholders.len(), 1);
        let binding = compiled.placeholders.get("var1").unwrap();
        assert_eq!(binding.field, "symbol");
        assert_eq!(binding.ty, AttributeType::String);

        let mut bindings = HashMap::new();
        bindings.insert("symbol".to_string(), Value::from("WSO2"));
        assert_eq!(
            compiled.resolve(&bindings)?,
            "{'$or': [{'symbol': {'$eq': 'WSO2'}}, {'price': {'$eq': null}}]}"
        );
        Ok(())
    }

    #[test]
    fn test_not_wraps_single_field() -> CompileResult<()> {
        let compiled = compile(&Expression::not(Expression::eq(
            symbol(),
            Expression::variable("symbol", AttributeType::String),
        )))?;
        assert_eq!(compiled.fragment, "{'symbol': {'$not': {'$eq': var1}}}");

        let compiled = compile(&Expression::not(Expression::not(Expression::is_null(
            price(),
        ))))?;
        assert_eq!(compiled.fragment, "{'price': {'$eq': null}}");
        Ok(())
    }

    #[test]
    fn test_not_over_compound_fails() {
        let err = compile(&Expression::not(Expression::and(
            Expression::eq(symbol(), Expression::constant("IBM")),
            Expression::gt(price(), Expression::constant(50)),
        )))
        .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedComposition(_)));
    }

    #[test]
    fn test_object_id_template() -> CompileResult<()> {
        let compiled = compile(&Expression::eq(
            Expression::column("_id", AttributeType::String),
            Expression::constant("5b2f6a1e"),
        ))?;
        assert_eq!(compiled.fragment, "{'_id': {'$eq': {'$oid': '5b2f6a1e'}}}");

        let config = CompilerConfig {
            id_field: "key".to_string(),
            ..CompilerConfig::default()
        };
        let mut compiler = FilterCompiler::new(&config);
        walk(
            &Expression::ne(
                Expression::variable("key", AttributeType::String),
                Expression::column("key", AttributeType::String),
            ),
            &mut compiler,
        )?;
        assert_eq!(
            compiler.finish()?.fragment,
            "{'key': {'$ne': {'$oid': var1}}}"
        );
        Ok(())
    }

    #[test]
    fn test_comparison_operand_mismatches() {
        let cases = vec![
            (Expression::eq(symbol(), price()), OperandKind::Column, OperandKind::Column),
            (
                Expression::eq(Expression::constant(1), Expression::constant(2)),
                OperandKind::Literal,
                OperandKind::Literal,
            ),
            (
                Expression::eq(
                    Expression::variable("a", AttributeType::Int),
                    Expression::constant(2),
                ),
                OperandKind::Variable,
                OperandKind::Literal,
            ),
            (
                Expression::eq(
                    Expression::is_null(price()),
                    Expression::constant(true),
                ),
                OperandKind::Condition,
                OperandKind::Literal,
            ),
        ];

        for (expr, left, right) in cases {
            assert_eq!(
                compile(&expr).unwrap_err(),
                CompileError::UnsupportedComparison {
                    operator: "==".to_string(),
                    left,
                    right,
                }
            );
        }
    }

    #[test]
    fn test_composition_needs_conditions() {
        let err = compile(&Expression::and(
            symbol(),
            Expression::gt(price(), Expression::constant(50)),
        ))
        .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedComposition(_)));

        let err = compile(&Expression::column("active", AttributeType::Bool)).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedComposition(_)));
    }

    #[test]
    fn test_null_check_needs_column() {
        let err = compile(&Expression::is_null(Expression::variable(
            "price",
            AttributeType::Double,
        )))
        .unwrap_err();
        assert_eq!(err, CompileError::UnsupportedNullCheck(OperandKind::Variable));

        let err = compile(&Expression::is_null(Expression::is_null(price()))).unwrap_err();
        assert_eq!(err, CompileError::UnsupportedNullCheck(OperandKind::Condition));
    }

    #[test]
    fn test_unconditional_rejections() {
        let err = compile(&Expression::in_source(symbol(), "SymbolTable")).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedOperation(_)));

        let err = compile(&Expression::gt(
            Expression::math(MathOp::Mul, price(), Expression::constant(2)),
            Expression::constant(100),
        ))
        .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedOperation(_)));

        let err = compile(&Expression::eq(
            Expression::function("upper", vec![symbol()]),
            Expression::constant("IBM"),
        ))
        .unwrap_err();
        assert_eq!(err, CompileError::UnsupportedFunction("upper".to_string()));

        let err = compile(&Expression::Function {
            namespace: Some("str".to_string()),
            name: "contains".to_string(),
            args: vec![symbol(), Expression::constant("B")],
        })
        .unwrap_err();
        assert_eq!(
            err,
            CompileError::UnsupportedFunction("str:contains".to_string())
        );
    }

    #[test]
    fn test_having_mode() -> CompileResult<()> {
        let err = compile_having(&Expression::is_null(price())).unwrap_err();
        assert_eq!(err, CompileError::UnsupportedInHaving("IS NULL".to_string()));

        let compiled = compile_having(&Expression::gt(
            Expression::column("avgPrice", AttributeType::Double),
            Expression::variable("threshold", AttributeType::Double),
        ))?;
        assert_eq!(compiled.fragment, "{'avgPrice': {'$gt': var1}}");

        let err = compile_having(&Expression::eq(
            Expression::column("avgPrice", AttributeType::Double),
            Expression::column("maxPrice", AttributeType::Double),
        ))
        .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedComparison { .. }));
        Ok(())
    }

    #[test]
    fn test_protocol_violation_is_internal() {
        let mut compiler = FilterCompiler::new(&CompilerConfig::default());
        compiler
            .on_column_reference(None, "price", AttributeType::Double)
            .unwrap();
        let err = compiler.on_exit_compare(CompareOp::Eq).unwrap_err();
        assert!(matches!(err, CompileError::Internal(_)));

        let compiler = FilterCompiler::new(&CompilerConfig::default());
        assert!(matches!(
            compiler.finish(),
            Err(CompileError::Internal(_))
        ));
    }

    #[test]
    fn test_sequence_continuation() -> CompileResult<()> {
        let first = compile(&Expression::eq(
            symbol(),
            Expression::variable("symbol", AttributeType::String),
        ))?;

        let mut compiler =
            FilterCompiler::having(&CompilerConfig::default()).with_sequence(first.sequence);
        walk(
            &Expression::gt(price(), Expression::variable("price", AttributeType::Double)),
            &mut compiler,
        )?;
        let second = compiler.finish()?;
        assert_eq!(second.fragment, "{'price': {'$gt': var2}}");
        Ok(())
    }
}
