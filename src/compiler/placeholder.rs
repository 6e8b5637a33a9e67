//! Placeholder allocation, literal finalization and runtime resolution.
//!
//! Placeholders are bare identifier tokens (`var<N>`, `lit<N>`) inside a
//! fragment. Literal placeholders are replaced by their rendered value when a
//! compiler finishes; runtime-variable placeholders survive until
//! [`resolve`] is called with the live values of one invocation.

use crate::compiler::error::{CompileError, CompileResult};
use crate::value::{AttributeType, Value};
use log::{debug, trace};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

const VARIABLE_PREFIX: &str = "var";
const LITERAL_PREFIX: &str = "lit";

/// Describes where the value of a runtime-variable placeholder comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeBinding {
    pub variable_id: Option<String>,
    pub source_id: Option<String>,
    pub field: String,
    #[serde(rename = "type")]
    pub ty: AttributeType,
}

impl RuntimeBinding {
    /// Key of the live value in a binding map: the variable's own id when it
    /// has one, else `source.field`, else the bare field name
    pub fn key(&self) -> String {
        match (&self.variable_id, &self.source_id) {
            (Some(id), _) => id.clone(),
            (None, Some(source)) => format!("{}.{}", source, self.field),
            (None, None) => self.field.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PlaceholderEntry {
    Runtime(RuntimeBinding),
    Literal { value: Value, ty: AttributeType },
}

/// Next free placeholder numbers. Handing the sequence of one finished
/// compiler to the next keeps names unique across a whole query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderSequence {
    next_variable: usize,
    next_literal: usize,
}

impl Default for PlaceholderSequence {
    fn default() -> Self {
        Self {
            next_variable: 1,
            next_literal: 1,
        }
    }
}

/// Placeholders allocated during one compiler traversal
#[derive(Debug, Default)]
pub struct PlaceholderTable {
    entries: BTreeMap<String, PlaceholderEntry>,
    sequence: PlaceholderSequence,
}

impl PlaceholderTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(sequence: PlaceholderSequence) -> Self {
        Self {
            entries: BTreeMap::new(),
            sequence,
        }
    }

    pub fn sequence(&self) -> PlaceholderSequence {
        self.sequence
    }

    pub fn allocate_runtime_placeholder(&mut self, binding: RuntimeBinding) -> String {
        let name = format!("{}{}", VARIABLE_PREFIX, self.sequence.next_variable);
        self.sequence.next_variable += 1;
        trace!("allocated {} for runtime field '{}'", name, binding.field);
        self.entries
            .insert(name.clone(), PlaceholderEntry::Runtime(binding));
        name
    }

    pub fn allocate_literal_placeholder(&mut self, value: Value, ty: AttributeType) -> String {
        let name = format!("{}{}", LITERAL_PREFIX, self.sequence.next_literal);
        self.sequence.next_literal += 1;
        trace!("allocated {} for literal {:?}", name, value);
        self.entries
            .insert(name.clone(), PlaceholderEntry::Literal { value, ty });
        name
    }

    /// Inline every literal placeholder of `fragment` and return the fragment
    /// together with the runtime placeholders that remain to be bound
    pub fn finalize(self, fragment: &str) -> CompileResult<(String, Placeholders)> {
        let mut runtime = BTreeMap::new();
        let mut literals = HashMap::new();
        for (name, entry) in self.entries {
            match entry {
                PlaceholderEntry::Runtime(binding) => {
                    runtime.insert(name, binding);
                }
                PlaceholderEntry::Literal { value, ty } => {
                    literals.insert(name, value.render_as(ty));
                }
            }
        }

        let inlined = substitute_tokens(fragment, |token| Ok(literals.get(token).cloned()))?;
        debug!(
            "finalized fragment with {} literal(s) inlined, {} runtime placeholder(s) left",
            literals.len(),
            runtime.len()
        );
        Ok((inlined, Placeholders(runtime)))
    }
}

/// Runtime-variable placeholders surviving finalization, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Placeholders(BTreeMap<String, RuntimeBinding>);

impl Placeholders {
    pub fn get(&self, name: &str) -> Option<&RuntimeBinding> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RuntimeBinding)> {
        self.0.iter()
    }

    /// Absorb the placeholders of another clause of the same query
    pub fn merge(&mut self, other: Placeholders) -> CompileResult<()> {
        for (name, binding) in other.0 {
            if self.0.contains_key(&name) {
                return Err(CompileError::Internal(format!(
                    "placeholder {} allocated by two clauses of one query",
                    name
                )));
            }
            self.0.insert(name, binding);
        }
        Ok(())
    }
}

/// Replace runtime placeholders in `fragment` with the rendered live values
/// from `bindings`, keyed by [`RuntimeBinding::key`].
///
/// String values are single-quoted and not escaped.
pub fn resolve(
    fragment: &str,
    placeholders: &Placeholders,
    bindings: &HashMap<String, Value>,
) -> CompileResult<String> {
    let mut resolver = Resolver::new(placeholders, bindings);
    let text = resolver.substitute(fragment)?;
    resolver.finish()?;
    Ok(text)
}

/// Binds the runtime placeholders of one or more fragments that share a
/// placeholder table.
///
/// Every placeholder of the table must be replaced in at least one fragment
/// before [`Resolver::finish`] succeeds. An inlined literal carrying an
/// unescaped quote can hide later placeholders from the scanner; those are
/// reported instead of leaking into the output.
pub struct Resolver<'a> {
    placeholders: &'a Placeholders,
    bindings: &'a HashMap<String, Value>,
    substituted: BTreeSet<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(placeholders: &'a Placeholders, bindings: &'a HashMap<String, Value>) -> Self {
        Self {
            placeholders,
            bindings,
            substituted: BTreeSet::new(),
        }
    }

    pub fn substitute(&mut self, fragment: &str) -> CompileResult<String> {
        let placeholders = self.placeholders;
        let bindings = self.bindings;
        let substituted = &mut self.substituted;
        substitute_tokens(fragment, |token| {
            let Some(binding) = placeholders.get(token) else {
                return Ok(None);
            };
            let key = binding.key();
            match bindings.get(&key) {
                Some(value) => {
                    substituted.insert(token.to_string());
                    Ok(Some(value.render()))
                }
                None => Err(CompileError::MissingBinding {
                    placeholder: token.to_string(),
                    key,
                }),
            }
        })
    }

    pub fn finish(self) -> CompileResult<()> {
        for (name, binding) in self.placeholders.iter() {
            if self.substituted.contains(name) {
                continue;
            }
            let key = binding.key();
            if !self.bindings.contains_key(&key) {
                return Err(CompileError::MissingBinding {
                    placeholder: name.clone(),
                    key,
                });
            }
            return Err(CompileError::Internal(format!(
                "placeholder {} was never reached outside quoted text",
                name
            )));
        }
        Ok(())
    }
}

/// Rewrite identifier tokens outside single-quoted regions.
///
/// A token is a maximal run of ASCII alphanumerics and `_`; only tokens
/// starting with a letter or `_` are offered to `replace`, so `lit1` never
/// matches inside `lit10` and numbers pass through untouched.
fn substitute_tokens<F>(fragment: &str, mut replace: F) -> CompileResult<String>
where
    F: FnMut(&str) -> CompileResult<Option<String>>,
{
    let mut out = String::with_capacity(fragment.len());
    let mut in_quote = false;
    let mut chars = fragment.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c == '\'' {
            in_quote = !in_quote;
            out.push(c);
            continue;
        }
        if in_quote || !is_token_char(c) {
            out.push(c);
            continue;
        }

        let mut end = start + c.len_utf8();
        while let Some(&(i, next)) = chars.peek() {
            if !is_token_char(next) {
                break;
            }
            end = i + next.len_utf8();
            chars.next();
        }

        let token = &fragment[start..end];
        let replacement = if c.is_ascii_alphabetic() || c == '_' {
            replace(token)?
        } else {
            None
        };
        match replacement {
            Some(text) => out.push_str(&text),
            None => out.push_str(token),
        }
    }

    Ok(out)
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
