//! Pipeline stage fragments.

use serde::{Deserialize, Serialize};

/// Sort order for an ORDER BY key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn direction(&self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

/// One step of an assembled pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Filter document from the WHERE clause
    Match(String),
    /// Body of the group stage
    Group(String),
    /// Body of the project stage
    Project(String),
    /// Filter document from the HAVING clause, over projected names
    Having(String),
    /// Body of the sort stage
    Sort(String),
    Skip(u64),
    Limit(u64),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Match(_) => "match",
            Stage::Group(_) => "group",
            Stage::Project(_) => "project",
            Stage::Having(_) => "having",
            Stage::Sort(_) => "sort",
            Stage::Skip(_) => "skip",
            Stage::Limit(_) => "limit",
        }
    }

    pub fn render(&self) -> String {
        match self {
            // HAVING is a second match stage
            Stage::Match(body) | Stage::Having(body) => format!("{{'$match': {}}}", body),
            Stage::Group(body) => format!("{{'$group': {}}}", body),
            Stage::Project(body) => format!("{{'$project': {}}}", body),
            Stage::Sort(body) => format!("{{'$sort': {}}}", body),
            Stage::Skip(n) => format!("{{'$skip': {}}}", n),
            Stage::Limit(n) => format!("{{'$limit': {}}}", n),
        }
    }
}

/// Ordered `'name': value` pairs rendered as a document.
/// Inserting an existing name replaces its value in place.
#[derive(Debug, Default)]
pub(crate) struct FieldList {
    fields: Vec<(String, String)>,
}

impl FieldList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub(crate) fn render(&self) -> String {
        let body: Vec<String> = self
            .fields
            .iter()
            .map(|(name, value)| format!("'{}': {}", name, value))
            .collect();
        format!("{{{}}}", body.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_render() {
        assert_eq!(
            Stage::Match("{'a': {'$eq': 1}}".to_string()).render(),
            "{'$match': {'a': {'$eq': 1}}}"
        );
        assert_eq!(
            Stage::Having("{'b': {'$gt': 2}}".to_string()).render(),
            "{'$match': {'b': {'$gt': 2}}}"
        );
        assert_eq!(Stage::Skip(10).render(), "{'$skip': 10}");
        assert_eq!(Stage::Limit(5).render(), "{'$limit': 5}");
        assert_eq!(Stage::Having(String::new()).name(), "having");
    }

    #[test]
    fn test_field_list_last_writer_wins() {
        let mut fields = FieldList::new();
        assert_eq!(fields.render(), "{}");
        fields.insert("a", "1");
        fields.insert("b", "2");
        fields.insert("a", "3");
        assert_eq!(fields.render(), "{'a': 3, 'b': 2}");
    }

    #[test]
    fn test_sort_direction() {
        assert_eq!(SortOrder::default(), SortOrder::Asc);
        assert_eq!(SortOrder::Asc.direction(), 1);
        assert_eq!(SortOrder::Desc.direction(), -1);
    }
}
