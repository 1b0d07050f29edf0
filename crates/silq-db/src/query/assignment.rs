use indexmap::IndexMap;

use crate::{query::Fragment, value::Parameter};

/// An ordered set of `column = value` assignments.
///
/// Plain values become a `?` placeholder with one parameter; SQL fragments
/// are used verbatim with their own parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentRow {
    assignments: IndexMap<String, Fragment>,
}

impl AssignmentRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a bound value. Re-assigning a column replaces it in place.
    pub fn set(self, column: impl Into<String>, value: impl Into<Parameter>) -> Self {
        self.set_sql(column, Fragment::new("?").bind(value))
    }

    /// Assigns a SQL expression, e.g. `"Counter" + ?`.
    pub fn set_sql(mut self, column: impl Into<String>, fragment: impl Into<Fragment>) -> Self {
        self.assignments.insert(column.into(), fragment.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Fragment> {
        self.assignments.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.assignments.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Fragment)> {
        self.assignments.iter()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}
