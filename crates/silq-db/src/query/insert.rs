use indexmap::IndexSet;

use crate::{query::AssignmentRow, value::Parameter};

/// A single- or multi-row INSERT.
///
/// Rows may assign different columns; the statement's column list is the
/// union of all rows in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlInsert {
    into: String,
    rows: Vec<AssignmentRow>,
}

impl SqlInsert {
    pub fn into_table(table: impl Into<String>) -> Self {
        Self {
            into: table.into(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, row: AssignmentRow) -> Self {
        self.rows.push(row);
        self
    }

    /// Assigns `column` on the current (last) row, starting one if needed.
    pub fn assign(mut self, column: impl Into<String>, value: impl Into<Parameter>) -> Self {
        let row = self.rows.pop().unwrap_or_default().set(column, value);
        self.rows.push(row);
        self
    }

    pub fn table(&self) -> &str {
        &self.into
    }

    pub fn rows(&self) -> &[AssignmentRow] {
        &self.rows
    }

    pub fn columns(&self) -> Vec<String> {
        let columns: IndexSet<&String> = self.rows.iter().flat_map(AssignmentRow::columns).collect();
        columns.into_iter().cloned().collect()
    }

    /// Empty without a target table or without a single assignment.
    pub fn is_empty(&self) -> bool {
        self.into.trim().is_empty() || self.rows.iter().all(AssignmentRow::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_are_unioned() {
        let insert = SqlInsert::into_table("\"T\"")
            .row(AssignmentRow::new().set("a", 1).set("b", 2))
            .row(AssignmentRow::new().set("a", 3).set("c", 4));
        assert_eq!(insert.columns(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_emptiness() {
        assert!(SqlInsert::default().assign("a", 1).is_empty());
        assert!(SqlInsert::into_table("\"T\"").is_empty());
        assert!(SqlInsert::into_table("\"T\"").row(AssignmentRow::new()).is_empty());
        assert!(!SqlInsert::into_table("\"T\"").assign("a", 1).is_empty());
    }
}
