use crate::{
    query::{
        conditional::{Conditional, ConditionalQuery},
        AssignmentRow, Fragment,
    },
    value::Parameter,
};

/// An UPDATE with ordered assignments and WHERE predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlUpdate {
    table: String,
    assignments: AssignmentRow,
    conditional: Conditional,
}

impl ConditionalQuery for SqlUpdate {
    fn conditional(&self) -> &Conditional {
        &self.conditional
    }

    fn conditional_mut(&mut self) -> &mut Conditional {
        &mut self.conditional
    }
}

impl SqlUpdate {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<Parameter>) -> Self {
        self.assignments = self.assignments.set(column, value);
        self
    }

    pub fn set_sql(mut self, column: impl Into<String>, fragment: impl Into<Fragment>) -> Self {
        self.assignments = self.assignments.set_sql(column, fragment);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn assignments(&self) -> &AssignmentRow {
        &self.assignments
    }

    pub fn is_empty(&self) -> bool {
        self.table.trim().is_empty() || self.assignments.is_empty()
    }
}
