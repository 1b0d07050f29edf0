use crate::query::conditional::{Conditional, ConditionalQuery};

/// A DELETE over a FROM list, optionally naming which tables to delete from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlDelete {
    conditional: Conditional,
    targets: Vec<String>,
}

impl ConditionalQuery for SqlDelete {
    fn conditional(&self) -> &Conditional {
        &self.conditional
    }

    fn conditional_mut(&mut self) -> &mut Conditional {
        &mut self.conditional
    }
}

impl SqlDelete {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a DELETE from a single table.
    pub fn from(table: impl Into<String>) -> Self {
        Self::new().from_table(table)
    }

    /// Adds an explicit delete target (multi-table DELETE).
    pub fn target(mut self, table: impl Into<String>) -> Self {
        let table = table.into();
        if !self.targets.contains(&table) {
            self.targets.push(table);
        }
        self
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn is_empty(&self) -> bool {
        self.conditional.is_empty()
    }
}
