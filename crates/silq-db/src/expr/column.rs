//! Represents a typed database column.
//!
//! `Col<T>` ties a column name (and optionally its table) to a Rust type `T`.
//! It renders as a double-quoted identifier and implements [`Expression`], so
//! it can be used directly in conditions.

use std::marker::PhantomData;

use crate::{connector::escape_identifier, query::Fragment, traits::Expression};

/// A typed reference to a database column.
///
/// The type parameter documents the expected value type; it is not checked
/// at runtime.
///
/// # Example
///
/// ```rust
/// use silq_db::expr::Col;
/// const TITLE: Col<String> = Col::qualified("Page", "Title");
/// assert_eq!(TITLE.sql(), "\"Page\".\"Title\"");
/// ```
#[derive(Clone, Copy)]
pub struct Col<T> {
    pub table: Option<&'static str>,
    pub name: &'static str,
    _type: PhantomData<T>,
}

impl<T> Col<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            table: None,
            name,
            _type: PhantomData,
        }
    }

    pub const fn qualified(table: &'static str, name: &'static str) -> Self {
        Self {
            table: Some(table),
            name,
            _type: PhantomData,
        }
    }

    /// The escaped column reference, e.g. `"Page"."Title"`.
    pub fn sql(&self) -> String {
        match self.table {
            Some(table) => format!("{}.{}", escape_identifier(table), escape_identifier(self.name)),
            None => escape_identifier(self.name),
        }
    }
}

impl<T> Expression for Col<T> {
    fn to_fragment(&self) -> Fragment {
        Fragment::new(self.sql())
    }
}
