//! Dialect query builders.
//!
//! They only differ in how an offset without a row count is written.

use crate::{
    builder::{render_limit, QueryBuilder},
    error::Result,
    query::{Fragment, SqlSelect},
};

/// Plain ANSI builder. Rejects offset-only pagination.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiQueryBuilder;

impl QueryBuilder for AnsiQueryBuilder {
    fn name(&self) -> &'static str {
        "ansi"
    }
}

/// MySQL / MariaDB builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlQueryBuilder;

impl MySqlQueryBuilder {
    /// Largest row count MySQL accepts, standing in for "no limit".
    pub const MAX_ROWS: &'static str = "18446744073709551615";
}

impl QueryBuilder for MySqlQueryBuilder {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn limit_clause(&self, select: &SqlSelect) -> Result<Fragment> {
        render_limit(select.limit_value(), Some(Self::MAX_ROWS))
    }
}

/// SQLite builder; a negative LIMIT means unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteQueryBuilder;

impl QueryBuilder for SqliteQueryBuilder {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn limit_clause(&self, select: &SqlSelect) -> Result<Fragment> {
        render_limit(select.limit_value(), Some("-1"))
    }
}

/// PostgreSQL builder; uses `LIMIT ALL`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresQueryBuilder;

impl QueryBuilder for PostgresQueryBuilder {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn limit_clause(&self, select: &SqlSelect) -> Result<Fragment> {
        render_limit(select.limit_value(), Some("ALL"))
    }
}
