//! The SQL expression model.
//!
//! Statements are described by four structured types, each with its own
//! chainable builder methods, and wrapped in [`SqlExpression`] for compiling:
//!
//! - [`SqlSelect`]: select list, FROM/joins, WHERE, GROUP BY, HAVING,
//!   ORDER BY and LIMIT.
//! - [`SqlInsert`]: target table plus one or more [`AssignmentRow`]s.
//! - [`SqlUpdate`]: table, assignments and WHERE.
//! - [`SqlDelete`]: FROM/joins, optional delete targets and WHERE.
//!
//! Every clause that binds values carries them in a [`Fragment`], so SQL text
//! and parameters never travel separately.
//!
//! # Example
//!
//! ```rust
//! use silq_db::query::{ConditionalQuery as _, SqlExpression, SqlSelect};
//! use silq_db::expr::Col;
//! use silq_db::traits::Expression as _;
//!
//! const ID: Col<i64> = Col::new("ID");
//!
//! let expr: SqlExpression = SqlSelect::new()
//!     .from_table("\"Page\"")
//!     .filter(ID.gt(3))
//!     .limit(10)
//!     .into();
//! assert!(!expr.is_empty());
//! ```

pub mod assignment;
pub mod conditional;
pub mod delete;
pub mod fragment;
pub mod insert;
pub mod select;
pub mod update;

pub use assignment::AssignmentRow;
pub use conditional::{Conditional, ConditionalQuery, Connective, FromItem, Join, JoinKind};
pub use delete::SqlDelete;
pub use fragment::Fragment;
pub use insert::SqlInsert;
pub use select::{Limit, SqlSelect};
pub use update::SqlUpdate;

/// Any statement the query builder can compile.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpression {
    Select(SqlSelect),
    Insert(SqlInsert),
    Update(SqlUpdate),
    Delete(SqlDelete),
}

impl SqlExpression {
    /// An empty expression compiles to no SQL at all.
    pub fn is_empty(&self) -> bool {
        match self {
            SqlExpression::Select(select) => select.is_empty(),
            SqlExpression::Insert(insert) => insert.is_empty(),
            SqlExpression::Update(update) => update.is_empty(),
            SqlExpression::Delete(delete) => delete.is_empty(),
        }
    }
}

impl From<SqlSelect> for SqlExpression {
    fn from(select: SqlSelect) -> Self {
        SqlExpression::Select(select)
    }
}

impl From<SqlInsert> for SqlExpression {
    fn from(insert: SqlInsert) -> Self {
        SqlExpression::Insert(insert)
    }
}

impl From<SqlUpdate> for SqlExpression {
    fn from(update: SqlUpdate) -> Self {
        SqlExpression::Update(update)
    }
}

impl From<SqlDelete> for SqlExpression {
    fn from(delete: SqlDelete) -> Self {
        SqlExpression::Delete(delete)
    }
}
