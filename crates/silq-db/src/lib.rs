pub mod builder;
pub mod connector;
pub mod cursor;
pub mod database;
pub mod error;
pub mod expr;
pub mod format;
pub mod macros;
pub mod query;
pub mod traits;
pub mod value;

pub use builder::{CompiledQuery, QueryBuilder};
pub use connector::{Connector, ErrorLevel, QueryOutcome};
pub use cursor::{Record, ResultCursor};
pub use database::Database;
pub use error::{DbError, Result};
pub use query::*;
pub use value::{BindType, Parameter, Value};
