//! Error types for silq-db.

use miette::Diagnostic;
use silq_config::error::ConfigError;
use thiserror::Error;

use crate::value::Value;

/// Database error type for silq-db operations.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Couldn't connect to database: {0}")]
    #[diagnostic(
        code(silq_db::connection),
        help("Check the [connection] settings and that the server is reachable")
    )]
    Connection(String),

    /// A statement failed at the database. Carries the SQL text and the
    /// bound parameter values with their type hints removed.
    #[error("{message}")]
    #[diagnostic(code(silq_db::query))]
    Query {
        message: String,
        sql: Option<String>,
        parameters: Vec<Value>,
    },

    #[error("Couldn't bind parameter {index}: {message}")]
    #[diagnostic(
        code(silq_db::binding),
        help("Check the parameter value against its type hint")
    )]
    Binding { index: usize, message: String },

    #[error("Invalid LIMIT: {0}")]
    #[diagnostic(
        code(silq_db::invalid_limit),
        help("Paged limits need a numeric row count on this dialect")
    )]
    InvalidLimit(String),

    #[error("Row {index} was read and discarded; rows are kept from {first} on")]
    #[diagnostic(
        code(silq_db::row_discarded),
        help("Call seek, rewind or num_records before reading rows that will be revisited")
    )]
    RowDiscarded { index: usize, first: usize },

    #[error("Not connected to a database server")]
    #[diagnostic(code(silq_db::not_connected))]
    NotConnected,

    #[error("Transaction error: {0}")]
    #[diagnostic(code(silq_db::transaction))]
    Transaction(String),

    #[error("Unsupported database driver: {0}")]
    #[diagnostic(
        code(silq_db::unsupported_driver),
        help("Supported drivers: sqlite, sqlite3, postgres, postgresql, pgsql")
    )]
    UnsupportedDriver(String),

    #[error("IO error: {0}")]
    #[diagnostic(
        code(silq_db::io),
        help("Check file permissions and disk space")
    )]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

impl DbError {
    pub fn query(message: impl Into<String>) -> Self {
        DbError::Query {
            message: message.into(),
            sql: None,
            parameters: Vec::new(),
        }
    }

    /// The SQL text of a failed statement, when known.
    pub fn sql(&self) -> Option<&str> {
        match self {
            DbError::Query { sql, .. } => sql.as_deref(),
            _ => None,
        }
    }

    /// The parameter values of a failed statement.
    pub fn parameters(&self) -> &[Value] {
        match self {
            DbError::Query { parameters, .. } => parameters,
            _ => &[],
        }
    }
}

/// Result type alias for silq-db operations.
pub type Result<T> = std::result::Result<T, DbError>;
