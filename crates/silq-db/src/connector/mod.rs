//! The connector contract and the helpers every connector shares.
//!
//! A [`Connector`] owns one live driver connection. It executes SQL with
//! optional bound parameters and reports failures through
//! [`database_error`], where the caller's [`ErrorLevel`] decides between
//! returning an error and logging a warning.

pub mod cache;
pub mod postgres;
pub mod sqlite;

use std::{
    sync::LazyLock,
    time::{Duration, Instant},
};

use regex::Regex;
use silq_config::{ConnectionConfig, ConnectorSettings};
use tracing::{debug, info, warn};

pub use cache::{CacheStats, StatementCache};
pub use postgres::PostgresConnector;
pub use sqlite::SqliteConnector;

use crate::{
    builder::QueryBuilder,
    cursor::ResultCursor,
    error::{DbError, Result},
    format::format_plain,
    value::{flatten_parameters, Parameter},
};

static LEADING_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\w+)").expect("unable to compile keyword regex"));

/// How a failed statement is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorLevel {
    /// Return [`DbError::Query`] to the caller.
    #[default]
    Fatal,
    /// Log a warning and return [`QueryOutcome::Failed`].
    Warning,
    /// Return [`QueryOutcome::Failed`] without logging.
    Silent,
}

/// The result of running one statement.
pub enum QueryOutcome<'c> {
    /// The statement produced a result set.
    Rows(Box<dyn ResultCursor + 'c>),
    /// The statement ran and changed `affected` rows.
    Done { affected: u64 },
    /// A write was skipped because write preview is on.
    Skipped,
    /// The statement failed and the error level did not ask for an error.
    Failed,
}

impl<'c> QueryOutcome<'c> {
    pub fn is_failed(&self) -> bool {
        matches!(self, QueryOutcome::Failed)
    }

    /// Rows changed by a write; zero for everything else.
    pub fn affected(&self) -> u64 {
        match self {
            QueryOutcome::Done { affected } => *affected,
            _ => 0,
        }
    }

    pub fn into_cursor(self) -> Option<Box<dyn ResultCursor + 'c>> {
        match self {
            QueryOutcome::Rows(cursor) => Some(cursor),
            _ => None,
        }
    }
}

impl std::fmt::Debug for QueryOutcome<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryOutcome::Rows(cursor) => f
                .debug_struct("Rows")
                .field("columns", &cursor.columns())
                .finish(),
            QueryOutcome::Done { affected } => {
                f.debug_struct("Done").field("affected", affected).finish()
            }
            QueryOutcome::Skipped => f.write_str("Skipped"),
            QueryOutcome::Failed => f.write_str("Failed"),
        }
    }
}

/// Per-connection state describing the most recent execution.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub selected_database: Option<String>,
    pub last_error: Option<String>,
    pub affected_rows: u64,
    pub last_insert_id: Option<i64>,
}

impl SessionState {
    /// Clears everything tied to the previous statement.
    pub fn reset(&mut self) {
        self.last_error = None;
        self.affected_rows = 0;
        self.last_insert_id = None;
    }

    /// Keeps the message of an error that is returned to the caller.
    pub fn record(&mut self, err: DbError) -> DbError {
        self.last_error = Some(err.to_string());
        err
    }
}

/// A live database connection.
///
/// Implementations are used through `dyn Connector`, so every method is
/// object safe.
pub trait Connector {
    /// Driver name, for logs.
    fn name(&self) -> &'static str;

    /// Connects to the server. A database is only selected when
    /// `select_database` is set and the config names one.
    fn connect(&mut self, config: &ConnectionConfig, select_database: bool) -> Result<()>;

    fn is_connected(&self) -> bool;

    fn select_database(&mut self, name: &str) -> Result<()>;

    /// Drops the selected database, keeping a connection to the server.
    fn unload_database(&mut self);

    fn selected_database(&self) -> Option<&str>;

    /// Connected with a database selected.
    fn is_active(&self) -> bool {
        self.is_connected() && self.selected_database().is_some()
    }

    fn database_exists(&mut self, name: &str) -> Result<bool>;

    fn create_database(&mut self, name: &str) -> Result<()>;

    /// Runs SQL without parameters.
    fn query(&mut self, sql: &str, level: ErrorLevel) -> Result<QueryOutcome<'_>> {
        self.prepared_query(sql, &[], level)
    }

    /// Runs SQL with one parameter per `?` placeholder.
    fn prepared_query(
        &mut self,
        sql: &str,
        parameters: &[Parameter],
        level: ErrorLevel,
    ) -> Result<QueryOutcome<'_>>;

    /// Message of the last failed statement, cleared by the next execution.
    fn last_error(&self) -> Option<&str>;

    /// Last generated key. `table` is a hint that connection-scoped drivers
    /// ignore.
    fn generated_id(&mut self, table: Option<&str>) -> Result<Option<i64>>;

    fn affected_rows(&self) -> u64;

    fn version(&mut self) -> Result<String>;

    fn escape_identifier(&self, identifier: &str) -> String {
        escape_identifier(identifier)
    }

    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn query_builder(&self) -> &dyn QueryBuilder;

    fn settings(&self) -> &ConnectorSettings;

    fn is_query_write(&self, sql: &str) -> bool {
        is_query_type(sql, self.settings().write_keywords())
    }

    fn is_query_ddl(&self, sql: &str) -> bool {
        is_query_type(sql, self.settings().ddl_keywords())
    }

    fn is_query_mutable(&self, sql: &str) -> bool {
        self.is_query_write(sql) || self.is_query_ddl(sql)
    }

    fn can_lock(&self, name: &str) -> bool;

    /// Takes the named advisory lock, waiting up to `timeout`.
    fn get_lock(&mut self, name: &str, timeout: Option<Duration>) -> Result<bool>;

    fn release_lock(&mut self, name: &str) -> Result<bool>;
}

/// Double-quotes an identifier, segment by segment for dotted names.
///
/// Not idempotent: call it once per raw identifier.
pub fn escape_identifier(identifier: &str) -> String {
    identifier
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// True when the leading keyword of `sql` is one of `keywords`, ignoring case.
pub fn is_query_type<S: AsRef<str>>(sql: &str, keywords: &[S]) -> bool {
    let Some(keyword) = LEADING_KEYWORD_RE
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
    else {
        return false;
    };

    keywords
        .iter()
        .any(|k| k.as_ref().eq_ignore_ascii_case(&keyword))
}

/// Fails with [`DbError::Binding`] unless a statement with `expected`
/// placeholders got exactly `given` parameters.
pub fn check_parameter_count(expected: usize, given: usize) -> Result<()> {
    if expected == given {
        return Ok(());
    }
    Err(DbError::Binding {
        index: given.min(expected) + 1,
        message: format!("statement has {expected} placeholders but {given} parameters were given"),
    })
}

/// Reports a failed statement according to `level`.
///
/// `Fatal` returns [`DbError::Query`] carrying the SQL and the parameter
/// values without their type hints. With `sql_in_errors` set, the message
/// also embeds the formatted SQL.
pub fn database_error(
    settings: &ConnectorSettings,
    message: &str,
    sql: Option<&str>,
    parameters: &[Parameter],
    level: ErrorLevel,
) -> Result<()> {
    let values = flatten_parameters(parameters);
    match level {
        ErrorLevel::Fatal => {
            let message = match sql {
                Some(sql) if settings.sql_in_errors() => {
                    format!("Couldn't run query:\n\n{}\n\n{message}", format_plain(sql))
                }
                _ => message.to_string(),
            };
            Err(DbError::Query {
                message,
                sql: sql.map(str::to_string),
                parameters: values,
            })
        }
        ErrorLevel::Warning => {
            warn!(sql = sql.unwrap_or_default(), parameters = ?values, "{message}");
            Ok(())
        }
        ErrorLevel::Silent => Ok(()),
    }
}

/// Returns true, after logging the statement, when `sql` is a write that
/// preview mode should skip.
pub fn preview_write(settings: &ConnectorSettings, sql: &str) -> bool {
    if settings.preview_write() && is_query_type(sql, settings.write_keywords()) {
        info!(sql, "preview: write not executed");
        return true;
    }
    false
}

/// Logs the elapsed time of a statement when query logging is on.
pub fn log_query(settings: &ConnectorSettings, sql: &str, started: Instant) {
    if settings.log_queries() {
        let elapsed = started.elapsed().as_secs_f64() * 1000.0;
        debug!(elapsed_ms = elapsed, "{sql}");
    }
}
