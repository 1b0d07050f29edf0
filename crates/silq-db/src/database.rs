//! The [`Database`] facade: one connector plus transaction bookkeeping.

use std::time::Duration;

use silq_config::{Config, ConnectorSettings};
use tracing::{debug, info, warn};

use crate::{
    builder::CompiledQuery,
    connector::{Connector, ErrorLevel, PostgresConnector, QueryOutcome, SqliteConnector},
    error::{DbError, Result},
    query::SqlExpression,
    value::Parameter,
};

/// Prefix of the savepoints that stand in for nested transactions.
const NESTED_SAVEPOINT: &str = "NESTEDTRANSACTION";

/// Builds the connector for a driver name.
pub fn connector_for(driver: &str, settings: ConnectorSettings) -> Result<Box<dyn Connector>> {
    match driver.to_lowercase().as_str() {
        "sqlite" | "sqlite3" => Ok(Box::new(SqliteConnector::new(settings))),
        "postgres" | "postgresql" | "pgsql" => Ok(Box::new(PostgresConnector::new(settings))),
        other => Err(DbError::UnsupportedDriver(other.to_string())),
    }
}

/// A connected database session.
///
/// Statements run in the order they are issued. Nested
/// [`transaction_start`](Database::transaction_start) calls become savepoints.
pub struct Database {
    connector: Box<dyn Connector>,
    transaction_depth: u32,
}

impl Database {
    /// Connects with the configured driver and selects the configured
    /// database, if any.
    pub fn connect(config: &Config) -> Result<Self> {
        let connection = &config.connection;
        let mut connector = connector_for(connection.driver(), config.connector.clone())?;
        connector.connect(connection, false)?;
        info!(driver = connector.name(), "connected");

        let mut database = Self::with_connector(connector);
        if let Some(name) = connection.database.as_deref() {
            database.select_database(name, false, ErrorLevel::Fatal)?;
        }
        Ok(database)
    }

    /// Wraps an already connected connector.
    pub fn with_connector(connector: Box<dyn Connector>) -> Self {
        Self {
            connector,
            transaction_depth: 0,
        }
    }

    pub fn connector(&self) -> &dyn Connector {
        self.connector.as_ref()
    }

    pub fn connector_mut(&mut self) -> &mut dyn Connector {
        self.connector.as_mut()
    }

    /// Compiles an expression with the connector's dialect.
    pub fn compile(&self, expression: &SqlExpression) -> Result<Option<CompiledQuery>> {
        self.connector.query_builder().build(expression)
    }

    /// Compiles and runs an expression. Empty expressions are skipped.
    pub fn execute(
        &mut self,
        expression: &SqlExpression,
        level: ErrorLevel,
    ) -> Result<QueryOutcome<'_>> {
        let Some(compiled) = self.compile(expression)? else {
            debug!("skipping empty expression");
            return Ok(QueryOutcome::Skipped);
        };

        if compiled.parameters.is_empty() {
            self.connector.query(&compiled.sql, level)
        } else {
            self.connector
                .prepared_query(&compiled.sql, &compiled.parameters, level)
        }
    }

    pub fn query(&mut self, sql: &str, level: ErrorLevel) -> Result<QueryOutcome<'_>> {
        self.connector.query(sql, level)
    }

    pub fn prepared_query(
        &mut self,
        sql: &str,
        parameters: &[Parameter],
        level: ErrorLevel,
    ) -> Result<QueryOutcome<'_>> {
        self.connector.prepared_query(sql, parameters, level)
    }

    /// Selects `name`, creating it first when `create` is set.
    ///
    /// Returns false when the database is missing or cannot be opened and
    /// `level` is not fatal. The previous selection is unloaded on failure.
    pub fn select_database(&mut self, name: &str, create: bool, level: ErrorLevel) -> Result<bool> {
        if !self.connector.database_exists(name)? {
            if create {
                self.connector.create_database(name)?;
            } else {
                return self.selection_failed(DbError::Connection(format!(
                    "database {name} does not exist"
                )), level);
            }
        }

        match self.connector.select_database(name) {
            Ok(()) => Ok(true),
            Err(err) => self.selection_failed(err, level),
        }
    }

    fn selection_failed(&mut self, err: DbError, level: ErrorLevel) -> Result<bool> {
        self.connector.unload_database();
        match level {
            ErrorLevel::Fatal => Err(err),
            ErrorLevel::Warning => {
                warn!("{err}");
                Ok(false)
            }
            ErrorLevel::Silent => Ok(false),
        }
    }

    pub fn selected_database(&self) -> Option<&str> {
        self.connector.selected_database()
    }

    pub fn is_active(&self) -> bool {
        self.connector.is_active()
    }

    pub fn generated_id(&mut self, table: Option<&str>) -> Result<Option<i64>> {
        self.connector.generated_id(table)
    }

    pub fn affected_rows(&self) -> u64 {
        self.connector.affected_rows()
    }

    /// Runs a control statement that must succeed.
    fn control(&mut self, sql: &str) -> Result<()> {
        debug!(sql, depth = self.transaction_depth, "transaction");
        let failed = self.connector.query(sql, ErrorLevel::Fatal)?.is_failed();
        if failed {
            return Err(DbError::Transaction(format!("{sql} failed")));
        }
        Ok(())
    }

    /// Starts a transaction, or a savepoint when one is already open.
    /// `mode` is appended to `BEGIN`, e.g. `IMMEDIATE` on SQLite.
    pub fn transaction_start(&mut self, mode: Option<&str>) -> Result<()> {
        let sql = if self.transaction_depth > 0 {
            format!("SAVEPOINT {NESTED_SAVEPOINT}{}", self.transaction_depth)
        } else {
            match mode {
                Some(mode) => format!("BEGIN {mode}"),
                None => "BEGIN".to_string(),
            }
        };
        self.control(&sql)?;
        self.transaction_depth += 1;
        Ok(())
    }

    pub fn transaction_savepoint(&mut self, name: &str) -> Result<()> {
        self.require_transaction("SAVEPOINT")?;
        self.control(&format!("SAVEPOINT {name}"))
    }

    /// Rolls back to `savepoint`, leaving the transaction open. Without a
    /// savepoint, rolls back the innermost level.
    pub fn transaction_rollback(&mut self, savepoint: Option<&str>) -> Result<()> {
        self.require_transaction("ROLLBACK")?;

        if let Some(savepoint) = savepoint {
            return self.control(&format!("ROLLBACK TO SAVEPOINT {savepoint}"));
        }

        if self.transaction_depth > 1 {
            let level = self.transaction_depth - 1;
            self.control(&format!("ROLLBACK TO SAVEPOINT {NESTED_SAVEPOINT}{level}"))?;
        } else {
            self.control("ROLLBACK")?;
        }
        self.transaction_depth -= 1;
        Ok(())
    }

    /// Commits the innermost level: releases its savepoint, or commits the
    /// outer transaction.
    pub fn transaction_end(&mut self) -> Result<()> {
        self.require_transaction("COMMIT")?;

        if self.transaction_depth > 1 {
            let level = self.transaction_depth - 1;
            self.control(&format!("RELEASE SAVEPOINT {NESTED_SAVEPOINT}{level}"))?;
        } else {
            self.control("COMMIT")?;
        }
        self.transaction_depth -= 1;
        Ok(())
    }

    pub fn transaction_depth(&self) -> u32 {
        self.transaction_depth
    }

    fn require_transaction(&self, verb: &str) -> Result<()> {
        if self.transaction_depth == 0 {
            return Err(DbError::Transaction(format!(
                "{verb} without an open transaction"
            )));
        }
        Ok(())
    }

    /// Lock names are scoped to the selected database.
    fn lock_name(&self, name: &str) -> String {
        format!("{}_{name}", self.selected_database().unwrap_or_default())
    }

    pub fn can_lock(&self, name: &str) -> bool {
        self.connector.can_lock(&self.lock_name(name))
    }

    pub fn get_lock(&mut self, name: &str, timeout: Option<Duration>) -> Result<bool> {
        let name = self.lock_name(name);
        self.connector.get_lock(&name, timeout)
    }

    pub fn release_lock(&mut self, name: &str) -> Result<bool> {
        let name = self.lock_name(name);
        self.connector.release_lock(&name)
    }
}
