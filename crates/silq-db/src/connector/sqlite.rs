//! SQLite connector backed by rusqlite.
//!
//! Each database is a file `<path>/<name>.sqlite`. With `memory` set, or
//! without a `path`, databases live in memory. A connection without a
//! selected database holds an in-memory handle so the session is never
//! without a live connection.

use std::{
    fs,
    path::PathBuf,
    time::{Duration, Instant},
};

use rusqlite::{
    types::{Null, ValueRef},
    Connection, OpenFlags, Statement,
};
use silq_config::{ConnectionConfig, ConnectorSettings};
use tracing::{debug, trace};

use crate::{
    builder::{QueryBuilder, SqliteQueryBuilder},
    connector::{
        check_parameter_count, database_error, is_query_type, log_query, preview_write,
        Connector, ErrorLevel, QueryOutcome, SessionState,
    },
    cursor::BufferedCursor,
    error::{DbError, Result},
    value::{resolve_parameters, Parameter, Value},
};

const INSERT_KEYWORDS: [&str; 2] = ["insert", "replace"];

/// Result of one successful execution.
enum Executed {
    Rows(BufferedCursor),
    Done { affected: u64 },
}

fn driver_error(err: rusqlite::Error) -> DbError {
    DbError::query(err.to_string())
}

/// Binds every parameter by position.
///
/// Text and blob bytes are borrowed from the parameter list. SQLite takes
/// its own copy at bind time; it has no separate path for sending long data.
fn bind_parameters(stmt: &mut Statement<'_>, parameters: &[Parameter]) -> Result<()> {
    check_parameter_count(stmt.parameter_count(), parameters.len())?;
    let resolved = resolve_parameters(parameters)?;
    for (i, (_, value)) in resolved.iter().enumerate() {
        let index = i + 1;
        let bound = match &**value {
            Value::Null => stmt.raw_bind_parameter(index, Null),
            Value::Bool(v) => stmt.raw_bind_parameter(index, *v),
            Value::Integer(v) => stmt.raw_bind_parameter(index, *v),
            Value::Float(v) => stmt.raw_bind_parameter(index, *v),
            Value::Text(v) => stmt.raw_bind_parameter(index, v.as_str()),
            Value::Blob(v) => {
                trace!(index, len = v.len(), "binding blob");
                stmt.raw_bind_parameter(index, v.as_slice())
            }
        };
        bound.map_err(|err| DbError::Binding {
            index,
            message: err.to_string(),
        })?;
    }

    Ok(())
}

fn read_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => Value::Blob(v.to_vec()),
    }
}

fn execute(conn: &Connection, sql: &str, parameters: &[Parameter]) -> Result<Executed> {
    let mut stmt = conn.prepare(sql).map_err(driver_error)?;
    bind_parameters(&mut stmt, parameters)?;

    let column_count = stmt.column_count();
    if column_count == 0 {
        let affected = stmt.raw_execute().map_err(driver_error)?;
        return Ok(Executed::Done {
            affected: affected as u64,
        });
    }

    let columns = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();

    let mut rows = stmt.raw_query();
    let mut buffered = Vec::new();
    while let Some(row) = rows.next().map_err(driver_error)? {
        let mut values = Vec::with_capacity(column_count);
        for index in 0..column_count {
            values.push(read_value(row.get_ref(index).map_err(driver_error)?));
        }
        buffered.push(values);
    }

    Ok(Executed::Rows(BufferedCursor::new(columns, buffered)))
}

/// Connector for SQLite database files.
pub struct SqliteConnector {
    conn: Option<Connection>,
    config: ConnectionConfig,
    settings: ConnectorSettings,
    state: SessionState,
}

impl SqliteConnector {
    pub fn new(settings: ConnectorSettings) -> Self {
        Self {
            conn: None,
            config: ConnectionConfig::default(),
            settings,
            state: SessionState::default(),
        }
    }

    /// File backing database `name`, or `None` in memory mode.
    pub fn database_file(&self, name: &str) -> Option<PathBuf> {
        if self.config.memory() {
            return None;
        }
        self.config
            .path
            .as_ref()
            .map(|dir| PathBuf::from(dir).join(format!("{name}.sqlite")))
    }

    fn connection(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(DbError::NotConnected)
    }

    fn open_memory() -> Result<Connection> {
        Connection::open_in_memory().map_err(|err| DbError::Connection(err.to_string()))
    }
}

impl Connector for SqliteConnector {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn connect(&mut self, config: &ConnectionConfig, select_database: bool) -> Result<()> {
        self.config = config.clone();
        self.state = SessionState::default();
        self.conn = Some(Self::open_memory()?);
        debug!(memory = self.config.memory(), path = ?self.config.path, "connected to sqlite");

        if select_database {
            if let Some(name) = config.database.as_deref() {
                self.select_database(name)?;
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Opens the database file. Missing files are an error; use
    /// [`create_database`](Connector::create_database) first.
    fn select_database(&mut self, name: &str) -> Result<()> {
        let conn = match self.database_file(name) {
            None => Self::open_memory()?,
            Some(file) => {
                let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX;
                let conn = Connection::open_with_flags(&file, flags).map_err(|err| {
                    DbError::Connection(format!("{}: {err}", file.display()))
                })?;
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })
                .map_err(|err| DbError::Connection(err.to_string()))?;
                conn
            }
        };

        self.conn = Some(conn);
        self.state.selected_database = Some(name.to_string());
        debug!(database = name, "selected sqlite database");
        Ok(())
    }

    fn unload_database(&mut self) {
        self.conn = Self::open_memory().ok();
        self.state.selected_database = None;
    }

    fn selected_database(&self) -> Option<&str> {
        self.state.selected_database.as_deref()
    }

    fn database_exists(&mut self, name: &str) -> Result<bool> {
        self.connection()?;
        Ok(self.database_file(name).map_or(true, |file| file.is_file()))
    }

    fn create_database(&mut self, name: &str) -> Result<()> {
        self.connection()?;
        let Some(file) = self.database_file(name) else {
            return Ok(());
        };
        if let Some(dir) = file.parent() {
            fs::create_dir_all(dir)?;
        }
        Connection::open(&file)
            .map_err(|err| DbError::Connection(format!("{}: {err}", file.display())))?;
        debug!(file = %file.display(), "created sqlite database");
        Ok(())
    }

    fn prepared_query(
        &mut self,
        sql: &str,
        parameters: &[Parameter],
        level: ErrorLevel,
    ) -> Result<QueryOutcome<'_>> {
        self.state.reset();
        if preview_write(&self.settings, sql) {
            return Ok(QueryOutcome::Skipped);
        }

        let conn = self.conn.as_ref().ok_or(DbError::NotConnected)?;
        let started = Instant::now();
        let result = execute(conn, sql, parameters);
        log_query(&self.settings, sql, started);

        match result {
            Ok(Executed::Rows(cursor)) => Ok(QueryOutcome::Rows(Box::new(cursor))),
            Ok(Executed::Done { affected }) => {
                if is_query_type(sql, self.settings.write_keywords()) {
                    self.state.affected_rows = affected;
                }
                if is_query_type(sql, &INSERT_KEYWORDS) {
                    self.state.last_insert_id = Some(conn.last_insert_rowid());
                }
                Ok(QueryOutcome::Done {
                    affected: self.state.affected_rows,
                })
            }
            Err(DbError::Query { message, .. }) => {
                self.state.last_error = Some(message.clone());
                database_error(&self.settings, &message, Some(sql), parameters, level)?;
                Ok(QueryOutcome::Failed)
            }
            Err(err) => Err(self.state.record(err)),
        }
    }

    fn last_error(&self) -> Option<&str> {
        self.state.last_error.as_deref()
    }

    fn generated_id(&mut self, _table: Option<&str>) -> Result<Option<i64>> {
        Ok(self.state.last_insert_id)
    }

    fn affected_rows(&self) -> u64 {
        self.state.affected_rows
    }

    fn version(&mut self) -> Result<String> {
        Ok(rusqlite::version().to_string())
    }

    fn query_builder(&self) -> &dyn QueryBuilder {
        &SqliteQueryBuilder
    }

    fn settings(&self) -> &ConnectorSettings {
        &self.settings
    }

    fn can_lock(&self, _name: &str) -> bool {
        false
    }

    /// SQLite has no advisory locks; the database file lock applies instead.
    fn get_lock(&mut self, _name: &str, _timeout: Option<Duration>) -> Result<bool> {
        Ok(true)
    }

    fn release_lock(&mut self, _name: &str) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::{cursor::ResultCursor as _, value::BindType};

    fn memory_connector() -> SqliteConnector {
        let mut connector = SqliteConnector::new(ConnectorSettings::default());
        let config = ConnectionConfig {
            database: Some("test".into()),
            memory: Some(true),
            ..Default::default()
        };
        connector.connect(&config, true).unwrap();
        connector
    }

    fn setup(connector: &mut SqliteConnector) {
        connector
            .query(
                "CREATE TABLE \"Page\" (\"ID\" INTEGER PRIMARY KEY, \"Title\" TEXT, \"Body\" BLOB)",
                ErrorLevel::Fatal,
            )
            .unwrap();
    }

    #[test]
    fn test_connect_selects_database() {
        let connector = memory_connector();
        assert!(connector.is_active());
        assert_eq!(connector.selected_database(), Some("test"));
    }

    #[test]
    fn test_insert_sets_generated_id_and_affected_rows() {
        let mut connector = memory_connector();
        setup(&mut connector);

        let affected = connector
            .prepared_query(
                "INSERT INTO \"Page\" (\"Title\") VALUES (?), (?)",
                &["one".into(), "two".into()],
                ErrorLevel::Fatal,
            )
            .unwrap()
            .affected();
        assert_eq!(affected, 2);
        assert_eq!(connector.affected_rows(), 2);
        assert_eq!(connector.generated_id(Some("Page")).unwrap(), Some(2));

        // state belongs to the latest statement only
        connector.query("SELECT 1", ErrorLevel::Fatal).unwrap();
        assert_eq!(connector.affected_rows(), 0);
        assert_eq!(connector.generated_id(None).unwrap(), None);
    }

    #[test]
    fn test_select_returns_typed_values() {
        let mut connector = memory_connector();
        setup(&mut connector);
        connector
            .prepared_query(
                "INSERT INTO \"Page\" (\"ID\", \"Title\", \"Body\") VALUES (?, ?, ?)",
                &[
                    Parameter::typed(BindType::Integer, "7"),
                    "Hello".into(),
                    vec![0u8, 1, 2].into(),
                ],
                ErrorLevel::Fatal,
            )
            .unwrap();

        let mut cursor = connector
            .prepared_query(
                "SELECT \"ID\", \"Title\", \"Body\" FROM \"Page\" WHERE \"Title\" = ?",
                &["Hello".into()],
                ErrorLevel::Fatal,
            )
            .unwrap()
            .into_cursor()
            .unwrap();

        assert_eq!(cursor.columns(), ["ID", "Title", "Body"]);
        let record = cursor.next_record().unwrap().unwrap();
        assert_eq!(record["ID"], Value::Integer(7));
        assert_eq!(record["Title"], Value::Text("Hello".into()));
        assert_eq!(record["Body"], Value::Blob(vec![0, 1, 2]));
        assert!(cursor.next_record().unwrap().is_none());
    }

    #[test]
    fn test_error_levels() {
        let mut connector = memory_connector();

        let failed = connector
            .prepared_query(
                "SELECT * FROM \"Missing\" WHERE \"ID\" = ?",
                &[Parameter::typed(BindType::Integer, 3)],
                ErrorLevel::Warning,
            )
            .unwrap()
            .is_failed();
        assert!(failed);
        assert!(connector.last_error().unwrap().contains("no such table"));

        let err = connector
            .prepared_query(
                "SELECT * FROM \"Missing\" WHERE \"ID\" = ?",
                &[Parameter::typed(BindType::Integer, 3)],
                ErrorLevel::Fatal,
            )
            .unwrap_err();
        assert_eq!(err.sql(), Some("SELECT * FROM \"Missing\" WHERE \"ID\" = ?"));
        assert_eq!(err.parameters(), &[Value::Integer(3)]);
    }

    #[test]
    fn test_parameter_count_mismatch_is_binding_error() {
        let mut connector = memory_connector();
        let err = connector
            .prepared_query("SELECT ?, ?", &[1.into()], ErrorLevel::Warning)
            .unwrap_err();
        assert!(matches!(err, DbError::Binding { index: 2, .. }));
        assert_eq!(connector.last_error(), Some(err.to_string().as_str()));

        // the next statement starts clean
        connector.query("SELECT 1", ErrorLevel::Fatal).unwrap();
        assert_eq!(connector.last_error(), None);
    }

    #[test]
    fn test_bad_type_hint_is_binding_error() {
        let mut connector = memory_connector();
        let err = connector
            .prepared_query(
                "SELECT ?",
                &[Parameter::typed(BindType::Integer, vec![1u8, 2])],
                ErrorLevel::Warning,
            )
            .unwrap_err();
        assert!(matches!(err, DbError::Binding { index: 1, .. }));
        assert!(connector.last_error().unwrap().contains("parameter 1"));
    }

    #[test]
    fn test_large_blob_round_trips() {
        let mut connector = memory_connector();
        setup(&mut connector);
        let body = (0..1 << 20).map(|i| (i % 251) as u8).collect::<Vec<_>>();
        connector
            .prepared_query(
                "INSERT INTO \"Page\" (\"Title\", \"Body\") VALUES (?, ?)",
                &["Big".into(), body.clone().into()],
                ErrorLevel::Fatal,
            )
            .unwrap();

        let stored = connector
            .prepared_query(
                "SELECT \"Body\" FROM \"Page\" WHERE \"Title\" = ?",
                &["Big".into()],
                ErrorLevel::Fatal,
            )
            .unwrap()
            .into_cursor()
            .unwrap()
            .value()
            .unwrap();
        assert_eq!(stored, Some(Value::Blob(body)));
    }

    #[test]
    fn test_preview_write_skips_execution() {
        let mut connector = memory_connector();
        setup(&mut connector);
        connector.settings.preview_write = Some(true);

        let skipped = matches!(
            connector
                .query("INSERT INTO \"Page\" (\"Title\") VALUES ('x')", ErrorLevel::Fatal)
                .unwrap(),
            QueryOutcome::Skipped
        );
        assert!(skipped);

        let count = connector
            .query("SELECT COUNT(*) FROM \"Page\"", ErrorLevel::Fatal)
            .unwrap()
            .into_cursor()
            .unwrap()
            .value()
            .unwrap();
        assert_eq!(count, Some(Value::Integer(0)));
    }

    #[test]
    fn test_file_databases() {
        let dir = tempdir().unwrap();
        let mut connector = SqliteConnector::new(ConnectorSettings::default());
        let config = ConnectionConfig {
            path: Some(dir.path().join("dbs").to_string_lossy().into_owned()),
            ..Default::default()
        };
        connector.connect(&config, false).unwrap();
        assert!(connector.is_connected());
        assert!(!connector.is_active());

        assert!(!connector.database_exists("site").unwrap());
        assert!(connector.select_database("site").is_err());

        connector.create_database("site").unwrap();
        assert!(connector.database_exists("site").unwrap());
        assert!(dir.path().join("dbs/site.sqlite").is_file());

        connector.select_database("site").unwrap();
        assert!(connector.is_active());

        connector.unload_database();
        assert!(connector.is_connected());
        assert!(connector.selected_database().is_none());
    }
}
