//! PostgreSQL connector backed by the synchronous `postgres` client.
//!
//! `?` placeholders are rewritten to `$n` before preparing. Parameters are
//! bound against the types the server declares for the prepared statement,
//! and result sets stream through [`StreamingCursor`]. Read-only statements
//! are kept in a [`StatementCache`] that is flushed on every (re)connect and
//! on DDL.
//!
//! Server types without a native mapping travel as text: parameters are sent
//! in text format for the server to parse, and columns are read as text (or
//! as a blob when the binary value is not text).

use std::{
    borrow::Cow,
    error::Error as StdError,
    thread,
    time::{Duration, Instant},
};

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use postgres::{
    fallible_iterator::FallibleIterator,
    types::{to_sql_checked, Format, FromSql, IsNull, Kind, ToSql, Type},
    Client, NoTls, RowIter, Statement,
};
use silq_config::{ConnectionConfig, ConnectorSettings};
use tracing::debug;
use uuid::Uuid;

use crate::{
    builder::{PostgresQueryBuilder, QueryBuilder},
    connector::{
        check_parameter_count, database_error, escape_identifier, is_query_type, log_query,
        preview_write, Connector, ErrorLevel, QueryOutcome, SessionState, StatementCache,
    },
    cursor::{RowSource, StreamingCursor},
    error::{DbError, Result},
    value::{resolve_parameters, BindType, Parameter, Value},
};

type DecodeResult<T> = std::result::Result<T, Box<dyn StdError + Sync + Send>>;

/// Database used while no database is selected.
const MAINTENANCE_DATABASE: &str = "postgres";

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);

const TIMESTAMPTZ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%:z";

/// How values of a server type are bound and read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PgKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Oid,
    Float4,
    Float8,
    Text,
    Bytea,
    Numeric,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Uuid,
    Json,
    /// Anything else: bound in text format, read as text or raw bytes.
    Other,
}

impl PgKind {
    fn of(ty: &Type) -> Self {
        if let Kind::Domain(base) = ty.kind() {
            return PgKind::of(base);
        }

        let kinds = [
            (Type::BOOL, PgKind::Bool),
            (Type::INT2, PgKind::Int2),
            (Type::INT4, PgKind::Int4),
            (Type::INT8, PgKind::Int8),
            (Type::OID, PgKind::Oid),
            (Type::FLOAT4, PgKind::Float4),
            (Type::FLOAT8, PgKind::Float8),
            (Type::TEXT, PgKind::Text),
            (Type::VARCHAR, PgKind::Text),
            (Type::BPCHAR, PgKind::Text),
            (Type::NAME, PgKind::Text),
            (Type::UNKNOWN, PgKind::Text),
            (Type::BYTEA, PgKind::Bytea),
            (Type::NUMERIC, PgKind::Numeric),
            (Type::TIMESTAMP, PgKind::Timestamp),
            (Type::TIMESTAMPTZ, PgKind::TimestampTz),
            (Type::DATE, PgKind::Date),
            (Type::TIME, PgKind::Time),
            (Type::UUID, PgKind::Uuid),
            (Type::JSON, PgKind::Json),
            (Type::JSONB, PgKind::Json),
        ];
        kinds
            .into_iter()
            .find_map(|(known, kind)| (known == *ty).then_some(kind))
            .unwrap_or(PgKind::Other)
    }

    fn bind_type(self) -> BindType {
        match self {
            PgKind::Bool => BindType::Boolean,
            PgKind::Int2 | PgKind::Int4 | PgKind::Int8 | PgKind::Oid => BindType::Integer,
            PgKind::Float4 | PgKind::Float8 => BindType::Float,
            PgKind::Bytea => BindType::Blob,
            _ => BindType::String,
        }
    }

    /// Kinds whose parameters go to the server as text for it to parse.
    fn binds_as_literal(self) -> bool {
        matches!(
            self,
            PgKind::Numeric
                | PgKind::Timestamp
                | PgKind::TimestampTz
                | PgKind::Date
                | PgKind::Time
                | PgKind::Uuid
                | PgKind::Json
                | PgKind::Other
        )
    }
}

/// A parameter converted to the Rust type its placeholder expects.
#[derive(Debug, PartialEq)]
enum PgParam<'a> {
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Oid(u32),
    Float4(f32),
    Float8(f64),
    Text(Cow<'a, str>),
    Bytea(Cow<'a, [u8]>),
    /// Text the server parses with the input function of the declared type.
    Literal(Cow<'a, str>),
}

impl ToSql for PgParam<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> DecodeResult<IsNull> {
        match self {
            PgParam::Null => Ok(IsNull::Yes),
            PgParam::Bool(v) => v.to_sql(ty, out),
            PgParam::Int2(v) => v.to_sql(ty, out),
            PgParam::Int4(v) => v.to_sql(ty, out),
            PgParam::Int8(v) => v.to_sql(ty, out),
            PgParam::Oid(v) => v.to_sql(ty, out),
            PgParam::Float4(v) => v.to_sql(ty, out),
            PgParam::Float8(v) => v.to_sql(ty, out),
            PgParam::Text(v) => {
                let text: &str = v;
                text.to_sql(ty, out)
            }
            PgParam::Bytea(v) => {
                let bytes: &[u8] = v;
                bytes.to_sql(ty, out)
            }
            PgParam::Literal(v) => {
                out.extend_from_slice(v.as_bytes());
                Ok(IsNull::No)
            }
        }
    }

    // Compatibility is checked in `bind_parameter`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();

    fn encode_format(&self, _ty: &Type) -> Format {
        match self {
            PgParam::Literal(_) => Format::Text,
            _ => Format::Binary,
        }
    }
}

/// Converts `value` for a placeholder the server declared as `ty`.
fn bind_parameter<'a>(index: usize, ty: &Type, value: &'a Value) -> Result<PgParam<'a>> {
    let kind = PgKind::of(ty);
    if value.is_null() {
        return Ok(PgParam::Null);
    }

    let coerced = value
        .coerce(kind.bind_type())
        .map_err(|message| DbError::Binding { index, message })?;
    let mismatch = || DbError::Binding {
        index,
        message: format!("cannot bind {value} as {ty}"),
    };
    let out_of_range = |v: i64| DbError::Binding {
        index,
        message: format!("{v} is out of range for {ty}"),
    };

    let param = match kind {
        PgKind::Text => match coerced {
            Cow::Borrowed(Value::Text(text)) => PgParam::Text(Cow::Borrowed(text.as_str())),
            Cow::Owned(Value::Text(text)) => PgParam::Text(Cow::Owned(text)),
            _ => return Err(mismatch()),
        },
        PgKind::Bytea => match coerced {
            Cow::Borrowed(Value::Blob(bytes)) => PgParam::Bytea(Cow::Borrowed(bytes.as_slice())),
            Cow::Owned(Value::Blob(bytes)) => PgParam::Bytea(Cow::Owned(bytes)),
            _ => return Err(mismatch()),
        },
        literal if literal.binds_as_literal() => match coerced {
            Cow::Borrowed(Value::Text(text)) => PgParam::Literal(Cow::Borrowed(text.as_str())),
            Cow::Owned(Value::Text(text)) => PgParam::Literal(Cow::Owned(text)),
            _ => return Err(mismatch()),
        },
        scalar => match (scalar, &*coerced) {
            (PgKind::Bool, Value::Bool(v)) => PgParam::Bool(*v),
            (PgKind::Int2, Value::Integer(v)) => {
                PgParam::Int2(i16::try_from(*v).map_err(|_| out_of_range(*v))?)
            }
            (PgKind::Int4, Value::Integer(v)) => {
                PgParam::Int4(i32::try_from(*v).map_err(|_| out_of_range(*v))?)
            }
            (PgKind::Int8, Value::Integer(v)) => PgParam::Int8(*v),
            (PgKind::Oid, Value::Integer(v)) => {
                PgParam::Oid(u32::try_from(*v).map_err(|_| out_of_range(*v))?)
            }
            (PgKind::Float4, Value::Float(v)) => PgParam::Float4(*v as f32),
            (PgKind::Float8, Value::Float(v)) => PgParam::Float8(*v),
            _ => return Err(mismatch()),
        },
    };
    Ok(param)
}

/// Binds resolved parameters against the declared placeholder types.
fn bind_parameters<'a>(
    declared: &[Type],
    parameters: &'a [(BindType, Cow<'_, Value>)],
) -> Result<Vec<PgParam<'a>>> {
    check_parameter_count(declared.len(), parameters.len())?;
    declared
        .iter()
        .zip(parameters)
        .enumerate()
        .map(|(i, (ty, (_, value)))| bind_parameter(i + 1, ty, value))
        .collect()
}

/// Renders a binary NUMERIC as decimal text.
///
/// The value is a header of four 16-bit fields (digit count, weight of the
/// first digit, sign, display scale) followed by base-10000 digits.
fn numeric_text(raw: &[u8]) -> DecodeResult<String> {
    let field = |at: usize| -> std::result::Result<u16, &'static str> {
        raw.get(at..at + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .ok_or("truncated numeric value")
    };

    let ndigits = usize::from(field(0)?);
    let weight = i32::from(field(2)? as i16);
    let sign = field(4)?;
    let scale = usize::from(field(6)?);
    let digits = (0..ndigits)
        .map(|i| field(8 + 2 * i))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    match sign {
        0x0000 | 0x4000 => {}
        0xC000 => return Ok("NaN".into()),
        0xD000 => return Ok("Infinity".into()),
        0xF000 => return Ok("-Infinity".into()),
        other => return Err(format!("invalid numeric sign {other:#06x}").into()),
    }

    let digit = |i: i32| {
        usize::try_from(i)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut text = String::new();
    if sign == 0x4000 {
        text.push('-');
    }
    if weight < 0 {
        text.push('0');
    } else {
        text.push_str(&digit(0).to_string());
        for i in 1..=weight {
            text.push_str(&format!("{:04}", digit(i)));
        }
    }

    if scale > 0 {
        let mut fraction = String::with_capacity(scale + 4);
        let mut i = weight + 1;
        while fraction.len() < scale {
            fraction.push_str(&format!("{:04}", digit(i)));
            i += 1;
        }
        fraction.truncate(scale);
        text.push('.');
        text.push_str(&fraction);
    }
    Ok(text)
}

/// A value of a type without a native mapping. Enums, `"char"`, `xml` and
/// extension types such as `citext` send their text; the rest stay bytes.
fn other_value(ty: &Type, raw: &[u8]) -> Value {
    let textual = matches!(ty.kind(), Kind::Enum(_))
        || *ty == Type::CHAR
        || *ty == Type::XML
        || Type::from_oid(ty.oid()).is_none();

    match std::str::from_utf8(raw) {
        Ok(text) if textual => Value::Text(text.to_string()),
        _ => Value::Blob(raw.to_vec()),
    }
}

/// A column value decoded by the type the server reports for it.
#[derive(Debug, PartialEq)]
struct PgValue(Value);

impl<'a> FromSql<'a> for PgValue {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> DecodeResult<Self> {
        let value = match PgKind::of(ty) {
            PgKind::Bool => Value::Bool(bool::from_sql(ty, raw)?),
            PgKind::Int2 => Value::Integer(i16::from_sql(ty, raw)?.into()),
            PgKind::Int4 => Value::Integer(i32::from_sql(ty, raw)?.into()),
            PgKind::Int8 => Value::Integer(i64::from_sql(ty, raw)?),
            PgKind::Oid => Value::Integer(u32::from_sql(ty, raw)?.into()),
            PgKind::Float4 => Value::Float(f32::from_sql(ty, raw)?.into()),
            PgKind::Float8 => Value::Float(f64::from_sql(ty, raw)?),
            PgKind::Text => Value::Text(String::from_sql(ty, raw)?),
            PgKind::Bytea => Value::Blob(Vec::<u8>::from_sql(ty, raw)?),
            PgKind::Numeric => Value::Text(numeric_text(raw)?),
            PgKind::Timestamp => Value::Text(NaiveDateTime::from_sql(ty, raw)?.to_string()),
            PgKind::TimestampTz => Value::Text(
                DateTime::<Utc>::from_sql(ty, raw)?
                    .format(TIMESTAMPTZ_FORMAT)
                    .to_string(),
            ),
            PgKind::Date => Value::Text(NaiveDate::from_sql(ty, raw)?.to_string()),
            PgKind::Time => Value::Text(NaiveTime::from_sql(ty, raw)?.to_string()),
            PgKind::Uuid => Value::Text(Uuid::from_sql(ty, raw)?.to_string()),
            PgKind::Json => Value::Text(serde_json::Value::from_sql(ty, raw)?.to_string()),
            PgKind::Other => other_value(ty, raw),
        };
        Ok(PgValue(value))
    }

    fn from_sql_null(_ty: &Type) -> DecodeResult<Self> {
        Ok(PgValue(Value::Null))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn driver_error(err: postgres::Error) -> DbError {
    DbError::query(err.to_string())
}

/// Rewrites `?` placeholders to `$1`, `$2`, ... leaving quoted text and
/// comments alone.
pub fn rewrite_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut chars = sql.chars().peekable();
    let mut index = 0;

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                out.push(c);
                for next in chars.by_ref() {
                    out.push(next);
                    if next == c {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                out.push(c);
                for next in chars.by_ref() {
                    out.push(next);
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                out.push(c);
                if let Some(star) = chars.next() {
                    out.push(star);
                }
                let mut prev = ' ';
                for next in chars.by_ref() {
                    out.push(next);
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            '?' => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            _ => out.push(c),
        }
    }

    out
}

/// Client settings for database `dbname`.
///
/// The charset becomes a `client_encoding` startup option; the user name
/// defaults to `postgres` and the host to `localhost`.
pub fn connection_config(config: &ConnectionConfig, dbname: &str) -> postgres::Config {
    let mut pg = postgres::Config::new();
    pg.host(config.server.as_deref().unwrap_or("localhost"))
        .user(config.username.as_deref().unwrap_or("postgres"))
        .dbname(dbname)
        .application_name("silq");
    if let Some(port) = config.port {
        pg.port(port);
    }
    if let Some(password) = config.password.as_deref() {
        pg.password(password);
    }
    if let Some(charset) = config.charset.as_deref() {
        pg.options(&format!("-c client_encoding={charset}"));
    }
    pg
}

/// 64-bit advisory lock key for a lock name.
pub fn lock_key(name: &str) -> i64 {
    let hash = blake3::hash(name.as_bytes());
    let mut key = [0u8; 8];
    key.copy_from_slice(&hash.as_bytes()[..8]);
    i64::from_le_bytes(key)
}

struct PgRowSource<'c> {
    rows: RowIter<'c>,
    columns: Vec<String>,
}

impl RowSource for PgRowSource<'_> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        let Some(row) = self.rows.next().map_err(driver_error)? else {
            return Ok(None);
        };
        (0..self.columns.len())
            .map(|index| {
                row.try_get::<_, PgValue>(index)
                    .map(|PgValue(value)| value)
                    .map_err(driver_error)
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

/// Records a failed statement and reports it at `level`.
fn fail<'c>(
    state: &mut SessionState,
    settings: &ConnectorSettings,
    message: String,
    sql: &str,
    parameters: &[Parameter],
    level: ErrorLevel,
) -> Result<QueryOutcome<'c>> {
    state.last_error = Some(message.clone());
    database_error(settings, &message, Some(sql), parameters, level)?;
    Ok(QueryOutcome::Failed)
}

/// Connector for PostgreSQL servers.
pub struct PostgresConnector {
    client: Option<Client>,
    config: ConnectionConfig,
    settings: ConnectorSettings,
    cache: StatementCache<Statement>,
    state: SessionState,
}

impl PostgresConnector {
    pub fn new(settings: ConnectorSettings) -> Self {
        Self {
            client: None,
            config: ConnectionConfig::default(),
            cache: StatementCache::new(settings.statement_cache_capacity()),
            settings,
            state: SessionState::default(),
        }
    }

    pub fn cache(&self) -> &StatementCache<Statement> {
        &self.cache
    }

    fn client(&mut self) -> Result<&mut Client> {
        self.client.as_mut().ok_or(DbError::NotConnected)
    }

    /// Opens a client on `dbname` and applies the session time zone.
    fn open(&self, dbname: &str) -> Result<Client> {
        let mut client = connection_config(&self.config, dbname)
            .connect(NoTls)
            .map_err(|err| DbError::Connection(err.to_string()))?;

        if let Some(timezone) = self.config.timezone.as_deref() {
            client
                .batch_execute(&format!("SET TIME ZONE {}", self.quote_string(timezone)))
                .map_err(|err| DbError::Connection(err.to_string()))?;
        }
        Ok(client)
    }
}

impl Connector for PostgresConnector {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn connect(&mut self, config: &ConnectionConfig, select_database: bool) -> Result<()> {
        self.config = config.clone();
        self.state = SessionState::default();
        self.cache.invalidate();

        let selected = config.database.as_deref().filter(|_| select_database);
        self.client = Some(self.open(selected.unwrap_or(MAINTENANCE_DATABASE))?);
        self.state.selected_database = selected.map(str::to_string);
        debug!(server = ?config.server, database = ?selected, "connected to postgres");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Reconnects to `name`; PostgreSQL sessions are bound to one database.
    fn select_database(&mut self, name: &str) -> Result<()> {
        let client = self.open(name)?;
        self.client = Some(client);
        self.cache.invalidate();
        self.state.selected_database = Some(name.to_string());
        debug!(database = name, "selected postgres database");
        Ok(())
    }

    fn unload_database(&mut self) {
        self.cache.invalidate();
        self.state.selected_database = None;
        self.client = self.open(MAINTENANCE_DATABASE).ok();
    }

    fn selected_database(&self) -> Option<&str> {
        self.state.selected_database.as_deref()
    }

    fn database_exists(&mut self, name: &str) -> Result<bool> {
        let row = self
            .client()?
            .query_opt("SELECT 1 FROM pg_database WHERE datname = $1", &[&name])
            .map_err(driver_error)?;
        Ok(row.is_some())
    }

    fn create_database(&mut self, name: &str) -> Result<()> {
        let sql = format!("CREATE DATABASE {}", escape_identifier(name));
        self.client()?.batch_execute(&sql).map_err(driver_error)?;
        debug!(database = name, "created postgres database");
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

        let client = self.client.as_mut().ok_or(DbError::NotConnected)?;
        self.cache.before_execute(sql, self.settings.ddl_keywords());

        let started = Instant::now();
        let text = rewrite_placeholders(sql);
        let statement = match self.cache.prepare(&text, |text| client.prepare(text)) {
            Ok(statement) => statement,
            Err(err) => {
                return fail(&mut self.state, &self.settings, err.to_string(), sql, parameters, level)
            }
        };

        let resolved = resolve_parameters(parameters).map_err(|err| self.state.record(err))?;
        let params = bind_parameters(statement.params(), &resolved)
            .map_err(|err| self.state.record(err))?;

        if statement.columns().is_empty() {
            let refs = params
                .iter()
                .map(|p| p as &(dyn ToSql + Sync))
                .collect::<Vec<_>>();
            let result = client.execute(&statement, &refs);
            log_query(&self.settings, sql, started);

            return match result {
                Ok(affected) => {
                    if is_query_type(sql, self.settings.write_keywords()) {
                        self.state.affected_rows = affected;
                    }
                    Ok(QueryOutcome::Done {
                        affected: self.state.affected_rows,
                    })
                }
                Err(err) => fail(&mut self.state, &self.settings, err.to_string(), sql, parameters, level),
            };
        }

        let columns = statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect::<Vec<_>>();

        let result = client.query_raw(&statement, params.iter().map(|p| p as &dyn ToSql));
        log_query(&self.settings, sql, started);

        match result {
            Ok(rows) => Ok(QueryOutcome::Rows(Box::new(StreamingCursor::new(
                PgRowSource { rows, columns },
            )))),
            Err(err) => fail(&mut self.state, &self.settings, err.to_string(), sql, parameters, level),
        }
    }

    fn last_error(&self) -> Option<&str> {
        self.state.last_error.as_deref()
    }

    /// `currval` of the table's `ID` sequence with a table hint, `lastval()`
    /// otherwise. Failures are recorded as the last error and yield `None`.
    fn generated_id(&mut self, table: Option<&str>) -> Result<Option<i64>> {
        let client = self.client.as_mut().ok_or(DbError::NotConnected)?;
        let row = match table {
            Some(table) => client.query_opt(
                "SELECT currval(pg_get_serial_sequence($1, 'ID'))",
                &[&escape_identifier(table)],
            ),
            None => client.query_opt("SELECT lastval()", &[]),
        };

        match row {
            Ok(Some(row)) => Ok(row.try_get::<_, Option<i64>>(0).ok().flatten()),
            Ok(None) => Ok(None),
            Err(err) => {
                self.state.last_error = Some(err.to_string());
                Ok(None)
            }
        }
    }

    fn affected_rows(&self) -> u64 {
        self.state.affected_rows
    }

    fn version(&mut self) -> Result<String> {
        self.client()?
            .query_one("SHOW server_version", &[])
            .and_then(|row| row.try_get::<_, String>(0))
            .map_err(driver_error)
    }

    fn query_builder(&self) -> &dyn QueryBuilder {
        &PostgresQueryBuilder
    }

    fn settings(&self) -> &ConnectorSettings {
        &self.settings
    }

    fn can_lock(&self, _name: &str) -> bool {
        self.is_connected()
    }

    /// Retries `pg_try_advisory_lock` until it succeeds or `timeout` passes.
    fn get_lock(&mut self, name: &str, timeout: Option<Duration>) -> Result<bool> {
        let key = lock_key(name);
        let deadline = Instant::now() + timeout.unwrap_or_default();
        let client = self.client()?;

        loop {
            let acquired = client
                .query_one("SELECT pg_try_advisory_lock($1)", &[&key])
                .and_then(|row| row.try_get::<_, bool>(0))
                .map_err(driver_error)?;
            if acquired {
                debug!(lock = name, key, "acquired advisory lock");
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(LOCK_RETRY_INTERVAL);
        }
    }

    fn release_lock(&mut self, name: &str) -> Result<bool> {
        let key = lock_key(name);
        self.client()?
            .query_one("SELECT pg_advisory_unlock($1)", &[&key])
            .and_then(|row| row.try_get::<_, bool>(0))
            .map_err(driver_error)
    }
}

#[cfg(test)]
mod tests {
    use postgres::config::Host;

    use super::*;

    #[test]
    fn test_rewrite_placeholders() {
        assert_eq!(
            rewrite_placeholders("SELECT * FROM t WHERE a = ? AND b IN (?, ?)"),
            "SELECT * FROM t WHERE a = $1 AND b IN ($2, $3)"
        );
    }

    #[test]
    fn test_rewrite_skips_quotes_and_comments() {
        let sql = "SELECT '?', \"c?\" FROM t -- why?\nWHERE a = ? /* or ? */ AND b = 'it''s ?' AND c = ?";
        assert_eq!(
            rewrite_placeholders(sql),
            "SELECT '?', \"c?\" FROM t -- why?\nWHERE a = $1 /* or ? */ AND b = 'it''s ?' AND c = $2"
        );
    }

    #[test]
    fn test_bind_to_declared_types() {
        let five = Value::Integer(5);
        assert_eq!(bind_parameter(1, &Type::INT4, &five).unwrap(), PgParam::Int4(5));
        assert_eq!(bind_parameter(1, &Type::INT8, &five).unwrap(), PgParam::Int8(5));
        assert_eq!(
            bind_parameter(1, &Type::TEXT, &five).unwrap(),
            PgParam::Text(Cow::Owned("5".into()))
        );
        assert_eq!(bind_parameter(1, &Type::FLOAT8, &five).unwrap(), PgParam::Float8(5.0));

        let yes = Value::Text("yes".into());
        assert_eq!(bind_parameter(2, &Type::BOOL, &yes).unwrap(), PgParam::Bool(true));
        assert_eq!(
            bind_parameter(2, &Type::BYTEA, &yes).unwrap(),
            PgParam::Bytea(Cow::Owned(b"yes".to_vec()))
        );
        assert_eq!(
            bind_parameter(3, &Type::VARCHAR, &Value::Null).unwrap(),
            PgParam::Null
        );
    }

    #[test]
    fn test_binding_errors() {
        let big = Value::Integer(70_000);
        assert!(matches!(
            bind_parameter(4, &Type::INT2, &big),
            Err(DbError::Binding { index: 4, .. })
        ));
        assert!(matches!(
            bind_parameter(1, &Type::UUID, &Value::Blob(vec![0xff, 0xfe])),
            Err(DbError::Binding { index: 1, .. })
        ));
        assert!(matches!(
            bind_parameter(2, &Type::INT4, &Value::Blob(vec![1])),
            Err(DbError::Binding { index: 2, .. })
        ));
    }

    #[test]
    fn test_other_types_bind_as_text() {
        let day = Value::Text("2024-01-01".into());
        let param = bind_parameter(1, &Type::TIMESTAMPTZ, &day).unwrap();
        assert_eq!(param, PgParam::Literal(Cow::Borrowed("2024-01-01")));
        assert!(matches!(param.encode_format(&Type::TIMESTAMPTZ), Format::Text));

        let mut out = BytesMut::new();
        assert!(matches!(
            param.to_sql_checked(&Type::TIMESTAMPTZ, &mut out),
            Ok(IsNull::No)
        ));
        assert_eq!(&out[..], b"2024-01-01");

        assert_eq!(
            bind_parameter(2, &Type::NUMERIC, &Value::Integer(5)).unwrap(),
            PgParam::Literal(Cow::Owned("5".into()))
        );
        assert_eq!(
            bind_parameter(3, &Type::INET, &Value::Text("10.0.0.1".into())).unwrap(),
            PgParam::Literal(Cow::Borrowed("10.0.0.1"))
        );
        assert!(matches!(
            PgParam::Int4(1).encode_format(&Type::INT4),
            Format::Binary
        ));
    }

    #[test]
    fn test_bind_parameters_checks_count() {
        let resolved = vec![(BindType::Integer, Cow::Owned(Value::Integer(1)))];
        assert!(matches!(
            bind_parameters(&[Type::INT4, Type::INT4], &resolved),
            Err(DbError::Binding { index: 2, .. })
        ));
        assert_eq!(
            bind_parameters(&[Type::INT8], &resolved).unwrap(),
            vec![PgParam::Int8(1)]
        );
    }

    #[test]
    fn test_kinds() {
        assert_eq!(PgKind::of(&Type::NAME), PgKind::Text);
        assert_eq!(PgKind::of(&Type::OID), PgKind::Oid);
        assert_eq!(PgKind::of(&Type::NUMERIC), PgKind::Numeric);
        assert_eq!(PgKind::of(&Type::JSONB), PgKind::Json);
        assert_eq!(PgKind::of(&Type::INTERVAL), PgKind::Other);

        let domain = Type::new(
            "positive".into(),
            90_001,
            Kind::Domain(Type::INT4),
            "public".into(),
        );
        assert_eq!(PgKind::of(&domain), PgKind::Int4);
    }

    fn decode(ty: &Type, raw: &[u8]) -> Value {
        PgValue::from_sql(ty, raw).unwrap().0
    }

    /// Binary NUMERIC: digit count, weight, sign, scale, then base-10000 digits.
    fn numeric(weight: i16, sign: u16, scale: u16, digits: &[u16]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&(digits.len() as u16).to_be_bytes());
        raw.extend_from_slice(&weight.to_be_bytes());
        raw.extend_from_slice(&sign.to_be_bytes());
        raw.extend_from_slice(&scale.to_be_bytes());
        for digit in digits {
            raw.extend_from_slice(&digit.to_be_bytes());
        }
        raw
    }

    #[test]
    fn test_numeric_decodes_to_text() {
        let cases = [
            (numeric(1, 0, 3, &[1, 2345, 6780]), "12345.678"),
            (numeric(-1, 0, 2, &[500]), "0.05"),
            (numeric(0, 0x4000, 0, &[7]), "-7"),
            (numeric(2, 0, 0, &[1]), "100000000"),
            (numeric(0, 0, 0, &[]), "0"),
            (numeric(0, 0, 4, &[3, 1415]), "3.1415"),
            (numeric(0, 0xC000, 0, &[]), "NaN"),
        ];
        for (raw, expected) in cases {
            assert_eq!(decode(&Type::NUMERIC, &raw), Value::Text(expected.into()));
        }
        assert!(numeric_text(&[0, 1]).is_err());
    }

    #[test]
    fn test_temporal_and_structured_columns_decode_to_text() {
        // 2024-01-02 03:04:05 is this many microseconds after 2000-01-01
        let micros: i64 = 757_479_845_000_000;
        assert_eq!(
            decode(&Type::TIMESTAMP, &micros.to_be_bytes()),
            Value::Text("2024-01-02 03:04:05".into())
        );
        assert_eq!(
            decode(&Type::TIMESTAMPTZ, &micros.to_be_bytes()),
            Value::Text("2024-01-02 03:04:05+00:00".into())
        );
        assert_eq!(
            decode(&Type::DATE, &8767i32.to_be_bytes()),
            Value::Text("2024-01-02".into())
        );
        assert_eq!(
            decode(&Type::TIME, &3_723_000_000i64.to_be_bytes()),
            Value::Text("01:02:03".into())
        );

        let uuid = Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0);
        assert_eq!(
            decode(&Type::UUID, uuid.as_bytes()),
            Value::Text("12345678-9abc-def0-1234-56789abcdef0".into())
        );

        assert_eq!(
            decode(&Type::JSON, br#"{"a": [1, 2]}"#),
            Value::Text(r#"{"a":[1,2]}"#.into())
        );
        assert_eq!(
            decode(&Type::JSONB, b"\x01{\"a\": true}"),
            Value::Text(r#"{"a":true}"#.into())
        );
    }

    #[test]
    fn test_other_columns_decode_to_text_or_bytes() {
        assert_eq!(decode(&Type::XML, b"<a/>"), Value::Text("<a/>".into()));

        let mood = Type::new(
            "mood".into(),
            90_002,
            Kind::Enum(vec!["happy".into(), "sad".into()]),
            "public".into(),
        );
        assert_eq!(decode(&mood, b"happy"), Value::Text("happy".into()));

        let citext = Type::new("citext".into(), 90_003, Kind::Simple, "public".into());
        assert_eq!(decode(&citext, b"Hello"), Value::Text("Hello".into()));

        let inet = [2u8, 32, 0, 4, 10, 0, 0, 1];
        assert_eq!(decode(&Type::INET, &inet), Value::Blob(inet.to_vec()));

        assert_eq!(
            PgValue::from_sql_null(&Type::INTERVAL).unwrap(),
            PgValue(Value::Null)
        );
        assert_eq!(decode(&Type::INT8, &42i64.to_be_bytes()), Value::Integer(42));
        assert_eq!(decode(&Type::VARCHAR, b"text"), Value::Text("text".into()));
    }

    #[test]
    fn test_lock_key_is_stable() {
        assert_eq!(lock_key("site_build"), lock_key("site_build"));
        assert_ne!(lock_key("site_build"), lock_key("site_publish"));
    }

    #[test]
    fn test_connection_config() {
        let config = ConnectionConfig {
            server: Some("db.example".into()),
            port: Some(5433),
            username: Some("silq".into()),
            password: Some("secret".into()),
            charset: Some("UTF8".into()),
            ..Default::default()
        };
        let pg = connection_config(&config, "site");
        assert_eq!(pg.get_hosts(), &[Host::Tcp("db.example".into())]);
        assert_eq!(pg.get_ports(), &[5433u16]);
        assert_eq!(pg.get_user(), Some("silq"));
        assert_eq!(pg.get_password(), Some(&b"secret"[..]));
        assert_eq!(pg.get_dbname(), Some("site"));
        assert_eq!(pg.get_options(), Some("-c client_encoding=UTF8"));

        let defaults = connection_config(&ConnectionConfig::default(), MAINTENANCE_DATABASE);
        assert_eq!(defaults.get_user(), Some("postgres"));
        assert_eq!(defaults.get_hosts(), &[Host::Tcp("localhost".into())]);
        assert!(defaults.get_ports().is_empty());
    }

    #[test]
    fn test_disconnected_connector() {
        let mut connector = PostgresConnector::new(ConnectorSettings::default());
        assert!(!connector.is_connected());
        assert!(!connector.is_active());
        assert!(matches!(
            connector.query("SELECT 1", ErrorLevel::Fatal),
            Err(DbError::NotConnected)
        ));
        assert_eq!(connector.cache().capacity(), 64);
        assert!(!connector.can_lock("build"));
    }

    #[test]
    fn test_connect_flushes_statement_cache() {
        let mut connector = PostgresConnector::new(ConnectorSettings::default());
        let config = ConnectionConfig {
            server: Some("127.0.0.1".into()),
            port: Some(1),
            ..Default::default()
        };

        assert!(matches!(
            connector.connect(&config, false),
            Err(DbError::Connection(_))
        ));
        assert_eq!(connector.cache().stats().invalidations, 1);
        assert!(connector.cache().is_empty());
    }
}
