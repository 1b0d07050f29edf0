use std::{
    env, fs,
    path::{Path, PathBuf},
};

use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{debug, info};

use crate::{
    annotations::{annotate_section, annotate_table},
    error::{ConfigError, Result},
};

const DEFAULT_WRITE_KEYWORDS: [&str; 4] = ["insert", "update", "delete", "replace"];
const DEFAULT_DDL_KEYWORDS: [&str; 4] = ["alter", "drop", "create", "truncate"];

/// silq configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, Documented, DocumentedFields)]
#[serde(default)]
pub struct Config {
    /// Connection parameters handed to the connector when it connects.
    pub connection: ConnectionConfig,

    /// Behaviour of the connector once connected.
    pub connector: ConnectorSettings,
}

/// Parameters used to open a database connection.
///
/// Keys a driver does not understand are ignored.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, Documented, DocumentedFields)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Database driver: "sqlite" / "sqlite3" or "postgres" / "postgresql" / "pgsql"
    pub driver: Option<String>,

    /// Server host name or socket directory (server engines only)
    /// Default: localhost
    pub server: Option<String>,

    /// Server port (server engines only)
    pub port: Option<u16>,

    /// User name to authenticate as
    pub username: Option<String>,

    /// Password to authenticate with
    pub password: Option<String>,

    /// Name of the database selected after connecting
    pub database: Option<String>,

    /// Client character set
    pub charset: Option<String>,

    /// Session time zone applied after connecting
    pub timezone: Option<String>,

    /// Directory holding `<database>.sqlite` files (file-backed engines only)
    pub path: Option<String>,

    /// Keep file-backed databases in memory instead of on disk
    /// Default: false
    pub memory: Option<bool>,
}

/// Connector behaviour shared by every driver.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, Documented, DocumentedFields)]
#[serde(default)]
pub struct ConnectorSettings {
    /// Maximum number of prepared statements kept per connection.
    /// Only read-only statements are cached. 0 disables the cache.
    /// Default: 64
    pub statement_cache_capacity: Option<usize>,

    /// Leading keywords that mark a statement as a content write.
    pub write_keywords: Vec<String>,

    /// Leading keywords that mark a statement as a schema change.
    pub ddl_keywords: Vec<String>,

    /// Include a formatted copy of the failing SQL in error messages.
    /// Turn this off for production-facing output.
    /// Default: true
    pub sql_in_errors: Option<bool>,

    /// Log content writes instead of sending them to the database.
    /// Default: false
    pub preview_write: Option<bool>,

    /// Log every statement with its execution time at debug level.
    /// Default: false
    pub log_queries: Option<bool>,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            statement_cache_capacity: None,
            write_keywords: DEFAULT_WRITE_KEYWORDS.map(String::from).to_vec(),
            ddl_keywords: DEFAULT_DDL_KEYWORDS.map(String::from).to_vec(),
            sql_in_errors: None,
            preview_write: None,
            log_queries: None,
        }
    }
}

impl ConnectorSettings {
    pub fn statement_cache_capacity(&self) -> usize {
        self.statement_cache_capacity.unwrap_or(64)
    }

    pub fn write_keywords(&self) -> &[String] {
        &self.write_keywords
    }

    pub fn ddl_keywords(&self) -> &[String] {
        &self.ddl_keywords
    }

    pub fn sql_in_errors(&self) -> bool {
        self.sql_in_errors.unwrap_or(true)
    }

    pub fn preview_write(&self) -> bool {
        self.preview_write.unwrap_or(false)
    }

    pub fn log_queries(&self) -> bool {
        self.log_queries.unwrap_or(false)
    }
}

impl ConnectionConfig {
    pub fn driver(&self) -> &str {
        self.driver.as_deref().unwrap_or("sqlite")
    }

    pub fn memory(&self) -> bool {
        self.memory.unwrap_or(false)
    }
}

/// Returns `$XDG_CONFIG_HOME`, falling back to `$HOME/.config`.
pub fn xdg_config_home() -> PathBuf {
    env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".config")
        })
}

fn xdg_data_home() -> PathBuf {
    env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".local/share")
        })
}

/// Resolves the configuration file location.
///
/// An explicit path wins, then `SILQ_CONFIG`, then
/// `$XDG_CONFIG_HOME/silq/config.toml`.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }
    match env::var("SILQ_CONFIG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => xdg_config_home().join("silq").join("config.toml"),
    }
}

impl Config {
    pub fn default_config() -> Self {
        let data_dir = xdg_data_home().join("silq");
        Self {
            connection: ConnectionConfig {
                driver: Some("sqlite".to_string()),
                database: Some("silq".to_string()),
                path: Some(data_dir.to_string_lossy().into_owned()),
                memory: Some(false),
                ..Default::default()
            },
            connector: ConnectorSettings {
                statement_cache_capacity: Some(64),
                sql_in_errors: Some(true),
                preview_write: Some(false),
                log_queries: Some(false),
                ..Default::default()
            },
        }
    }

    /// Loads the configuration from `path`.
    ///
    /// A missing file yields the default configuration. Environment
    /// overrides are applied after the file is read.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config at {}, using defaults", path.display());
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.apply_env()?;
        config.resolve()?;

        Ok(config)
    }

    /// Applies `SILQ_DB_*` environment overrides on top of the loaded values.
    pub fn apply_env(&mut self) -> Result<()> {
        let conn = &mut self.connection;

        if let Ok(driver) = env::var("SILQ_DB_DRIVER") {
            conn.driver = Some(driver);
        }
        if let Ok(server) = env::var("SILQ_DB_SERVER") {
            conn.server = Some(server);
        }
        if let Ok(port) = env::var("SILQ_DB_PORT") {
            let parsed = port.trim().parse().map_err(|_| {
                ConfigError::InvalidEnv {
                    var: "SILQ_DB_PORT".into(),
                    value: port.clone(),
                }
            })?;
            conn.port = Some(parsed);
        }
        if let Ok(username) = env::var("SILQ_DB_USERNAME") {
            conn.username = Some(username);
        }
        if let Ok(password) = env::var("SILQ_DB_PASSWORD") {
            conn.password = Some(password);
        }
        if let Ok(name) = env::var("SILQ_DB_NAME") {
            conn.database = Some(name);
        }

        Ok(())
    }

    pub fn resolve(&mut self) -> Result<()> {
        match self.connection.driver.as_deref().map(str::trim) {
            Some("") => return Err(ConfigError::MissingDriver),
            Some(driver) => self.connection.driver = Some(driver.to_lowercase()),
            None => {}
        }

        let settings = &mut self.connector;
        if settings.write_keywords.is_empty() {
            return Err(ConfigError::EmptyKeywords("write_keywords"));
        }
        if settings.ddl_keywords.is_empty() {
            return Err(ConfigError::EmptyKeywords("ddl_keywords"));
        }
        for keyword in settings
            .write_keywords
            .iter_mut()
            .chain(settings.ddl_keywords.iter_mut())
        {
            *keyword = keyword.trim().to_lowercase();
        }

        settings.statement_cache_capacity.get_or_insert(64);
        settings.sql_in_errors.get_or_insert(true);
        settings.preview_write.get_or_insert(false);
        settings.log_queries.get_or_insert(false);

        Ok(())
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_table::<Config>(doc.as_table_mut(), false)?;
        annotate_section::<ConnectionConfig>(&mut doc, "connection")?;
        annotate_section::<ConnectorSettings>(&mut doc, "connector")?;

        Ok(doc)
    }
}

/// Writes the annotated default configuration to `path`.
///
/// Refuses to overwrite an existing file.
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    if path.exists() {
        return Err(ConfigError::ConfigAlreadyExists(
            path.display().to_string(),
        ));
    }

    let annotated_doc = Config::default_config().to_annotated_document()?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, annotated_doc.to_string())?;
    info!(
        "Default configuration file generated with documentation at: {}",
        path.display()
    );
    Ok(())
}
