use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(silq_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(silq_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists: {0}")]
    #[diagnostic(
        code(silq_config::already_exists),
        help("Remove the existing config file or pass a different path with --config")
    )]
    ConfigAlreadyExists(String),

    #[error("No database driver configured")]
    #[diagnostic(
        code(silq_config::missing_driver),
        help("Set `driver` in the [connection] table or export SILQ_DB_DRIVER")
    )]
    MissingDriver,

    #[error("Invalid value `{value}` in environment variable {var}")]
    #[diagnostic(code(silq_config::invalid_env))]
    InvalidEnv { var: String, value: String },

    #[error("Keyword list `{0}` must not be empty")]
    #[diagnostic(
        code(silq_config::empty_keywords),
        help("Remove the key to fall back to the built-in keyword list")
    )]
    EmptyKeywords(&'static str),

    #[error("IO error: {0}")]
    #[diagnostic(code(silq_config::io))]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(silq_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(silq_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
