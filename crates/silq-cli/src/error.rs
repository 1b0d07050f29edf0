use miette::Diagnostic;
use silq_config::error::ConfigError;
use silq_db::DbError;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid parameter `{0}`")]
    #[diagnostic(
        code(silq::invalid_parameter),
        help("Typed parameters are written as `type:value`, e.g. `int:42` or `bool:true`")
    )]
    InvalidParameter(String),

    #[error("Expected {expected} parameters but got {given}")]
    #[diagnostic(
        code(silq::parameter_count),
        help("Pass one -p/--param or -t/--typed value per `?` placeholder")
    )]
    ParameterCount { expected: usize, given: usize },

    #[error("JSON serialization error: {0}")]
    #[diagnostic(code(silq::json))]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
