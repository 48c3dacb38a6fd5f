// gpteo-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(gpteo::infra::database::duckdb),
        help("An error occurred inside the scan store.")
    )]
    DuckDB(#[from] duckdb::Error),

    #[error("Store lock poisoned")]
    #[diagnostic(code(gpteo::infra::database::lock))]
    LockPoisoned,

    #[error("Corrupted row in '{table}': {reason}")]
    #[diagnostic(code(gpteo::infra::database::row))]
    CorruptRow { table: &'static str, reason: String },
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(gpteo::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- SERIALIZATION ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(gpteo::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON Error: {0}")]
    #[diagnostic(code(gpteo::infra::json))]
    JsonError(#[from] serde_json::Error),

    // --- HTTP ---
    #[error("HTTP Client Error: {0}")]
    #[diagnostic(code(gpteo::infra::http))]
    Http(#[from] reqwest::Error),

    // --- CONFIG ---
    #[error("Configuration Error: {0}")]
    #[diagnostic(code(gpteo::infra::config))]
    ConfigError(String),

    #[error("Configuration not found at '{0}'")]
    #[diagnostic(code(gpteo::infra::config_missing))]
    ConfigNotFound(String),

    // --- TEMPLATING ---
    #[error("Template Rendering Error: {0}")]
    #[diagnostic(
        code(gpteo::infra::template),
        help("Check the Jinja syntax ({{ ... }}) of the check's fix_template.")
    )]
    TemplateError(#[from] minijinja::Error),
}

impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}
