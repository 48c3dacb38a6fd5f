// gpteo-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Invalid scan request: {}", .0.join("; "))]
    #[diagnostic(
        code(gpteo::domain::validation),
        help("Check the domain, the seed URLs (1 to 10 absolute http(s) URLs) and the mode.")
    )]
    Validation(Vec<String>),

    #[error("Illegal scan transition: {from} -> {to}")]
    #[diagnostic(code(gpteo::domain::transition))]
    InvalidTransition { from: String, to: String },

    #[error("Scan '{0}' not found")]
    #[diagnostic(code(gpteo::domain::scan_not_found))]
    ScanNotFound(String),

    #[error("Scan '{0}' is already in a terminal state")]
    #[diagnostic(code(gpteo::domain::already_terminal))]
    AlreadyTerminal(String),

    #[error("Scan '{0}' is still active")]
    #[diagnostic(
        code(gpteo::domain::scan_active),
        help("Cancel the scan or wait for it to finish first.")
    )]
    ScanActive(String),

    #[error("Checks registry unavailable: {0}")]
    #[diagnostic(
        code(gpteo::domain::registry),
        help("Check the checks catalogue (unique keys, positive weights, valid patterns).")
    )]
    Registry(String),

    #[error("Check '{0}' is still referenced by findings")]
    #[diagnostic(code(gpteo::domain::check_in_use))]
    CheckInUse(String),

    #[error("Fix template error: {0}")]
    #[diagnostic(code(gpteo::domain::template))]
    Template(String),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }
}
