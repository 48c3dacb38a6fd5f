// gpteo-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GpteoError {
    // --- DOMAIN (validation, state machine, registry) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE (store, network, IO, parsing) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for GpteoError {
    fn from(err: std::io::Error) -> Self {
        GpteoError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl From<crate::infrastructure::error::DatabaseError> for GpteoError {
    fn from(err: crate::infrastructure::error::DatabaseError) -> Self {
        GpteoError::Infrastructure(InfrastructureError::Database(err))
    }
}

impl From<duckdb::Error> for GpteoError {
    fn from(err: duckdb::Error) -> Self {
        GpteoError::Infrastructure(err.into())
    }
}

impl GpteoError {
    /// The domain error behind this error, if any.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(e) => Some(e),
            _ => None,
        }
    }
}
