// gpteo-core/src/domain/ports/registry.rs

use crate::domain::check::ChecksRegistry;
use crate::domain::error::DomainError;

/// Supplies the checks registry snapshot a scan is evaluated against.
///
/// A snapshot is taken once when a scan starts; later catalogue edits do not
/// affect a scan in flight.
pub trait RegistrySource: Send + Sync {
    fn snapshot(&self) -> Result<ChecksRegistry, DomainError>;
}

/// A fixed, already-validated registry.
impl RegistrySource for ChecksRegistry {
    fn snapshot(&self) -> Result<ChecksRegistry, DomainError> {
        Ok(self.clone())
    }
}
