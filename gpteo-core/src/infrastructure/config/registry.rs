// gpteo-core/src/infrastructure/config/registry.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::domain::check::ChecksRegistry;
use crate::domain::error::DomainError;
use crate::domain::ports::RegistrySource;

/// Re-reads a YAML catalogue on every snapshot, so edits apply to the next
/// scan and never to one in flight.
#[derive(Debug, Clone)]
pub struct YamlRegistrySource {
    path: PathBuf,
}

impl YamlRegistrySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistrySource for YamlRegistrySource {
    #[instrument(skip(self), fields(path = ?self.path))]
    fn snapshot(&self) -> Result<ChecksRegistry, DomainError> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            DomainError::Registry(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let registry = ChecksRegistry::from_yaml(&content)?;
        info!(
            version = registry.version(),
            checks = registry.checks().len(),
            "Loaded checks catalogue"
        );
        Ok(registry)
    }
}

/// The configured catalogue file, or the built-in catalogue.
pub fn registry_source(
    checks_path: Option<&Path>,
) -> Result<Arc<dyn RegistrySource>, DomainError> {
    match checks_path {
        Some(path) => Ok(Arc::new(YamlRegistrySource::new(path))),
        None => Ok(Arc::new(ChecksRegistry::builtin()?)),
    }
}
