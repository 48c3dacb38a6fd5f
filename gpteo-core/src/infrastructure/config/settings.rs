// gpteo-core/src/infrastructure/config/settings.rs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};
use validator::Validate;

use crate::domain::scan::ScanMode;
use crate::infrastructure::error::InfrastructureError;

const CANDIDATES: [&str; 2] = ["gpteo.yaml", "gpteo.yml"];

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    #[validate(nested)]
    pub queue: QueueSettings,
    #[validate(nested)]
    pub fetch: FetchSettings,
    pub registry: RegistrySettings,
    pub store: StoreSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct QueueSettings {
    /// Scans executing at the same time.
    #[validate(range(min = 1, message = "queue.concurrency must be at least 1"))]
    pub concurrency: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct FetchSettings {
    /// Pages fetched at the same time within one scan.
    #[validate(range(min = 1, max = 16, message = "fetch.page_concurrency must be within 1..=16"))]
    pub page_concurrency: usize,
    #[validate(range(max = 20, message = "fetch.max_redirects must be within 0..=20"))]
    pub max_redirects: usize,
    pub user_agent: String,
    pub max_body_bytes: usize,
    pub timeouts: ModeTimeouts,
    pub probe_timeout_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            page_concurrency: 4,
            max_redirects: 5,
            user_agent: "GPTeo-Scanner/1.0".to_string(),
            max_body_bytes: 5 * 1024 * 1024,
            timeouts: ModeTimeouts::default(),
            probe_timeout_secs: 5,
        }
    }
}

impl FetchSettings {
    pub fn timeout_for(&self, mode: ScanMode) -> Duration {
        let secs = match mode {
            ScanMode::Quick => self.timeouts.quick,
            ScanMode::Standard => self.timeouts.standard,
            ScanMode::Deep => self.timeouts.deep,
        };
        Duration::from_secs(secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Per-page fetch timeout in seconds, by scan mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModeTimeouts {
    pub quick: u64,
    pub standard: u64,
    pub deep: u64,
}

impl Default for ModeTimeouts {
    fn default() -> Self {
        Self {
            quick: 10,
            standard: 20,
            deep: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RegistrySettings {
    /// YAML catalogue replacing the built-in one.
    pub checks_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Duckdb,
}

impl std::str::FromStr for StoreBackend {
    type Err = InfrastructureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "duckdb" => Ok(Self::Duckdb),
            other => Err(InfrastructureError::ConfigError(format!(
                "Unknown store backend '{}'. Expected memory or duckdb.",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub db_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            db_path: "gpteo.duckdb".to_string(),
        }
    }
}

/// Loads settings from `path` (a file, or a directory holding `gpteo.yaml`
/// / `gpteo.yml`), then applies `GPTEO_*` environment overrides.
///
/// An explicitly named file that does not exist is an error; a directory
/// without a settings file yields the defaults.
#[instrument]
pub fn load_settings(path: Option<&Path>) -> Result<Settings, InfrastructureError> {
    let file = match path {
        Some(p) if p.is_dir() => find_settings_file(p),
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => {
            return Err(InfrastructureError::ConfigNotFound(p.display().to_string()));
        }
        None => find_settings_file(Path::new(".")),
    };

    let mut settings = match file {
        Some(file) => {
            info!(path = ?file, "Loading settings");
            let content = fs::read_to_string(&file)?;
            serde_yaml::from_str(&content)?
        }
        None => Settings::default(),
    };

    apply_overrides(&mut settings, |key| std::env::var(key).ok())?;
    validate(&settings)?;
    Ok(settings)
}

fn find_settings_file(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Layers `GPTEO_*` variables over the file values.
pub fn apply_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), InfrastructureError> {
    if let Some(val) = lookup("GPTEO_CONCURRENCY") {
        settings.queue.concurrency = parse_number("GPTEO_CONCURRENCY", &val)?;
        info!(value = settings.queue.concurrency, "Overriding queue concurrency via ENV");
    }
    if let Some(val) = lookup("GPTEO_PAGE_CONCURRENCY") {
        settings.fetch.page_concurrency = parse_number("GPTEO_PAGE_CONCURRENCY", &val)?;
        info!(value = settings.fetch.page_concurrency, "Overriding page concurrency via ENV");
    }
    if let Some(val) = lookup("GPTEO_STORE") {
        settings.store.backend = val.parse()?;
    }
    if let Some(val) = lookup("GPTEO_DB_PATH") {
        info!(old = ?settings.store.db_path, new = ?val, "Overriding database path via ENV");
        settings.store.db_path = val;
    }
    if let Some(val) = lookup("GPTEO_CHECKS_PATH") {
        settings.registry.checks_path = Some(PathBuf::from(val));
    }
    Ok(())
}

fn parse_number(key: &str, raw: &str) -> Result<usize, InfrastructureError> {
    raw.trim().parse().map_err(|_| {
        InfrastructureError::ConfigError(format!("{} must be a positive integer, got '{}'", key, raw))
    })
}

fn validate(settings: &Settings) -> Result<(), InfrastructureError> {
    settings
        .validate()
        .map_err(|e| InfrastructureError::ConfigError(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_directory_has_no_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut settings = Settings::default();
        apply_overrides(&mut settings, |_| None)?;
        assert_eq!(find_settings_file(dir.path()), None);
        assert_eq!(settings.queue.concurrency, 1);
        assert_eq!(settings.fetch.page_concurrency, 4);
        assert_eq!(settings.fetch.timeout_for(ScanMode::Deep), Duration::from_secs(30));
        assert_eq!(settings.store.backend, StoreBackend::Memory);
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join("gpteo.yml"),
            "queue:\n  concurrency: 3\nfetch:\n  timeouts:\n    quick: 7\nstore:\n  backend: duckdb\n",
        )?;
        let file = find_settings_file(dir.path()).unwrap();
        let settings: Settings = serde_yaml::from_str(&fs::read_to_string(file)?)?;

        assert_eq!(settings.queue.concurrency, 3);
        assert_eq!(settings.fetch.timeouts.quick, 7);
        assert_eq!(settings.fetch.timeouts.standard, 20);
        assert_eq!(settings.fetch.user_agent, "GPTeo-Scanner/1.0");
        assert_eq!(settings.store.backend, StoreBackend::Duckdb);
        assert_eq!(settings.store.db_path, "gpteo.duckdb");
        Ok(())
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let err = load_settings(Some(Path::new("/definitely/not/here/gpteo.yaml")));
        assert!(matches!(err, Err(InfrastructureError::ConfigNotFound(_))));
    }

    #[test]
    fn test_env_overrides() -> Result<()> {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GPTEO_CONCURRENCY", "4"),
            ("GPTEO_STORE", "DuckDB"),
            ("GPTEO_DB_PATH", "/tmp/scans.duckdb"),
            ("GPTEO_CHECKS_PATH", "checks.yaml"),
        ]);
        let mut settings = Settings::default();
        apply_overrides(&mut settings, |k| env.get(k).map(|v| v.to_string()))?;

        assert_eq!(settings.queue.concurrency, 4);
        assert_eq!(settings.store.backend, StoreBackend::Duckdb);
        assert_eq!(settings.store.db_path, "/tmp/scans.duckdb");
        assert_eq!(settings.registry.checks_path, Some(PathBuf::from("checks.yaml")));
        Ok(())
    }

    #[test]
    fn test_bad_numeric_override_is_config_error() {
        let mut settings = Settings::default();
        let err = apply_overrides(&mut settings, |k| {
            (k == "GPTEO_PAGE_CONCURRENCY").then(|| "many".to_string())
        });
        assert!(matches!(err, Err(InfrastructureError::ConfigError(_))));
    }

    #[test]
    fn test_validation_bounds() {
        let mut settings = Settings::default();
        settings.queue.concurrency = 0;
        assert!(validate(&settings).is_err());

        let mut settings = Settings::default();
        settings.fetch.page_concurrency = 17;
        assert!(validate(&settings).is_err());

        let mut settings = Settings::default();
        settings.fetch.max_redirects = 21;
        assert!(validate(&settings).is_err());

        assert!(validate(&Settings::default()).is_ok());
    }
}
