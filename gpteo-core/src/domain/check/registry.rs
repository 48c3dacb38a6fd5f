// gpteo-core/src/domain/check/registry.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use validator::Validate;

use super::{Check, RuleKind};
use crate::domain::error::DomainError;

const BUILTIN_CATALOGUE: &str = include_str!("default_checks.yaml");

/// On-disk shape of a checks catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckCatalogue {
    #[serde(default = "default_catalogue_version")]
    pub version: String,
    pub checks: Vec<Check>,
}

/// Immutable snapshot of the rule definitions a scan runs against.
/// Cloning is cheap; every clone observes the same `version`.
#[derive(Debug, Clone)]
pub struct ChecksRegistry {
    version: String,
    checks: Arc<[Check]>,
}

impl ChecksRegistry {
    pub fn from_catalogue(catalogue: CheckCatalogue) -> Result<Self, DomainError> {
        let mut seen = HashSet::with_capacity(catalogue.checks.len());

        for check in &catalogue.checks {
            check
                .validate()
                .map_err(|e| DomainError::Registry(format!("check '{}': {}", check.key, e)))?;

            check
                .rule
                .validate_params()
                .map_err(|e| DomainError::Registry(format!("check '{}': {}", check.key, e)))?;

            let prefix = check.key.split('.').next().unwrap_or_default();
            if prefix != check.category.as_str() {
                return Err(DomainError::Registry(format!(
                    "check '{}' is namespaced '{}' but declared in category '{}'",
                    check.key, prefix, check.category
                )));
            }

            if !seen.insert(check.key.as_str()) {
                return Err(DomainError::Registry(format!(
                    "duplicate check key '{}'",
                    check.key
                )));
            }
        }

        Ok(Self {
            version: catalogue.version,
            checks: catalogue.checks.into(),
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, DomainError> {
        let catalogue: CheckCatalogue = serde_yaml::from_str(content)
            .map_err(|e| DomainError::Registry(format!("catalogue parse error: {}", e)))?;
        Self::from_catalogue(catalogue)
    }

    /// The catalogue shipped with the scanner.
    pub fn builtin() -> Result<Self, DomainError> {
        Self::from_yaml(BUILTIN_CATALOGUE)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn active(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|c| c.is_active())
    }

    pub fn get(&self, key: &str) -> Option<&Check> {
        self.checks.iter().find(|c| c.key == key)
    }

    /// Distinct site-level paths the fetcher must probe on homepages.
    pub fn probe_paths(&self) -> Vec<String> {
        self.active()
            .filter_map(|c| match &c.rule {
                RuleKind::WellKnownResource { path } => Some(path.clone()),
                _ => None,
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn default_catalogue_version() -> String {
    "1.0.0".to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::check::Category;

    #[test]
    fn test_builtin_catalogue_loads() -> anyhow::Result<()> {
        let registry = ChecksRegistry::builtin()?;
        assert_eq!(registry.version(), "1.0.0");
        assert_eq!(registry.checks().len(), 24);

        let seo = registry
            .checks()
            .iter()
            .filter(|c| c.category == Category::Seo)
            .count();
        assert_eq!(seo, 10);

        let title = registry
            .get("seo.meta.title")
            .ok_or_else(|| anyhow::anyhow!("missing title check"))?;
        assert_eq!(title.weight, 15);
        assert!(title.fix_template.is_some());

        assert_eq!(
            registry.probe_paths(),
            vec!["/ai-feed.json", "/robots.txt", "/sitemap.xml"]
        );
        Ok(())
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let yaml = r#"
checks:
  - key: seo.meta.title
    name: A
    category: seo
    rule: { kind: presence, fields: [title] }
  - key: seo.meta.title
    name: B
    category: seo
    rule: { kind: presence, fields: [title] }
"#;
        let err = ChecksRegistry::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate check key"));
    }

    #[test]
    fn test_category_namespace_mismatch_rejected() {
        let yaml = r#"
checks:
  - key: gpteo.meta.title
    name: A
    category: seo
    rule: { kind: presence, fields: [title] }
"#;
        assert!(ChecksRegistry::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_inactive_checks_are_kept_but_not_active() -> anyhow::Result<()> {
        let yaml = r#"
version: "2.1.0"
checks:
  - key: seo.meta.title
    name: A
    category: seo
    rule: { kind: presence, fields: [title] }
  - key: seo.meta.robots
    name: B
    category: seo
    active: false
    rule: { kind: presence, fields: ["meta:robots"] }
"#;
        let registry = ChecksRegistry::from_yaml(yaml)?;
        assert_eq!(registry.version(), "2.1.0");
        assert_eq!(registry.checks().len(), 2);
        assert_eq!(registry.active().count(), 1);
        Ok(())
    }
}
