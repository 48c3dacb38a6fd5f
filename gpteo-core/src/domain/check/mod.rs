// gpteo-core/src/domain/check/mod.rs

pub mod field;
pub mod registry;
pub mod rule;

pub use field::{Element, FieldRef, Metric};
pub use registry::{CheckCatalogue, ChecksRegistry};
pub use rule::{LinkPatterns, Requirement, RuleKind};

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::domain::scan::PageType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Seo,
    Gpteo,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Seo, Category::Gpteo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seo => "seo",
            Self::Gpteo => "gpteo",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Declaration order gives Info < Low < ... < Critical, which the
// critical-issue ranking relies on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn is_critical_or_high(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A weighted, versioned rule evaluated against every applicable page.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Check {
    #[validate(length(min = 3, message = "check key is too short"))]
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub severity: Severity,
    #[validate(range(min = 1, message = "weight must be a positive integer"))]
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Empty means the check applies to every page type.
    #[serde(default)]
    pub page_types: Vec<PageType>,
    pub rule: RuleKind,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_template: Option<String>,
}

impl Check {
    pub fn is_active(&self) -> bool {
        self.active && self.deprecated.is_none()
    }

    pub fn applies_to(&self, page_type: PageType) -> bool {
        self.page_types.is_empty() || self.page_types.contains(&page_type)
    }

    /// Sub-score group: the second dotted segment of the key
    /// (`seo.meta.title` -> `meta`).
    pub fn group(&self) -> &str {
        check_group(&self.key)
    }
}

pub fn check_group(key: &str) -> &str {
    key.split('.').nth(1).unwrap_or(key)
}

fn default_weight() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_version() -> String {
    "1.0.0".to_string()
}
