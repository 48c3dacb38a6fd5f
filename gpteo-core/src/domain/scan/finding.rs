// gpteo-core/src/domain/scan/finding.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::check::{Category, Check, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Pass,
    Partial,
    Fail,
    Warning,
    Info,
}

impl FindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Partial => "partial",
            Self::Fail => "fail",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    /// Summary bucket: everything that is neither a pass nor a fail is
    /// reported as a warning so the three counts add up.
    pub fn bucket(&self) -> FindingStatus {
        match self {
            Self::Pass => Self::Pass,
            Self::Fail => Self::Fail,
            Self::Partial | Self::Warning | Self::Info => Self::Warning,
        }
    }

    pub fn is_problem(&self) -> bool {
        matches!(self, Self::Fail | Self::Warning)
    }

    /// Statuses that carry a fix suggestion.
    pub fn needs_fix(&self) -> bool {
        matches!(self, Self::Fail | Self::Partial | Self::Warning)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pass" => Some(Self::Pass),
            "partial" => Some(Self::Partial),
            "fail" => Some(Self::Fail),
            "warning" => Some(Self::Warning),
            "info" => Some(Self::Info),
            _ => None,
        }
    }
}

impl fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the rule saw, and where.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Evidence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<serde_json::Value>,
}

/// Result of one check against one page. Category, severity and weight are
/// copied from the registry snapshot so aggregation needs nothing else.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub check_key: String,
    pub category: Category,
    pub severity: Severity,
    pub weight: u32,
    pub page_url: String,
    pub status: FindingStatus,
    pub score: f64,
    pub message: String,
    #[serde(default)]
    pub evidence: Evidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_suggestion: Option<String>,
}

impl Finding {
    pub fn new(
        check: &Check,
        page_url: &str,
        status: FindingStatus,
        score: f64,
        message: impl Into<String>,
        evidence: Evidence,
    ) -> Self {
        Self {
            check_key: check.key.clone(),
            category: check.category,
            severity: check.severity,
            weight: check.weight,
            page_url: page_url.to_string(),
            status,
            score: score.clamp(0.0, 100.0),
            message: message.into(),
            evidence,
            fix_suggestion: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_cover_every_status() {
        assert_eq!(FindingStatus::Pass.bucket(), FindingStatus::Pass);
        assert_eq!(FindingStatus::Fail.bucket(), FindingStatus::Fail);
        assert_eq!(FindingStatus::Partial.bucket(), FindingStatus::Warning);
        assert_eq!(FindingStatus::Info.bucket(), FindingStatus::Warning);
        assert_eq!(FindingStatus::Warning.bucket(), FindingStatus::Warning);
    }

    #[test]
    fn test_status_parse_roundtrip() {
        for status in [
            FindingStatus::Pass,
            FindingStatus::Partial,
            FindingStatus::Fail,
            FindingStatus::Warning,
            FindingStatus::Info,
        ] {
            assert_eq!(FindingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(FindingStatus::parse("skipped"), None);
    }
}
