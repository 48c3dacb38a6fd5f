// gpteo-core/src/domain/scan/summary.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::check::{Category, Severity};

/// A high-severity problem surfaced in the scan summary, grouped by check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriticalIssue {
    pub check_key: String,
    pub severity: Severity,
    pub message: String,
    pub affected_pages: usize,
}

/// Aggregate over every finding of a completed scan. Derived data: it can
/// always be recomputed from the findings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanSummary {
    pub scan_id: Uuid,
    pub total_pages: usize,
    pub total_findings: usize,
    pub pass_count: usize,
    pub fail_count: usize,
    pub warning_count: usize,
    pub seo_score: Option<f64>,
    pub gpteo_score: Option<f64>,
    pub seo_breakdown: BTreeMap<String, f64>,
    pub gpteo_breakdown: BTreeMap<String, f64>,
    pub critical_issues: Vec<CriticalIssue>,
}

impl ScanSummary {
    pub fn score(&self, category: Category) -> Option<f64> {
        match category {
            Category::Seo => self.seo_score,
            Category::Gpteo => self.gpteo_score,
        }
    }

    pub fn breakdown(&self, category: Category) -> &BTreeMap<String, f64> {
        match category {
            Category::Seo => &self.seo_breakdown,
            Category::Gpteo => &self.gpteo_breakdown,
        }
    }
}
