// gpteo-core/src/domain/scoring.rs
//
// Deterministic roll-up of page findings into a scan summary.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

use crate::domain::check::{Category, Severity, check_group};
use crate::domain::scan::{CriticalIssue, Finding, FindingStatus, PageReport, ScanSummary};

pub const MAX_CRITICAL_ISSUES: usize = 5;

#[derive(Default)]
struct WeightedMean {
    weighted: f64,
    weight: f64,
}

impl WeightedMean {
    fn add(&mut self, finding: &Finding) {
        let w = f64::from(finding.weight);
        self.weighted += w * finding.score / 100.0;
        self.weight += w;
    }

    fn value(&self) -> Option<f64> {
        (self.weight > 0.0).then(|| round2(100.0 * self.weighted / self.weight))
    }
}

struct IssueGroup<'a> {
    severity: Severity,
    message: &'a str,
    pages: BTreeSet<&'a str>,
}

/// Builds the summary of a scan from its page reports.
///
/// Category score is `100 * Σ(w·s/100) / Σw` over the category's findings;
/// a category without findings scores `None` rather than 0. Group
/// sub-scores use the same formula per check group.
pub fn aggregate(scan_id: Uuid, reports: &[PageReport]) -> ScanSummary {
    let findings: Vec<&Finding> = reports.iter().flat_map(|r| r.findings.iter()).collect();

    let mut pass_count = 0;
    let mut fail_count = 0;
    let mut warning_count = 0;
    for finding in &findings {
        match finding.status.bucket() {
            FindingStatus::Pass => pass_count += 1,
            FindingStatus::Fail => fail_count += 1,
            _ => warning_count += 1,
        }
    }

    let (seo_score, seo_breakdown) = category_scores(&findings, Category::Seo);
    let (gpteo_score, gpteo_breakdown) = category_scores(&findings, Category::Gpteo);

    ScanSummary {
        scan_id,
        total_pages: reports.len(),
        total_findings: findings.len(),
        pass_count,
        fail_count,
        warning_count,
        seo_score,
        gpteo_score,
        seo_breakdown,
        gpteo_breakdown,
        critical_issues: critical_issues(&findings),
    }
}

fn category_scores(
    findings: &[&Finding],
    category: Category,
) -> (Option<f64>, BTreeMap<String, f64>) {
    let mut total = WeightedMean::default();
    let mut groups: BTreeMap<&str, WeightedMean> = BTreeMap::new();

    for finding in findings.iter().filter(|f| f.category == category) {
        total.add(finding);
        groups
            .entry(check_group(&finding.check_key))
            .or_default()
            .add(finding);
    }

    let breakdown = groups
        .into_iter()
        .filter_map(|(group, mean)| mean.value().map(|v| (group.to_string(), v)))
        .collect();
    (total.value(), breakdown)
}

/// Failing or warning findings of high and critical checks, grouped by check
/// and ranked by severity, then affected pages, then key.
fn critical_issues(findings: &[&Finding]) -> Vec<CriticalIssue> {
    let mut groups: HashMap<&str, IssueGroup> = HashMap::new();

    for finding in findings
        .iter()
        .filter(|f| f.severity.is_critical_or_high() && f.status.is_problem())
    {
        groups
            .entry(finding.check_key.as_str())
            .or_insert_with(|| IssueGroup {
                severity: finding.severity,
                message: &finding.message,
                pages: BTreeSet::new(),
            })
            .pages
            .insert(finding.page_url.as_str());
    }

    let mut ranked: Vec<(&str, IssueGroup)> = groups.into_iter().collect();
    ranked.sort_by_key(|(key, g)| (Reverse(g.severity), Reverse(g.pages.len()), *key));

    ranked
        .into_iter()
        .take(MAX_CRITICAL_ISSUES)
        .map(|(key, g)| CriticalIssue {
            check_key: key.to_string(),
            severity: g.severity,
            message: g.message.to_string(),
            affected_pages: g.pages.len(),
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
