// gpteo-core/src/domain/evaluation/mod.rs

pub mod jsonld;
pub mod rules;

pub use rules::RuleOutcome;

use miette::Diagnostic;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::domain::check::{Check, ChecksRegistry};
use crate::domain::ports::FixRenderer;
use crate::domain::scan::{Evidence, Finding, FindingStatus, Page};

/// A failure inside one rule. Never escapes the engine: it becomes a failed
/// finding for that (page, check) pair.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum RuleError {
    #[error("Malformed structured data at {path}: {reason}")]
    #[diagnostic(code(gpteo::rule::structured_data))]
    MalformedStructuredData { path: String, reason: String },

    #[error("Invalid rule pattern: {0}")]
    #[diagnostic(code(gpteo::rule::pattern))]
    InvalidPattern(String),
}

impl RuleError {
    fn location(&self) -> Option<&str> {
        match self {
            Self::MalformedStructuredData { path, .. } => Some(path),
            Self::InvalidPattern(_) => None,
        }
    }
}

/// Applies every active, applicable check of a registry snapshot to a page.
#[derive(Clone, Default)]
pub struct ChecksEngine {
    renderer: Option<Arc<dyn FixRenderer>>,
}

impl ChecksEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-passing findings of checks with a `fix_template` get a rendered
    /// fix suggestion.
    pub fn with_renderer(renderer: Arc<dyn FixRenderer>) -> Self {
        Self {
            renderer: Some(renderer),
        }
    }

    /// Exactly one finding per active check whose page types include the
    /// page's type, in registry order. Never fails.
    pub fn evaluate(&self, page: &Page, registry: &ChecksRegistry, domain: &str) -> Vec<Finding> {
        registry
            .active()
            .filter(|check| check.applies_to(page.page_type))
            .map(|check| self.evaluate_check(check, page, domain))
            .collect()
    }

    fn evaluate_check(&self, check: &Check, page: &Page, domain: &str) -> Finding {
        let mut finding = match (&page.fetch_error, check.rule.needs_content()) {
            (Some(error), true) => Finding::new(
                check,
                &page.url,
                FindingStatus::Fail,
                0.0,
                format!("Page content unavailable: {}", error),
                Evidence {
                    location: Some(page.url.clone()),
                    ..Evidence::default()
                },
            ),
            _ => match rules::evaluate(&check.rule, page) {
                Ok(outcome) => Finding::new(
                    check,
                    &page.url,
                    outcome.status,
                    outcome.score,
                    outcome.message,
                    outcome.evidence,
                ),
                Err(e) => {
                    warn!("Check '{}' errored on {}: {}", check.key, page.url, e);
                    Finding::new(
                        check,
                        &page.url,
                        FindingStatus::Fail,
                        0.0,
                        format!("Rule evaluation error: {}", e),
                        Evidence {
                            snippet: Some(e.to_string()),
                            location: e.location().map(str::to_string),
                            ..Evidence::default()
                        },
                    )
                }
            },
        };

        if finding.status.needs_fix() {
            finding.fix_suggestion = self.fix_suggestion(check, &finding, domain);
        }
        finding
    }

    fn fix_suggestion(&self, check: &Check, finding: &Finding, domain: &str) -> Option<String> {
        let template = check.fix_template.as_deref()?;
        let Some(renderer) = &self.renderer else {
            return Some(template.to_string());
        };

        let context = json!({
            "url": finding.page_url,
            "domain": domain,
            "found": finding.evidence.found.as_ref().map(display_value).unwrap_or_default(),
            "expected": finding.evidence.expected.as_ref().map(display_value).unwrap_or_default(),
            "check": check.key,
        });
        match renderer.render(template, &context) {
            Ok(rendered) => Some(rendered),
            Err(e) => {
                warn!("Fix template for '{}' failed to render: {}", check.key, e);
                Some(template.to_string())
            }
        }
    }
}

// Lists render as "a, b" inside fix suggestions rather than JSON arrays.
fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .map(jsonld::value_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => jsonld::value_text(other),
    }
}
