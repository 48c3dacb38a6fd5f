// gpteo-core/src/domain/evaluation/rules.rs
//
// One strategy per `RuleKind`. Every strategy is a pure function of the rule
// parameters and the extracted page.

use chrono::{DateTime, NaiveDate, Utc};
use regex::RegexBuilder;
use serde_json::{Value, json};

use super::RuleError;
use super::jsonld;
use crate::domain::check::{Element, FieldRef, LinkPatterns, Metric, Requirement, RuleKind};
use crate::domain::scan::{Evidence, FindingStatus, Page};

const SNIPPET_MAX_CHARS: usize = 200;

/// Status, score and evidence produced by a single rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub status: FindingStatus,
    pub score: f64,
    pub message: String,
    pub evidence: Evidence,
}

impl RuleOutcome {
    fn new(status: FindingStatus, score: f64, message: impl Into<String>) -> Self {
        Self {
            status,
            score,
            message: message.into(),
            evidence: Evidence::default(),
        }
    }

    fn pass(message: impl Into<String>) -> Self {
        Self::new(FindingStatus::Pass, 100.0, message)
    }

    fn fail(message: impl Into<String>) -> Self {
        Self::new(FindingStatus::Fail, 0.0, message)
    }

    fn partial(message: impl Into<String>) -> Self {
        Self::new(FindingStatus::Partial, 50.0, message)
    }

    fn with_location(mut self, location: impl Into<String>) -> Self {
        self.evidence.location = Some(location.into());
        self
    }

    fn with_snippet(mut self, snippet: &str) -> Self {
        self.evidence.snippet = Some(truncate(snippet, SNIPPET_MAX_CHARS));
        self
    }

    fn with_found(mut self, found: Value) -> Self {
        self.evidence.found = Some(found);
        self
    }

    fn with_expected(mut self, expected: Value) -> Self {
        self.evidence.expected = Some(expected);
        self
    }
}

pub fn evaluate(rule: &RuleKind, page: &Page) -> Result<RuleOutcome, RuleError> {
    match rule {
        RuleKind::Presence { fields, require } => Ok(presence(page, fields, *require)),
        RuleKind::LengthRange { field, min, max } => Ok(length_range(page, field, *min, *max)),
        RuleKind::Threshold { metric, good, fair } => Ok(threshold(page, *metric, *good, *fair)),
        RuleKind::StructuredField {
            schema_type,
            path,
            required,
            require,
        } => structured_field(page, schema_type, path.as_deref(), required, *require),
        RuleKind::Forbidden { fields, tokens } => forbidden(page, fields, tokens),
        RuleKind::ElementCount { element, min, max } => {
            Ok(element_count(page, *element, *min, *max))
        }
        RuleKind::LinkPattern { patterns } => Ok(link_pattern(page, patterns)),
        RuleKind::WellKnownResource { path } => Ok(well_known_resource(page, path)),
        RuleKind::BrandConsistency => Ok(brand_consistency(page)),
    }
}

/// Resolves a field reference to its textual value, if present and non-empty.
pub fn lookup(page: &Page, field: &FieldRef) -> Option<String> {
    match field {
        FieldRef::Meta(name) => page.meta(name).map(str::to_string),
        FieldRef::Header(name) => page.header(name).map(str::to_string),
        FieldRef::JsonLd(property) => {
            jsonld::find_property(&page.json_ld, property).map(jsonld::value_text)
        }
    }
}

fn presence(page: &Page, fields: &[FieldRef], require: Requirement) -> RuleOutcome {
    let mut found = serde_json::Map::new();
    let mut missing = Vec::new();
    for field in fields {
        match lookup(page, field) {
            Some(value) => {
                found.insert(field.to_string(), json!(truncate(&value, SNIPPET_MAX_CHARS)));
            }
            None => missing.push(field.to_string()),
        }
    }

    let satisfied = match require {
        Requirement::All => missing.is_empty(),
        Requirement::Any => !found.is_empty(),
    };
    let location = fields
        .iter()
        .map(FieldRef::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    let outcome = if satisfied {
        let present: Vec<&String> = found.keys().collect();
        RuleOutcome::pass(format!(
            "Found {}",
            present
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    } else {
        RuleOutcome::fail(format!("Missing {}", missing.join(", ")))
    };

    outcome
        .with_location(location)
        .with_found(Value::Object(found))
        .with_expected(json!(match require {
            Requirement::All => fields.iter().map(FieldRef::to_string).collect::<Vec<_>>(),
            Requirement::Any => missing,
        }))
}

fn length_range(page: &Page, field: &FieldRef, min: usize, max: usize) -> RuleOutcome {
    let expected = json!({ "min": min, "max": max });
    let Some(value) = lookup(page, field) else {
        return RuleOutcome::fail(format!("{} is missing", field))
            .with_location(field.to_string())
            .with_expected(expected);
    };

    let value = value.trim().to_string();
    let length = value.chars().count();
    let outcome = if (min..=max).contains(&length) {
        RuleOutcome::pass(format!(
            "{} length {} is within {}-{}",
            field, length, min, max
        ))
    } else {
        RuleOutcome::partial(format!(
            "{} length {} is outside the recommended {}-{}",
            field, length, min, max
        ))
    };

    outcome
        .with_location(field.to_string())
        .with_snippet(&value)
        .with_found(json!({ "value": truncate(&value, SNIPPET_MAX_CHARS), "length": length }))
        .with_expected(expected)
}

fn threshold(page: &Page, metric: Metric, good: f64, fair: f64) -> RuleOutcome {
    let expected = json!({ "good": good, "fair": fair });
    let Some(value) = metric_value(page, metric) else {
        return RuleOutcome::new(
            FindingStatus::Info,
            0.0,
            format!("{} is unavailable", metric.as_str()),
        )
        .with_location(metric.as_str())
        .with_expected(expected);
    };

    let outcome = if value <= good {
        RuleOutcome::pass(format!("{} is {} (good <= {})", metric.as_str(), value, good))
    } else if value <= fair {
        RuleOutcome::new(
            FindingStatus::Warning,
            50.0,
            format!("{} is {} (fair <= {})", metric.as_str(), value, fair),
        )
    } else {
        RuleOutcome::fail(format!(
            "{} is {} (exceeds {})",
            metric.as_str(),
            value,
            fair
        ))
    };

    outcome
        .with_location(metric.as_str())
        .with_found(json!(value))
        .with_expected(expected)
}

/// Numeric value of a page metric, when the page carries it.
pub fn metric_value(page: &Page, metric: Metric) -> Option<f64> {
    match metric {
        Metric::LoadTimeMs => page.load_time_ms.map(|v| v as f64),
        Metric::SizeBytes => page.size_bytes.map(|v| v as f64),
        Metric::DaysSinceModified => last_modified(page)
            .map(|at| (page.fetched_at - at).num_days().max(0) as f64),
    }
}

fn last_modified(page: &Page) -> Option<DateTime<Utc>> {
    let from_jsonld = jsonld::find_property(&page.json_ld, "dateModified")
        .and_then(Value::as_str)
        .and_then(parse_date);
    from_jsonld.or_else(|| {
        page.header("last-modified")
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    })
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn structured_field(
    page: &Page,
    schema_type: &str,
    path: Option<&str>,
    required: &[String],
    require: Requirement,
) -> Result<RuleOutcome, RuleError> {
    let location = match path {
        Some(p) => format!("{}.{}", schema_type, p),
        None => schema_type.to_string(),
    };

    let Some(node) = jsonld::find_typed_node(&page.json_ld, schema_type) else {
        return Ok(RuleOutcome::fail(format!("No {} schema found", schema_type))
            .with_location(location)
            .with_found(json!({ "json_ld_blocks": page.json_ld.len() }))
            .with_expected(json!({ "@type": schema_type })));
    };

    let target = match path {
        None => node,
        Some(p) => {
            let nested = match node.get(p) {
                Some(Value::Array(items)) => items.first(),
                other => other,
            };
            match nested.filter(|v| jsonld::is_present(v)) {
                Some(v) => v,
                None => {
                    return Ok(RuleOutcome::fail(format!("{} is missing", location))
                        .with_location(location)
                        .with_expected(json!(required)));
                }
            }
        }
    };

    if !target.is_object() {
        return Err(RuleError::MalformedStructuredData {
            path: format!("$.{}", location),
            reason: format!("expected an object, found {}", json_kind(target)),
        });
    }

    let (present, missing): (Vec<&String>, Vec<&String>) = required
        .iter()
        .partition(|field| target.get(field.as_str()).is_some_and(jsonld::is_present));

    let (status, score) = match require {
        Requirement::Any if present.is_empty() => (FindingStatus::Fail, 0.0),
        Requirement::Any => (FindingStatus::Pass, 100.0),
        Requirement::All => {
            let score = 100.0 * present.len() as f64 / required.len() as f64;
            let status = if missing.is_empty() {
                FindingStatus::Pass
            } else if present.is_empty() {
                FindingStatus::Fail
            } else {
                FindingStatus::Partial
            };
            (status, score)
        }
    };

    let message = match status {
        FindingStatus::Pass => format!("{} has {}", location, join(&present)),
        _ if matches!(require, Requirement::Any) => {
            format!("{} has none of {}", location, join(&missing))
        }
        _ => format!("{} is missing {}", location, join(&missing)),
    };

    Ok(RuleOutcome::new(status, score, message)
        .with_location(location)
        .with_snippet(&target.to_string())
        .with_found(json!(present))
        .with_expected(json!(missing)))
}

fn forbidden(page: &Page, fields: &[FieldRef], tokens: &[String]) -> Result<RuleOutcome, RuleError> {
    let mut matchers = Vec::with_capacity(tokens.len());
    for token in tokens {
        let pattern = format!(r"\b{}\b", regex::escape(token.trim()));
        let re = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| RuleError::InvalidPattern(format!("{}: {}", token, e)))?;
        matchers.push((token, re));
    }

    for field in fields {
        let Some(value) = lookup(page, field) else {
            continue;
        };
        if let Some((token, _)) = matchers.iter().find(|(_, re)| re.is_match(&value)) {
            return Ok(RuleOutcome::fail(format!("{} contains '{}'", field, token))
                .with_location(field.to_string())
                .with_snippet(&value)
                .with_found(json!(token))
                .with_expected(json!({ "not_containing": tokens })));
        }
    }

    Ok(RuleOutcome::pass(format!(
        "No forbidden terms in {}",
        fields
            .iter()
            .map(FieldRef::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    ))
    .with_expected(json!({ "not_containing": tokens })))
}

fn element_count(page: &Page, element: Element, min: usize, max: usize) -> RuleOutcome {
    let items = match element {
        Element::H1 => &page.h1,
    };
    let count = items.len();
    let message = format!("Found {} <h1> element(s), expected {}-{}", count, min, max);

    let outcome = if (min..=max).contains(&count) {
        RuleOutcome::pass(message)
    } else if count == 0 {
        RuleOutcome::fail(message)
    } else {
        RuleOutcome::partial(message)
    };

    let outcome = outcome
        .with_location("h1")
        .with_found(json!(count))
        .with_expected(json!({ "min": min, "max": max }));
    match items.first() {
        Some(first) => outcome.with_snippet(first),
        None => outcome,
    }
}

fn link_pattern(page: &Page, patterns: &LinkPatterns) -> RuleOutcome {
    match patterns.first_match(&page.links) {
        Some(href) => RuleOutcome::pass(format!("Found link {}", href))
            .with_location("a[href]")
            .with_found(json!(href)),
        None => RuleOutcome::fail(format!(
            "No link matching {}",
            patterns.sources().join(" | ")
        ))
        .with_location("a[href]")
        .with_found(json!({ "links": page.links.len() }))
        .with_expected(json!(patterns.sources())),
    }
}

fn well_known_resource(page: &Page, path: &str) -> RuleOutcome {
    let outcome = match page.resources.get(path).copied() {
        Some(status) if (200..300).contains(&status) => {
            RuleOutcome::pass(format!("{} is reachable ({})", path, status))
        }
        Some(0) => RuleOutcome::fail(format!("{} is unreachable", path)),
        Some(status) => RuleOutcome::fail(format!("{} returned {}", path, status)),
        None => RuleOutcome::fail(format!("{} was not probed", path)),
    };
    let outcome = outcome
        .with_location(path)
        .with_expected(json!("2xx"));
    match page.resources.get(path) {
        Some(status) => outcome.with_found(json!(status)),
        None => outcome,
    }
}

fn brand_consistency(page: &Page) -> RuleOutcome {
    let Some(brand) = jsonld::brand_name(&page.json_ld) else {
        return RuleOutcome::fail("No brand declared in structured data")
            .with_location("jsonld:brand")
            .with_expected(json!("Product.brand or Organization.name"));
    };

    let visible: Vec<&str> = ["title", "og:site_name", "og:title"]
        .iter()
        .filter_map(|name| page.meta(name))
        .chain(page.h1.iter().map(String::as_str))
        .collect();
    let needle = brand.to_lowercase();
    let outcome = if visible.iter().any(|t| t.to_lowercase().contains(&needle)) {
        RuleOutcome::pass(format!("Brand '{}' is visible on the page", brand))
    } else {
        RuleOutcome::partial(format!(
            "Brand '{}' is declared but not visible in the title or headings",
            brand
        ))
    };
    outcome
        .with_location("title, og:site_name, og:title, h1")
        .with_found(json!(visible))
        .with_expected(json!(brand))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn join(items: &[&String]) -> String {
    items
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn truncate(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &value[..idx]),
        None => value.to_string(),
    }
}
