// gpteo-core/src/domain/scan/request.rs

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::error::DomainError;

pub const MAX_SEED_URLS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    #[default]
    Quick,
    Standard,
    Deep,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Standard => "standard",
            Self::Deep => "deep",
        }
    }

    /// Upper bound on pages processed. Seeds are capped at 10, so standard
    /// and deep currently process every seed.
    pub fn page_cap(&self) -> usize {
        match self {
            Self::Quick => 3,
            Self::Standard => 10,
            Self::Deep => 20,
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quick" => Ok(Self::Quick),
            "standard" => Ok(Self::Standard),
            "deep" => Ok(Self::Deep),
            _ => Err(format!("Unknown scan mode: {}", s)),
        }
    }
}

/// Raw "submit scan" input as received from a caller.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScanRequest {
    #[validate(custom(function = "validate_domain"))]
    pub domain: String,
    #[validate(
        length(min = 1, message = "at least one URL required"),
        custom(function = "validate_seed_urls")
    )]
    pub seed_urls: Vec<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

/// A request that passed admission: normalized domain, parsed URLs,
/// resolved mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub domain: String,
    pub seed_urls: Vec<Url>,
    pub mode: ScanMode,
}

impl ScanRequest {
    pub fn new(domain: impl Into<String>, seed_urls: Vec<String>, mode: Option<&str>) -> Self {
        Self {
            domain: domain.into(),
            seed_urls,
            mode: mode.map(str::to_string),
        }
    }

    /// Admission check. Every problem is reported at once, sorted, and
    /// nothing is created when any is found.
    pub fn into_validated(self) -> Result<ValidatedRequest, DomainError> {
        let mut messages = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => collect_messages(&errors),
        };

        let mode = match self.mode.as_deref() {
            None => Some(ScanMode::default()),
            Some(raw) => ScanMode::from_str(raw).ok(),
        };
        if mode.is_none() {
            messages.push("mode must be one of quick, standard, deep".to_string());
        }

        let domain = normalize_domain(&self.domain);

        match (domain, mode) {
            (Some(domain), Some(mode)) if messages.is_empty() => {
                let mut seen = HashSet::new();
                let mut seed_urls = self
                    .seed_urls
                    .iter()
                    .map(|raw| parse_seed_url(raw))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| DomainError::validation(e.to_string()))?;
                // Duplicates keep their first position.
                seed_urls.retain(|url| seen.insert(url.to_string()));
                Ok(ValidatedRequest {
                    domain,
                    seed_urls,
                    mode,
                })
            }
            _ => {
                messages.sort();
                messages.dedup();
                Err(DomainError::Validation(messages))
            }
        }
    }
}

/// `HTTPS://WWW.Example.com:443/path` -> `example.com`.
/// Returns `None` when nothing host-like remains.
pub fn normalize_domain(input: &str) -> Option<String> {
    let lowered = input.trim().to_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    let without_www = without_scheme
        .strip_prefix("www.")
        .unwrap_or(without_scheme);

    let host = without_www
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default();

    if host.is_empty() || !host.contains('.') || host.starts_with('.') || host.ends_with('.') {
        return None;
    }
    Some(host.to_string())
}

fn parse_seed_url(raw: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(raw.trim()).map_err(|_| invalid_url(raw))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid_url(raw));
    }
    Ok(url)
}

fn invalid_url(raw: &str) -> ValidationError {
    ValidationError::new("url").with_message(Cow::Owned(format!("invalid URL: {}", raw)))
}

fn validate_domain(domain: &str) -> Result<(), ValidationError> {
    match normalize_domain(domain) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("domain").with_message(Cow::Borrowed("invalid domain"))),
    }
}

fn validate_seed_urls(urls: &[String]) -> Result<(), ValidationError> {
    if urls.len() > MAX_SEED_URLS {
        return Err(ValidationError::new("seed_urls").with_message(Cow::Owned(format!(
            "at most {} URLs allowed",
            MAX_SEED_URLS
        ))));
    }
    for raw in urls {
        parse_seed_url(raw)?;
    }
    Ok(())
}

fn collect_messages(errors: &ValidationErrors) -> Vec<String> {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .map(|e| {
            e.message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| e.code.to_string())
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_normalize_domain() {
        assert_eq!(
            normalize_domain("HTTPS://WWW.Example.com/"),
            Some("example.com".into())
        );
        assert_eq!(
            normalize_domain("http://shop.example.co.uk:8080/products?x=1"),
            Some("shop.example.co.uk".into())
        );
        assert_eq!(normalize_domain("  example.org  "), Some("example.org".into()));
        assert_eq!(normalize_domain("localhost"), None);
        assert_eq!(normalize_domain("https://"), None);
        assert_eq!(normalize_domain(""), None);
    }

    #[test]
    fn test_valid_request_defaults_to_quick() -> Result<()> {
        let req = ScanRequest::new(
            "www.example.com",
            vec!["https://example.com/".into(), "https://example.com/p/1".into()],
            None,
        );
        let validated = req.into_validated()?;
        assert_eq!(validated.domain, "example.com");
        assert_eq!(validated.mode, ScanMode::Quick);
        assert_eq!(validated.seed_urls.len(), 2);
        Ok(())
    }

    #[test]
    fn test_duplicate_seed_urls_collapse_in_order() -> Result<()> {
        let req = ScanRequest::new(
            "example.com",
            vec![
                "https://example.com/products/mug".into(),
                "https://example.com".into(),
                " https://example.com/products/mug".into(),
                "https://example.com/".into(),
                "https://example.com/pages/returns".into(),
            ],
            Some("standard"),
        );
        let validated = req.into_validated()?;
        let urls: Vec<&str> = validated.seed_urls.iter().map(Url::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/products/mug",
                "https://example.com/",
                "https://example.com/pages/returns",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_empty_seed_urls_rejected() {
        let req = ScanRequest::new("example.com", vec![], Some("quick"));
        let err = req.into_validated().unwrap_err();
        match err {
            DomainError::Validation(messages) => {
                assert_eq!(messages, vec!["at least one URL required".to_string()]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_too_many_seed_urls_rejected() {
        let urls = (0..11)
            .map(|i| format!("https://example.com/{}", i))
            .collect();
        let err = ScanRequest::new("example.com", urls, None)
            .into_validated()
            .unwrap_err();
        assert!(err.to_string().contains("at most 10 URLs allowed"));
    }

    #[test]
    fn test_every_problem_is_reported() {
        let req = ScanRequest::new(
            "not a domain",
            vec!["ftp://example.com/file".into()],
            Some("exhaustive"),
        );
        match req.into_validated().unwrap_err() {
            DomainError::Validation(messages) => {
                assert_eq!(messages.len(), 3);
                assert!(messages.contains(&"invalid domain".to_string()));
                assert!(messages.contains(&"invalid URL: ftp://example.com/file".to_string()));
                assert!(
                    messages.contains(&"mode must be one of quick, standard, deep".to_string())
                );
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_relative_url_rejected() {
        let err = ScanRequest::new("example.com", vec!["/products/1".into()], None)
            .into_validated()
            .unwrap_err();
        assert!(err.to_string().contains("invalid URL"));
    }

    #[test]
    fn test_page_caps() {
        assert_eq!(ScanMode::Quick.page_cap(), 3);
        assert_eq!(ScanMode::Standard.page_cap(), 10);
        assert!(ScanMode::Deep.page_cap() >= 20);
        assert_eq!("DEEP".parse::<ScanMode>(), Ok(ScanMode::Deep));
    }
}
