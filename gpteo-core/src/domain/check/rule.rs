// gpteo-core/src/domain/check/rule.rs

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::field::{Element, FieldRef, Metric};

/// How many of a rule's listed fields must be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    #[default]
    All,
    Any,
}

/// Typed parameters of a check. Each variant maps to one evaluation strategy
/// in `domain::evaluation::rules`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    Presence {
        fields: Vec<FieldRef>,
        #[serde(default)]
        require: Requirement,
    },
    LengthRange {
        field: FieldRef,
        min: usize,
        max: usize,
    },
    Threshold {
        metric: Metric,
        good: f64,
        fair: f64,
    },
    StructuredField {
        schema_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        required: Vec<String>,
        #[serde(default)]
        require: Requirement,
    },
    Forbidden {
        fields: Vec<FieldRef>,
        tokens: Vec<String>,
    },
    ElementCount {
        element: Element,
        min: usize,
        max: usize,
    },
    LinkPattern {
        patterns: LinkPatterns,
    },
    WellKnownResource {
        path: String,
    },
    BrandConsistency,
}

impl RuleKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Presence { .. } => "presence",
            Self::LengthRange { .. } => "length_range",
            Self::Threshold { .. } => "threshold",
            Self::StructuredField { .. } => "structured_field",
            Self::Forbidden { .. } => "forbidden",
            Self::ElementCount { .. } => "element_count",
            Self::LinkPattern { .. } => "link_pattern",
            Self::WellKnownResource { .. } => "well_known_resource",
            Self::BrandConsistency => "brand_consistency",
        }
    }

    /// Whether the rule reads the response body. Rules that don't can still
    /// produce a meaningful finding for a page whose fetch failed.
    pub fn needs_content(&self) -> bool {
        match self {
            Self::Presence { fields, .. } | Self::Forbidden { fields, .. } => {
                fields.iter().any(FieldRef::needs_content)
            }
            Self::Threshold { .. } | Self::WellKnownResource { .. } => false,
            _ => true,
        }
    }

    /// Parameter sanity checks that serde cannot express.
    pub fn validate_params(&self) -> Result<(), String> {
        match self {
            Self::Presence { fields, .. } if fields.is_empty() => {
                Err("presence rule needs at least one field".into())
            }
            Self::Forbidden { fields, tokens } if fields.is_empty() || tokens.is_empty() => {
                Err("forbidden rule needs at least one field and one token".into())
            }
            Self::LengthRange { min, max, .. } | Self::ElementCount { min, max, .. }
                if min > max =>
            {
                Err(format!("min ({}) is greater than max ({})", min, max))
            }
            Self::Threshold { good, fair, .. } if good > fair || *good < 0.0 => Err(format!(
                "threshold bands must satisfy 0 <= good ({}) <= fair ({})",
                good, fair
            )),
            Self::StructuredField {
                schema_type,
                required,
                ..
            } if schema_type.is_empty() || required.is_empty() => {
                Err("structured_field rule needs a schema_type and required fields".into())
            }
            Self::LinkPattern { patterns } if patterns.is_empty() => {
                Err("link_pattern rule needs at least one pattern".into())
            }
            Self::WellKnownResource { path } if !path.starts_with('/') => {
                Err(format!("resource path '{}' must start with '/'", path))
            }
            _ => Ok(()),
        }
    }
}

/// Case-insensitive href patterns, compiled once when the catalogue loads.
#[derive(Debug, Clone)]
pub struct LinkPatterns(Vec<Regex>);

impl LinkPatterns {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the first href matching any pattern.
    pub fn first_match<'a>(&self, hrefs: &'a [String]) -> Option<&'a str> {
        hrefs
            .iter()
            .find(|href| self.0.iter().any(|re| re.is_match(href)))
            .map(String::as_str)
    }

    pub fn sources(&self) -> Vec<String> {
        self.0.iter().map(|re| re.as_str().to_string()).collect()
    }
}

impl TryFrom<Vec<String>> for LinkPatterns {
    type Error = String;

    fn try_from(raw: Vec<String>) -> Result<Self, Self::Error> {
        raw.iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| format!("Invalid link pattern '{}': {}", p, e))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl From<LinkPatterns> for Vec<String> {
    fn from(value: LinkPatterns) -> Self {
        value.sources()
    }
}

impl Serialize for LinkPatterns {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.sources().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LinkPatterns {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Vec::<String>::deserialize(deserializer)?;
        LinkPatterns::try_from(raw).map_err(serde::de::Error::custom)
    }
}
