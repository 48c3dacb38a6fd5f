// gpteo-core/src/domain/check/field.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Typed selector for a value extracted from a page.
///
/// Textual form: `title`, `meta:<name>`, `header:<name>`, `jsonld:<property>`.
/// Meta and header names are case-insensitive and stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldRef {
    Meta(String),
    Header(String),
    JsonLd(String),
}

impl FieldRef {
    /// HTTP headers survive a failed fetch; everything else needs the body.
    pub fn needs_content(&self) -> bool {
        !matches!(self, Self::Header(_))
    }
}

impl FromStr for FieldRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("title") {
            return Ok(Self::Meta("title".to_string()));
        }
        let (scope, name) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid field reference '{}': expected <scope>:<name>", s))?;
        if name.is_empty() {
            return Err(format!("Invalid field reference '{}': empty name", s));
        }
        match scope.to_ascii_lowercase().as_str() {
            "meta" => Ok(Self::Meta(name.to_ascii_lowercase())),
            "header" => Ok(Self::Header(name.to_ascii_lowercase())),
            "jsonld" => Ok(Self::JsonLd(name.to_string())),
            other => Err(format!(
                "Unknown field scope '{}'. Expected one of: meta, header, jsonld.",
                other
            )),
        }
    }
}

impl TryFrom<String> for FieldRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldRef> for String {
    fn from(value: FieldRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Meta(name) if name == "title" => write!(f, "title"),
            Self::Meta(name) => write!(f, "meta:{}", name),
            Self::Header(name) => write!(f, "header:{}", name),
            Self::JsonLd(name) => write!(f, "jsonld:{}", name),
        }
    }
}

/// Lower-is-better page metrics used by threshold rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    LoadTimeMs,
    SizeBytes,
    DaysSinceModified,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoadTimeMs => "load_time_ms",
            Self::SizeBytes => "size_bytes",
            Self::DaysSinceModified => "days_since_modified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    H1,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_field_ref_parsing() -> Result<()> {
        assert_eq!(
            "title".parse::<FieldRef>().map_err(anyhow::Error::msg)?,
            FieldRef::Meta("title".into())
        );
        assert_eq!(
            "meta:OG:Image".parse::<FieldRef>().map_err(anyhow::Error::msg)?,
            FieldRef::Meta("og:image".into())
        );
        assert_eq!(
            "header:Last-Modified"
                .parse::<FieldRef>()
                .map_err(anyhow::Error::msg)?,
            FieldRef::Header("last-modified".into())
        );
        // JSON-LD properties are case-sensitive.
        assert_eq!(
            "jsonld:dateModified"
                .parse::<FieldRef>()
                .map_err(anyhow::Error::msg)?,
            FieldRef::JsonLd("dateModified".into())
        );
        assert!("cookie:session".parse::<FieldRef>().is_err());
        assert!("meta:".parse::<FieldRef>().is_err());
        assert!("robots".parse::<FieldRef>().is_err());
        Ok(())
    }

    #[test]
    fn test_field_ref_display_is_parseable() -> Result<()> {
        for raw in ["title", "meta:robots", "header:x-robots-tag", "jsonld:sku"] {
            let field: FieldRef = raw.parse().map_err(anyhow::Error::msg)?;
            assert_eq!(field.to_string(), raw);
        }
        Ok(())
    }

    #[test]
    fn test_only_headers_survive_failed_fetch() {
        assert!(!FieldRef::Header("server".into()).needs_content());
        assert!(FieldRef::Meta("title".into()).needs_content());
        assert!(FieldRef::JsonLd("sku".into()).needs_content());
    }
}
