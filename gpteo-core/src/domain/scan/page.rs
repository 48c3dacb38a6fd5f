// gpteo-core/src/domain/scan/page.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::finding::Finding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Homepage,
    Product,
    Category,
    Policy,
    #[default]
    Other,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Homepage => "homepage",
            Self::Product => "product",
            Self::Category => "category",
            Self::Policy => "policy",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "homepage" => Ok(Self::Homepage),
            "product" => Ok(Self::Product),
            "category" => Ok(Self::Category),
            "policy" => Ok(Self::Policy),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown page type: {}", s)),
        }
    }
}

/// Everything the fetcher extracted from one URL of a scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub url: String,
    pub final_url: Option<String>,
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub status_code: Option<u16>,
    #[serde(default)]
    pub redirect_chain: Vec<String>,
    /// Response headers, names lowercased.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub json_ld: Vec<serde_json::Value>,
    /// JSON-LD blocks dropped because they did not parse.
    #[serde(default)]
    pub invalid_json_ld: usize,
    /// `title`, `canonical`, `license`, and every `<meta name|property>`.
    #[serde(default)]
    pub meta_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub h1: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    /// Status of each probed site-level path (0 = transport error).
    #[serde(default)]
    pub resources: BTreeMap<String, u16>,
    pub load_time_ms: Option<u64>,
    pub size_bytes: Option<u64>,
    pub fetched_at: DateTime<Utc>,
    pub fetch_error: Option<String>,
}

impl Page {
    pub fn new(url: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            final_url: None,
            page_type: PageType::Other,
            status_code: None,
            redirect_chain: Vec::new(),
            headers: BTreeMap::new(),
            json_ld: Vec::new(),
            invalid_json_ld: 0,
            meta_tags: BTreeMap::new(),
            h1: Vec::new(),
            links: Vec::new(),
            resources: BTreeMap::new(),
            load_time_ms: None,
            size_bytes: None,
            fetched_at,
            fetch_error: None,
        }
    }

    /// True when the body was retrieved and extracted.
    pub fn has_content(&self) -> bool {
        self.fetch_error.is_none()
    }

    pub fn meta(&self, name: &str) -> Option<&str> {
        self.meta_tags
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// A page together with the findings evaluated against it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageReport {
    pub page: Page,
    pub findings: Vec<Finding>,
}
