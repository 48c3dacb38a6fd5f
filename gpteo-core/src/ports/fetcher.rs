// gpteo-core/src/ports/fetcher.rs

use async_trait::async_trait;
use miette::Diagnostic;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::domain::scan::Page;

/// Per-call fetch parameters, derived from the scan mode and the registry
/// snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub timeout: Duration,
    /// Site-level paths to probe when the page classifies as a homepage.
    pub probe_paths: Vec<String>,
}

impl FetchOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            probe_paths: Vec::new(),
        }
    }

    pub fn with_probes(mut self, probe_paths: Vec<String>) -> Self {
        self.probe_paths = probe_paths;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Timeout,
    Connect,
    Status(u16),
    TooManyRedirects,
    InvalidUrl,
    Body,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Connect => write!(f, "connection error"),
            Self::Status(code) => write!(f, "HTTP {}", code),
            Self::TooManyRedirects => write!(f, "too many redirects"),
            Self::InvalidUrl => write!(f, "invalid URL"),
            Self::Body => write!(f, "unreadable body"),
        }
    }
}

/// A failed fetch. Carries whatever was obtained before the failure
/// (status, headers, redirect chain) so HTTP-level checks can still run.
#[derive(Error, Debug, Diagnostic)]
#[error("{kind}: {message}")]
#[diagnostic(code(gpteo::fetch))]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
    pub page: Box<Page>,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>, page: Page) -> Self {
        let message = message.into();
        let mut page = page;
        page.fetch_error = Some(format!("{}: {}", kind, message));
        Self {
            kind,
            message,
            page: Box::new(page),
        }
    }

    /// The partial page, with `fetch_error` set.
    pub fn into_page(self) -> Page {
        *self.page
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// One GET with bounded redirects, followed by extraction and
    /// classification.
    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<Page, FetchError>;

    /// Identifies the client in the scan record.
    fn user_agent(&self) -> &str;
}
