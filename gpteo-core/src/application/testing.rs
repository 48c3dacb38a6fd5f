// gpteo-core/src/application/testing.rs

//! Doubles shared by the application tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::application::ScanOrchestrator;
use crate::domain::check::ChecksRegistry;
use crate::domain::evaluation::ChecksEngine;
use crate::domain::scan::{Page, PageReport, Scan, ScanRequest, ScanSummary};
use crate::error::GpteoError;
use crate::infrastructure::config::FetchSettings;
use crate::infrastructure::fetcher::{HtmlExtractor, classify};
use crate::infrastructure::store::MemoryScanStore;
use crate::ports::{
    FetchError, FetchErrorKind, FetchOptions, PageFetcher, ScanListing, ScanRecord, ScanStats,
    ScanStore,
};

const HOME: &str = r#"<html><head>
<title>Example Shop</title>
<meta name="description" content="Handmade ceramics from a small studio, shipped worldwide with care and tracked delivery.">
<meta property="og:site_name" content="Example Shop">
<link rel="canonical" href="https://shop.example.com/">
<script type="application/ld+json">{"@type":"Organization","name":"Example Shop"}</script>
</head><body><h1>Example Shop</h1><a href="/products/mug">Mug</a></body></html>"#;

const PRODUCT: &str = r#"<html><head>
<title>Stoneware Mug | Example Shop</title>
<script type="application/ld+json">{"@type":"Product","name":"Stoneware Mug","brand":"Example Shop","offers":{"price":"24.00","priceCurrency":"EUR"}}</script>
</head><body><h1>Stoneware Mug</h1></body></html>"#;

const RETURNS: &str = r#"<html><head><title>Returns</title></head>
<body><h1>Returns policy</h1><p>30 days.</p></body></html>"#;

/// Serves canned HTML by path. `/down` refuses the connection and unknown
/// paths answer 404.
pub struct StubFetcher {
    pages: HashMap<String, &'static str>,
    extractor: HtmlExtractor,
    calls: AtomicUsize,
    cancel_on_fetch: Option<CancellationToken>,
    gate: Option<Arc<Semaphore>>,
}

impl StubFetcher {
    pub fn shop() -> Self {
        let pages = HashMap::from([
            ("/".to_string(), HOME),
            ("/products/mug".to_string(), PRODUCT),
            ("/pages/returns".to_string(), RETURNS),
        ]);
        Self {
            pages,
            extractor: HtmlExtractor::new().unwrap(),
            calls: AtomicUsize::new(0),
            cancel_on_fetch: None,
            gate: None,
        }
    }

    /// Cancels `token` while the first fetch is in flight.
    pub fn cancel_on_fetch(mut self, token: CancellationToken) -> Self {
        self.cancel_on_fetch = Some(token);
        self
    }

    /// Every fetch waits for a permit on `gate`.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<Page, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(token) = &self.cancel_on_fetch {
            token.cancel();
        }

        let mut page = Page::new(url.as_str(), Utc::now());
        page.page_type = classify(url, &[]);
        if url.path() == "/down" {
            return Err(FetchError::new(
                FetchErrorKind::Connect,
                "connection refused",
                page,
            ));
        }
        let Some(html) = self.pages.get(url.path()) else {
            page.status_code = Some(404);
            return Err(FetchError::new(FetchErrorKind::Status(404), "Not Found", page));
        };

        page.status_code = Some(200);
        page.final_url = Some(url.to_string());
        page.size_bytes = Some(html.len() as u64);
        page.load_time_ms = Some(12);
        self.extractor.extract(html, url, &mut page);
        page.page_type = classify(url, &page.json_ld);
        if url.path() == "/" {
            for path in &options.probe_paths {
                page.resources.insert(path.clone(), 200);
            }
        }
        Ok(page)
    }

    fn user_agent(&self) -> &str {
        "stub-agent"
    }
}

/// Memory store with injected write failures.
pub struct FailingStore {
    inner: MemoryScanStore,
    failing_updates: AtomicUsize,
    fail_complete: bool,
}

impl FailingStore {
    /// Every `complete_scan` fails.
    pub fn new() -> Self {
        Self {
            inner: MemoryScanStore::new(),
            failing_updates: AtomicUsize::new(0),
            fail_complete: true,
        }
    }

    /// Only the first `update_scan` fails.
    pub fn first_update_fails() -> Self {
        Self {
            inner: MemoryScanStore::new(),
            failing_updates: AtomicUsize::new(1),
            fail_complete: false,
        }
    }
}

#[async_trait]
impl ScanStore for FailingStore {
    async fn create_scan(&self, scan: &Scan) -> Result<(), GpteoError> {
        self.inner.create_scan(scan).await
    }

    async fn get_scan(&self, id: Uuid) -> Result<Option<Scan>, GpteoError> {
        self.inner.get_scan(id).await
    }

    async fn update_scan(&self, scan: &Scan) -> Result<(), GpteoError> {
        let failing = self
            .failing_updates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(GpteoError::InternalError("database is locked".to_string()));
        }
        self.inner.update_scan(scan).await
    }

    async fn register_checks(&self, registry: &ChecksRegistry) -> Result<(), GpteoError> {
        self.inner.register_checks(registry).await
    }

    async fn complete_scan(
        &self,
        scan: &Scan,
        pages: &[PageReport],
        summary: &ScanSummary,
    ) -> Result<(), GpteoError> {
        if self.fail_complete {
            return Err(GpteoError::InternalError("disk full".to_string()));
        }
        self.inner.complete_scan(scan, pages, summary).await
    }

    async fn get_results(&self, id: Uuid) -> Result<Option<ScanRecord>, GpteoError> {
        self.inner.get_results(id).await
    }

    async fn list_scans(
        &self,
        owner_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<ScanListing, GpteoError> {
        self.inner.list_scans(owner_id, limit, offset).await
    }

    async fn delete_scan(&self, id: Uuid) -> Result<bool, GpteoError> {
        self.inner.delete_scan(id).await
    }

    async fn delete_check(&self, key: &str) -> Result<bool, GpteoError> {
        self.inner.delete_check(key).await
    }

    async fn stats(&self, owner_id: &str) -> Result<ScanStats, GpteoError> {
        self.inner.stats(owner_id).await
    }
}

pub fn orchestrator(store: Arc<dyn ScanStore>, fetcher: Arc<dyn PageFetcher>) -> ScanOrchestrator {
    ScanOrchestrator::new(
        store,
        fetcher,
        Arc::new(ChecksRegistry::builtin().unwrap()),
        ChecksEngine::new(),
        FetchSettings::default(),
    )
}

/// Stores a queued scan for `shop.example.com` owned by `tester`.
pub async fn submit(store: &dyn ScanStore, urls: &[&str], mode: &str) -> anyhow::Result<Uuid> {
    let request = ScanRequest::new(
        "shop.example.com",
        urls.iter().map(|u| u.to_string()).collect(),
        Some(mode),
    );
    let scan = Scan::queued("tester", request.into_validated()?, Utc::now());
    store.create_scan(&scan).await?;
    Ok(scan.id)
}

/// Polls the store until the scan reaches a terminal state.
pub async fn wait_terminal(store: &dyn ScanStore, scan_id: Uuid) -> Scan {
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        loop {
            let scan = store.get_scan(scan_id).await.unwrap().unwrap();
            if scan.status.is_terminal() {
                return scan;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap()
}
