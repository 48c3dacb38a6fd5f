// gpteo-core/src/application/orchestrator.rs

use chrono::Utc;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::domain::check::ChecksRegistry;
use crate::domain::error::DomainError;
use crate::domain::evaluation::ChecksEngine;
use crate::domain::ports::RegistrySource;
use crate::domain::scan::{Page, PageReport, Scan, ScanStatus};
use crate::domain::scoring::aggregate;
use crate::error::GpteoError;
use crate::infrastructure::config::FetchSettings;
use crate::ports::{FetchOptions, PageFetcher, ScanStore};

/// Owns the lifecycle of one scan: fetch, evaluate, aggregate, persist.
///
/// It is the only writer of a running scan's record.
pub struct ScanOrchestrator {
    store: Arc<dyn ScanStore>,
    fetcher: Arc<dyn PageFetcher>,
    registry: Arc<dyn RegistrySource>,
    engine: ChecksEngine,
    fetch: FetchSettings,
}

impl ScanOrchestrator {
    pub fn new(
        store: Arc<dyn ScanStore>,
        fetcher: Arc<dyn PageFetcher>,
        registry: Arc<dyn RegistrySource>,
        engine: ChecksEngine,
        fetch: FetchSettings,
    ) -> Self {
        Self {
            store,
            fetcher,
            registry,
            engine,
            fetch,
        }
    }

    /// Drives a queued scan to a terminal state and returns that state.
    ///
    /// A scan that is already terminal is left untouched. `cancel` is
    /// honoured between pages; in-flight fetches finish first.
    #[instrument(skip(self, cancel))]
    pub async fn run(
        &self,
        scan_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<ScanStatus, GpteoError> {
        let mut scan = self
            .store
            .get_scan(scan_id)
            .await?
            .ok_or_else(|| DomainError::ScanNotFound(scan_id.to_string()))?;

        if scan.status.is_terminal() {
            info!("Scan {} is already {}, nothing to do", scan_id, scan.status);
            return Ok(scan.status);
        }

        if cancel.is_cancelled() {
            scan.cancel(Utc::now())?;
            self.store.update_scan(&scan).await?;
            info!("Scan {} cancelled before start", scan_id);
            return Ok(ScanStatus::Cancelled);
        }

        let registry = self.registry.snapshot();
        scan.start(
            Utc::now(),
            registry.as_ref().ok().map(|r| r.version()),
            self.fetcher.user_agent(),
        )?;
        self.store.update_scan(&scan).await?;
        info!(
            "Scan {} running: {} page(s), checks {}",
            scan_id,
            scan.effective_urls().len(),
            scan.checks_version.as_deref().unwrap_or("unavailable")
        );

        let registry = match registry {
            Ok(registry) => registry,
            Err(e) => return self.fail(scan, e.to_string()).await,
        };
        if let Err(e) = self.store.register_checks(&registry).await {
            return self.fail(scan, format!("cannot record checks: {}", e)).await;
        }

        let reports = self.process_pages(&scan, &registry, &cancel).await;

        if cancel.is_cancelled() {
            scan.cancel(Utc::now())?;
            self.store.update_scan(&scan).await?;
            info!("Scan {} cancelled, {} page result(s) discarded", scan_id, reports.len());
            return Ok(ScanStatus::Cancelled);
        }

        let summary = aggregate(scan.id, &reports);
        let mut completed = scan.clone();
        completed.complete(&summary, Utc::now())?;

        match self.store.complete_scan(&completed, &reports, &summary).await {
            Ok(()) => {
                info!(
                    "Scan {} completed: seo={:?} gpteo={:?} findings={}",
                    scan_id, completed.seo_score, completed.gpteo_score, summary.total_findings
                );
                Ok(ScanStatus::Completed)
            }
            Err(e) => self.fail(scan, format!("cannot persist results: {}", e)).await,
        }
    }

    /// Fetches and evaluates the effective pages with bounded parallelism.
    /// Results come back in seed order.
    async fn process_pages(
        &self,
        scan: &Scan,
        registry: &ChecksRegistry,
        cancel: &CancellationToken,
    ) -> Vec<PageReport> {
        let options = FetchOptions::new(self.fetch.timeout_for(scan.mode))
            .with_probes(registry.probe_paths());
        let options = &options;

        let pages: Vec<_> = scan
            .effective_urls()
            .iter()
            .enumerate()
            .map(|(index, raw)| async move {
                // Page boundary: nothing new starts once cancelled.
                if cancel.is_cancelled() {
                    return None;
                }
                let page = self.fetch_page(raw, options).await;
                let findings = self.engine.evaluate(&page, registry, &scan.domain);
                Some((index, PageReport { page, findings }))
            })
            .collect();
        let mut reports: Vec<(usize, PageReport)> = futures::stream::iter(pages)
            .buffer_unordered(self.fetch.page_concurrency.max(1))
            .filter_map(futures::future::ready)
            .collect()
            .await;

        reports.sort_by_key(|(index, _)| *index);
        reports.into_iter().map(|(_, report)| report).collect()
    }

    async fn fetch_page(&self, raw: &str, options: &FetchOptions) -> Page {
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                let mut page = Page::new(raw, Utc::now());
                page.fetch_error = Some(format!("invalid URL: {}", e));
                return page;
            }
        };
        let started = Instant::now();
        let page = match self.fetcher.fetch(&url, options).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Fetch of {} failed: {}", url, e);
                e.into_page()
            }
        };
        debug!("Processed {} as {} in {:?}", url, page.page_type, started.elapsed());
        page
    }

    async fn fail(&self, mut scan: Scan, message: String) -> Result<ScanStatus, GpteoError> {
        error!("Scan {} failed: {}", scan.id, message);
        scan.fail(message, Utc::now())?;
        self.store.update_scan(&scan).await?;
        Ok(ScanStatus::Failed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::testing::{FailingStore, StubFetcher, orchestrator, submit};
    use crate::domain::scan::{FindingStatus, PageType};
    use crate::infrastructure::store::MemoryScanStore;
    use anyhow::Result;

    #[tokio::test]
    async fn test_scan_completes_with_summary() -> Result<()> {
        let store = Arc::new(MemoryScanStore::new());
        let fetcher = Arc::new(StubFetcher::shop());
        let orch = orchestrator(store.clone(), fetcher.clone());
        let id = submit(
            store.as_ref(),
            &["https://shop.example.com/", "https://shop.example.com/products/mug"],
            "quick",
        )
        .await?;

        let status = orch.run(id, CancellationToken::new()).await?;
        assert_eq!(status, ScanStatus::Completed);

        let record = store.get_results(id).await?.unwrap();
        assert_eq!(record.scan.status, ScanStatus::Completed);
        assert_eq!(record.scan.checks_version.as_deref(), Some("1.0.0"));
        assert_eq!(record.scan.user_agent.as_deref(), Some("stub-agent"));
        assert!(record.scan.seo_score.is_some());
        assert!(record.scan.gpteo_score.is_some());
        assert!(record.scan.completed_at.is_some());

        // Pages keep seed order whatever the completion order.
        let urls: Vec<&str> = record.pages.iter().map(|p| p.page.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://shop.example.com/", "https://shop.example.com/products/mug"]
        );

        let registry = ChecksRegistry::builtin()?;
        for report in &record.pages {
            let applicable = registry
                .active()
                .filter(|c| c.applies_to(report.page.page_type))
                .count();
            assert_eq!(report.findings.len(), applicable);
        }

        let summary = record.summary.unwrap();
        assert_eq!(summary.total_pages, 2);
        assert_eq!(
            summary.pass_count + summary.fail_count + summary.warning_count,
            summary.total_findings
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_failure_is_absorbed() -> Result<()> {
        let store = Arc::new(MemoryScanStore::new());
        let orch = orchestrator(store.clone(), Arc::new(StubFetcher::shop()));
        let id = submit(
            store.as_ref(),
            &["https://shop.example.com/", "https://shop.example.com/down"],
            "quick",
        )
        .await?;

        assert_eq!(orch.run(id, CancellationToken::new()).await?, ScanStatus::Completed);

        let record = store.get_results(id).await?.unwrap();
        let down = &record.pages[1];
        assert!(down.page.fetch_error.is_some());
        assert!(!down.findings.is_empty());
        assert!(down.findings.iter().any(|f| f.status == FindingStatus::Fail
            && f.message.starts_with("Page content unavailable")));
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_product_page_fails_product_checks() -> Result<()> {
        let store = Arc::new(MemoryScanStore::new());
        let orch = orchestrator(store.clone(), Arc::new(StubFetcher::shop()));
        let id = submit(
            store.as_ref(),
            &["https://shop.example.com/products/missing"],
            "quick",
        )
        .await?;

        assert_eq!(orch.run(id, CancellationToken::new()).await?, ScanStatus::Completed);

        let record = store.get_results(id).await?.unwrap();
        let missing = &record.pages[0];
        assert_eq!(missing.page.page_type, PageType::Product);
        let product = missing
            .findings
            .iter()
            .find(|f| f.check_key == "gpteo.schema.product.present")
            .unwrap();
        assert_eq!(product.status, FindingStatus::Fail);
        assert!(product.message.starts_with("Page content unavailable"));
        Ok(())
    }

    #[tokio::test]
    async fn test_registry_failure_fails_scan() -> Result<()> {
        let store = Arc::new(MemoryScanStore::new());
        let orch = ScanOrchestrator::new(
            store.clone(),
            Arc::new(StubFetcher::shop()),
            Arc::new(crate::infrastructure::config::YamlRegistrySource::new(
                "/no/such/catalogue.yaml",
            )),
            ChecksEngine::new(),
            FetchSettings::default(),
        );
        let id = submit(store.as_ref(), &["https://shop.example.com/"], "quick").await?;

        assert_eq!(orch.run(id, CancellationToken::new()).await?, ScanStatus::Failed);

        let scan = store.get_scan(id).await?.unwrap();
        assert_eq!(scan.status, ScanStatus::Failed);
        assert!(scan.error_message.unwrap().contains("registry"));
        assert!(scan.started_at.is_some());
        assert!(scan.checks_version.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_persistence_failure_fails_scan() -> Result<()> {
        let store = Arc::new(FailingStore::new());
        let orch = orchestrator(store.clone(), Arc::new(StubFetcher::shop()));
        let id = submit(store.as_ref(), &["https://shop.example.com/"], "quick").await?;

        assert_eq!(orch.run(id, CancellationToken::new()).await?, ScanStatus::Failed);

        let scan = store.get_scan(id).await?.unwrap();
        assert!(scan.error_message.unwrap().starts_with("cannot persist results"));
        assert!(store.get_results(id).await?.unwrap().summary.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_before_start() -> Result<()> {
        let store = Arc::new(MemoryScanStore::new());
        let fetcher = Arc::new(StubFetcher::shop());
        let orch = orchestrator(store.clone(), fetcher.clone());
        let id = submit(store.as_ref(), &["https://shop.example.com/"], "quick").await?;

        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(orch.run(id, token).await?, ScanStatus::Cancelled);
        assert_eq!(fetcher.calls(), 0);

        let record = store.get_results(id).await?.unwrap();
        assert_eq!(record.scan.status, ScanStatus::Cancelled);
        assert!(record.scan.started_at.is_none());
        assert!(record.pages.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_stops_at_page_boundary() -> Result<()> {
        let store = Arc::new(MemoryScanStore::new());
        let token = CancellationToken::new();
        let fetcher = Arc::new(StubFetcher::shop().cancel_on_fetch(token.clone()));
        let orch = ScanOrchestrator::new(
            store.clone(),
            fetcher.clone(),
            Arc::new(ChecksRegistry::builtin()?),
            ChecksEngine::new(),
            FetchSettings {
                page_concurrency: 1,
                ..FetchSettings::default()
            },
        );
        let id = submit(
            store.as_ref(),
            &[
                "https://shop.example.com/",
                "https://shop.example.com/products/mug",
                "https://shop.example.com/pages/returns",
            ],
            "quick",
        )
        .await?;

        assert_eq!(orch.run(id, token).await?, ScanStatus::Cancelled);
        // The in-flight fetch finished; nothing after it started.
        assert_eq!(fetcher.calls(), 1);

        let record = store.get_results(id).await?.unwrap();
        assert_eq!(record.scan.status, ScanStatus::Cancelled);
        assert!(record.pages.is_empty());
        assert!(record.summary.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_with_parallel_pages_discards_everything() -> Result<()> {
        let store = Arc::new(MemoryScanStore::new());
        let token = CancellationToken::new();
        let fetcher = Arc::new(StubFetcher::shop().cancel_on_fetch(token.clone()));
        let orch = ScanOrchestrator::new(
            store.clone(),
            fetcher.clone(),
            Arc::new(ChecksRegistry::builtin()?),
            ChecksEngine::new(),
            FetchSettings {
                page_concurrency: 4,
                ..FetchSettings::default()
            },
        );
        let seeds: Vec<String> = (0..8)
            .map(|i| format!("https://shop.example.com/products/item-{}", i))
            .collect();
        let seeds: Vec<&str> = seeds.iter().map(String::as_str).collect();
        let id = submit(store.as_ref(), &seeds, "standard").await?;

        assert_eq!(orch.run(id, token).await?, ScanStatus::Cancelled);
        // At most one window of fetches was in flight.
        assert!(fetcher.calls() >= 1);
        assert!(fetcher.calls() <= 4);

        let record = store.get_results(id).await?.unwrap();
        assert_eq!(record.scan.status, ScanStatus::Cancelled);
        assert!(record.scan.seo_score.is_none());
        assert!(record.pages.is_empty());
        assert!(record.summary.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_terminal_scan_is_a_no_op() -> Result<()> {
        let store = Arc::new(MemoryScanStore::new());
        let fetcher = Arc::new(StubFetcher::shop());
        let orch = orchestrator(store.clone(), fetcher.clone());
        let id = submit(store.as_ref(), &["https://shop.example.com/"], "quick").await?;

        let mut scan = store.get_scan(id).await?.unwrap();
        scan.cancel(Utc::now())?;
        store.update_scan(&scan).await?;

        assert_eq!(orch.run(id, CancellationToken::new()).await?, ScanStatus::Cancelled);
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(store.get_scan(id).await?.unwrap(), scan);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_scan_is_an_error() {
        let store = Arc::new(MemoryScanStore::new());
        let orch = orchestrator(store, Arc::new(StubFetcher::shop()));
        let err = orch.run(Uuid::new_v4(), CancellationToken::new()).await;
        assert!(matches!(
            err,
            Err(GpteoError::Domain(DomainError::ScanNotFound(_)))
        ));
    }
}
