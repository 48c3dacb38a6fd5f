// gpteo-core/src/application/service.rs

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::application::{JobQueue, QueueStatus, ScanOrchestrator};
use crate::domain::check::ChecksRegistry;
use crate::domain::error::DomainError;
use crate::domain::evaluation::ChecksEngine;
use crate::domain::ports::RegistrySource;
use crate::domain::scan::{Scan, ScanRequest};
use crate::error::GpteoError;
use crate::infrastructure::config::{Settings, registry_source};
use crate::infrastructure::fetcher::HttpPageFetcher;
use crate::infrastructure::jinja::JinjaFixRenderer;
use crate::infrastructure::store::open_store;
use crate::ports::{ScanOverview, ScanRecord, ScanStats, ScanStore};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// One page of an owner's scans.
#[derive(Debug, Clone, Serialize)]
pub struct ScanPage {
    pub scans: Vec<ScanOverview>,
    pub total: usize,
    pub has_more: bool,
}

/// Caller-facing operations. Every call is scoped to an owner: a scan owned
/// by someone else is reported as not found.
#[derive(Clone)]
pub struct ScanService {
    store: Arc<dyn ScanStore>,
    queue: JobQueue,
    registry: Arc<dyn RegistrySource>,
}

impl ScanService {
    pub fn new(
        store: Arc<dyn ScanStore>,
        queue: JobQueue,
        registry: Arc<dyn RegistrySource>,
    ) -> Self {
        Self {
            store,
            queue,
            registry,
        }
    }

    /// Wires the configured adapters and starts the queue.
    /// Must be called within a Tokio runtime.
    pub fn from_settings(settings: &Settings) -> Result<Self, GpteoError> {
        let store = open_store(&settings.store)?;
        let fetcher = Arc::new(HttpPageFetcher::new(&settings.fetch)?);
        let registry = registry_source(settings.registry.checks_path.as_deref())?;
        let engine = ChecksEngine::with_renderer(Arc::new(JinjaFixRenderer::new()));

        let orchestrator = ScanOrchestrator::new(
            store.clone(),
            fetcher,
            registry.clone(),
            engine,
            settings.fetch.clone(),
        );
        let queue = JobQueue::start(store.clone(), orchestrator, &settings.queue);
        Ok(Self::new(store, queue, registry))
    }

    pub async fn submit(&self, owner_id: &str, request: ScanRequest) -> Result<Uuid, GpteoError> {
        self.queue.submit(owner_id, request).await
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, owner_id: &str, scan_id: Uuid) -> Result<(), GpteoError> {
        let scan = self.owned_scan(owner_id, scan_id).await?;
        if scan.status.is_terminal() {
            return Err(DomainError::AlreadyTerminal(scan_id.to_string()).into());
        }
        if self.queue.cancel(scan_id).await? {
            return Ok(());
        }

        // Not tracked by this queue: either it just finished, or it was left
        // behind by a previous process.
        let mut scan = self.owned_scan(owner_id, scan_id).await?;
        if scan.status.is_terminal() {
            return Err(DomainError::AlreadyTerminal(scan_id.to_string()).into());
        }
        scan.cancel(Utc::now())?;
        self.store.update_scan(&scan).await?;
        info!("Cancelled orphaned scan {}", scan_id);
        Ok(())
    }

    pub async fn read(&self, owner_id: &str, scan_id: Uuid) -> Result<ScanRecord, GpteoError> {
        match self.store.get_results(scan_id).await? {
            Some(record) if record.scan.owner_id == owner_id => Ok(record),
            _ => Err(DomainError::ScanNotFound(scan_id.to_string()).into()),
        }
    }

    /// Newest first. `limit` is clamped to `1..=MAX_PAGE_SIZE`.
    pub async fn list(
        &self,
        owner_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<ScanPage, GpteoError> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let listing = self.store.list_scans(owner_id, limit, offset).await?;
        let has_more = offset + listing.scans.len() < listing.total;
        Ok(ScanPage {
            scans: listing.scans,
            total: listing.total,
            has_more,
        })
    }

    pub async fn stats(&self, owner_id: &str) -> Result<ScanStats, GpteoError> {
        self.store.stats(owner_id).await
    }

    /// Removes a finished scan with its pages, findings and summary.
    #[instrument(skip(self))]
    pub async fn delete(&self, owner_id: &str, scan_id: Uuid) -> Result<(), GpteoError> {
        let scan = self.owned_scan(owner_id, scan_id).await?;
        if !scan.status.is_terminal() {
            return Err(DomainError::ScanActive(scan_id.to_string()).into());
        }
        self.store.delete_scan(scan_id).await?;
        info!("Deleted scan {}", scan_id);
        Ok(())
    }

    pub async fn delete_check(&self, key: &str) -> Result<bool, GpteoError> {
        self.store.delete_check(key).await
    }

    /// The registry the next scan would run with.
    pub fn checks(&self) -> Result<ChecksRegistry, GpteoError> {
        Ok(self.registry.snapshot()?)
    }

    pub async fn queue_status(&self) -> QueueStatus {
        self.queue.status().await
    }

    /// Polls until the scan reaches a terminal state.
    pub async fn wait_for_terminal(
        &self,
        owner_id: &str,
        scan_id: Uuid,
        poll: Duration,
    ) -> Result<Scan, GpteoError> {
        loop {
            let scan = self.owned_scan(owner_id, scan_id).await?;
            if scan.status.is_terminal() {
                return Ok(scan);
            }
            tokio::time::sleep(poll).await;
        }
    }

    pub fn shutdown(&self) {
        self.queue.shutdown();
    }

    async fn owned_scan(&self, owner_id: &str, scan_id: Uuid) -> Result<Scan, GpteoError> {
        match self.store.get_scan(scan_id).await? {
            Some(scan) if scan.owner_id == owner_id => Ok(scan),
            _ => Err(DomainError::ScanNotFound(scan_id.to_string()).into()),
        }
    }
}
