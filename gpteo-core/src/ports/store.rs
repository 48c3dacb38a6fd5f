// gpteo-core/src/ports/store.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::check::ChecksRegistry;
use crate::domain::scan::{PageReport, Scan, ScanSummary};
use crate::error::GpteoError;

/// A scan with everything it owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanRecord {
    pub scan: Scan,
    pub pages: Vec<PageReport>,
    pub summary: Option<ScanSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanOverview {
    pub scan: Scan,
    pub summary: Option<ScanSummary>,
}

/// One page of an owner's scans, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanListing {
    pub scans: Vec<ScanOverview>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScanStats {
    pub total: usize,
    pub completed: usize,
    pub running: usize,
    pub queued: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Mean over scans that have a score in the category.
    pub avg_seo_score: Option<f64>,
    pub avg_gpteo_score: Option<f64>,
}

/// Durable source of truth for scans, pages, findings, summaries and the
/// check rows findings refer to.
#[async_trait]
pub trait ScanStore: Send + Sync {
    async fn create_scan(&self, scan: &Scan) -> Result<(), GpteoError>;

    async fn get_scan(&self, id: Uuid) -> Result<Option<Scan>, GpteoError>;

    /// Overwrites the scan row (status, timestamps, scores, error).
    async fn update_scan(&self, scan: &Scan) -> Result<(), GpteoError>;

    /// Upserts the check rows of a registry snapshot.
    async fn register_checks(&self, registry: &ChecksRegistry) -> Result<(), GpteoError>;

    /// Persists the completed scan, its pages, findings and summary as one
    /// unit: either everything is written or nothing is.
    async fn complete_scan(
        &self,
        scan: &Scan,
        pages: &[PageReport],
        summary: &ScanSummary,
    ) -> Result<(), GpteoError>;

    async fn get_results(&self, id: Uuid) -> Result<Option<ScanRecord>, GpteoError>;

    async fn list_scans(
        &self,
        owner_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<ScanListing, GpteoError>;

    /// Removes a scan and everything it owns. Returns false if absent.
    async fn delete_scan(&self, id: Uuid) -> Result<bool, GpteoError>;

    /// Removes a check row. Refused with `CheckInUse` while findings
    /// reference it.
    async fn delete_check(&self, key: &str) -> Result<bool, GpteoError>;

    async fn stats(&self, owner_id: &str) -> Result<ScanStats, GpteoError>;
}
