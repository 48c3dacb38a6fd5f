// gpteo-core/src/infrastructure/store/memory.rs

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::check::{Check, ChecksRegistry};
use crate::domain::error::DomainError;
use crate::domain::scan::{PageReport, Scan, ScanStatus, ScanSummary};
use crate::error::GpteoError;
use crate::infrastructure::error::DatabaseError;
use crate::ports::{ScanListing, ScanOverview, ScanRecord, ScanStats, ScanStore};

#[derive(Default)]
struct State {
    scans: HashMap<Uuid, Scan>,
    pages: HashMap<Uuid, Vec<PageReport>>,
    summaries: HashMap<Uuid, ScanSummary>,
    checks: BTreeMap<String, Check>,
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryScanStore {
    state: Mutex<State>,
}

impl MemoryScanStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, GpteoError> {
        self.state
            .lock()
            .map_err(|_| DatabaseError::LockPoisoned.into())
    }
}

#[async_trait]
impl ScanStore for MemoryScanStore {
    async fn create_scan(&self, scan: &Scan) -> Result<(), GpteoError> {
        self.lock()?.scans.insert(scan.id, scan.clone());
        Ok(())
    }

    async fn get_scan(&self, id: Uuid) -> Result<Option<Scan>, GpteoError> {
        Ok(self.lock()?.scans.get(&id).cloned())
    }

    async fn update_scan(&self, scan: &Scan) -> Result<(), GpteoError> {
        let mut state = self.lock()?;
        match state.scans.get_mut(&scan.id) {
            Some(row) => {
                *row = scan.clone();
                Ok(())
            }
            None => Err(DomainError::ScanNotFound(scan.id.to_string()).into()),
        }
    }

    async fn register_checks(&self, registry: &ChecksRegistry) -> Result<(), GpteoError> {
        let mut state = self.lock()?;
        for check in registry.checks() {
            state.checks.insert(check.key.clone(), check.clone());
        }
        Ok(())
    }

    #[instrument(skip(self, scan, pages, summary), fields(scan_id = %scan.id))]
    async fn complete_scan(
        &self,
        scan: &Scan,
        pages: &[PageReport],
        summary: &ScanSummary,
    ) -> Result<(), GpteoError> {
        let mut state = self.lock()?;
        if !state.scans.contains_key(&scan.id) {
            return Err(DomainError::ScanNotFound(scan.id.to_string()).into());
        }
        // Same guarantee the relational store gets from its check rows.
        if let Some(unknown) = pages
            .iter()
            .flat_map(|p| p.findings.iter())
            .find(|f| !state.checks.contains_key(&f.check_key))
        {
            return Err(GpteoError::InternalError(format!(
                "finding references unregistered check '{}'",
                unknown.check_key
            )));
        }

        state.scans.insert(scan.id, scan.clone());
        state.pages.insert(scan.id, pages.to_vec());
        state.summaries.insert(scan.id, summary.clone());
        Ok(())
    }

    async fn get_results(&self, id: Uuid) -> Result<Option<ScanRecord>, GpteoError> {
        let state = self.lock()?;
        Ok(state.scans.get(&id).map(|scan| ScanRecord {
            scan: scan.clone(),
            pages: state.pages.get(&id).cloned().unwrap_or_default(),
            summary: state.summaries.get(&id).cloned(),
        }))
    }

    async fn list_scans(
        &self,
        owner_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<ScanListing, GpteoError> {
        let state = self.lock()?;
        let mut owned: Vec<&Scan> = state
            .scans
            .values()
            .filter(|s| s.owner_id == owner_id)
            .collect();
        owned.sort_by(|a, b| b.queued_at.cmp(&a.queued_at).then(b.id.cmp(&a.id)));

        Ok(ScanListing {
            total: owned.len(),
            scans: owned
                .into_iter()
                .skip(offset)
                .take(limit)
                .map(|scan| ScanOverview {
                    scan: scan.clone(),
                    summary: state.summaries.get(&scan.id).cloned(),
                })
                .collect(),
        })
    }

    async fn delete_scan(&self, id: Uuid) -> Result<bool, GpteoError> {
        let mut state = self.lock()?;
        state.pages.remove(&id);
        state.summaries.remove(&id);
        Ok(state.scans.remove(&id).is_some())
    }

    async fn delete_check(&self, key: &str) -> Result<bool, GpteoError> {
        let mut state = self.lock()?;
        let in_use = state
            .pages
            .values()
            .flatten()
            .flat_map(|p| p.findings.iter())
            .any(|f| f.check_key == key);
        if in_use {
            return Err(DomainError::CheckInUse(key.to_string()).into());
        }
        Ok(state.checks.remove(key).is_some())
    }

    async fn stats(&self, owner_id: &str) -> Result<ScanStats, GpteoError> {
        let state = self.lock()?;
        let mut stats = ScanStats::default();
        let mut seo = Vec::new();
        let mut gpteo = Vec::new();

        for scan in state.scans.values().filter(|s| s.owner_id == owner_id) {
            stats.total += 1;
            match scan.status {
                ScanStatus::Queued => stats.queued += 1,
                ScanStatus::Running => stats.running += 1,
                ScanStatus::Completed => stats.completed += 1,
                ScanStatus::Failed => stats.failed += 1,
                ScanStatus::Cancelled => stats.cancelled += 1,
            }
            seo.extend(scan.seo_score.map(f64::from));
            gpteo.extend(scan.gpteo_score.map(f64::from));
        }

        stats.avg_seo_score = mean(&seo);
        stats.avg_gpteo_score = mean(&gpteo);
        Ok(stats)
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}
