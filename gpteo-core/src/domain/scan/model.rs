// gpteo-core/src/domain/scan/model.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::request::{ScanMode, ValidatedRequest};
use super::status::ScanStatus;
use super::summary::ScanSummary;
use crate::domain::error::DomainError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScoreBreakdown {
    pub seo: BTreeMap<String, f64>,
    pub gpteo: BTreeMap<String, f64>,
}

/// One evaluation run. Status changes go through the transition methods,
/// which refuse anything the state machine does not allow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scan {
    pub id: Uuid,
    pub owner_id: String,
    pub domain: String,
    pub mode: ScanMode,
    pub seed_urls: Vec<String>,
    pub status: ScanStatus,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub seo_score: Option<u8>,
    pub gpteo_score: Option<u8>,
    pub score_breakdown: Option<ScoreBreakdown>,
    pub error_message: Option<String>,
    pub user_agent: Option<String>,
    pub checks_version: Option<String>,
}

impl Scan {
    pub fn queued(owner_id: &str, request: ValidatedRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            domain: request.domain,
            mode: request.mode,
            seed_urls: request.seed_urls.into_iter().map(String::from).collect(),
            status: ScanStatus::Queued,
            queued_at: now,
            started_at: None,
            completed_at: None,
            seo_score: None,
            gpteo_score: None,
            score_breakdown: None,
            error_message: None,
            user_agent: None,
            checks_version: None,
        }
    }

    /// Seed URLs actually processed, in submission order.
    pub fn effective_urls(&self) -> &[String] {
        let cap = self.mode.page_cap().min(self.seed_urls.len());
        &self.seed_urls[..cap]
    }

    /// `checks_version` is `None` when no registry snapshot could be taken;
    /// such a scan is failed right after starting.
    pub fn start(
        &mut self,
        now: DateTime<Utc>,
        checks_version: Option<&str>,
        user_agent: &str,
    ) -> Result<(), DomainError> {
        self.status.ensure_transition(ScanStatus::Running)?;
        self.status = ScanStatus::Running;
        self.started_at = Some(now);
        self.checks_version = checks_version.map(str::to_string);
        self.user_agent = Some(user_agent.to_string());
        Ok(())
    }

    pub fn complete(&mut self, summary: &ScanSummary, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.status.ensure_transition(ScanStatus::Completed)?;
        self.status = ScanStatus::Completed;
        self.completed_at = Some(now);
        self.seo_score = summary.seo_score.map(round_score);
        self.gpteo_score = summary.gpteo_score.map(round_score);
        self.score_breakdown = Some(ScoreBreakdown {
            seo: summary.seo_breakdown.clone(),
            gpteo: summary.gpteo_breakdown.clone(),
        });
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.status.ensure_transition(ScanStatus::Failed)?;
        self.status = ScanStatus::Failed;
        self.completed_at = Some(now);
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Fails the scan from any live state. A queued scan is marked started
    /// first so it still passes through `Running`.
    pub fn abort(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status == ScanStatus::Queued {
            self.status.ensure_transition(ScanStatus::Running)?;
            self.status = ScanStatus::Running;
            self.started_at = Some(now);
        }
        self.fail(message, now)
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.status.ensure_transition(ScanStatus::Cancelled)?;
        self.status = ScanStatus::Cancelled;
        self.completed_at = Some(now);
        Ok(())
    }
}

fn round_score(score: f64) -> u8 {
    score.round().clamp(0.0, 100.0) as u8
}
