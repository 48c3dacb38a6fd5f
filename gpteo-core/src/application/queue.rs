// gpteo-core/src/application/queue.rs

use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::application::ScanOrchestrator;
use crate::domain::scan::{Scan, ScanRequest};
use crate::error::GpteoError;
use crate::infrastructure::config::QueueSettings;
use crate::ports::ScanStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub queue_length: usize,
    pub active_count: usize,
}

#[derive(Default)]
struct QueueState {
    backlog: VecDeque<Uuid>,
    active: HashMap<Uuid, CancellationToken>,
}

struct QueueInner {
    store: Arc<dyn ScanStore>,
    orchestrator: ScanOrchestrator,
    state: Mutex<QueueState>,
    wakeup: Notify,
    slots: Arc<Semaphore>,
    shutdown: CancellationToken,
}

/// FIFO backlog of admitted scans feeding a bounded pool of workers.
///
/// Cloning is cheap; clones share the same backlog and workers.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<QueueInner>,
}

impl JobQueue {
    /// Spawns the dispatcher. Must be called within a Tokio runtime.
    pub fn start(
        store: Arc<dyn ScanStore>,
        orchestrator: ScanOrchestrator,
        settings: &QueueSettings,
    ) -> Self {
        let concurrency = settings.concurrency.max(1);
        let inner = Arc::new(QueueInner {
            store,
            orchestrator,
            state: Mutex::new(QueueState::default()),
            wakeup: Notify::new(),
            slots: Arc::new(Semaphore::new(concurrency)),
            shutdown: CancellationToken::new(),
        });
        tokio::spawn(dispatch(inner.clone()));
        info!("Job queue started with {} worker slot(s)", concurrency);
        Self { inner }
    }

    /// Validates and persists the request as a queued scan, then enqueues it.
    /// Nothing is stored when validation fails.
    #[instrument(skip(self, request))]
    pub async fn submit(&self, owner_id: &str, request: ScanRequest) -> Result<Uuid, GpteoError> {
        let validated = request.into_validated()?;
        let scan = Scan::queued(owner_id, validated, Utc::now());
        self.inner.store.create_scan(&scan).await?;

        self.inner.state.lock().await.backlog.push_back(scan.id);
        self.inner.wakeup.notify_one();
        info!("Scan {} queued for {} ({})", scan.id, scan.domain, scan.mode);
        Ok(scan.id)
    }

    /// Returns false when the scan is neither waiting nor executing here.
    ///
    /// A waiting scan is cancelled on the spot. An executing one is
    /// signalled and stops at its next page boundary.
    #[instrument(skip(self))]
    pub async fn cancel(&self, scan_id: Uuid) -> Result<bool, GpteoError> {
        let mut state = self.inner.state.lock().await;

        if let Some(pos) = state.backlog.iter().position(|id| *id == scan_id) {
            state.backlog.remove(pos);
            drop(state);

            let Some(mut scan) = self.inner.store.get_scan(scan_id).await? else {
                return Ok(false);
            };
            if scan.status.is_terminal() {
                return Ok(false);
            }
            scan.cancel(Utc::now())?;
            self.inner.store.update_scan(&scan).await?;
            info!("Scan {} cancelled while queued", scan_id);
            return Ok(true);
        }

        match state.active.get(&scan_id) {
            Some(token) => {
                token.cancel();
                info!("Cancellation requested for running scan {}", scan_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn status(&self) -> QueueStatus {
        let state = self.inner.state.lock().await;
        QueueStatus {
            queue_length: state.backlog.len(),
            active_count: state.active.len(),
        }
    }

    /// Stops dispatching and signals every executing scan. Scans still in
    /// the backlog stay queued in the store.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }
}

async fn dispatch(inner: Arc<QueueInner>) {
    loop {
        let permit = tokio::select! {
            _ = inner.shutdown.cancelled() => break,
            permit = inner.slots.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };
        let (scan_id, token) = tokio::select! {
            _ = inner.shutdown.cancelled() => break,
            job = inner.next_job() => job,
        };

        let worker = inner.clone();
        tokio::spawn(async move {
            worker.execute(scan_id, token).await;
            drop(permit);
        });
    }
    debug!("Job queue dispatcher stopped");
}

impl QueueInner {
    /// Pops the head of the backlog, waiting for a submission if empty.
    async fn next_job(&self) -> (Uuid, CancellationToken) {
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(scan_id) = state.backlog.pop_front() {
                    let token = self.shutdown.child_token();
                    state.active.insert(scan_id, token.clone());
                    return (scan_id, token);
                }
            }
            self.wakeup.notified().await;
        }
    }

    /// Runs one scan. Errors and panics stay inside this job.
    #[instrument(skip(self, token))]
    async fn execute(&self, scan_id: Uuid, token: CancellationToken) {
        let outcome = AssertUnwindSafe(self.orchestrator.run(scan_id, token))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(status)) => debug!("Scan {} left the queue as {}", scan_id, status),
            Ok(Err(e)) => {
                error!("Scan {} aborted: {}", scan_id, e);
                self.mark_failed(scan_id, e.to_string()).await;
            }
            Err(_) => {
                error!("Scan {} worker panicked", scan_id);
                self.mark_failed(scan_id, "internal error: scan worker panicked".to_string())
                    .await;
            }
        }

        self.state.lock().await.active.remove(&scan_id);
    }

    async fn mark_failed(&self, scan_id: Uuid, message: String) {
        let result = async {
            let Some(mut scan) = self.store.get_scan(scan_id).await? else {
                return Ok(());
            };
            if !scan.status.is_terminal() {
                scan.abort(message, Utc::now())?;
                self.store.update_scan(&scan).await?;
            }
            Ok::<(), GpteoError>(())
        }
        .await;

        if let Err(e) = result {
            error!("Cannot record failure of scan {}: {}", scan_id, e);
        }
    }
}
