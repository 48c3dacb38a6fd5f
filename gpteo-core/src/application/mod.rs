// gpteo-core/src/application/mod.rs

pub mod orchestrator;
pub mod queue;
pub mod service;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing;

// --- RE-EXPORTS (FACADE PATTERN) ---
// Lets the CLI write `use gpteo_core::application::{ScanService, QueueStatus};`
// without knowing the file layout.

pub use orchestrator::ScanOrchestrator;
pub use queue::{JobQueue, QueueStatus};
pub use service::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, ScanPage, ScanService};
