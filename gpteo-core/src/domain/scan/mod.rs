// gpteo-core/src/domain/scan/mod.rs

pub mod finding;
pub mod model;
pub mod page;
pub mod request;
pub mod status;
pub mod summary;

pub use finding::{Evidence, Finding, FindingStatus};
pub use model::{Scan, ScoreBreakdown};
pub use page::{Page, PageReport, PageType};
pub use request::{ScanMode, ScanRequest, ValidatedRequest, normalize_domain};
pub use status::ScanStatus;
pub use summary::{CriticalIssue, ScanSummary};
