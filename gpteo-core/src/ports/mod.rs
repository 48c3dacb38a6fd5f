// gpteo-core/src/ports/mod.rs

pub mod fetcher;
pub mod store;

pub use fetcher::{FetchError, FetchErrorKind, FetchOptions, PageFetcher};
pub use store::{ScanListing, ScanOverview, ScanRecord, ScanStats, ScanStore};
