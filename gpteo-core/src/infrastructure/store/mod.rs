// gpteo-core/src/infrastructure/store/mod.rs

pub mod duckdb;
pub mod memory;

pub use self::duckdb::DuckDbScanStore;
pub use memory::MemoryScanStore;

use std::sync::Arc;

use crate::error::GpteoError;
use crate::infrastructure::config::{StoreBackend, StoreSettings};
use crate::ports::ScanStore;

/// Opens the store selected in the settings.
pub fn open_store(settings: &StoreSettings) -> Result<Arc<dyn ScanStore>, GpteoError> {
    match settings.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryScanStore::new())),
        StoreBackend::Duckdb => Ok(Arc::new(DuckDbScanStore::open(&settings.db_path)?)),
    }
}
