// gpteo-core/src/infrastructure/mod.rs

pub mod config;
pub mod error;
pub mod fetcher;
pub mod fs;
pub mod jinja;
pub mod store;
