// gpteo-core/src/domain/mod.rs

pub mod check;
pub mod error;
pub mod evaluation;
pub mod ports;
pub mod scan;
pub mod scoring;

pub use error::DomainError;
