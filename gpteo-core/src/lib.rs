// gpteo-core/src/lib.rs

// 1. Documentation
#![allow(missing_docs)]
// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (async traits the use cases depend on)
// PageFetcher, ScanStore
pub mod ports;

// 2. Domain (pure logic)
// Checks registry, scan state machine, checks engine, scoring.
// Depends on nothing else in the crate.
pub mod domain;

// 3. Infrastructure (adapters)
// HTTP fetcher, memory and DuckDB stores, YAML config, Jinja renderer.
pub mod infrastructure;

// 4. Application (use cases)
// Orchestrator, job queue, owner-scoped service.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use error::GpteoError;
