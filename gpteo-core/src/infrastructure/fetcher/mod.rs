// gpteo-core/src/infrastructure/fetcher/mod.rs

pub mod classify;
pub mod extract;
pub mod http;

pub use classify::classify;
pub use extract::HtmlExtractor;
pub use http::HttpPageFetcher;
