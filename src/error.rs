//! Error types for the seedcrawl crate

use thiserror::Error;

/// Result type for seedcrawl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for seedcrawl operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid crawl configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Writing the corpus or sources file failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Web crawling error
    #[error("Crawl error: {0}")]
    Crawl(String),
}
