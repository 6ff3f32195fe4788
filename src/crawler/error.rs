//! Error types for the crawler module

use crate::error::Error as CrateError;
use reqwest::StatusCode;
use thiserror::Error;

/// Invalid crawl configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The seed list is empty
    #[error("no seed URLs configured")]
    NoSeeds,

    /// A seed is not an absolute URL
    #[error("invalid seed URL '{seed}': {source}")]
    InvalidSeed {
        seed: String,
        #[source]
        source: url::ParseError,
    },

    /// A seed uses a scheme other than http(s)
    #[error("unsupported seed scheme: {0}")]
    UnsupportedScheme(String),

    /// A limit that must be positive was zero
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
}

/// Why a fetch failed
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// DNS, connection, TLS or timeout error
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error("HTTP status {0}")]
    Status(StatusCode),
}

/// A failed GET for one URL. Always recoverable: the URL is skipped.
#[derive(Debug, Error)]
#[error("GET failed {url}: {cause}")]
pub struct FetchError {
    /// The URL that was requested
    pub url: String,

    /// The underlying cause
    #[source]
    pub cause: FetchFailure,
}

impl FetchError {
    pub(crate) fn new(url: impl Into<String>, cause: impl Into<FetchFailure>) -> Self {
        Self {
            url: url.into(),
            cause: cause.into(),
        }
    }
}

/// Error raised while turning fetched bytes into a record
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The raw artifact could not be written
    #[error("failed to write artifact {path}: {source}")]
    Artifact {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// HTML parsing error
    #[error("HTML parsing error: {0}")]
    HtmlParse(String),
}

/// Final write failure. Fatal for the run.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("export task failed: {0}")]
    Task(String),
}

impl From<ConfigError> for CrateError {
    fn from(err: ConfigError) -> Self {
        CrateError::Config(err.to_string())
    }
}

impl From<FetchError> for CrateError {
    fn from(err: FetchError) -> Self {
        let message = err.to_string();
        match err.cause {
            FetchFailure::Transport(e) => CrateError::Http(e),
            FetchFailure::Status(_) => CrateError::Crawl(message),
        }
    }
}

impl From<ExtractError> for CrateError {
    fn from(err: ExtractError) -> Self {
        CrateError::Crawl(err.to_string())
    }
}

impl From<PersistError> for CrateError {
    fn from(err: PersistError) -> Self {
        CrateError::Persistence(err.to_string())
    }
}

impl From<tokio::task::JoinError> for PersistError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(format!("Failed to join task: {}", err))
    }
}
