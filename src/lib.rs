//! # seedcrawl - Polite Seed-Site Corpus Builder
//!
//! This crate crawls a configured set of seed websites, extracts readable
//! text from their HTML pages and PDF documents, and exports a deduplicated
//! corpus together with the list of source URLs it came from.
//!
//! ## Features
//!
//! - Breadth-first crawl restricted to the seed hosts and allowed domains
//! - robots.txt compliance and per-host request pacing
//! - Main-content extraction from HTML and text extraction from PDFs
//! - Whitespace normalization, length limits and duplicate removal
//! - Atomic export of `corpus.json` and `sources.txt`
//! - Async API with Tokio
//!
//! ## Example
//!
//! ```rust,no_run
//! use seedcrawl::crawler::{CrawlConfig, CrawlSession};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CrawlConfig::builder()
//!         .seeds(["https://www.finances.gov.bf/"])
//!         .target_count(50)
//!         .data_dir("data_admin")
//!         .build()?;
//!
//!     let report = CrawlSession::new(config)?
//!         .run(CancellationToken::new(), None)
//!         .await?;
//!
//!     println!("Collected {} documents", report.total());
//!     Ok(())
//! }
//! ```

mod error;

pub mod crawler;

pub use error::Error;

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
}
