//! # Seed-Site Crawler
//!
//! This module crawls a fixed set of seed sites and builds a plain-text
//! corpus from their HTML pages and PDF documents. Each run ends by writing
//! two files: `corpus.json`, an array of records, and `sources.txt`, the
//! source URL of each record one per line.
//!
//! ## Key Components
//!
//! - `CrawlConfig`: Seeds, limits, politeness settings and the data directory
//! - `CrawlSession`: Runs the crawl and writes the outputs
//! - `CrawlRecord`: One extracted document in its exported form
//! - `Frontier` / `LinkScope`: The breadth-first URL queue and the rules for
//!   which discovered links may join it
//! - `PolitenessGuard`: robots.txt checks and per-host request pacing
//! - `Extractor`: Turns fetched bytes into records, keeping the raw artifact
//!
//! ## Behaviour
//!
//! - robots.txt is consulted once per origin; an unreachable policy permits
//! - Requests to the same host are spaced by the politeness delay
//! - Pages with too little text are skipped, but their links are still followed
//! - Records with the same title and content prefix are exported once
//! - Per-URL failures are logged and skipped; only output writes fail a run

mod config;
mod content_extraction;
mod dedup;
mod error;
mod fetcher;
mod frontier;
mod normalize;
mod pipeline;
mod record;
mod robots;
pub mod storage;

pub use config::{
    parse_seed_list, CrawlConfig, CrawlConfigBuilder, OutputPaths, DEFAULT_ALLOWED_DOMAINS,
    DEFAULT_SEEDS,
};
pub use content_extraction::{
    parse_html_page, Extraction, Extractor, HtmlPage, Skip, MIN_CONTENT_CHARS, PDF_SENTINEL,
};
pub use dedup::{content_fingerprint, dedupe};
pub use error::{ConfigError, ExtractError, FetchError, FetchFailure, PersistError};
pub use fetcher::{FetchedDocument, Fetcher};
pub use frontier::{Frontier, LinkScope};
pub use normalize::{normalize, CONTENT_MAX_CHARS, TITLE_MAX_CHARS};
pub use pipeline::{CrawlProgress, CrawlReport, CrawlSession, CrawlStats, StopReason};
pub use record::{Category, CrawlRecord};
pub use robots::{PolitenessGuard, RobotsTxt};
