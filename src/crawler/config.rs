//! # Crawl Configuration Module
//!
//! Explicit configuration for one pipeline run: seed list, output directories,
//! timeouts and limits. Nothing in the crawler reads global state; everything
//! it needs is carried by a `CrawlConfig` built here.
//!
//! ## Key Components
//!
//! - `CrawlConfig`: The validated configuration consumed by `CrawlSession`
//! - `CrawlConfigBuilder`: Builder pattern implementation for easier configuration
//! - `OutputPaths`: The file layout derived from the data directory
//!
//! ## Defaults
//!
//! The defaults describe the public-service collection this crawler was built
//! for: eleven Burkina Faso administration and news sites, a 12 second request
//! timeout, an 800 ms per-host delay, a 500 document target and a 4000 page
//! ceiling.

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::crawler::error::ConfigError;

/// Seed sites crawled when no seeds are supplied
pub const DEFAULT_SEEDS: &[&str] = &[
    "https://servicepublic.gov.bf/",
    "https://www.matd.gov.bf/",
    "https://www.justice.gov.bf/",
    "https://www.dgi.gov.bf/",
    "https://www.cnss.bf/",
    "https://oni.bf/",
    "https://www.finances.gov.bf/",
    "https://www.jobf.gov.bf/",
    "https://www.ambassadeburkina.fr/",
    "https://lefaso.net/",
    "https://burkina24.com/",
];

/// Secondary domains whose links are followed from any page
pub const DEFAULT_ALLOWED_DOMAINS: &[&str] = &["gov.bf", "lefaso.net", "burkina24.com"];

/// Header sent with every request
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; ResourceCollector/1.0; +https://example.org)";

/// Product token matched against robots.txt `User-agent` groups
pub const DEFAULT_ROBOTS_AGENT: &str = "ResourceCollector";

/// Files and directories produced by a run, all below one data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Raw HTML artifacts
    pub raw_html_dir: PathBuf,

    /// Raw PDF artifacts
    pub pdf_dir: PathBuf,

    /// The exported corpus document
    pub corpus_file: PathBuf,

    /// The exported newline-delimited sources list
    pub sources_file: PathBuf,

    /// The run log written by the CLI
    pub log_file: PathBuf,
}

impl OutputPaths {
    /// Derive the standard layout below `data_dir`
    pub fn under(data_dir: &Path) -> Self {
        Self {
            raw_html_dir: data_dir.join("raw_html"),
            pdf_dir: data_dir.join("pdfs"),
            corpus_file: data_dir.join("corpus.json"),
            sources_file: data_dir.join("sources.txt"),
            log_file: data_dir.join("scrape.log"),
        }
    }
}

/// Configuration for one crawl run
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Seed URLs, in crawl order
    pub seeds: Vec<Url>,

    /// User agent sent with every request
    pub user_agent: String,

    /// Agent token evaluated against robots.txt groups
    pub robots_agent: String,

    /// Timeout for a single HTTP request
    pub request_timeout: Duration,

    /// Minimum delay between two requests to the same host
    pub politeness_delay: Duration,

    /// Number of accepted documents after which the crawl stops
    pub target_count: usize,

    /// Number of visited URLs after which the crawl stops
    pub max_pages: usize,

    /// Number of URLs processed concurrently
    pub concurrency: usize,

    /// Secondary domains whose links are always in scope
    pub allowed_domains: Vec<String>,

    /// Root directory for artifacts and outputs
    pub data_dir: PathBuf,
}

impl CrawlConfig {
    /// Create a new builder
    pub fn builder() -> CrawlConfigBuilder {
        CrawlConfigBuilder::new()
    }

    /// Output layout for this run
    pub fn output_paths(&self) -> OutputPaths {
        OutputPaths::under(&self.data_dir)
    }
}

/// Builder for CrawlConfig
#[derive(Debug, Clone)]
pub struct CrawlConfigBuilder {
    seeds: Vec<String>,
    user_agent: String,
    robots_agent: String,
    request_timeout: Duration,
    politeness_delay: Duration,
    target_count: usize,
    max_pages: usize,
    concurrency: usize,
    allowed_domains: Vec<String>,
    data_dir: PathBuf,
}

impl Default for CrawlConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            seeds: DEFAULT_SEEDS.iter().map(|s| s.to_string()).collect(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            robots_agent: DEFAULT_ROBOTS_AGENT.to_string(),
            request_timeout: Duration::from_secs(12),
            politeness_delay: Duration::from_millis(800),
            target_count: 500,
            max_pages: 4000,
            concurrency: 4,
            allowed_domains: DEFAULT_ALLOWED_DOMAINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            data_dir: PathBuf::from("data_admin"),
        }
    }

    /// Replace the seed list
    pub fn seeds<I, S>(mut self, seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seeds = seeds.into_iter().map(Into::into).collect();
        self
    }

    /// Set the user agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the robots.txt agent token
    pub fn robots_agent(mut self, robots_agent: impl Into<String>) -> Self {
        self.robots_agent = robots_agent.into();
        self
    }

    /// Set the per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the per-host delay between requests
    pub fn politeness_delay(mut self, delay: Duration) -> Self {
        self.politeness_delay = delay;
        self
    }

    /// Set the accepted-document target
    pub fn target_count(mut self, target_count: usize) -> Self {
        self.target_count = target_count;
        self
    }

    /// Set the visited-page ceiling
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Set the number of concurrent workers
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Replace the secondary domain allowlist
    pub fn allowed_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Set the data directory
    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<CrawlConfig, ConfigError> {
        if self.seeds.is_empty() {
            return Err(ConfigError::NoSeeds);
        }
        if self.target_count == 0 {
            return Err(ConfigError::ZeroLimit("target_count"));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroLimit("concurrency"));
        }

        let mut seeds = Vec::with_capacity(self.seeds.len());
        for seed in &self.seeds {
            let url = Url::parse(seed.trim()).map_err(|source| ConfigError::InvalidSeed {
                seed: seed.clone(),
                source,
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::UnsupportedScheme(seed.clone()));
            }
            seeds.push(url);
        }

        let allowed_domains = self
            .allowed_domains
            .into_iter()
            .map(|d| d.trim().trim_start_matches('.').to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        Ok(CrawlConfig {
            seeds,
            user_agent: self.user_agent,
            robots_agent: self.robots_agent,
            request_timeout: self.request_timeout,
            politeness_delay: self.politeness_delay,
            target_count: self.target_count,
            max_pages: self.max_pages,
            concurrency: self.concurrency,
            allowed_domains,
            data_dir: self.data_dir,
        })
    }
}

/// Parse a seeds file: one URL per line, blank lines and `#` comments ignored
pub fn parse_seed_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CrawlConfig::builder().build().unwrap();
        assert_eq!(config.seeds.len(), DEFAULT_SEEDS.len());
        assert_eq!(config.target_count, 500);
        assert_eq!(config.max_pages, 4000);
        assert_eq!(config.request_timeout, Duration::from_secs(12));
        assert_eq!(config.politeness_delay, Duration::from_millis(800));
        assert_eq!(config.seeds[0].as_str(), "https://servicepublic.gov.bf/");
    }

    #[test]
    fn test_builder_overrides() {
        let config = CrawlConfig::builder()
            .seeds(["https://example.com/"])
            .target_count(5)
            .max_pages(10)
            .concurrency(1)
            .allowed_domains([".Example.org", ""])
            .data_dir("/tmp/out")
            .build()
            .unwrap();

        assert_eq!(config.seeds.len(), 1);
        assert_eq!(config.target_count, 5);
        assert_eq!(config.allowed_domains, vec!["example.org".to_string()]);
        assert_eq!(
            config.output_paths().corpus_file,
            PathBuf::from("/tmp/out/corpus.json")
        );
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            CrawlConfig::builder().seeds(Vec::<String>::new()).build(),
            Err(ConfigError::NoSeeds)
        ));
        assert!(matches!(
            CrawlConfig::builder().seeds(["not a url"]).build(),
            Err(ConfigError::InvalidSeed { .. })
        ));
        assert!(matches!(
            CrawlConfig::builder().seeds(["ftp://example.com/"]).build(),
            Err(ConfigError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            CrawlConfig::builder().concurrency(0).build(),
            Err(ConfigError::ZeroLimit("concurrency"))
        ));
    }

    #[test]
    fn test_parse_seed_list() {
        let seeds = parse_seed_list("# seeds\nhttps://a.example/\n\n  https://b.example/  \n");
        assert_eq!(seeds, vec!["https://a.example/", "https://b.example/"]);
    }
}
