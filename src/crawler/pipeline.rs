//! The crawl-and-build pipeline.
//!
//! A single coordinator owns the frontier and the corpus. It hands URLs to a
//! bounded set of worker tasks, each of which checks robots.txt, waits for
//! its host's rate limit, fetches and extracts one document. Outcomes come
//! back to the coordinator, which is the only place that mutates crawl state.
//! When the frontier runs dry, the target is met, the page ceiling is passed
//! or the run is cancelled, in-flight work is drained, the corpus is
//! deduplicated and both output files are written.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::crawler::config::CrawlConfig;
use crate::crawler::content_extraction::{Extraction, Extractor, Skip};
use crate::crawler::error::{ExtractError, FetchError, PersistError};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::{Frontier, LinkScope};
use crate::crawler::record::Category;
use crate::crawler::robots::PolitenessGuard;
use crate::crawler::storage::{ArtifactStore, Corpus, CorpusStore};
use crate::error::Result;

/// Why the crawl loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No URL left to visit
    FrontierExhausted,

    /// The accepted-document target was met
    TargetReached,

    /// More distinct URLs were visited than the page ceiling allows
    PageCeiling,

    /// The run was cancelled from outside
    Cancelled,
}

/// Progress update sent after every processed URL
#[derive(Debug, Clone)]
pub struct CrawlProgress {
    pub url: String,
    pub accepted: usize,
    pub visited: usize,
}

/// Per-URL outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub skipped_too_small: usize,
    pub skipped_empty: usize,
    pub skipped_unsupported: usize,
    pub robots_denied: usize,
    pub fetch_failed: usize,
    pub extract_failed: usize,
    pub over_target: usize,
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stop_reason: StopReason,
    pub visited: usize,
    pub frontier_remaining: usize,
    /// Records accepted before deduplication
    pub accepted: usize,
    pub duplicates_dropped: usize,
    /// Exported webpage records
    pub webpages: usize,
    /// Exported pdf records
    pub pdfs: usize,
    /// Lines in the sources file
    pub sources: usize,
    pub stats: CrawlStats,
    pub corpus_file: PathBuf,
    pub sources_file: PathBuf,
}

impl CrawlReport {
    /// Number of exported documents
    pub fn total(&self) -> usize {
        self.webpages + self.pdfs
    }

    /// Write the collection report to the run log
    pub fn log_summary(&self) {
        info!("----- COLLECTION REPORT -----");
        info!("Total documents collected: {}", self.total());
        info!("HTML pages saved: {}", self.webpages);
        info!("PDFs saved: {}", self.pdfs);
        info!("Total sources listed: {}", self.sources);
        info!(
            "Visited {} URLs, {} duplicates dropped, {} too small, {} robots denials, {} fetch failures",
            self.visited,
            self.duplicates_dropped,
            self.stats.skipped_too_small,
            self.stats.robots_denied,
            self.stats.fetch_failed
        );
        info!("Stopped: {:?}", self.stop_reason);
        info!("-----------------------------");
    }
}

/// What happened to one URL inside a worker
#[derive(Debug)]
enum Visit {
    Extracted(Extraction),
    RobotsDenied,
    RedirectDenied(Url),
    FetchFailed(FetchError),
    ExtractFailed(ExtractError),
}

/// Shared, read-only collaborators used by every worker task
struct Worker {
    fetcher: Fetcher,
    guard: PolitenessGuard,
    extractor: Extractor,
}

impl Worker {
    async fn visit(&self, url: Url) -> Visit {
        if !self.guard.allowed(&url).await {
            return Visit::RobotsDenied;
        }
        self.guard.wait_turn(&url).await;

        let doc = match self.fetcher.fetch(&url).await {
            Ok(doc) => doc,
            Err(e) => return Visit::FetchFailed(e),
        };
        // A redirect to another origin must pass that origin's robots.txt too
        if doc.url.origin() != url.origin() && !self.guard.allowed(&doc.url).await {
            return Visit::RedirectDenied(doc.url);
        }

        match self.extractor.extract(&url, doc).await {
            Ok(extraction) => Visit::Extracted(extraction),
            Err(e) => Visit::ExtractFailed(e),
        }
    }
}

/// Crawl state owned by the coordinator
#[derive(Debug)]
struct CrawlState {
    frontier: Frontier,
    corpus: Corpus,
    stats: CrawlStats,
    target: usize,
}

impl CrawlState {
    fn new(config: &CrawlConfig) -> Self {
        Self {
            frontier: Frontier::with_seeds(config.seeds.iter().map(Url::to_string)),
            corpus: Corpus::new(),
            stats: CrawlStats::default(),
            target: config.target_count,
        }
    }

    /// Apply one worker outcome: log it, keep the record, enqueue the links
    fn apply(&mut self, url: &str, visit: Visit) {
        match visit {
            Visit::RobotsDenied => {
                info!("Robots disallow: {}", url);
                self.stats.robots_denied += 1;
            }
            Visit::RedirectDenied(target) => {
                info!("Robots disallow redirect target: {} -> {}", url, target);
                self.stats.robots_denied += 1;
            }
            Visit::FetchFailed(e) => {
                warn!("{}", e);
                self.stats.fetch_failed += 1;
            }
            Visit::ExtractFailed(e) => {
                warn!("Extraction failed {}: {}", url, e);
                self.stats.extract_failed += 1;
            }
            Visit::Extracted(extraction) => {
                let (result, links) = extraction.into_parts();
                match result {
                    Ok(record) if self.corpus.len() < self.target => {
                        info!(category = %record.category(), "Collected {}", url);
                        self.corpus.push(record);
                    }
                    Ok(_) => {
                        debug!("Target reached, discarding {}", url);
                        self.stats.over_target += 1;
                    }
                    Err(Skip::TooSmall { chars }) => {
                        info!("Skipped (too small): {} ({} chars)", url, chars);
                        self.stats.skipped_too_small += 1;
                    }
                    Err(Skip::Empty) => {
                        info!("Skipped (no text): {}", url);
                        self.stats.skipped_empty += 1;
                    }
                }

                for link in links {
                    self.frontier.offer(link.to_string());
                }
            }
        }
    }
}

/// One pipeline run: the HTTP client, politeness state, artifact and output
/// locations, and the configuration they were built from
pub struct CrawlSession {
    config: CrawlConfig,
    worker: Arc<Worker>,
    artifacts: ArtifactStore,
    store: CorpusStore,
}

impl CrawlSession {
    /// Build the session's collaborators from a configuration
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let paths = config.output_paths();
        let fetcher = Fetcher::new(&config.user_agent, config.request_timeout)?;
        let guard = PolitenessGuard::new(
            fetcher.clone(),
            config.robots_agent.clone(),
            config.politeness_delay,
        );
        let artifacts = ArtifactStore::new(&paths);
        let extractor = Extractor::new(
            artifacts.clone(),
            LinkScope::new(&config.allowed_domains),
        );

        Ok(Self {
            worker: Arc::new(Worker {
                fetcher,
                guard,
                extractor,
            }),
            artifacts,
            store: CorpusStore::new(&paths),
            config,
        })
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawl, deduplicate and export.
    ///
    /// Per-URL failures are logged and counted; only failing to write the
    /// outputs fails the run.
    #[instrument(skip_all, fields(seeds = self.config.seeds.len(), target = self.config.target_count))]
    pub async fn run(
        &self,
        cancel: CancellationToken,
        progress: Option<mpsc::Sender<CrawlProgress>>,
    ) -> Result<CrawlReport> {
        let started_at = Utc::now();
        info!("Starting crawl...");
        self.artifacts.ensure_directories().await?;

        let (state, stop_reason) = self.crawl(&cancel, progress.as_ref()).await;
        let CrawlState {
            frontier,
            corpus,
            stats,
            ..
        } = state;

        let accepted = corpus.len();
        let corpus = corpus.deduplicated();
        let webpages = corpus.count(Category::Webpage);
        let pdfs = corpus.count(Category::Pdf);
        let sources = corpus.sources().len();

        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.persist(corpus.records(), corpus.sources()))
            .await
            .map_err(PersistError::from)??;

        let report = CrawlReport {
            started_at,
            finished_at: Utc::now(),
            stop_reason,
            visited: frontier.visited_count(),
            frontier_remaining: frontier.pending(),
            accepted,
            duplicates_dropped: accepted - (webpages + pdfs),
            webpages,
            pdfs,
            sources,
            stats,
            corpus_file: self.store.corpus_file().to_path_buf(),
            sources_file: self.store.sources_file().to_path_buf(),
        };
        report.log_summary();
        Ok(report)
    }

    async fn crawl(
        &self,
        cancel: &CancellationToken,
        progress: Option<&mpsc::Sender<CrawlProgress>>,
    ) -> (CrawlState, StopReason) {
        let mut state = CrawlState::new(&self.config);
        let mut in_flight: JoinSet<(String, Visit)> = JoinSet::new();
        let mut stop: Option<StopReason> = None;

        loop {
            while stop.is_none() && in_flight.len() < self.config.concurrency {
                if cancel.is_cancelled() {
                    stop = Some(StopReason::Cancelled);
                    break;
                }
                if state.corpus.len() >= self.config.target_count {
                    stop = Some(StopReason::TargetReached);
                    break;
                }
                if state.frontier.visited_count() > self.config.max_pages {
                    info!("Max pages visited reached, stopping crawl.");
                    stop = Some(StopReason::PageCeiling);
                    break;
                }
                let Some(url) = state.frontier.next_url() else {
                    break;
                };
                state.frontier.mark_visited(&url);

                let parsed = match Url::parse(&url) {
                    Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed,
                    _ => {
                        debug!("Skipping unsupported URL {}", url);
                        state.stats.skipped_unsupported += 1;
                        continue;
                    }
                };

                let worker = Arc::clone(&self.worker);
                in_flight.spawn(async move {
                    let visit = worker.visit(parsed).await;
                    (url, visit)
                });
            }

            let joined = tokio::select! {
                joined = in_flight.join_next() => joined,
                _ = cancel.cancelled(), if stop.is_none() => {
                    info!("Stop requested, draining in-flight requests");
                    stop = Some(StopReason::Cancelled);
                    continue;
                }
            };

            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok((url, visit)) => {
                    state.apply(&url, visit);
                    if let Some(tx) = progress {
                        let update = CrawlProgress {
                            url,
                            accepted: state.corpus.len(),
                            visited: state.frontier.visited_count(),
                        };
                        // The receiver going away only stops progress display
                        let _ = tx.send(update).await;
                    }
                }
                Err(e) => warn!("Crawl task failed: {}", e),
            }
        }

        (state, stop.unwrap_or(StopReason::FrontierExhausted))
    }
}
