//! # seedcrawl CLI
//!
//! Command-line entry point for the corpus crawler.
//!
//! - `crawl`: Crawl the seed sites and export `corpus.json` and `sources.txt`
//! - `summary`: Print per-category counts for a previously exported corpus
//!
//! Logs go to stderr and to `scrape.log` in the data directory. Ctrl-C stops
//! the crawl gracefully: in-flight requests finish and whatever was collected
//! is still exported.

mod telemetry;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use seedcrawl::crawler::storage::CorpusStore;
use seedcrawl::crawler::{
    parse_seed_list, Category, CrawlConfig, CrawlProgress, CrawlReport, CrawlSession, OutputPaths,
    PDF_SENTINEL,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

#[derive(Parser)]
#[command(author, version, about = "Polite seed-site crawler that builds a deduplicated text corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl the seed sites and export the corpus
    Crawl(CrawlArgs),

    /// Summarize an exported corpus
    Summary(SummaryArgs),
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Seed URL (repeatable); defaults to the built-in seed list
    #[arg(short, long = "seed")]
    seeds: Vec<String>,

    /// File with one seed URL per line; `#` starts a comment
    #[arg(long)]
    seeds_file: Option<PathBuf>,

    /// Extra domain whose subdomains may be crawled (repeatable)
    #[arg(short, long = "allow-domain")]
    allowed_domains: Vec<String>,

    /// Stop after this many accepted documents
    #[arg(short, long, default_value = "500")]
    target: usize,

    /// Maximum number of pages to visit
    #[arg(short = 'p', long, default_value = "4000")]
    max_pages: usize,

    /// Minimum delay between requests to the same host, in milliseconds
    #[arg(short = 'r', long, default_value = "800")]
    delay_ms: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "12")]
    timeout_secs: u64,

    /// Number of concurrent requests
    #[arg(short, long, default_value = "4")]
    concurrency: usize,

    /// Output directory for artifacts, corpus and logs
    #[arg(short, long, default_value = "data_admin")]
    data_dir: PathBuf,

    /// Override the User-Agent header
    #[arg(long)]
    user_agent: Option<String>,

    /// Output format for the final report (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Export traces and metrics over OTLP
    #[arg(long)]
    otlp: bool,
}

#[derive(Args, Debug)]
struct SummaryArgs {
    /// Path to an exported corpus.json
    #[arg(default_value = "data_admin/corpus.json")]
    corpus: PathBuf,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Crawl(args)) => {
            let log_file = OutputPaths::under(&args.data_dir).log_file;
            let _otel = telemetry::init_tracing_subscriber(Some(&log_file), args.otlp)?;
            crawl_command(args).await?;
        }
        Some(Commands::Summary(args)) => {
            let _otel = telemetry::init_tracing_subscriber(None, false)?;
            summary_command(args).await?;
        }
        None => {
            let _ = Cli::parse_from(["seedcrawl", "--help"]);
        }
    }

    Ok(())
}

async fn build_config(args: &CrawlArgs) -> anyhow::Result<CrawlConfig> {
    let mut seeds = args.seeds.clone();
    if let Some(path) = &args.seeds_file {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read seeds file {}", path.display()))?;
        seeds.extend(parse_seed_list(&contents));
    }

    let mut builder = CrawlConfig::builder()
        .target_count(args.target)
        .max_pages(args.max_pages)
        .politeness_delay(Duration::from_millis(args.delay_ms))
        .request_timeout(Duration::from_secs(args.timeout_secs))
        .concurrency(args.concurrency)
        .data_dir(&args.data_dir);

    if !seeds.is_empty() {
        builder = builder.seeds(seeds);
    }
    if !args.allowed_domains.is_empty() {
        builder = builder.allowed_domains(args.allowed_domains.iter().cloned());
    }
    if let Some(user_agent) = &args.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }

    Ok(builder.build()?)
}

#[instrument]
async fn crawl_command(args: CrawlArgs) -> anyhow::Result<()> {
    let config = build_config(&args).await?;
    println!(
        "Crawling {} seed sites (target {} documents)...",
        config.seeds.len(),
        config.target_count
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing in-flight requests before export");
                cancel.cancel();
            }
        }
    });

    // Create a channel for progress updates
    let (progress_sender, mut progress_receiver) = mpsc::channel::<CrawlProgress>(100);

    let progress_bar = ProgressBar::new(config.target_count as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("##-"),
    );
    progress_bar.set_message("Crawling...");

    let progress_handle = tokio::spawn({
        let progress_bar = progress_bar.clone();
        async move {
            while let Some(update) = progress_receiver.recv().await {
                progress_bar.set_position(update.accepted as u64);
                progress_bar.set_message(format!("{} visited | {}", update.visited, update.url));
            }
            progress_bar.finish_with_message("Crawl finished");
        }
    });

    let session = CrawlSession::new(config)?;
    let report = session.run(cancel, Some(progress_sender)).await?;

    // run() dropped the sender, so the progress task ends on its own
    let _ = progress_handle.await;

    print_report(&report, &args.format)?;
    Ok(())
}

fn print_report(report: &CrawlReport, format: &str) -> anyhow::Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(report)?),
        _ => {
            let elapsed = report.finished_at - report.started_at;
            println!("Total documents collected: {}", report.total());
            println!("  webpages: {}", report.webpages);
            println!("  pdfs:     {}", report.pdfs);
            println!("Sources listed: {}", report.sources);
            println!(
                "Visited {} URLs in {}s ({} duplicates dropped, {} left in frontier)",
                report.visited,
                elapsed.num_seconds(),
                report.duplicates_dropped,
                report.frontier_remaining
            );
            println!("Stopped: {:?}", report.stop_reason);
            println!("Corpus written to {}", report.corpus_file.display());
            println!("Sources written to {}", report.sources_file.display());
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct CorpusSummary {
    total: usize,
    webpages: usize,
    pdfs: usize,
    /// PDFs stored with the placeholder text
    unconverted_pdfs: usize,
}

#[instrument]
async fn summary_command(args: SummaryArgs) -> anyhow::Result<()> {
    let records = CorpusStore::load(&args.corpus)
        .await
        .with_context(|| format!("Failed to load corpus {}", args.corpus.display()))?;
    info!("Loaded {} records from {}", records.len(), args.corpus.display());

    let count = |category: Category| records.iter().filter(|r| r.category() == category).count();
    let summary = CorpusSummary {
        total: records.len(),
        webpages: count(Category::Webpage),
        pdfs: count(Category::Pdf),
        unconverted_pdfs: records
            .iter()
            .filter(|r| r.category() == Category::Pdf && r.content() == PDF_SENTINEL)
            .count(),
    };

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => {
            println!("Documents: {}", summary.total);
            println!("  webpages: {}", summary.webpages);
            println!("  pdfs:     {}", summary.pdfs);
            if summary.unconverted_pdfs > 0 {
                println!("PDFs without extractable text: {}", summary.unconverted_pdfs);
            }
        }
    }

    Ok(())
}
