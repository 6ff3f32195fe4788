//! Raw artifact files and the exported corpus.
//!
//! `ArtifactStore` writes the unmodified bytes of every fetched document under
//! a content-addressed name. `Corpus` accumulates accepted records during a
//! run and `CorpusStore` writes the deduplicated result once at the end,
//! through a temporary file renamed into place.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::fs;
use tracing::{debug, info, instrument};
use url::Url;

use crate::crawler::config::OutputPaths;
use crate::crawler::dedup::dedupe;
use crate::crawler::error::{ExtractError, PersistError};
use crate::crawler::record::{bytes_fingerprint, url_fingerprint, Category, CrawlRecord};

/// Fallback name for PDFs whose URL has no file segment
const DEFAULT_PDF_NAME: &str = "document.pdf";

/// Writes raw HTML and PDF artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    raw_html_dir: PathBuf,
    pdf_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(paths: &OutputPaths) -> Self {
        Self {
            raw_html_dir: paths.raw_html_dir.clone(),
            pdf_dir: paths.pdf_dir.clone(),
        }
    }

    /// Creates the artifact directories
    pub async fn ensure_directories(&self) -> io::Result<()> {
        fs::create_dir_all(&self.raw_html_dir).await?;
        fs::create_dir_all(&self.pdf_dir).await?;
        Ok(())
    }

    /// Path of the raw HTML artifact for a URL
    pub fn html_path(&self, url: &str) -> PathBuf {
        self.raw_html_dir
            .join(format!("{}.html", url_fingerprint(url)))
    }

    /// Path of the raw PDF artifact for some bytes and their original file name
    pub fn pdf_path(&self, bytes: &[u8], file_name: &str) -> PathBuf {
        self.pdf_dir
            .join(format!("{}_{}", bytes_fingerprint(bytes), file_name))
    }

    /// Stores the unmodified bytes of a fetched HTML page
    pub async fn save_html(&self, url: &str, body: &[u8]) -> Result<PathBuf, ExtractError> {
        let path = self.html_path(url);
        write_artifact(&path, body).await?;
        Ok(path)
    }

    /// Stores a fetched PDF
    pub async fn save_pdf(&self, bytes: &[u8], file_name: &str) -> Result<PathBuf, ExtractError> {
        let path = self.pdf_path(bytes, file_name);
        write_artifact(&path, bytes).await?;
        Ok(path)
    }
}

async fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), ExtractError> {
    let to_error = |source: io::Error| ExtractError::Artifact {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(to_error)?;
    }
    fs::write(path, bytes).await.map_err(to_error)?;
    debug!("Saved artifact {}", path.display());
    Ok(())
}

/// File-system safe version of the last path segment of a PDF URL
pub fn pdf_file_name(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    let safe: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if safe.trim_matches(|c| c == '.' || c == '_').is_empty() {
        DEFAULT_PDF_NAME.to_string()
    } else {
        safe
    }
}

/// Records accepted during a run, with their sources index-aligned
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    records: Vec<CrawlRecord>,
    sources: Vec<String>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: CrawlRecord) {
        self.sources.push(record.source().to_string());
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CrawlRecord] {
        &self.records
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Number of records of one category
    pub fn count(&self, category: Category) -> usize {
        self.records
            .iter()
            .filter(|r| r.category() == category)
            .count()
    }

    /// Drop duplicate records together with their sources
    pub fn deduplicated(self) -> Self {
        let records = dedupe(self.records);
        let sources = records.iter().map(|r| r.source().to_string()).collect();
        Self { records, sources }
    }
}

/// Writes the corpus document and the sources list
#[derive(Debug, Clone)]
pub struct CorpusStore {
    corpus_file: PathBuf,
    sources_file: PathBuf,
}

impl CorpusStore {
    pub fn new(paths: &OutputPaths) -> Self {
        Self {
            corpus_file: paths.corpus_file.clone(),
            sources_file: paths.sources_file.clone(),
        }
    }

    pub fn corpus_file(&self) -> &Path {
        &self.corpus_file
    }

    pub fn sources_file(&self) -> &Path {
        &self.sources_file
    }

    /// Overwrite both output files.
    ///
    /// Each file is written to a temporary sibling and renamed over the
    /// target, so a failed run leaves the previous outputs intact.
    #[instrument(skip_all, fields(records = records.len()))]
    pub fn persist(&self, records: &[CrawlRecord], sources: &[String]) -> Result<(), PersistError> {
        let json = serde_json::to_vec_pretty(records)?;
        write_atomic(&self.corpus_file, &json)?;
        write_atomic(&self.sources_file, sources.join("\n").as_bytes())?;

        info!(
            "Saved corpus: {} entries. sources: {}",
            records.len(),
            sources.len()
        );
        Ok(())
    }

    /// Read a previously exported corpus document
    pub async fn load(path: &Path) -> Result<Vec<CrawlRecord>, PersistError> {
        let json = fs::read(path).await.map_err(|source| PersistError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_slice(&json)?)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let to_error = |source: io::Error| PersistError::Io {
        path: path.display().to_string(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(to_error)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(to_error)?;
    tmp.write_all(bytes).map_err(to_error)?;
    tmp.as_file().sync_all().map_err(to_error)?;
    tmp.persist(path).map_err(|e| to_error(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(source: &str, title: &str, category: Category) -> CrawlRecord {
        CrawlRecord::new(source, title, category, "artifact", "some content").unwrap()
    }

    #[test]
    fn test_artifact_paths() {
        let paths = OutputPaths::under(Path::new("/data"));
        let store = ArtifactStore::new(&paths);

        let html = store.html_path("https://example.com/");
        assert_eq!(html.parent().unwrap(), Path::new("/data/raw_html"));
        assert!(html.to_string_lossy().ends_with(".html"));

        let pdf = store.pdf_path(b"%PDF", "loi.pdf");
        assert_eq!(pdf.parent().unwrap(), Path::new("/data/pdfs"));
        assert!(pdf.to_string_lossy().ends_with("_loi.pdf"));
    }

    #[test]
    fn test_pdf_file_name() {
        let url = Url::parse("https://www.dgi.gov.bf/files/Code%20des%20imp%C3%B4ts.pdf").unwrap();
        assert_eq!(pdf_file_name(&url), "Code_20des_20imp_C3_B4ts.pdf");

        let url = Url::parse("https://www.dgi.gov.bf/download/").unwrap();
        assert_eq!(pdf_file_name(&url), DEFAULT_PDF_NAME);
    }

    #[tokio::test]
    async fn test_save_artifacts() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(&OutputPaths::under(dir.path()));

        let html_path = store.save_html("https://a/", b"<p>x</p>").await.unwrap();
        assert_eq!(std::fs::read_to_string(&html_path).unwrap(), "<p>x</p>");

        let pdf_path = store.save_pdf(b"%PDF-1.4", "a.pdf").await.unwrap();
        assert_eq!(std::fs::read(&pdf_path).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn test_corpus_dedup_drops_sources() {
        let mut corpus = Corpus::new();
        corpus.push(record("https://a/1", "Same", Category::Webpage));
        corpus.push(record("https://a/2", "Same", Category::Webpage));
        corpus.push(record("https://a/3.pdf", "Doc", Category::Pdf));
        assert_eq!(corpus.sources().len(), 3);

        let corpus = corpus.deduplicated();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.sources(), ["https://a/1", "https://a/3.pdf"]);
        assert_eq!(corpus.count(Category::Pdf), 1);
    }

    #[tokio::test]
    async fn test_persist_and_load() {
        let dir = TempDir::new().unwrap();
        let store = CorpusStore::new(&OutputPaths::under(dir.path()));
        let records = vec![
            record("https://a/1", "One", Category::Webpage),
            record("https://a/2.pdf", "Two", Category::Pdf),
        ];
        let sources: Vec<String> = records.iter().map(|r| r.source().to_string()).collect();

        store.persist(&records, &sources).unwrap();

        let loaded = CorpusStore::load(store.corpus_file()).await.unwrap();
        assert_eq!(loaded, records);
        assert_eq!(
            std::fs::read_to_string(store.sources_file()).unwrap(),
            "https://a/1\nhttps://a/2.pdf"
        );
    }

    #[test]
    fn test_persist_empty_collection() {
        let dir = TempDir::new().unwrap();
        let store = CorpusStore::new(&OutputPaths::under(dir.path()));

        store.persist(&[], &[]).unwrap();

        let json = std::fs::read_to_string(store.corpus_file()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!([]));
        assert_eq!(std::fs::read_to_string(store.sources_file()).unwrap(), "");
    }

    #[test]
    fn test_persist_overwrites_previous_run() {
        let dir = TempDir::new().unwrap();
        let store = CorpusStore::new(&OutputPaths::under(dir.path()));

        let first = vec![record("https://a/1", "One", Category::Webpage)];
        store.persist(&first, &["https://a/1".to_string()]).unwrap();
        store.persist(&[], &[]).unwrap();

        assert_eq!(std::fs::read_to_string(store.sources_file()).unwrap(), "");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 2);
    }
}
