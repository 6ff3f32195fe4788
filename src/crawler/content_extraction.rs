//! Content classification and text extraction for fetched documents
//!
//! PDFs are stored and run through `pdf-extract`; everything else is treated
//! as HTML and searched for its main text block with a fixed list of
//! selectors. HTML pages also yield the in-scope links used to grow the
//! frontier.

use scraper::{ElementRef, Html, Selector};
use tracing::{instrument, warn};
use url::Url;

use crate::crawler::error::ExtractError;
use crate::crawler::fetcher::FetchedDocument;
use crate::crawler::frontier::LinkScope;
use crate::crawler::normalize::{truncate_chars, CONTENT_MAX_CHARS};
pub use crate::crawler::record::PDF_SENTINEL;
use crate::crawler::record::{Category, CrawlRecord};
use crate::crawler::storage::{pdf_file_name, ArtifactStore};

/// Minimum main-text length, in characters, for an HTML page to be kept
pub const MIN_CONTENT_CHARS: usize = 200;

/// Candidate containers for the main text, in priority order
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "div.texte",
    "div.entry-content",
    "div.post-content",
    "div.content",
    "main",
];

/// Elements whose text is never part of the page content
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Why a fetched document produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// Main text shorter than [`MIN_CONTENT_CHARS`]
    TooSmall { chars: usize },

    /// Nothing left after normalization
    Empty,
}

/// An accepted document and the links found in it
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub record: CrawlRecord,
    pub links: Vec<Url>,
}

/// Result of extracting one fetched document
#[derive(Debug, Clone)]
pub enum Extraction {
    Document(ExtractedDocument),

    /// No record, but the page's links are still worth following
    Skipped { reason: Skip, links: Vec<Url> },
}

impl Extraction {
    /// Split into the record (or skip reason) and the discovered links
    pub fn into_parts(self) -> (Result<CrawlRecord, Skip>, Vec<Url>) {
        match self {
            Extraction::Document(doc) => (Ok(doc.record), doc.links),
            Extraction::Skipped { reason, links } => (Err(reason), links),
        }
    }
}

/// How a document is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Html,
    Pdf,
}

/// Decide between the PDF and HTML branches
pub fn classify(url: &Url, content_type: &str) -> DocumentKind {
    if content_type.contains("application/pdf") || url.path().to_lowercase().ends_with(".pdf") {
        DocumentKind::Pdf
    } else {
        DocumentKind::Html
    }
}

/// Text and links pulled out of one HTML document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlPage {
    pub title: String,
    pub main_text: String,
    pub links: Vec<Url>,
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css)
        .map_err(|e| ExtractError::HtmlParse(format!("Failed to parse selector '{}': {}", css, e)))
}

/// Text of the element's visible descendants, one trimmed text node per line
fn visible_text(element: ElementRef<'_>) -> String {
    element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
            });
            if hidden {
                return None;
            }
            let text = text.trim();
            (!text.is_empty()).then_some(text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Title from the first `h1`, then `title`, then the URL itself
pub fn extract_title(document: &Html, url: &str) -> Result<String, ExtractError> {
    for css in ["h1", "title"] {
        let sel = selector(css)?;
        if let Some(element) = document.select(&sel).next() {
            let text = element
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if !text.is_empty() {
                return Ok(text);
            }
        }
    }
    Ok(url.to_string())
}

/// Main text via the prioritized selector search.
///
/// The first selector whose first match holds more than
/// [`MIN_CONTENT_CHARS`] characters wins. Otherwise the whole body text is
/// used, cut to [`CONTENT_MAX_CHARS`].
pub fn extract_main_text(document: &Html) -> Result<String, ExtractError> {
    for css in CONTENT_SELECTORS {
        let sel = selector(css)?;
        if let Some(element) = document.select(&sel).next() {
            let text = visible_text(element);
            if text.chars().count() > MIN_CONTENT_CHARS {
                return Ok(text);
            }
        }
    }

    let body_sel = selector("body")?;
    let body = document
        .select(&body_sel)
        .next()
        .unwrap_or_else(|| document.root_element());
    Ok(truncate_chars(&visible_text(body), CONTENT_MAX_CHARS).to_string())
}

/// Absolute, fragment-free link targets in document order, without repeats.
///
/// In-page anchors, `mailto:` targets and non-http(s) schemes are dropped.
pub fn extract_links(document: &Html, base: &Url) -> Result<Vec<Url>, ExtractError> {
    let sel = selector("a[href]")?;
    let mut links: Vec<Url> = Vec::new();

    for element in document.select(&sel) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.starts_with('#') || href.to_lowercase().starts_with("mailto:") {
            continue;
        }

        let mut link = match base.join(href) {
            Ok(link) => link,
            Err(_) => continue,
        };
        if !matches!(link.scheme(), "http" | "https") {
            continue;
        }
        link.set_fragment(None);

        if !links.contains(&link) {
            links.push(link);
        }
    }

    Ok(links)
}

/// Parse an HTML document into title, main text and links
pub fn parse_html_page(html: &str, url: &Url) -> Result<HtmlPage, ExtractError> {
    let document = Html::parse_document(html);
    Ok(HtmlPage {
        title: extract_title(&document, url.as_str())?,
        main_text: extract_main_text(&document)?,
        links: extract_links(&document, url)?,
    })
}

/// Turns fetched documents into records, storing the raw artifact first
#[derive(Debug, Clone)]
pub struct Extractor {
    artifacts: ArtifactStore,
    scope: LinkScope,
}

impl Extractor {
    pub fn new(artifacts: ArtifactStore, scope: LinkScope) -> Self {
        Self { artifacts, scope }
    }

    /// Extract a document fetched for `source`.
    ///
    /// `source` is the URL taken from the frontier; it becomes the record's
    /// provenance and decides which links are in scope. Relative links are
    /// resolved against the URL the response actually came from.
    #[instrument(skip(self, source, doc), fields(source = %source, content_type = %doc.content_type))]
    pub async fn extract(
        &self,
        source: &Url,
        doc: FetchedDocument,
    ) -> Result<Extraction, ExtractError> {
        match classify(source, &doc.content_type) {
            DocumentKind::Pdf => self.extract_pdf(source, doc).await,
            DocumentKind::Html => self.extract_html(source, doc).await,
        }
    }

    async fn extract_pdf(
        &self,
        source: &Url,
        doc: FetchedDocument,
    ) -> Result<Extraction, ExtractError> {
        let file_name = pdf_file_name(source);
        let path = self.artifacts.save_pdf(&doc.body, &file_name).await?;

        let bytes = doc.body;
        let text = match tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes)
        })
        .await
        {
            Ok(Ok(text)) => Some(text),
            Ok(Err(e)) => {
                warn!("PDF text extraction failed {}: {}", source, e);
                None
            }
            Err(e) => {
                warn!("PDF text extraction aborted {}: {}", source, e);
                None
            }
        };

        let record = match text {
            Some(text) => {
                CrawlRecord::new(source.as_str(), &file_name, Category::Pdf, path.clone(), &text)
                    .unwrap_or_else(|| {
                        warn!("PDF has no text layer {}", source);
                        CrawlRecord::unextractable_pdf(source.as_str(), &file_name, path.clone())
                    })
            }
            None => CrawlRecord::unextractable_pdf(source.as_str(), &file_name, path),
        };

        Ok(Extraction::Document(ExtractedDocument {
            record,
            links: Vec::new(),
        }))
    }

    async fn extract_html(
        &self,
        source: &Url,
        doc: FetchedDocument,
    ) -> Result<Extraction, ExtractError> {
        let path = self.artifacts.save_html(source.as_str(), &doc.body).await?;

        let html = doc.decode_text();
        let page = parse_html_page(&html, &doc.url)?;
        let links: Vec<Url> = page
            .links
            .into_iter()
            .filter(|link| self.scope.admits(source, link))
            .collect();

        let chars = page.main_text.chars().count();
        if chars < MIN_CONTENT_CHARS {
            return Ok(Extraction::Skipped {
                reason: Skip::TooSmall { chars },
                links,
            });
        }

        Ok(
            match CrawlRecord::new(
                source.as_str(),
                &page.title,
                Category::Webpage,
                path,
                &page.main_text,
            ) {
                Some(record) => Extraction::Document(ExtractedDocument { record, links }),
                None => Extraction::Skipped {
                    reason: Skip::Empty,
                    links,
                },
            },
        )
    }
}
