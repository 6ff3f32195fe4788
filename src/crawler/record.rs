//! The corpus record and the fingerprints used to name and compare records

use std::fmt;
use std::path::{Path, PathBuf};

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::crawler::normalize::{normalize, CONTENT_MAX_CHARS, TITLE_MAX_CHARS};

/// Content recorded for a PDF whose text cannot be extracted
pub const PDF_SENTINEL: &str = "[PDF text could not be extracted]";

/// Kind of document a record was extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Webpage,
    Pdf,
}

impl Category {
    /// Name used in the corpus document and the run log
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Webpage => "webpage",
            Category::Pdf => "pdf",
        }
    }

    /// Corpus key holding the artifact path for this category
    fn artifact_key(self) -> &'static str {
        match self {
            Category::Webpage => "raw_html",
            Category::Pdf => "source_file",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hex SHA-256 of a URL, used as record id and raw HTML file name
pub fn url_fingerprint(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// Hex SHA-256 of raw bytes, used to name PDF artifacts
pub fn bytes_fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// One accepted document.
///
/// Built once by the extractor and never mutated afterwards. Construction
/// normalizes title and content and refuses empty content, so every record
/// that exists satisfies the corpus length bounds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RecordRepr")]
pub struct CrawlRecord {
    id: String,
    title: String,
    category: Category,
    source: String,
    artifact_path: PathBuf,
    content: String,
}

impl CrawlRecord {
    /// Build a record from raw extracted text.
    ///
    /// Returns `None` when the content is empty after normalization. An empty
    /// normalized title falls back to the source URL.
    pub fn new(
        source: &str,
        title: &str,
        category: Category,
        artifact_path: impl Into<PathBuf>,
        content: &str,
    ) -> Option<Self> {
        let content = normalize(content, CONTENT_MAX_CHARS);
        if content.is_empty() {
            return None;
        }

        let mut title = normalize(title, TITLE_MAX_CHARS);
        if title.is_empty() {
            title = normalize(source, TITLE_MAX_CHARS);
        }

        Some(Self {
            id: url_fingerprint(source),
            title,
            category,
            source: source.to_string(),
            artifact_path: artifact_path.into(),
            content,
        })
    }

    /// Record for a stored PDF whose text could not be extracted
    pub fn unextractable_pdf(source: &str, title: &str, artifact_path: impl Into<PathBuf>) -> Self {
        let mut title = normalize(title, TITLE_MAX_CHARS);
        if title.is_empty() {
            title = normalize(source, TITLE_MAX_CHARS);
        }

        Self {
            id: url_fingerprint(source),
            title,
            category: Category::Pdf,
            source: source.to_string(),
            artifact_path: artifact_path.into(),
            content: PDF_SENTINEL.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// The URL the document was fetched from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Raw HTML file for webpages, raw PDF file for pdfs
    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

impl Serialize for CrawlRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CrawlRecord", 6)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("title", &self.title)?;
        state.serialize_field("category", &self.category)?;
        state.serialize_field("source", &self.source)?;
        state.serialize_field(self.category.artifact_key(), &self.artifact_path)?;
        state.serialize_field("content", &self.content)?;
        state.end()
    }
}

/// On-disk shape of a record, with the artifact under a per-category key
#[derive(Deserialize)]
struct RecordRepr {
    id: String,
    title: String,
    category: Category,
    source: String,
    raw_html: Option<PathBuf>,
    source_file: Option<PathBuf>,
    content: String,
}

impl TryFrom<RecordRepr> for CrawlRecord {
    type Error = String;

    fn try_from(repr: RecordRepr) -> Result<Self, Self::Error> {
        let artifact_path = match repr.category {
            Category::Webpage => repr.raw_html,
            Category::Pdf => repr.source_file,
        }
        .ok_or_else(|| {
            format!(
                "record {} has no '{}' field",
                repr.id,
                repr.category.artifact_key()
            )
        })?;

        if repr.content.is_empty() {
            return Err(format!("record {} has empty content", repr.id));
        }

        Ok(Self {
            id: repr.id,
            title: repr.title,
            category: repr.category,
            source: repr.source,
            artifact_path,
            content: repr.content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_fingerprint_is_stable() {
        let a = url_fingerprint("https://example.com/a");
        assert_eq!(a, url_fingerprint("https://example.com/a"));
        assert_ne!(a, url_fingerprint("https://example.com/b"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_new_rejects_empty_content() {
        assert!(CrawlRecord::new("https://x/", "t", Category::Webpage, "a.html", " \n ").is_none());
    }

    #[test]
    fn test_new_normalizes_and_bounds() {
        let long_title = "T".repeat(400);
        let long_body = "word ".repeat(2000);
        let record = CrawlRecord::new(
            "https://example.com/doc",
            &long_title,
            Category::Webpage,
            "raw/doc.html",
            &long_body,
        )
        .unwrap();

        assert!(record.title().chars().count() <= TITLE_MAX_CHARS);
        assert!(record.content().chars().count() <= CONTENT_MAX_CHARS);
        assert_eq!(record.id(), url_fingerprint("https://example.com/doc"));
    }

    #[test]
    fn test_blank_title_falls_back_to_source() {
        let record =
            CrawlRecord::new("https://example.com/x", "  ", Category::Pdf, "x.pdf", "text").unwrap();
        assert_eq!(record.title(), "https://example.com/x");
    }

    #[test]
    fn test_unextractable_pdf_record() {
        let record = CrawlRecord::unextractable_pdf("https://a.bf/loi.pdf", "loi.pdf", "pdfs/x_loi.pdf");
        assert_eq!(record.category(), Category::Pdf);
        assert_eq!(record.content(), PDF_SENTINEL);
        assert_eq!(record.title(), "loi.pdf");
        assert_eq!(record.id(), url_fingerprint("https://a.bf/loi.pdf"));
    }

    #[test]
    fn test_serialized_shape_per_category() {
        let page =
            CrawlRecord::new("https://a/", "A", Category::Webpage, "raw/a.html", "body").unwrap();
        let pdf = CrawlRecord::new("https://a/f.pdf", "f.pdf", Category::Pdf, "pdfs/f.pdf", "body")
            .unwrap();

        let page_json = serde_json::to_value(&page).unwrap();
        assert_eq!(page_json["category"], json!("webpage"));
        assert_eq!(page_json["raw_html"], json!("raw/a.html"));
        assert!(page_json.get("source_file").is_none());

        let pdf_json = serde_json::to_value(&pdf).unwrap();
        assert_eq!(pdf_json["category"], json!("pdf"));
        assert_eq!(pdf_json["source_file"], json!("pdfs/f.pdf"));

        let back: CrawlRecord = serde_json::from_value(pdf_json).unwrap();
        assert_eq!(back, pdf);
    }

    #[test]
    fn test_deserialize_requires_artifact_key() {
        let value = json!({
            "id": "1", "title": "t", "category": "pdf",
            "source": "https://a/", "raw_html": "x.html", "content": "c"
        });
        assert!(serde_json::from_value::<CrawlRecord>(value).is_err());
    }
}
