//! Prefix-based duplicate removal, run once over the whole collection

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use crate::crawler::normalize::truncate_chars;
use crate::crawler::record::CrawlRecord;

/// Number of content characters that take part in the fingerprint
pub const DEDUP_PREFIX_CHARS: usize = 200;

/// Dedup key: hash of the title and the opening of the content.
///
/// Two pages with the same title and the same first 200 characters are
/// considered duplicates even if their bodies diverge later.
pub fn content_fingerprint(record: &CrawlRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.title().as_bytes());
    hasher.update(b"||");
    hasher.update(truncate_chars(record.content(), DEDUP_PREFIX_CHARS).as_bytes());
    hex::encode(hasher.finalize())
}

/// Keep the first record of every fingerprint, preserving insertion order
pub fn dedupe(records: Vec<CrawlRecord>) -> Vec<CrawlRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(content_fingerprint(record)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::record::Category;

    fn record(source: &str, title: &str, content: &str) -> CrawlRecord {
        CrawlRecord::new(source, title, Category::Webpage, "raw.html", content).unwrap()
    }

    #[test]
    fn test_keeps_earliest_duplicate() {
        let shared = "x".repeat(DEDUP_PREFIX_CHARS);
        let records = vec![
            record("https://a/1", "Same", &format!("{shared} first tail")),
            record("https://a/2", "Other", "unrelated"),
            record("https://a/3", "Same", &format!("{shared} second tail")),
        ];

        let out = dedupe(records);
        let sources: Vec<_> = out.iter().map(|r| r.source()).collect();
        assert_eq!(sources, vec!["https://a/1", "https://a/2"]);
    }

    #[test]
    fn test_different_title_is_not_duplicate() {
        let records = vec![
            record("https://a/1", "One", "same body"),
            record("https://a/2", "Two", "same body"),
        ];
        assert_eq!(dedupe(records).len(), 2);
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let records = vec![
            record("https://a/1", "T", "body"),
            record("https://a/2", "T", "body"),
            record("https://a/3", "U", "body"),
        ];
        let once = dedupe(records);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_collection() {
        assert!(dedupe(Vec::new()).is_empty());
    }
}
