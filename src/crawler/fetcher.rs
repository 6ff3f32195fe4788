//! HTTP fetcher for crawl targets and robots.txt files
//!
//! Wraps a single `reqwest::Client` configured with the crawl's user agent and
//! request timeout. Every failure, whether transport or HTTP status, comes
//! back as a [`FetchError`] naming the URL, so the crawl loop can log it and
//! move on.

use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client as ReqwestClient;
use tracing::{debug, instrument};
use url::Url;

use crate::crawler::error::{FetchError, FetchFailure};

/// Raw response for one successful GET
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// URL after redirects
    pub url: Url,

    /// Declared content type, lower-cased and trimmed (empty if absent)
    pub content_type: String,

    /// Unmodified response body
    pub body: Vec<u8>,
}

impl FetchedDocument {
    /// The `charset` parameter of the content type, if declared
    pub fn charset(&self) -> Option<&str> {
        self.content_type.split(';').skip(1).find_map(|param| {
            let (name, value) = param.split_once('=')?;
            (name.trim() == "charset").then(|| value.trim().trim_matches('"'))
        })
    }

    /// Body decoded with the declared charset, UTF-8 when absent or unknown.
    ///
    /// A byte-order mark overrides the declared charset and malformed
    /// sequences become U+FFFD, the same rules as `reqwest::Response::text`.
    pub fn decode_text(&self) -> String {
        let encoding = self
            .charset()
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        let (text, _, _) = encoding.decode(&self.body);
        text.into_owned()
    }
}

/// HTTP client shared by all crawl workers
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: ReqwestClient,
}

impl Fetcher {
    /// Create a fetcher sending `user_agent` and giving up after `timeout`
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// GET a URL, failing on transport errors and non-2xx statuses
    #[instrument(skip(self), fields(url = %url), level = "debug")]
    pub async fn fetch(&self, url: &Url) -> Result<FetchedDocument, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::new(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(url.as_str(), FetchFailure::Status(status)));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_lowercase())
            .unwrap_or_default();

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::new(url.as_str(), e))?
            .to_vec();

        debug!(status = %status, content_type = %content_type, bytes = body.len(), "Fetched");

        Ok(FetchedDocument {
            url: final_url,
            content_type,
            body,
        })
    }
}
