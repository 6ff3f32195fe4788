//! Breadth-first crawl frontier and link scope filter.
//!
//! The frontier is owned by the crawl coordinator alone; workers hand their
//! discovered links back and never touch the queue or the visited set.

use std::collections::{HashSet, VecDeque};

use url::Url;

/// FIFO work queue plus the set of URLs already dequeued.
///
/// `queue` and `visited` are kept disjoint: a URL that has been visited is
/// never queued again, and a queued URL is not offered twice.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<String>,
    queued: HashSet<String>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a frontier holding the seeds in order, duplicates removed
    pub fn with_seeds<I, S>(seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut frontier = Self::new();
        for seed in seeds {
            frontier.offer(seed);
        }
        frontier
    }

    /// Enqueue a URL unless it was already visited or queued.
    ///
    /// Returns whether the URL was added.
    pub fn offer(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.visited.contains(&url) || self.queued.contains(&url) {
            return false;
        }
        self.queued.insert(url.clone());
        self.queue.push_back(url);
        true
    }

    /// Pop the oldest queued URL
    pub fn next_url(&mut self) -> Option<String> {
        let url = self.queue.pop_front()?;
        self.queued.remove(&url);
        Some(url)
    }

    /// Record that a URL has been dequeued, whatever its outcome
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Number of URLs waiting in the queue
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Number of distinct URLs dequeued so far
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Decides which discovered links are worth enqueuing.
///
/// A link is in scope when it is on the same host as the page it was found
/// on, or on one of the allowed secondary domains (the domain itself or any
/// subdomain of it).
#[derive(Debug, Clone, Default)]
pub struct LinkScope {
    allowed_domains: Vec<String>,
}

impl LinkScope {
    pub fn new<I, S>(allowed_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_domains: allowed_domains
                .into_iter()
                .map(|d| d.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn admits(&self, page: &Url, link: &Url) -> bool {
        if !matches!(link.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = link.host_str() else {
            return false;
        };
        let host = host.to_lowercase();

        if page
            .host_str()
            .is_some_and(|page_host| page_host.eq_ignore_ascii_case(&host))
        {
            return true;
        }

        self.allowed_domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut frontier = Frontier::with_seeds(["a", "b", "c"]);
        assert_eq!(frontier.next_url().as_deref(), Some("a"));
        assert_eq!(frontier.next_url().as_deref(), Some("b"));
        frontier.offer("d");
        assert_eq!(frontier.next_url().as_deref(), Some("c"));
        assert_eq!(frontier.next_url().as_deref(), Some("d"));
        assert!(frontier.next_url().is_none());
    }

    #[test]
    fn test_offer_is_idempotent() {
        let mut frontier = Frontier::with_seeds(["a", "a"]);
        assert_eq!(frontier.pending(), 1);
        assert!(!frontier.offer("a"));
        assert_eq!(frontier.pending(), 1);
    }

    #[test]
    fn test_visited_url_is_never_requeued() {
        let mut frontier = Frontier::with_seeds(["a"]);
        let url = frontier.next_url().unwrap();
        frontier.mark_visited(&url);

        assert!(!frontier.offer("a"));
        assert!(frontier.is_empty());
        assert!(frontier.is_visited("a"));
        assert_eq!(frontier.visited_count(), 1);
    }

    #[test]
    fn test_queue_and_visited_stay_disjoint() {
        let mut frontier = Frontier::with_seeds(["a", "b"]);
        while let Some(url) = frontier.next_url() {
            frontier.mark_visited(&url);
            for link in ["a", "b", "c"] {
                frontier.offer(link);
            }
            assert!(frontier.queue.iter().all(|u| !frontier.visited.contains(u)));
        }
        assert_eq!(frontier.visited_count(), 3);
    }

    #[test]
    fn test_scope_same_host() {
        let scope = LinkScope::new(Vec::<String>::new());
        let page = Url::parse("https://www.cnss.bf/accueil").unwrap();
        assert!(scope.admits(&page, &Url::parse("https://www.cnss.bf/prestations").unwrap()));
        assert!(!scope.admits(&page, &Url::parse("https://cnss.bf/").unwrap()));
        assert!(!scope.admits(&page, &Url::parse("https://twitter.com/cnss").unwrap()));
    }

    #[test]
    fn test_scope_allowed_domains() {
        let scope = LinkScope::new([".gov.bf", "lefaso.net"]);
        let page = Url::parse("https://www.cnss.bf/").unwrap();
        assert!(scope.admits(&page, &Url::parse("https://www.dgi.gov.bf/x").unwrap()));
        assert!(scope.admits(&page, &Url::parse("https://lefaso.net/spip.php").unwrap()));
        assert!(!scope.admits(&page, &Url::parse("https://notlefaso.net/").unwrap()));
        assert!(!scope.admits(&page, &Url::parse("ftp://www.dgi.gov.bf/").unwrap()));
    }
}
