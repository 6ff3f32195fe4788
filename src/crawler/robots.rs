//! Politeness: robots.txt compliance and per-host request pacing.
//!
//! Each origin's robots.txt is fetched at most once per run and shared by all
//! workers. A policy that cannot be retrieved permits everything; absence of
//! a policy is not a prohibition.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument};
use url::Url;

use crate::crawler::fetcher::Fetcher;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    allow: bool,
    pattern: String,
}

#[derive(Debug, Clone, Default)]
struct Group {
    agents: Vec<String>,
    rules: Vec<Rule>,
}

/// Parsed robots.txt rules
#[derive(Debug, Clone, Default)]
pub struct RobotsTxt {
    groups: Vec<Group>,
}

impl RobotsTxt {
    /// A policy that permits every path
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parse robots.txt content.
    ///
    /// Consecutive `User-agent` lines share the rules that follow them.
    /// Unknown directives are ignored.
    pub fn parse(content: &str) -> Self {
        let mut groups: Vec<Group> = Vec::new();
        let mut collecting_agents = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    if !collecting_agents {
                        groups.push(Group::default());
                        collecting_agents = true;
                    }
                    if let Some(group) = groups.last_mut() {
                        group.agents.push(value.to_lowercase());
                    }
                }
                "allow" | "disallow" => {
                    collecting_agents = false;
                    // An empty Disallow allows everything; an empty Allow says nothing
                    if value.is_empty() {
                        continue;
                    }
                    if let Some(group) = groups.last_mut() {
                        group.rules.push(Rule {
                            allow: directive == "allow",
                            pattern: value.to_string(),
                        });
                    }
                }
                _ => {}
            }
        }

        Self { groups }
    }

    /// Check whether `agent` may fetch `path` (path plus optional query).
    ///
    /// Groups naming the agent take precedence over `*`. Among matching rules
    /// the longest pattern wins; on a tie, Allow wins.
    pub fn is_allowed(&self, agent: &str, path: &str) -> bool {
        let agent = agent.to_lowercase();

        let specific: Vec<&Group> = self
            .groups
            .iter()
            .filter(|g| g.agents.iter().any(|a| a != "*" && agent.contains(a.as_str())))
            .collect();
        let groups = if specific.is_empty() {
            self.groups
                .iter()
                .filter(|g| g.agents.iter().any(|a| a == "*"))
                .collect()
        } else {
            specific
        };

        let mut best: Option<&Rule> = None;
        for rule in groups.iter().flat_map(|g| g.rules.iter()) {
            if !pattern_matches(&rule.pattern, path) {
                continue;
            }
            best = match best {
                Some(current)
                    if current.pattern.len() > rule.pattern.len()
                        || (current.pattern.len() == rule.pattern.len() && current.allow) =>
                {
                    Some(current)
                }
                _ => Some(rule),
            };
        }

        best.is_none_or(|rule| rule.allow)
    }
}

/// Match a robots path pattern supporting `*` wildcards and a trailing `$`
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(p) => (p, true),
        None => (pattern, false),
    };

    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = path.strip_prefix(first) else {
        return false;
    };

    let parts: Vec<&str> = parts.collect();
    if parts.is_empty() {
        return !anchored || rest.is_empty();
    }

    for (i, part) in parts.iter().enumerate() {
        if anchored && i == parts.len() - 1 {
            return rest.ends_with(part);
        }
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    true
}

/// Robots.txt cache plus the per-host rate limiter shared by crawl workers
pub struct PolitenessGuard {
    fetcher: Fetcher,
    agent: String,
    policies: Mutex<HashMap<String, Arc<OnceCell<RobotsTxt>>>>,
    limiter: Option<DefaultKeyedRateLimiter<String>>,
}

impl PolitenessGuard {
    /// Create a guard evaluating robots rules for `agent`.
    ///
    /// A zero `delay` disables request pacing.
    pub fn new(fetcher: Fetcher, agent: impl Into<String>, delay: Duration) -> Self {
        let limiter = Quota::with_period(delay)
            .map(|quota| RateLimiter::keyed(quota.allow_burst(NonZeroU32::MIN)));
        Self {
            fetcher,
            agent: agent.into(),
            policies: Mutex::new(HashMap::new()),
            limiter,
        }
    }

    /// Whether the origin's robots.txt lets us fetch `url`
    #[instrument(skip(self), fields(url = %url), level = "debug")]
    pub async fn allowed(&self, url: &Url) -> bool {
        let origin = url.origin();
        if !origin.is_tuple() {
            return true;
        }
        let origin = origin.ascii_serialization();

        let cell = {
            let mut policies = self.policies.lock().await;
            policies.entry(origin.clone()).or_default().clone()
        };
        let policy = cell.get_or_init(|| self.load_policy(&origin)).await;

        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        policy.is_allowed(&self.agent, &path)
    }

    /// Wait until another request to `url`'s host is permitted
    pub async fn wait_turn(&self, url: &Url) {
        if let (Some(limiter), Some(host)) = (&self.limiter, url.host_str()) {
            limiter.until_key_ready(&host.to_lowercase()).await;
        }
    }

    async fn load_policy(&self, origin: &str) -> RobotsTxt {
        let robots_url = match Url::parse(&format!("{origin}/robots.txt")) {
            Ok(url) => url,
            Err(e) => {
                debug!("Robots URL for {} invalid, permitting: {}", origin, e);
                return RobotsTxt::allow_all();
            }
        };

        match self.fetcher.fetch(&robots_url).await {
            Ok(doc) => {
                debug!("Loaded robots.txt for {}", origin);
                RobotsTxt::parse(&doc.decode_text())
            }
            Err(e) => {
                info!("robots.txt unavailable for {}, permitting: {}", origin, e);
                RobotsTxt::allow_all()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[test]
    fn test_parse_basic() {
        let content = r#"
User-agent: *
Disallow: /private/
Disallow: /admin/ # staff only
Allow: /public/
Crawl-delay: 2

Sitemap: https://example.com/sitemap.xml
        "#;

        let robots = RobotsTxt::parse(content);

        assert!(robots.is_allowed("TestBot", "/public/page"));
        assert!(!robots.is_allowed("TestBot", "/private/page"));
        assert!(!robots.is_allowed("TestBot", "/admin/"));
        assert!(robots.is_allowed("TestBot", "/other/page"));
    }

    #[test]
    fn test_specific_user_agent() {
        let content = r#"
User-agent: *
Disallow: /

User-agent: resourcecollector
Disallow:
        "#;

        let robots = RobotsTxt::parse(content);

        assert!(!robots.is_allowed("BadBot", "/page"));
        assert!(robots.is_allowed("ResourceCollector", "/page"));
    }

    #[test]
    fn test_grouped_user_agents_share_rules() {
        let content = "User-agent: alpha\nUser-agent: beta\nDisallow: /x\n";
        let robots = RobotsTxt::parse(content);

        assert!(!robots.is_allowed("alpha", "/x/1"));
        assert!(!robots.is_allowed("beta", "/x/1"));
        assert!(robots.is_allowed("gamma", "/x/1"));
    }

    #[test]
    fn test_longest_match_wins() {
        let content = r#"
User-agent: *
Disallow: /private/
Allow: /private/public/
Disallow: /private/public/secret
        "#;

        let robots = RobotsTxt::parse(content);

        assert!(!robots.is_allowed("Bot", "/private/secret"));
        assert!(robots.is_allowed("Bot", "/private/public/page"));
        assert!(!robots.is_allowed("Bot", "/private/public/secret.html"));
    }

    #[test]
    fn test_wildcards() {
        let content = "User-agent: *\nDisallow: /*.pdf$\nDisallow: /search*q=\n";
        let robots = RobotsTxt::parse(content);

        assert!(!robots.is_allowed("Bot", "/docs/loi.pdf"));
        assert!(robots.is_allowed("Bot", "/docs/loi.pdf.html"));
        assert!(!robots.is_allowed("Bot", "/search?lang=fr&q=impots"));
        assert!(robots.is_allowed("Bot", "/search"));
    }

    #[test]
    fn test_empty_robots() {
        let robots = RobotsTxt::parse("");
        assert!(robots.is_allowed("AnyBot", "/any/path"));
    }

    fn guard() -> PolitenessGuard {
        let fetcher = Fetcher::new("test-agent", Duration::from_secs(5)).unwrap();
        PolitenessGuard::new(fetcher, "ResourceCollector", Duration::ZERO)
    }

    #[tokio::test]
    async fn test_guard_denies_and_caches() {
        let mut server = Server::new_async().await;
        let robots = server
            .mock("GET", "/robots.txt")
            .with_status(200)
            .with_body("User-agent: *\nDisallow: /private\n")
            .expect(1)
            .create_async()
            .await;

        let guard = guard();
        let private = Url::parse(&format!("{}/private/doc", server.url())).unwrap();
        let public = Url::parse(&format!("{}/public", server.url())).unwrap();

        assert!(!guard.allowed(&private).await);
        assert!(guard.allowed(&public).await);
        robots.assert_async().await;
    }

    #[tokio::test]
    async fn test_guard_permits_when_robots_missing() {
        let mut server = Server::new_async().await;
        let _robots = server
            .mock("GET", "/robots.txt")
            .with_status(404)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/anything", server.url())).unwrap();
        assert!(guard().allowed(&url).await);
    }

    #[tokio::test]
    async fn test_guard_permits_when_host_unreachable() {
        let url = Url::parse("http://127.0.0.1:1/page").unwrap();
        assert!(guard().allowed(&url).await);
    }
}
