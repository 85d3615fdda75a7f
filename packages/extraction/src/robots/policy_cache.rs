//! Shared per-domain robots.txt policy cache.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use super::policy::DomainPolicy;
use crate::cache::BoundedCache;
use crate::fetch::PageFetcher;

/// Default number of domains kept before the cache is cleared.
pub const DEFAULT_MAX_DOMAINS: usize = 512;

/// Answers "may `identity` fetch this URL?" using cached robots.txt policies.
///
/// Every failure along the way (unparseable URL, network error) resolves
/// to *allow*: the extractor has to stay usable when robots.txt is
/// unreachable. Missing robots.txt files cache an allow-all policy for an
/// hour so they get re-checked.
#[derive(Clone)]
pub struct PolicyCache {
    fetcher: Arc<dyn PageFetcher>,
    policies: BoundedCache<String, DomainPolicy>,
}

impl PolicyCache {
    /// Create a cache that fetches robots.txt through `fetcher`.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_capacity(fetcher, DEFAULT_MAX_DOMAINS)
    }

    /// Create a cache with a custom domain bound.
    pub fn with_capacity(fetcher: Arc<dyn PageFetcher>, max_domains: usize) -> Self {
        Self {
            fetcher,
            policies: BoundedCache::new("robots_policies", max_domains),
        }
    }

    /// Check whether `identity` may fetch `url`.
    pub async fn is_allowed(&self, url: &str, identity: &str) -> bool {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(url = %url, error = %e, "robots.txt check skipped: invalid URL, allowing");
                return true;
            }
        };

        let Some(domain) = domain_of(&parsed) else {
            warn!(url = %url, "robots.txt check skipped: URL has no host, allowing");
            return true;
        };
        let path = path_and_query(&parsed);

        if let Some(policy) = self.cached(&domain) {
            return policy.is_path_allowed(&path);
        }

        let policy = match self.fetch_policy(&domain, identity).await {
            Some(policy) => policy,
            None => return true,
        };

        let allowed = policy.is_path_allowed(&path);
        self.policies.insert(domain, policy);
        allowed
    }

    /// Return a non-expired cached policy for a domain.
    pub fn cached(&self, domain: &str) -> Option<DomainPolicy> {
        self.policies
            .get(&domain.to_string())
            .filter(|policy| !policy.is_expired(Utc::now()))
    }

    /// Insert a policy directly, replacing any previous one for its domain.
    pub fn insert(&self, policy: DomainPolicy) {
        self.policies.insert(policy.domain.clone(), policy);
    }

    /// Number of domains currently cached (expired entries included).
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether no domain has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    async fn fetch_policy(&self, domain: &str, identity: &str) -> Option<DomainPolicy> {
        let robots_url = format!("{}/robots.txt", domain);

        match self.fetcher.get(&robots_url).await {
            Ok(page) if page.is_success() => {
                let policy = DomainPolicy::parse(domain, &page.body, identity, Utc::now());
                debug!(
                    domain = %domain,
                    disallowed = policy.disallowed.len(),
                    "Parsed robots.txt"
                );
                Some(policy)
            }
            Ok(page) => {
                // No robots.txt or error - allow all
                debug!(domain = %domain, status = page.status, "No robots.txt, allowing by default");
                Some(DomainPolicy::allow_all(domain, Utc::now()))
            }
            Err(e) => {
                warn!(domain = %domain, error = %e, "Error checking robots.txt, allowing");
                None
            }
        }
    }
}

/// `scheme://host` for a URL (port dropped, matching how policies are keyed).
pub fn domain_of(url: &Url) -> Option<String> {
    url.host_str()
        .map(|host| format!("{}://{}", url.scheme(), host))
}

fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use chrono::Duration;

    const IDENTITY: &str = "HNReader";

    #[tokio::test]
    async fn test_fetches_once_per_domain() {
        let fetcher = Arc::new(
            MockFetcher::new().with_page(
                "https://example.com/robots.txt",
                "User-agent: *\nDisallow: /private",
            ),
        );
        let cache = PolicyCache::new(fetcher.clone());

        assert!(cache.is_allowed("https://example.com/post", IDENTITY).await);
        assert!(!cache.is_allowed("https://example.com/private/x", IDENTITY).await);
        assert!(cache.is_allowed("https://example.com/other?q=1", IDENTITY).await);

        assert_eq!(fetcher.request_count("https://example.com/robots.txt"), 1);
    }

    #[tokio::test]
    async fn test_missing_robots_allows_and_caches_short() {
        let fetcher = Arc::new(MockFetcher::new());
        let cache = PolicyCache::new(fetcher.clone());

        assert!(cache.is_allowed("https://nosite.com/a", IDENTITY).await);

        let policy = cache.cached("https://nosite.com").unwrap();
        assert!(policy.disallowed.is_empty());
        assert!(policy.expires_at <= Utc::now() + Duration::hours(1));
    }

    #[tokio::test]
    async fn test_network_failure_allows_without_caching() {
        let fetcher = Arc::new(MockFetcher::new().with_failure("https://down.com/robots.txt"));
        let cache = PolicyCache::new(fetcher.clone());

        assert!(cache.is_allowed("https://down.com/a", IDENTITY).await);
        assert!(cache.cached("https://down.com").is_none());
    }

    #[tokio::test]
    async fn test_expired_policy_is_refetched() {
        let fetcher = Arc::new(
            MockFetcher::new().with_page("https://example.com/robots.txt", "User-agent: *\n"),
        );
        let cache = PolicyCache::new(fetcher.clone());

        let mut stale = DomainPolicy::parse(
            "https://example.com",
            "User-agent: *\nDisallow: /",
            IDENTITY,
            Utc::now() - Duration::hours(48),
        );
        stale.expires_at = Utc::now() - Duration::hours(1);
        cache.insert(stale);

        assert!(cache.is_allowed("https://example.com/post", IDENTITY).await);
        assert_eq!(fetcher.request_count("https://example.com/robots.txt"), 1);
    }

    #[tokio::test]
    async fn test_disallow_all_denies_every_path() {
        let fetcher = Arc::new(
            MockFetcher::new().with_page("https://blocked.com/robots.txt", "User-agent: *\nDisallow: /"),
        );
        let cache = PolicyCache::new(fetcher);

        assert!(!cache.is_allowed("https://blocked.com/", IDENTITY).await);
        assert!(!cache.is_allowed("https://blocked.com/a/b", IDENTITY).await);
    }

    #[tokio::test]
    async fn test_invalid_url_allows() {
        let cache = PolicyCache::new(Arc::new(MockFetcher::new()));
        assert!(cache.is_allowed("not a url", IDENTITY).await);
    }

    #[tokio::test]
    async fn test_concurrent_domains() {
        let fetcher = Arc::new(MockFetcher::new());
        let cache = PolicyCache::new(fetcher);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache
                        .is_allowed(&format!("https://site{}.com/page", i), IDENTITY)
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(cache.len(), 16);
    }
}
