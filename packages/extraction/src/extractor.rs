//! Robots-aware plain-text extraction for external articles.

use scraper::Html;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{FetchError, FetchResult, SecurityError};
use crate::fetch::{FetchedPage, HttpFetcher, PageFetcher};
use crate::html::{lead_image_url, truncate_chars, visible_text};
use crate::image_cache::ImageUrlCache;
use crate::robots::PolicyCache;

/// Longest error marker returned to callers.
pub const MAX_ERROR_MARKER_CHARS: usize = 300;

/// Marker returned when robots.txt forbids the fetch.
pub const ROBOTS_DENIED_MARKER: &str = "[Error: Scraping not allowed by site's robots.txt]";

/// Marker returned when the request times out.
pub const TIMEOUT_MARKER: &str = "[Error: Request timeout - site took too long to respond]";

/// Configuration for content extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Character budget for extracted text (before the truncation marker).
    ///
    /// Default: 5000.
    pub max_chars: usize,

    /// Identity matched against robots.txt `User-agent` sections.
    ///
    /// Should match the User-Agent the fetcher sends. Default: `HNReader`.
    pub identity: String,

    /// User-Agent header sent by [`ExtractorConfig::http_fetcher`].
    pub user_agent: String,

    /// Request timeout used when building the default HTTP fetcher.
    pub timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_chars: 5000,
            identity: "HNReader".to_string(),
            user_agent: "HNReader".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ExtractorConfig {
    /// Set the character budget.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Set the robots.txt identity.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Set the User-Agent header for the default fetcher.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the default HTTP fetcher for this configuration.
    pub fn http_fetcher(&self) -> FetchResult<HttpFetcher> {
        HttpFetcher::with_timeout(&self.user_agent, self.timeout)
    }
}

/// Fetches external pages and reduces them to bounded plain text.
///
/// Never fails: every problem becomes a short `[Error: ...]` marker so a
/// batch of scrapes (or an agent's tool loop) keeps going. Lead images are
/// recorded in the shared [`ImageUrlCache`] as a side effect.
///
/// # Example
///
/// ```rust,ignore
/// use extraction::{ContentExtractor, HttpFetcher};
///
/// let extractor = ContentExtractor::from_fetcher(Arc::new(HttpFetcher::new("HNReader")?));
/// let text = extractor.extract_plain_text("https://example.com/post").await;
/// let image = extractor.cached_image_url("https://example.com/post");
/// ```
#[derive(Clone)]
pub struct ContentExtractor {
    fetcher: Arc<dyn PageFetcher>,
    policies: PolicyCache,
    images: ImageUrlCache,
    config: ExtractorConfig,
}

impl ContentExtractor {
    /// Create an extractor from explicit collaborators.
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        policies: PolicyCache,
        images: ImageUrlCache,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            fetcher,
            policies,
            images,
            config,
        }
    }

    /// Create an extractor with fresh caches and default configuration.
    pub fn from_fetcher(fetcher: Arc<dyn PageFetcher>) -> Self {
        let policies = PolicyCache::new(Arc::clone(&fetcher));
        Self::new(
            fetcher,
            policies,
            ImageUrlCache::default(),
            ExtractorConfig::default(),
        )
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    /// Fetch `url` and return its visible text, or an error marker.
    pub async fn extract_plain_text(&self, url: &str) -> String {
        if !self.policies.is_allowed(url, &self.config.identity).await {
            info!(url = %url, "Blocked by robots.txt");
            return ROBOTS_DENIED_MARKER.to_string();
        }

        let page = match self.fetcher.get(url).await {
            Ok(page) if page.is_success() => page,
            Ok(page) => {
                warn!(url = %url, status = page.status, "Non-success status scraping page");
                return error_marker(&format!(
                    "HTTP request failed - response status code {}",
                    page.status
                ));
            }
            Err(e) => return fetch_error_marker(url, &e),
        };

        self.process_page(url, &page)
    }

    /// Look up the lead image recorded by a previous extraction of `url`.
    ///
    /// Pure cache lookup: outer `None` means `url` was never successfully
    /// fetched, `Some(None)` means it was but had no usable image.
    pub fn cached_image_url(&self, url: &str) -> Option<Option<String>> {
        self.images.get(url)
    }

    /// Shared image cache handle.
    pub fn image_cache(&self) -> &ImageUrlCache {
        &self.images
    }

    /// Shared robots policy cache handle.
    pub fn policy_cache(&self) -> &PolicyCache {
        &self.policies
    }

    /// Current configuration.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    // The parsed document is not `Send`; keep it out of any `.await`.
    fn process_page(&self, url: &str, page: &FetchedPage) -> String {
        let document = Html::parse_document(&page.body);

        // Image first: the containers it looks at are stripped below
        let image_url = lead_image_url(&document, url);
        if let Some(image) = &image_url {
            debug!(url = %url, image = %image, "Cached lead image");
        }
        self.images.record(url, image_url);

        let text = truncate_chars(visible_text(&document), self.config.max_chars);
        debug!(url = %url, chars = text.chars().count(), "Scraped page");
        text
    }
}

fn fetch_error_marker(url: &str, error: &FetchError) -> String {
    match error {
        FetchError::Timeout { .. } => {
            warn!(url = %url, "Timeout scraping page");
            TIMEOUT_MARKER.to_string()
        }
        FetchError::Transport(e) => {
            warn!(url = %url, error = %e, "HTTP error scraping page");
            error_marker(&format!("HTTP request failed - {}", e))
        }
        FetchError::TooManyRedirects { .. } => {
            warn!(url = %url, "Redirect limit reached scraping page");
            error_marker("HTTP request failed - too many redirects")
        }
        FetchError::Rejected(SecurityError::Malformed(_)) => {
            warn!(url = %url, "Invalid URL");
            error_marker("Failed to scrape article - invalid URL")
        }
        FetchError::Rejected(e) => {
            warn!(url = %url, error = %e, "Rejected URL");
            error_marker(&format!("URL rejected - {}", e))
        }
    }
}

/// Wrap a message as `[Error: ...]`, bounded to [`MAX_ERROR_MARKER_CHARS`].
pub fn error_marker(message: &str) -> String {
    let budget = MAX_ERROR_MARKER_CHARS - "[Error: ]".len();
    let message: String = if message.chars().count() > budget {
        let mut cut: String = message.chars().take(budget - 3).collect();
        cut.push_str("...");
        cut
    } else {
        message.to_string()
    };
    format!("[Error: {}]", message)
}

/// Whether a string returned by the extractor is an error marker.
pub fn is_error_marker(text: &str) -> bool {
    text.starts_with("[Error: ")
}
