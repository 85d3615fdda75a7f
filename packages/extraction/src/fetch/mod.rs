//! Page fetching abstraction.
//!
//! Everything that touches the network goes through [`PageFetcher`], so the
//! policy cache and extractor can be exercised against
//! [`MockFetcher`](crate::testing::MockFetcher) in tests.

pub mod http;
pub mod validator;

use async_trait::async_trait;

use crate::error::FetchResult;

pub use http::HttpFetcher;
pub use validator::UrlValidator;

/// A fetched HTTP response body.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL that was requested
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Response body as text
    pub body: String,
}

impl FetchedPage {
    /// Create a page with an explicit status.
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches raw response bodies.
///
/// Implementations return `Ok` for any response the server produced, even
/// non-2xx ones; callers decide what a status means. Transport failures
/// (DNS, TLS, timeouts) are `Err`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET a URL.
    async fn get(&self, url: &str) -> FetchResult<FetchedPage>;

    /// Name for logs.
    fn name(&self) -> &str;
}
