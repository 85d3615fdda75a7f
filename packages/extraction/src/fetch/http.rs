//! HTTP-based fetcher implementation.

use async_trait::async_trait;
use reqwest::header::LOCATION;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::validator::UrlValidator;
use super::{FetchedPage, PageFetcher};
use crate::error::{FetchError, FetchResult};

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 5;

/// Fetcher backed by a shared `reqwest::Client`.
///
/// Every hop, the first request and each redirect target alike, is checked
/// with [`UrlValidator::validate_with_dns`] before a request is made, so
/// agent-supplied links cannot reach loopback or private addresses.
/// Redirects are followed here rather than by reqwest for that reason.
///
/// # Example
///
/// ```rust,ignore
/// use extraction::fetch::HttpFetcher;
///
/// let fetcher = HttpFetcher::new("HNReader")?;
/// let page = fetcher.get("https://example.com/robots.txt").await?;
/// ```
pub struct HttpFetcher {
    client: reqwest::Client,
    validator: Option<UrlValidator>,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout and SSRF validation.
    pub fn new(user_agent: &str) -> FetchResult<Self> {
        Self::with_timeout(user_agent, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a fetcher with a custom timeout.
    pub fn with_timeout(user_agent: &str, timeout: Duration) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| FetchError::Transport(Box::new(e)))?;

        Ok(Self {
            client,
            validator: Some(UrlValidator::new()),
        })
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Replace the URL validator.
    pub fn with_validator(mut self, validator: UrlValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Disable URL validation (local development against test servers).
    pub fn without_validation(mut self) -> Self {
        self.validator = None;
        self
    }
}

impl HttpFetcher {
    async fn send_once(&self, url: &str) -> FetchResult<reqwest::Response> {
        if let Some(validator) = &self.validator {
            validator.validate_with_dns(url).await?;
        }

        self.client.get(url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "HTTP request failed");
            transport_error(url, e)
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn get(&self, url: &str) -> FetchResult<FetchedPage> {
        debug!(url = %url, "HTTP fetch starting");
        let mut current = url.to_string();
        let mut hops = 0;

        let response = loop {
            let response = self.send_once(&current).await?;
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok());
            let Some(next) = redirect_target(&current, response.status().as_u16(), location)
            else {
                break response;
            };

            hops += 1;
            if hops > MAX_REDIRECTS {
                return Err(FetchError::TooManyRedirects {
                    url: url.to_string(),
                });
            }
            debug!(from = %current, to = %next, "Following redirect");
            current = next;
        };

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&current, e))?;

        debug!(url = %current, status, content_length = body.len(), "HTTP fetch finished");
        Ok(FetchedPage::new(current, status, body))
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport(Box::new(e))
    }
}

/// Absolute URL a redirect response points at, or `None` when the response
/// is final. A 3xx without a usable `Location` is treated as final.
fn redirect_target(current: &str, status: u16, location: Option<&str>) -> Option<String> {
    if !matches!(status, 301 | 302 | 303 | 307 | 308) {
        return None;
    }
    let base = Url::parse(current).ok()?;
    base.join(location?).ok().map(String::from)
}
