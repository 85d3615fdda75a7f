//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the extraction library
//! without making real network calls.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{FetchError, FetchResult};
use crate::fetch::{FetchedPage, PageFetcher};

/// Canned outcome for a mocked URL.
#[derive(Debug, Clone)]
enum MockResponse {
    Page { status: u16, body: String },
    Failure(String),
    Timeout,
}

/// A mock fetcher that serves predefined responses.
///
/// Unknown URLs answer with an empty `404`, so robots.txt lookups fall back
/// to allow-all unless a test registers one.
#[derive(Default, Clone)]
pub struct MockFetcher {
    /// Predefined responses by URL
    responses: Arc<RwLock<HashMap<String, MockResponse>>>,

    /// Requested URLs in order, for assertions
    requests: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    /// Create an empty mock fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200 for `url`.
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.with_status(url, 200, body)
    }

    /// Serve `body` with an explicit status for `url`.
    pub fn with_status(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.insert(
            url.into(),
            MockResponse::Page {
                status,
                body: body.into(),
            },
        );
        self
    }

    /// Fail requests to `url` with a transport error.
    pub fn with_failure(self, url: impl Into<String>) -> Self {
        self.insert(url.into(), MockResponse::Failure("connection refused".into()));
        self
    }

    /// Fail requests to `url` with a timeout.
    pub fn with_timeout(self, url: impl Into<String>) -> Self {
        self.insert(url.into(), MockResponse::Timeout);
        self
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.read().unwrap().clone()
    }

    /// How many times `url` was requested.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .read()
            .unwrap()
            .iter()
            .filter(|requested| requested.as_str() == url)
            .count()
    }

    fn insert(&self, url: String, response: MockResponse) {
        self.responses.write().unwrap().insert(url, response);
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn get(&self, url: &str) -> FetchResult<FetchedPage> {
        self.requests.write().unwrap().push(url.to_string());

        let response = self.responses.read().unwrap().get(url).cloned();
        match response {
            Some(MockResponse::Page { status, body }) => Ok(FetchedPage::new(url, status, body)),
            Some(MockResponse::Failure(reason)) => Err(FetchError::Transport(reason.into())),
            Some(MockResponse::Timeout) => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
            None => Ok(FetchedPage::new(url, 404, "")),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
