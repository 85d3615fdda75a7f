//! Robots-aware Article Extraction Library
//!
//! Fetches external article pages on behalf of a digest agent and reduces
//! them to bounded plain text, respecting each site's robots.txt and
//! remembering the page's lead image for later enrichment.
//!
//! # Usage
//!
//! ```rust,ignore
//! use extraction::{ContentExtractor, HttpFetcher};
//! use std::sync::Arc;
//!
//! let fetcher = Arc::new(HttpFetcher::new("HNReader")?);
//! let extractor = ContentExtractor::from_fetcher(fetcher);
//!
//! let text = extractor.extract_plain_text("https://example.com/post").await;
//! if let Some(Some(image)) = extractor.cached_image_url("https://example.com/post") {
//!     println!("lead image: {image}");
//! }
//! ```
//!
//! # Modules
//!
//! - [`fetch`] - The [`PageFetcher`] seam, an HTTP implementation and SSRF validation
//! - [`robots`] - robots.txt parsing and the per-domain [`PolicyCache`]
//! - [`html`] - Visible-text and lead-image helpers
//! - [`extractor`] - [`ContentExtractor`], tying it all together
//! - [`cache`] - The bounded concurrent map the caches are built on
//! - [`testing`] - Mock implementations for testing

pub mod cache;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod html;
pub mod image_cache;
pub mod robots;
pub mod testing;

pub use cache::BoundedCache;
pub use error::{FetchError, FetchResult, SecurityError};
pub use extractor::{
    error_marker, is_error_marker, ContentExtractor, ExtractorConfig, MAX_ERROR_MARKER_CHARS,
    ROBOTS_DENIED_MARKER, TIMEOUT_MARKER,
};
pub use fetch::{FetchedPage, HttpFetcher, PageFetcher, UrlValidator};
pub use html::{normalize_image_url, sanitize_image_url, TRUNCATION_MARKER};
pub use image_cache::ImageUrlCache;
pub use robots::{DomainPolicy, PolicyCache};
