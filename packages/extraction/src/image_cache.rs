//! Lead-image URLs discovered during extraction, keyed by page URL.

use crate::cache::BoundedCache;

/// Default number of pages remembered.
pub const DEFAULT_MAX_IMAGES: usize = 1024;

/// Cache of lead-image URLs.
///
/// Populated only by [`ContentExtractor`](crate::ContentExtractor) as a side
/// effect of a successful page fetch. A page with no usable image is still
/// recorded (as `None`) so callers can tell "no image" from "never scraped".
#[derive(Clone, Debug)]
pub struct ImageUrlCache {
    entries: BoundedCache<String, Option<String>>,
}

impl Default for ImageUrlCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGES)
    }
}

impl ImageUrlCache {
    /// Create a cache remembering at most `max_pages` pages.
    pub fn new(max_pages: usize) -> Self {
        Self {
            entries: BoundedCache::new("image_urls", max_pages),
        }
    }

    /// Look up the image recorded for `page_url`.
    ///
    /// Outer `None`: the page was never extracted. `Some(None)`: it was,
    /// but had no usable image.
    pub fn get(&self, page_url: &str) -> Option<Option<String>> {
        self.entries.get(&page_url.to_string())
    }

    pub(crate) fn record(&self, page_url: &str, image_url: Option<String>) {
        self.entries.insert(page_url.to_string(), image_url);
    }

    /// Number of pages recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
