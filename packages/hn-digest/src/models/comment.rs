use serde::{Deserialize, Serialize};

/// A comment scraped from a discussion page, before nesting is rebuilt.
///
/// `depth` comes straight from the page markup and is never inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatComment {
    /// HN item id
    pub id: u64,

    /// Username of the commenter
    pub author: String,

    /// Comment body as HTML
    pub raw_text: String,

    /// Nesting level, 0 for top-level comments
    pub depth: usize,

    /// Unix timestamp (seconds)
    pub timestamp: i64,
}

impl FlatComment {
    pub fn new(id: u64, author: impl Into<String>, raw_text: impl Into<String>, depth: usize) -> Self {
        Self {
            id,
            author: author.into(),
            raw_text: raw_text.into(),
            depth,
            timestamp: 0,
        }
    }

    /// Set the timestamp.
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}
