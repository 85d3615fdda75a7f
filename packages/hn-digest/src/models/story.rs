use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A story as returned by the Algolia HN search API.
///
/// This is also the shape of the raw input file the digest agent reads,
/// so field names follow Algolia's JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryHit {
    #[serde(rename = "objectID")]
    pub id: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    /// Self-post body (HTML, entity-escaped)
    #[serde(default)]
    pub story_text: Option<String>,

    #[serde(default)]
    pub points: Option<i64>,

    #[serde(default)]
    pub num_comments: Option<i64>,

    pub created_at: DateTime<Utc>,
}

impl StoryHit {
    /// Numeric story id, if the Algolia id is numeric.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.parse().ok()
    }

    pub fn is_show_hn(&self) -> bool {
        self.title
            .as_deref()
            .is_some_and(|title| title.starts_with("Show HN:"))
    }

    pub fn is_ask_hn(&self) -> bool {
        self.title
            .as_deref()
            .is_some_and(|title| title.starts_with("Ask HN:"))
    }
}

/// Root of an Algolia search response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<StoryHit>,

    #[serde(rename = "nbHits", default)]
    pub total_hits: u64,
}
