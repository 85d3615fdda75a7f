//! Hacker News data sources.
//!
//! The REST clients are thin collaborators; the pipeline only sees these
//! traits so tests can swap in [`crate::testing`] mocks.

pub mod algolia;
pub mod web;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{FlatComment, StoryHit};

pub use algolia::AlgoliaClient;
pub use web::HnWebClient;

/// Source of story metadata.
#[async_trait]
pub trait StorySource: Send + Sync {
    /// Stories created after `since`, at most `limit` of them.
    async fn recent_stories(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<StoryHit>>;

    /// A single story by id.
    async fn story(&self, story_id: u64) -> anyhow::Result<StoryHit>;
}

/// Source of flat, depth-annotated comments for a story.
#[async_trait]
pub trait CommentSource: Send + Sync {
    /// Comments in page order. Failures yield an empty list.
    async fn fetch_comments(&self, story_id: u64) -> Vec<FlatComment>;
}
