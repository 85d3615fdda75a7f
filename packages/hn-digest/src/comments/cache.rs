//! Per-story cache of built comment forests.

use extraction::BoundedCache;
use std::sync::Arc;
use tracing::{debug, warn};

use super::tree::{build_tree, CommentNode};
use crate::hn::CommentSource;
use crate::models::FlatComment;

/// Default number of stories whose comment trees are kept.
pub const DEFAULT_MAX_STORIES: usize = 50;

/// Lists at least this long are built on the blocking pool.
pub const BLOCKING_BUILD_THRESHOLD: usize = 500;

/// Fetches, builds and caches comment forests per story id.
#[derive(Clone)]
pub struct CommentCache {
    source: Arc<dyn CommentSource>,
    trees: BoundedCache<u64, Arc<Vec<CommentNode>>>,
}

impl CommentCache {
    pub fn new(source: Arc<dyn CommentSource>) -> Self {
        Self::with_capacity(source, DEFAULT_MAX_STORIES)
    }

    pub fn with_capacity(source: Arc<dyn CommentSource>, max_stories: usize) -> Self {
        Self {
            source,
            trees: BoundedCache::new("comment_trees", max_stories),
        }
    }

    /// Return the forest for a story, fetching and building it on a miss.
    pub async fn get_or_fetch(&self, story_id: u64) -> Arc<Vec<CommentNode>> {
        if let Some(roots) = self.trees.get(&story_id) {
            debug!(story_id, "Comment tree cache hit");
            return roots;
        }

        let comments = self.source.fetch_comments(story_id).await;
        let roots = Arc::new(build_tree_off_thread(comments).await);
        self.trees.insert(story_id, Arc::clone(&roots));
        roots
    }

    /// Drop the cached forest for a story.
    pub fn invalidate(&self, story_id: u64) {
        self.trees.remove(&story_id);
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

/// Build a forest, moving large inputs onto the blocking pool.
pub async fn build_tree_off_thread(comments: Vec<FlatComment>) -> Vec<CommentNode> {
    if comments.len() < BLOCKING_BUILD_THRESHOLD {
        return build_tree(comments);
    }

    let count = comments.len();
    match tokio::task::spawn_blocking(move || build_tree(comments)).await {
        Ok(roots) => roots,
        Err(e) => {
            warn!(count, error = %e, "Comment tree build task failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::tree::forest_len;
    use crate::testing::MockCommentSource;

    #[tokio::test]
    async fn test_fetches_once_per_story() {
        let source = Arc::new(MockCommentSource::new().with_comments(
            7,
            vec![
                FlatComment::new(1, "a", "x", 0),
                FlatComment::new(2, "b", "y", 1),
            ],
        ));
        let cache = CommentCache::new(source.clone());

        let first = cache.get_or_fetch(7).await;
        let second = cache.get_or_fetch(7).await;

        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.fetch_count(7), 1);
    }

    #[tokio::test]
    async fn test_overflow_clears() {
        let source = Arc::new(MockCommentSource::new());
        let cache = CommentCache::with_capacity(source.clone(), 2);

        for story_id in 1..=3 {
            cache.get_or_fetch(story_id).await;
        }

        assert_eq!(cache.len(), 1);
        cache.get_or_fetch(1).await;
        assert_eq!(source.fetch_count(1), 2);
    }

    #[tokio::test]
    async fn test_large_lists_build_off_thread() {
        let comments: Vec<_> = (0..2000u64)
            .map(|i| FlatComment::new(i, "u", "t", (i % 4) as usize))
            .collect();

        let roots = build_tree_off_thread(comments).await;

        assert_eq!(roots.len(), 500);
        assert_eq!(forest_len(&roots), 2000);
    }
}
