//! Comment trees: building, caching and rendering.

pub mod cache;
pub mod markdown;
pub mod tree;

pub use cache::CommentCache;
pub use markdown::{html_to_plain_text, story_markdown, StoryDocument};
pub use tree::{build_tree, CommentNode};
