//! Data types shared across the digest core.

pub mod comment;
pub mod digest;
pub mod interest;
pub mod progress;
pub mod story;

pub use comment::FlatComment;
pub use digest::{DigestGroup, DigestOutput, DigestStory};
pub use interest::Interest;
pub use progress::{DigestProgress, GenerationProgress, InsightProgress, ProgressReporter};
pub use story::{SearchResponse, StoryHit};
