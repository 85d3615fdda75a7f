//! Agent-backed generation pipelines.

pub mod digest;
pub mod driver;
pub mod enrich;
pub mod insight;
pub mod prompts;

pub use digest::{DigestPipeline, DigestSettings};
pub use driver::PipelineOutcome;
pub use enrich::enrich_digest;
pub use insight::InsightGenerator;
