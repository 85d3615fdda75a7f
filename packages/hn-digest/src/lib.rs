//! Hacker News digest core.
//!
//! Turns the last day of Hacker News into a digest grouped by the user's
//! interests. An agent does the writing; this crate prepares its inputs,
//! confines it to a knowledge-base folder and post-processes its output.
//!
//! # Usage
//!
//! ```rust,ignore
//! use hn_digest::pipeline::{DigestPipeline, PipelineOutcome};
//! use hn_digest::models::ProgressReporter;
//! use tokio_util::sync::CancellationToken;
//!
//! let (progress, mut updates) = ProgressReporter::channel();
//! let cancel = CancellationToken::new();
//!
//! match pipeline.run(&cancel, &progress).await {
//!     PipelineOutcome::Completed(digest) => println!("{} stories", digest.story_count()),
//!     PipelineOutcome::Cancelled => println!("cancelled"),
//!     PipelineOutcome::Failed(message) => eprintln!("{message}"),
//! }
//! ```
//!
//! # Modules
//!
//! - [`comments`] - Comment trees, their cache and markdown rendering
//! - [`vault`] - The sandboxed knowledge base and its files
//! - [`agent`] - Permission gate, tools and the agent session seam
//! - [`pipeline`] - Digest and story insight generation
//! - [`hn`] - Story and comment sources
//! - [`testing`] - Mock sources and a scripted agent transport

pub mod agent;
pub mod comments;
pub mod config;
pub mod error;
pub mod hn;
pub mod models;
pub mod pipeline;
pub mod testing;
pub mod vault;

pub use agent::{PermissionDecision, PermissionGate, PermissionRequest};
pub use comments::{build_tree, CommentCache, CommentNode};
pub use config::Config;
pub use error::{AgentError, DigestError, Result, VaultError};
pub use pipeline::{DigestPipeline, DigestSettings, InsightGenerator, PipelineOutcome};
pub use vault::{SandboxRoot, VaultFiles};
