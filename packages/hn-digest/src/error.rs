//! Typed errors for the digest core.
//!
//! Library code returns these; `anyhow` only shows up at the edges
//! (configuration, the CLI, the HN REST clients).

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by knowledge-base file operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// No vault folder has been selected
    #[error("vault path is not set; select a vault folder before performing file operations")]
    NotConfigured,

    /// Path resolves outside the sandbox root
    #[error("access denied: path '{path}' resolves outside the knowledge base")]
    AccessDenied { path: String },

    /// Underlying filesystem failure
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Digest content is not a valid digest document
    #[error("invalid digest: {0}")]
    InvalidDigest(String),
}

impl VaultError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by the agent session layer.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The session could not be created
    #[error("failed to start agent session: {0}")]
    Start(String),

    /// Sending a prompt or aborting failed
    #[error("agent transport error: {0}")]
    Transport(String),

    /// The agent reported an error event
    #[error("agent error: {0}")]
    Session(String),

    /// The event stream ended before the session went idle
    #[error("agent session closed before finishing")]
    Closed,
}

/// Errors raised by the digest and insight pipelines.
#[derive(Debug, Error)]
pub enum DigestError {
    /// Knowledge-base operation failed
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Agent session failed
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Story or comment source failed
    #[error("story source error: {0}")]
    Source(String),

    /// The agent finished without a readable digest file
    #[error("agent did not produce a digest")]
    MissingDigest,

    /// The agent finished without returning any text
    #[error("no response received from agent")]
    EmptyResponse,

    /// The run was cancelled by the caller
    #[error("cancelled")]
    Cancelled,
}

/// Result type alias for vault operations.
pub type VaultResult<T> = std::result::Result<T, VaultError>;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, DigestError>;
