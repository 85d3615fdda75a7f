//! The sandboxed knowledge base the agent works in.

pub mod files;
pub mod sandbox;
pub mod templates;

pub use files::{
    VaultFiles, AGENT_INSTRUCTIONS_FILE_NAME, DIGEST_FILE_NAME, KNOWLEDGE_BASE_FOLDER,
    NEWS_DIGEST_FOLDER, STORIES_FOLDER, UNPROCESSED_DIGEST_DATA_FILE_NAME,
};
pub use sandbox::{normalize_path, SandboxRoot};
