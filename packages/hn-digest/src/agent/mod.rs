//! Everything the pipelines need to run a confined agent session.

pub mod permission;
pub mod progress;
pub mod session;
pub mod tools;

pub use permission::{PermissionArgument, PermissionDecision, PermissionGate, PermissionRequest};
pub use progress::{SessionCommand, SessionProgress, AGENT_MIDPOINT};
pub use session::{
    resolve_model, start_session, AgentSession, AgentTransport, SessionConfig, SessionEvent,
    DEFAULT_MODEL, SUPPORTED_MODELS,
};
pub use tools::{
    digest_comments, CommentDigest, ReadCommentsTool, ScrapeArticleTool, Tool, ToolDefinition,
    ToolError, ToolRegistry,
};
