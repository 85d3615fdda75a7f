//! Tools exposed to the agent during a session.
//!
//! Tools have typed arguments and outputs; [`ErasedTool`] lets a
//! [`ToolRegistry`] hold them side by side and dispatch JSON calls by name.

use async_trait::async_trait;
use extraction::ContentExtractor;
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

use crate::hn::CommentSource;
use crate::models::FlatComment;

/// A capability offered to the agent, with typed input and output.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the agent calls the tool by.
    const NAME: &'static str;

    type Args: DeserializeOwned + JsonSchema + Send;
    type Output: Serialize + Send;
    type Error: std::error::Error + Send + Sync + 'static;

    fn description(&self) -> &str;

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: self.description().into(),
            input_schema: serde_json::to_value(schema_for!(Self::Args)).unwrap_or_default(),
        }
    }
}

/// What a transport advertises to the model for one tool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Object-safe view of a [`Tool`] that speaks JSON strings.
#[async_trait]
pub trait ErasedTool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn invoke_json(&self, arguments: &str) -> Result<String, ToolError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Rejected by the session's permission gate.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid tool arguments: {0}")]
    BadArguments(String),

    #[error("tool failed: {0}")]
    Failed(String),

    #[error("could not encode tool result: {0}")]
    Encode(String),
}

#[async_trait]
impl<T: Tool> ErasedTool for T {
    fn definition(&self) -> ToolDefinition {
        Tool::definition(self)
    }

    async fn invoke_json(&self, arguments: &str) -> Result<String, ToolError> {
        let args = serde_json::from_str::<T::Args>(arguments)
            .map_err(|e| ToolError::BadArguments(e.to_string()))?;
        match self.call(args).await {
            Ok(output) => {
                serde_json::to_string(&output).map_err(|e| ToolError::Encode(e.to_string()))
            }
            Err(e) => Err(ToolError::Failed(e.to_string())),
        }
    }
}

/// Named set of tools available to one session.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ErasedTool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any tool with the same name.
    pub fn register<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.insert(T::NAME.to_string(), Arc::new(tool));
        self
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch a call by name with JSON arguments. Callers outside the
    /// crate go through [`SessionConfig::call_tool`](super::SessionConfig::call_tool).
    pub(crate) async fn call(&self, name: &str, arguments: &str) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.invoke_json(arguments).await
    }
}

// =============================================================================
// scrape_article
// =============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ScrapeArticleArgs {
    /// The full URL of the external article to scrape
    pub url: String,
}

/// Fetches an external article as plain text.
///
/// Never fails: scraping problems come back as `[Error: ...]` text.
pub struct ScrapeArticleTool {
    extractor: ContentExtractor,
}

impl ScrapeArticleTool {
    pub fn new(extractor: ContentExtractor) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl Tool for ScrapeArticleTool {
    const NAME: &'static str = "scrape_article";
    type Args = ScrapeArticleArgs;
    type Output = String;
    type Error = Infallible;

    fn description(&self) -> &str {
        "Fetch an external article URL and return its plain-text content"
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        debug!(url = %args.url, "scrape_article called");
        Ok(self.extractor.extract_plain_text(&args.url).await)
    }
}

// =============================================================================
// read_comments
// =============================================================================

/// Deepest comment level returned.
pub const MAX_COMMENT_DEPTH: usize = 2;

/// Most comments returned per call.
pub const MAX_COMMENTS_TO_RETURN: usize = 15;

/// Per-comment character cap (before the `...` suffix).
pub const MAX_COMMENT_LENGTH: usize = 500;

/// Character budget across all returned comments.
pub const MAX_TOTAL_COMMENT_CHARS: usize = 4000;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadCommentsArgs {
    /// The Hacker News story/object ID to fetch comments for
    #[serde(alias = "storyId")]
    pub story_id: u64,
}

/// Trimmed discussion sample returned to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDigest {
    pub status: String,
    pub total_comment_count: usize,
    pub returned_comment_count: usize,
    pub comments: Vec<CommentExcerpt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentExcerpt {
    pub author: String,
    pub depth: usize,
    pub text: String,
}

/// Fetches a story's comments, capped to fit the agent's context.
pub struct ReadCommentsTool {
    comments: Arc<dyn CommentSource>,
}

impl ReadCommentsTool {
    pub fn new(comments: Arc<dyn CommentSource>) -> Self {
        Self { comments }
    }
}

#[async_trait]
impl Tool for ReadCommentsTool {
    const NAME: &'static str = "read_comments";
    type Args = ReadCommentsArgs;
    type Output = CommentDigest;
    type Error = Infallible;

    fn description(&self) -> &str {
        "Fetch comments for a Hacker News story"
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        debug!(story_id = args.story_id, "read_comments called");
        let comments = self.comments.fetch_comments(args.story_id).await;
        Ok(digest_comments(&comments))
    }
}

/// Apply the context-budget caps to a flat comment list.
///
/// Blank and deep comments are skipped; long comments are cut to
/// [`MAX_COMMENT_LENGTH`] characters plus `...`; collection stops at
/// [`MAX_COMMENTS_TO_RETURN`] comments or before the total would exceed
/// [`MAX_TOTAL_COMMENT_CHARS`].
pub fn digest_comments(comments: &[FlatComment]) -> CommentDigest {
    let mut excerpts = Vec::new();
    let mut total_chars = 0;

    let eligible = comments
        .iter()
        .filter(|comment| !comment.raw_text.trim().is_empty() && comment.depth <= MAX_COMMENT_DEPTH);

    for comment in eligible {
        if excerpts.len() >= MAX_COMMENTS_TO_RETURN {
            break;
        }

        let text = cap_chars(&comment.raw_text, MAX_COMMENT_LENGTH);
        let length = text.chars().count();
        if total_chars + length > MAX_TOTAL_COMMENT_CHARS {
            break;
        }

        total_chars += length;
        excerpts.push(CommentExcerpt {
            author: comment.author.clone(),
            depth: comment.depth,
            text,
        });
    }

    debug!(
        returned = excerpts.len(),
        chars = total_chars,
        total = comments.len(),
        "Trimmed comments for agent"
    );

    CommentDigest {
        status: "ok".to_string(),
        total_comment_count: comments.len(),
        returned_comment_count: excerpts.len(),
        comments: excerpts,
    }
}

fn cap_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}
