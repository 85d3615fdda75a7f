//! The agent session seam.
//!
//! The agent runtime itself is a black box: it is started with a
//! [`SessionConfig`], receives a prompt and emits [`SessionEvent`]s until it
//! goes idle. Transports call back into the config for every tool call and
//! every permission request, so confinement never depends on the runtime.

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::permission::{PermissionDecision, PermissionGate, PermissionRequest};
use super::tools::{ToolDefinition, ToolError, ToolRegistry};
use crate::error::AgentError;

/// Models a session may run on.
pub const SUPPORTED_MODELS: &[&str] = &["claude-sonnet-4.5", "claude-opus-4-5", "gpt-5.2"];

/// Model used when the configured one is missing or unsupported.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4.5";

/// Pick the configured model if supported, else [`DEFAULT_MODEL`].
pub fn resolve_model(configured: Option<&str>) -> &'static str {
    let Some(configured) = configured.map(str::trim).filter(|model| !model.is_empty()) else {
        return DEFAULT_MODEL;
    };

    match SUPPORTED_MODELS
        .iter()
        .copied()
        .find(|model| model.eq_ignore_ascii_case(configured))
    {
        Some(model) => model,
        None => {
            warn!(model = %configured, fallback = DEFAULT_MODEL, "Unsupported model configured");
            DEFAULT_MODEL
        }
    }
}

/// Everything a transport needs to start a session.
///
/// The permission gate is not optional: a session cannot be described
/// without one. Tools are only reachable through [`SessionConfig::call_tool`],
/// which consults the gate first.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub working_directory: PathBuf,
    pub model: String,
    pub system_prompt: String,
    tools: ToolRegistry,
    permission_gate: PermissionGate,
    /// Emit incremental assistant output
    pub streaming: bool,
}

impl SessionConfig {
    /// A session with no tools and streaming off.
    pub fn new(
        working_directory: impl Into<PathBuf>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        permission_gate: PermissionGate,
    ) -> Self {
        Self {
            working_directory: working_directory.into(),
            model: model.into(),
            system_prompt: system_prompt.into(),
            tools: ToolRegistry::new(),
            permission_gate,
            streaming: false,
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn permission_gate(&self) -> &PermissionGate {
        &self.permission_gate
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.names()
    }

    /// Definitions to advertise to the model.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.definitions()
    }

    /// Evaluate an action the agent wants to perform.
    pub fn authorize(&self, request: &PermissionRequest) -> PermissionDecision {
        self.permission_gate.evaluate(request)
    }

    /// Run a tool call on behalf of the agent.
    ///
    /// The arguments pass through the permission gate first, so a tool
    /// invoked with a path outside the sandbox never runs.
    pub async fn call_tool(&self, name: &str, arguments: &str) -> Result<String, ToolError> {
        let bag: serde_json::Map<String, serde_json::Value> = serde_json::from_str(arguments)
            .map_err(|e| ToolError::BadArguments(e.to_string()))?;

        let request = PermissionRequest::from_untyped(name, &bag);
        if let PermissionDecision::Denied { reason } = self.authorize(&request) {
            return Err(ToolError::PermissionDenied(reason));
        }

        debug!(tool = %name, "Dispatching tool call");
        self.tools.call(name, arguments).await
    }

    /// Loggable summary.
    pub fn describe(&self) -> SessionDescription {
        SessionDescription {
            working_directory: self.working_directory.clone(),
            model: self.model.clone(),
            tools: self.tool_names().into_iter().map(String::from).collect(),
            streaming: self.streaming,
        }
    }
}

/// What a session was started with, minus the callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionDescription {
    pub working_directory: PathBuf,
    pub model: String,
    pub tools: Vec<String>,
    pub streaming: bool,
}

/// Lifecycle events emitted by a running session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    ToolStarted { tool_name: String },
    ToolCompleted { tool_name: String },
    /// Incremental assistant output (streaming sessions only)
    AssistantDelta { content: String },
    /// A complete assistant message
    AssistantMessage { content: String },
    Error { message: String },
    /// The agent finished its turn
    Idle,
}

/// A running agent session.
#[async_trait]
pub trait AgentSession: Send {
    /// Send a user prompt.
    async fn send(&mut self, prompt: &str) -> Result<(), AgentError>;

    /// Next lifecycle event; `None` once the stream has ended.
    async fn next_event(&mut self) -> Option<SessionEvent>;

    /// Ask the runtime to stop the session.
    async fn abort(&mut self) -> Result<(), AgentError>;
}

/// Starts agent sessions.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn start_session(&self, config: SessionConfig)
        -> Result<Box<dyn AgentSession>, AgentError>;
}

/// Start a session, logging what it was started with.
pub async fn start_session(
    transport: &dyn AgentTransport,
    config: SessionConfig,
) -> Result<Box<dyn AgentSession>, AgentError> {
    let description = config.describe();
    info!(
        working_directory = %description.working_directory.display(),
        model = %description.model,
        tools = ?description.tools,
        streaming = description.streaming,
        "Starting agent session"
    );
    transport.start_session(config).await
}
