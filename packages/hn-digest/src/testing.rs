//! Testing utilities including mock implementations.
//!
//! Mock story and comment sources, and a scripted agent transport whose
//! sessions replay a fixed list of steps. Tool calls and file writes made
//! by a script go through the session's tools and permission gate, so
//! tests exercise the same confinement a real runtime would.

use anyhow::bail;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use crate::agent::session::SessionDescription;
use crate::agent::{
    AgentSession, AgentTransport, PermissionDecision, PermissionRequest, SessionConfig,
    SessionEvent,
};
use crate::error::AgentError;
use crate::hn::{CommentSource, StorySource};
use crate::models::{FlatComment, StoryHit};

/// A story hit with the given id and title, created now.
pub fn story_hit(id: u64, title: &str, url: Option<&str>) -> StoryHit {
    StoryHit {
        id: id.to_string(),
        title: Some(title.to_string()),
        author: Some(format!("author{}", id)),
        url: url.map(String::from),
        story_text: None,
        points: Some(100),
        num_comments: Some(10),
        created_at: Utc::now(),
    }
}

// =============================================================================
// Story source
// =============================================================================

/// Serves a fixed list of stories.
#[derive(Default, Clone)]
pub struct MockStorySource {
    stories: Arc<RwLock<Vec<StoryHit>>>,
    failure: Arc<RwLock<Option<String>>>,
    calls: Arc<RwLock<usize>>,
}

impl MockStorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_story(self, story: StoryHit) -> Self {
        self.stories.write().unwrap().push(story);
        self
    }

    /// Make every call fail with `message`.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        *self.failure.write().unwrap() = Some(message.into());
        self
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        *self.calls.read().unwrap()
    }

    fn record_call(&self) -> anyhow::Result<()> {
        *self.calls.write().unwrap() += 1;
        if let Some(message) = self.failure.read().unwrap().clone() {
            bail!("{}", message);
        }
        Ok(())
    }
}

#[async_trait]
impl StorySource for MockStorySource {
    async fn recent_stories(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<StoryHit>> {
        self.record_call()?;
        Ok(self
            .stories
            .read()
            .unwrap()
            .iter()
            .filter(|story| story.created_at > since)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn story(&self, story_id: u64) -> anyhow::Result<StoryHit> {
        self.record_call()?;
        match self
            .stories
            .read()
            .unwrap()
            .iter()
            .find(|story| story.numeric_id() == Some(story_id))
        {
            Some(story) => Ok(story.clone()),
            None => bail!("story {} not found", story_id),
        }
    }
}

// =============================================================================
// Comment source
// =============================================================================

/// Serves canned comment lists; unknown stories have no comments.
#[derive(Default, Clone)]
pub struct MockCommentSource {
    comments: Arc<RwLock<HashMap<u64, Vec<FlatComment>>>>,
    fetches: Arc<RwLock<HashMap<u64, usize>>>,
}

impl MockCommentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comments(self, story_id: u64, comments: Vec<FlatComment>) -> Self {
        self.comments.write().unwrap().insert(story_id, comments);
        self
    }

    /// How many times comments for `story_id` were fetched.
    pub fn fetch_count(&self, story_id: u64) -> usize {
        self.fetches
            .read()
            .unwrap()
            .get(&story_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl CommentSource for MockCommentSource {
    async fn fetch_comments(&self, story_id: u64) -> Vec<FlatComment> {
        *self.fetches.write().unwrap().entry(story_id).or_insert(0) += 1;
        self.comments
            .read()
            .unwrap()
            .get(&story_id)
            .cloned()
            .unwrap_or_default()
    }
}

// =============================================================================
// Scripted agent transport
// =============================================================================

/// One step of a scripted session.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Call a session tool (emits tool started/completed)
    ToolCall { name: String, arguments: Value },

    /// Write a file through the permission gate (emits nothing)
    WriteFile { path: String, content: String },

    Delta(String),

    Message(String),

    Error(String),

    Idle,

    /// Never produce another event
    Hang,
}

impl ScriptStep {
    pub fn tool(name: &str, arguments: Value) -> Self {
        Self::ToolCall {
            name: name.to_string(),
            arguments,
        }
    }

    pub fn write(path: &str, content: impl Into<String>) -> Self {
        Self::WriteFile {
            path: path.to_string(),
            content: content.into(),
        }
    }
}

/// Everything scripted sessions observed.
#[derive(Debug, Clone, Default)]
pub struct TransportLog {
    pub sessions: Vec<SessionDescription>,
    pub system_prompts: Vec<String>,
    pub prompts: Vec<String>,
    /// Tool name and its output or error text
    pub tool_results: Vec<(String, Result<String, String>)>,
    /// Paths whose writes the gate denied
    pub denied_writes: Vec<String>,
    pub aborts: usize,
}

/// Starts sessions that replay queued scripts, one script per session.
///
/// Starting a session with no script left fails.
#[derive(Default, Clone)]
pub struct ScriptedTransport {
    scripts: Arc<Mutex<VecDeque<Vec<ScriptStep>>>>,
    log: Arc<Mutex<TransportLog>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a script for the next session.
    pub fn with_script(self, steps: Vec<ScriptStep>) -> Self {
        self.scripts.lock().unwrap().push_back(steps);
        self
    }

    /// Snapshot of what happened so far.
    pub fn log(&self) -> TransportLog {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentTransport for ScriptedTransport {
    async fn start_session(
        &self,
        config: SessionConfig,
    ) -> Result<Box<dyn AgentSession>, AgentError> {
        let steps = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::Start("no scripted session left".into()))?;

        {
            let mut log = self.log.lock().unwrap();
            log.sessions.push(config.describe());
            log.system_prompts.push(config.system_prompt.clone());
        }

        Ok(Box::new(ScriptedSession {
            config,
            steps: steps.into(),
            pending_tool: None,
            aborted: false,
            log: Arc::clone(&self.log),
        }))
    }
}

struct ScriptedSession {
    config: SessionConfig,
    steps: VecDeque<ScriptStep>,
    pending_tool: Option<(String, Value)>,
    aborted: bool,
    log: Arc<Mutex<TransportLog>>,
}

impl ScriptedSession {
    async fn write_file(&self, path: &str, content: &str) {
        let request = PermissionRequest::new("write").with_path("path", path);
        let target = match self.config.authorize(&request) {
            PermissionDecision::Approved => self.config.permission_gate().sandbox().resolve(path),
            PermissionDecision::Denied { .. } => {
                self.log.lock().unwrap().denied_writes.push(path.to_string());
                return;
            }
        };

        if let Ok(target) = target {
            if let Some(parent) = target.parent() {
                let _ = tokio::fs::create_dir_all(parent).await;
            }
            let _ = tokio::fs::write(&target, content).await;
        }
    }
}

#[async_trait]
impl AgentSession for ScriptedSession {
    async fn send(&mut self, prompt: &str) -> Result<(), AgentError> {
        if self.aborted {
            return Err(AgentError::Transport("session aborted".into()));
        }
        self.log.lock().unwrap().prompts.push(prompt.to_string());
        Ok(())
    }

    async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            if self.aborted {
                return None;
            }

            if let Some((name, arguments)) = self.pending_tool.take() {
                let result = self
                    .config
                    .call_tool(&name, &arguments.to_string())
                    .await
                    .map_err(|e| e.to_string());
                self.log
                    .lock()
                    .unwrap()
                    .tool_results
                    .push((name.clone(), result));
                return Some(SessionEvent::ToolCompleted { tool_name: name });
            }

            match self.steps.pop_front()? {
                ScriptStep::ToolCall { name, arguments } => {
                    self.pending_tool = Some((name.clone(), arguments));
                    return Some(SessionEvent::ToolStarted { tool_name: name });
                }
                ScriptStep::WriteFile { path, content } => {
                    self.write_file(&path, &content).await;
                }
                ScriptStep::Delta(content) => {
                    return Some(SessionEvent::AssistantDelta { content })
                }
                ScriptStep::Message(content) => {
                    return Some(SessionEvent::AssistantMessage { content })
                }
                ScriptStep::Error(message) => return Some(SessionEvent::Error { message }),
                ScriptStep::Idle => return Some(SessionEvent::Idle),
                ScriptStep::Hang => std::future::pending::<()>().await,
            }
        }
    }

    async fn abort(&mut self) -> Result<(), AgentError> {
        self.aborted = true;
        self.log.lock().unwrap().aborts += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::PermissionGate;
    use crate::vault::SandboxRoot;
    use chrono::Duration;
    use serde_json::json;

    #[tokio::test]
    async fn test_story_source_filters_window() {
        let mut old = story_hit(1, "old", None);
        old.created_at = Utc::now() - Duration::hours(48);
        let source = MockStorySource::new()
            .with_story(old)
            .with_story(story_hit(2, "new", None));

        let stories = source
            .recent_stories(Utc::now() - Duration::hours(24), 10)
            .await
            .unwrap();

        assert_eq!(stories.len(), 1);
        assert_eq!(source.story(1).await.unwrap().title.as_deref(), Some("old"));
        assert!(source.story(3).await.is_err());
        assert_eq!(source.call_count(), 3);
    }

    #[tokio::test]
    async fn test_scripted_session_replays_and_gates_writes() {
        let dir = tempfile::TempDir::new().unwrap();
        let transport = ScriptedTransport::new().with_script(vec![
            ScriptStep::tool("missing_tool", json!({})),
            ScriptStep::write("out.json", "{}"),
            ScriptStep::write("../escape.json", "{}"),
            ScriptStep::Message("done".into()),
            ScriptStep::Idle,
        ]);
        let config = SessionConfig::new(
            dir.path(),
            "m",
            "system",
            PermissionGate::new(SandboxRoot::new(dir.path())),
        );

        let mut session = transport.start_session(config).await.unwrap();
        session.send("go").await.unwrap();

        let mut events = Vec::new();
        while let Some(event) = session.next_event().await {
            events.push(event);
        }

        assert_eq!(events.len(), 4);
        assert_eq!(events[3], SessionEvent::Idle);
        assert!(dir.path().join("out.json").is_file());
        assert!(!dir.path().parent().unwrap().join("escape.json").exists());

        let log = transport.log();
        assert_eq!(log.prompts, vec!["go"]);
        assert_eq!(log.denied_writes, vec!["../escape.json"]);
        assert!(log.tool_results[0].1.is_err());
        assert!(transport.start_session(SessionConfig::new(
            dir.path(),
            "m",
            "s",
            PermissionGate::new(SandboxRoot::new(dir.path())),
        ))
        .await
        .is_err());
    }
}
