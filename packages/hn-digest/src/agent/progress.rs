//! Maps session lifecycle events to progress.
//!
//! [`SessionProgress`] is a small state machine: it consumes one
//! [`SessionEvent`] at a time and decides what the caller should do next.
//! Once it has resolved (idle or error), later events are ignored.

use tracing::{debug, warn};

use super::session::SessionEvent;

/// Percentage reported while a digest agent is working.
pub const AGENT_MIDPOINT: u8 = 60;

/// What the caller should do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Publish an intermediate progress report
    Report { percentage: u8, message: String },

    /// The agent finished its turn
    Finish,

    /// The agent reported an error
    Fail { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Working,
    Writing,
    Finished,
    Failed,
}

/// Progress reducer for one agent session.
#[derive(Debug, Clone)]
pub struct SessionProgress {
    percentage: u8,
    writing_message: String,
    phase: Phase,
    last_message: Option<String>,
    streamed: String,
}

impl SessionProgress {
    /// A reducer reporting at `percentage`, with `writing_message` shown
    /// once the agent starts producing output.
    pub fn new(percentage: u8, writing_message: impl Into<String>) -> Self {
        Self {
            percentage,
            writing_message: writing_message.into(),
            phase: Phase::Working,
            last_message: None,
            streamed: String::new(),
        }
    }

    /// Reducer for the digest agent.
    pub fn digest() -> Self {
        Self::new(AGENT_MIDPOINT, "Agent is writing the digest...")
    }

    pub fn decide(&mut self, event: &SessionEvent) -> Option<SessionCommand> {
        if self.is_resolved() {
            debug!(?event, "Ignoring event after session resolved");
            return None;
        }

        match event {
            SessionEvent::ToolStarted { tool_name } => {
                self.phase = Phase::Working;
                Some(self.report(format!("Agent: executing {}...", tool_name)))
            }
            SessionEvent::ToolCompleted { .. } => {
                self.phase = Phase::Working;
                Some(self.report("Agent: processing results..."))
            }
            SessionEvent::AssistantDelta { content } => {
                self.streamed.push_str(content);
                // Report once per writing burst, not per token
                if self.phase == Phase::Writing {
                    return None;
                }
                self.phase = Phase::Writing;
                Some(self.report(self.writing_message.clone()))
            }
            SessionEvent::AssistantMessage { content } => {
                self.last_message = Some(content.clone());
                self.streamed.clear();
                None
            }
            SessionEvent::Error { message } => {
                warn!(error = %message, "Agent session reported an error");
                self.phase = Phase::Failed;
                Some(SessionCommand::Fail {
                    message: message.clone(),
                })
            }
            SessionEvent::Idle => {
                self.phase = Phase::Finished;
                Some(SessionCommand::Finish)
            }
        }
    }

    fn report(&self, message: impl Into<String>) -> SessionCommand {
        SessionCommand::Report {
            percentage: self.percentage,
            message: message.into(),
        }
    }

    /// Whether an idle or error event has been seen.
    pub fn is_resolved(&self) -> bool {
        matches!(self.phase, Phase::Finished | Phase::Failed)
    }

    /// The agent's final response: the last complete message, or the text
    /// streamed after it if no message followed.
    pub fn response(&self) -> Option<&str> {
        let streamed = self.streamed.trim();
        if !streamed.is_empty() {
            return Some(streamed);
        }
        self.last_message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
    }
}

impl Default for SessionProgress {
    fn default() -> Self {
        Self::digest()
    }
}
