//! Drives a started agent session to completion.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::agent::{AgentSession, SessionCommand, SessionProgress};
use crate::error::{AgentError, DigestError, Result};

/// Outcome of a pipeline run.
///
/// Failures and cancellation are values, not errors: a run never throws
/// across the pipeline boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome<T> {
    Completed(T),
    Cancelled,
    Failed(String),
}

impl<T> PipelineOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn into_result(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Cancelled | Self::Failed(_) => None,
        }
    }
}

/// Return `Cancelled` if the token has fired.
pub(crate) fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(DigestError::Cancelled);
    }
    Ok(())
}

enum Next {
    Cancelled,
    Event(Option<crate::agent::SessionEvent>),
}

/// Feed session events through the reducer until it resolves.
///
/// Cancellation aborts the session. A stream that ends before the session
/// goes idle is an error.
pub(crate) async fn drive_session<F>(
    session: &mut dyn AgentSession,
    reducer: &mut SessionProgress,
    cancel: &CancellationToken,
    mut on_report: F,
) -> Result<()>
where
    F: FnMut(u8, String),
{
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => Next::Cancelled,
            event = session.next_event() => Next::Event(event),
        };

        let event = match next {
            Next::Cancelled => {
                debug!("Cancellation requested, aborting agent session");
                if let Err(e) = session.abort().await {
                    warn!(error = %e, "Failed to abort agent session");
                }
                return Err(DigestError::Cancelled);
            }
            Next::Event(Some(event)) => event,
            Next::Event(None) => return Err(AgentError::Closed.into()),
        };

        match reducer.decide(&event) {
            Some(SessionCommand::Report {
                percentage,
                message,
            }) => on_report(percentage, message),
            Some(SessionCommand::Finish) => return Ok(()),
            Some(SessionCommand::Fail { message }) => {
                return Err(AgentError::Session(message).into())
            }
            None => {}
        }
    }
}
