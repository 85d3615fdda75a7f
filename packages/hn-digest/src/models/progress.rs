//! Progress reports emitted by the digest and insight pipelines.

use serde::Serialize;
use tokio::sync::mpsc;

use super::digest::DigestOutput;

/// One progress report.
///
/// Completion, error and cancellation are mutually exclusive terminal
/// states; a run emits exactly one of them, last.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationProgress<T> {
    /// 0-100, not necessarily increasing
    pub percentage: u8,
    pub message: String,
    pub is_complete: bool,
    pub has_error: bool,
    pub is_cancelled: bool,
    pub error_message: Option<String>,
    pub result: Option<T>,
}

/// Progress of a digest run.
pub type DigestProgress = GenerationProgress<DigestOutput>;

/// Progress of a story insight run.
pub type InsightProgress = GenerationProgress<String>;

impl<T> GenerationProgress<T> {
    /// Intermediate stage.
    pub fn stage(percentage: u8, message: impl Into<String>) -> Self {
        Self {
            percentage: percentage.min(100),
            message: message.into(),
            is_complete: false,
            has_error: false,
            is_cancelled: false,
            error_message: None,
            result: None,
        }
    }

    /// Successful terminal state at 100%.
    pub fn complete(result: T, message: impl Into<String>) -> Self {
        Self {
            percentage: 100,
            is_complete: true,
            result: Some(result),
            ..Self::stage(100, message)
        }
    }

    /// Failed terminal state, reported at 0%.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            has_error: true,
            error_message: Some(message.clone()),
            ..Self::stage(0, message)
        }
    }

    /// Cancelled terminal state, reported at 0% without an error message.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            is_cancelled: true,
            ..Self::stage(0, message)
        }
    }

    /// Whether this report ends the run.
    pub fn is_terminal(&self) -> bool {
        self.is_complete || self.has_error || self.is_cancelled
    }
}

/// Sends progress reports to whoever is listening.
///
/// A reporter without a receiver (or whose receiver went away) silently
/// drops reports; progress is advisory.
#[derive(Debug)]
pub struct ProgressReporter<T> {
    sender: Option<mpsc::UnboundedSender<GenerationProgress<T>>>,
}

impl<T> Clone for ProgressReporter<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> ProgressReporter<T> {
    /// Create a reporter and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<GenerationProgress<T>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// A reporter that discards everything.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn report(&self, progress: GenerationProgress<T>) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(progress);
        }
    }

    /// Shorthand for reporting an intermediate stage.
    pub fn stage(&self, percentage: u8, message: impl Into<String>) {
        self.report(GenerationProgress::stage(percentage, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_are_exclusive() {
        let complete: GenerationProgress<String> = GenerationProgress::complete("x".into(), "done");
        let error: GenerationProgress<String> = GenerationProgress::error("boom");
        let cancelled: GenerationProgress<String> = GenerationProgress::cancelled("stopped");

        for progress in [&complete, &error, &cancelled] {
            let flags = [progress.is_complete, progress.has_error, progress.is_cancelled];
            assert_eq!(flags.iter().filter(|flag| **flag).count(), 1);
            assert!(progress.is_terminal());
        }

        assert_eq!(complete.percentage, 100);
        assert_eq!(error.percentage, 0);
        assert_eq!(error.error_message.as_deref(), Some("boom"));
        assert!(cancelled.error_message.is_none());
    }

    #[test]
    fn test_stage_clamps_percentage() {
        let progress: GenerationProgress<()> = GenerationProgress::stage(150, "x");
        assert_eq!(progress.percentage, 100);
        assert!(!progress.is_terminal());
    }

    #[tokio::test]
    async fn test_reporter_channel() {
        let (reporter, mut receiver) = ProgressReporter::<String>::channel();

        reporter.stage(5, "fetching");
        reporter.report(GenerationProgress::complete("ok".into(), "done"));
        drop(reporter);

        assert_eq!(receiver.recv().await.unwrap().percentage, 5);
        assert!(receiver.recv().await.unwrap().is_complete);
        assert!(receiver.recv().await.is_none());
    }

    #[test]
    fn test_disabled_reporter_drops() {
        ProgressReporter::<String>::disabled().stage(1, "ignored");
    }
}
