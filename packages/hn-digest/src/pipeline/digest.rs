//! The digest pipeline.
//!
//! One run walks `init → fetch stories → persist raw data → agent session →
//! load digest → enrich → persist digest`, reporting progress along the
//! way. Cancellation is checked between stages and while the agent works.

use chrono::{Duration, Utc};
use extraction::ContentExtractor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::driver::{drive_session, ensure_not_cancelled, PipelineOutcome};
use super::enrich::enrich_digest;
use super::prompts::{digest_prompt, digest_system_message};
use crate::agent::{
    resolve_model, start_session, AgentTransport, PermissionGate, ReadCommentsTool,
    ScrapeArticleTool, SessionConfig, SessionProgress, ToolRegistry,
};
use crate::error::{DigestError, Result};
use crate::hn::{CommentSource, StorySource};
use crate::models::{DigestOutput, GenerationProgress, Interest, ProgressReporter};
use crate::vault::{VaultFiles, NEWS_DIGEST_FOLDER};

/// Lowest and highest accepted stories-per-group limits.
pub const MAX_STORIES_PER_GROUP_RANGE: (usize, usize) = (1, 30);

/// Settings for a digest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestSettings {
    /// How many recent stories to fetch
    pub story_limit: usize,

    /// How far back to look, in hours
    pub window_hours: i64,

    pub interests: Vec<Interest>,

    pub max_stories_per_group: usize,

    /// Requested model; unsupported values fall back to the default
    pub model: Option<String>,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            story_limit: 50,
            window_hours: 24,
            interests: Vec::new(),
            max_stories_per_group: 5,
            model: None,
        }
    }
}

impl DigestSettings {
    pub fn with_interests(mut self, interests: Vec<Interest>) -> Self {
        self.interests = interests;
        self
    }

    /// Set the per-group limit, clamped to [`MAX_STORIES_PER_GROUP_RANGE`].
    pub fn with_max_stories_per_group(mut self, max: usize) -> Self {
        let (low, high) = MAX_STORIES_PER_GROUP_RANGE;
        self.max_stories_per_group = max.clamp(low, high);
        self
    }

    pub fn with_story_limit(mut self, limit: usize) -> Self {
        self.story_limit = limit.max(1);
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

/// Generates the news digest.
pub struct DigestPipeline {
    stories: Arc<dyn StorySource>,
    comments: Arc<dyn CommentSource>,
    vault: VaultFiles,
    transport: Arc<dyn AgentTransport>,
    extractor: ContentExtractor,
    settings: DigestSettings,
}

impl DigestPipeline {
    pub fn new(
        stories: Arc<dyn StorySource>,
        comments: Arc<dyn CommentSource>,
        vault: VaultFiles,
        transport: Arc<dyn AgentTransport>,
        extractor: ContentExtractor,
        settings: DigestSettings,
    ) -> Self {
        Self {
            stories,
            comments,
            vault,
            transport,
            extractor,
            settings,
        }
    }

    pub fn settings(&self) -> &DigestSettings {
        &self.settings
    }

    /// Run the pipeline once.
    ///
    /// The last progress report mirrors the returned outcome.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        progress: &ProgressReporter<DigestOutput>,
    ) -> PipelineOutcome<DigestOutput> {
        match self.execute(cancel, progress).await {
            Ok(digest) => {
                info!(
                    groups = digest.groups.len(),
                    stories = digest.story_count(),
                    "Digest generated"
                );
                progress.report(GenerationProgress::complete(digest.clone(), "Digest ready!"));
                PipelineOutcome::Completed(digest)
            }
            Err(DigestError::Cancelled) => {
                info!("Digest generation cancelled");
                progress.report(GenerationProgress::cancelled("Digest generation cancelled."));
                PipelineOutcome::Cancelled
            }
            Err(e) => {
                error!(error = %e, "Digest generation failed");
                let message = format!("Failed to generate digest: {}", e);
                progress.report(GenerationProgress::error(message.clone()));
                PipelineOutcome::Failed(message)
            }
        }
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        progress: &ProgressReporter<DigestOutput>,
    ) -> Result<DigestOutput> {
        ensure_not_cancelled(cancel)?;
        progress.stage(2, "Initializing knowledge base...");
        self.vault.initialize_knowledge_base().await?;

        ensure_not_cancelled(cancel)?;
        progress.stage(5, "Fetching trending stories from Hacker News...");
        let since = Utc::now() - Duration::hours(self.settings.window_hours);
        let stories = self
            .stories
            .recent_stories(since, self.settings.story_limit)
            .await
            .map_err(|e| DigestError::Source(format!("{:#}", e)))?;
        progress.stage(15, format!("Found {} trending stories", stories.len()));

        ensure_not_cancelled(cancel)?;
        self.vault.write_raw_stories(&stories).await?;
        progress.stage(30, format!("Saved {} stories to knowledge base", stories.len()));

        ensure_not_cancelled(cancel)?;
        progress.stage(35, "Starting AI agent...");
        self.run_agent(cancel, progress).await?;

        ensure_not_cancelled(cancel)?;
        progress.stage(95, "Loading generated digest...");
        let mut digest = self
            .vault
            .load_digest()
            .await?
            .ok_or(DigestError::MissingDigest)?;

        let duplicates = digest.duplicate_story_ids();
        if !duplicates.is_empty() {
            warn!(?duplicates, "Agent placed stories in more than one group");
        }

        progress.stage(95, "Enriching stories with images...");
        enrich_digest(
            &mut digest,
            |url| self.extractor.cached_image_url(url),
            Utc::now(),
        );
        self.vault.save_digest(&digest).await?;

        Ok(digest)
    }

    async fn run_agent(
        &self,
        cancel: &CancellationToken,
        progress: &ProgressReporter<DigestOutput>,
    ) -> Result<()> {
        let folder = self.vault.folder_sandbox(NEWS_DIGEST_FOLDER)?;
        let working_directory = folder.root()?;

        let tools = ToolRegistry::new()
            .register(ScrapeArticleTool::new(self.extractor.clone()))
            .register(ReadCommentsTool::new(Arc::clone(&self.comments)));
        let config = SessionConfig::new(
            working_directory,
            resolve_model(self.settings.model.as_deref()),
            digest_system_message(),
            PermissionGate::new(folder),
        )
        .with_tools(tools)
        .with_streaming(true);

        let mut session = start_session(self.transport.as_ref(), config).await?;

        if cancel.is_cancelled() {
            if let Err(e) = session.abort().await {
                warn!(error = %e, "Failed to abort agent session");
            }
            return Err(DigestError::Cancelled);
        }
        let prompt = digest_prompt(
            &self.settings.interests,
            self.settings.max_stories_per_group,
            Utc::now().date_naive(),
        );
        session.send(&prompt).await?;

        let mut reducer = SessionProgress::digest();
        drive_session(session.as_mut(), &mut reducer, cancel, |percentage, message| {
            progress.stage(percentage, message)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_clamp_group_limit() {
        assert_eq!(
            DigestSettings::default()
                .with_max_stories_per_group(0)
                .max_stories_per_group,
            1
        );
        assert_eq!(
            DigestSettings::default()
                .with_max_stories_per_group(99)
                .max_stories_per_group,
            30
        );
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: DigestSettings = serde_json::from_str(r#"{"story_limit": 10}"#).unwrap();

        assert_eq!(settings.story_limit, 10);
        assert_eq!(settings.window_hours, 24);
        assert_eq!(settings.max_stories_per_group, 5);
    }
}
