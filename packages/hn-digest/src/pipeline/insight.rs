//! AI insight for a single story.
//!
//! The story and its discussion are written to `stories/<id>.md`, then a
//! non-streaming agent confined to the stories folder summarises it.

use extraction::{BoundedCache, ContentExtractor};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::driver::{drive_session, ensure_not_cancelled, PipelineOutcome};
use super::prompts::{insight_prompt, insight_system_message};
use crate::agent::{
    resolve_model, start_session, AgentTransport, PermissionGate, SessionConfig, SessionProgress,
};
use crate::comments::{html_to_plain_text, story_markdown, CommentCache, StoryDocument};
use crate::error::{DigestError, Result};
use crate::hn::StorySource;
use crate::models::{GenerationProgress, ProgressReporter, StoryHit};
use crate::vault::{VaultFiles, STORIES_FOLDER};

/// Default number of insights kept.
pub const DEFAULT_MAX_INSIGHTS: usize = 50;

/// Author shown when a story has none.
const UNKNOWN_AUTHOR: &str = "unknown";

/// Generates and caches story insights.
pub struct InsightGenerator {
    stories: Arc<dyn StorySource>,
    comments: CommentCache,
    vault: VaultFiles,
    transport: Arc<dyn AgentTransport>,
    extractor: ContentExtractor,
    insights: BoundedCache<u64, String>,
    model: Option<String>,
}

impl InsightGenerator {
    pub fn new(
        stories: Arc<dyn StorySource>,
        comments: CommentCache,
        vault: VaultFiles,
        transport: Arc<dyn AgentTransport>,
        extractor: ContentExtractor,
    ) -> Self {
        Self {
            stories,
            comments,
            vault,
            transport,
            extractor,
            insights: BoundedCache::new("insights", DEFAULT_MAX_INSIGHTS),
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_capacity(mut self, max_insights: usize) -> Self {
        self.insights = BoundedCache::new("insights", max_insights);
        self
    }

    /// A previously generated insight.
    pub fn cached(&self, story_id: u64) -> Option<String> {
        self.insights.get(&story_id)
    }

    /// Forget a cached insight so the next call regenerates it.
    pub fn invalidate(&self, story_id: u64) {
        self.insights.remove(&story_id);
    }

    /// Produce the insight for a story, from cache when available.
    pub async fn generate(
        &self,
        story_id: u64,
        cancel: &CancellationToken,
        progress: &ProgressReporter<String>,
    ) -> PipelineOutcome<String> {
        match self.execute(story_id, cancel, progress).await {
            Ok(insight) => {
                progress.report(GenerationProgress::complete(insight.clone(), "Insight ready!"));
                PipelineOutcome::Completed(insight)
            }
            Err(DigestError::Cancelled) => {
                info!(story_id, "Insight generation cancelled");
                progress.report(GenerationProgress::cancelled("Insight generation cancelled."));
                PipelineOutcome::Cancelled
            }
            Err(e) => {
                error!(story_id, error = %e, "Insight generation failed");
                let message = format!("Failed to generate insight: {}", e);
                progress.report(GenerationProgress::error(message.clone()));
                PipelineOutcome::Failed(message)
            }
        }
    }

    async fn execute(
        &self,
        story_id: u64,
        cancel: &CancellationToken,
        progress: &ProgressReporter<String>,
    ) -> Result<String> {
        if let Some(insight) = self.insights.get(&story_id) {
            debug!(story_id, "Insight cache hit");
            return Ok(insight);
        }

        ensure_not_cancelled(cancel)?;
        progress.stage(10, "Scraping article content...");
        let hit = self
            .stories
            .story(story_id)
            .await
            .map_err(|e| DigestError::Source(format!("{:#}", e)))?;
        let document = self.story_document(story_id, &hit).await;

        ensure_not_cancelled(cancel)?;
        progress.stage(40, "Loading comments...");
        let roots = self.comments.get_or_fetch(story_id).await;
        let markdown = story_markdown(&document, &roots);

        ensure_not_cancelled(cancel)?;
        progress.stage(60, "Saving to knowledge vault...");
        self.vault.initialize_knowledge_base().await?;
        self.vault.save_story_markdown(story_id, &markdown).await?;

        ensure_not_cancelled(cancel)?;
        let insight = self.run_agent(story_id, cancel, progress).await?;

        self.insights.insert(story_id, insight.clone());
        info!(story_id, chars = insight.len(), "Generated story insight");
        Ok(insight)
    }

    /// Story header plus body: the self-post text for Ask/Show HN and text
    /// posts, the extracted article for link posts.
    async fn story_document(&self, story_id: u64, hit: &StoryHit) -> StoryDocument {
        let mut document = StoryDocument::from_hit(story_id, hit);
        if document.author.trim().is_empty() {
            document.author = UNKNOWN_AUTHOR.to_string();
        }

        let self_post = hit.is_ask_hn() || hit.is_show_hn();
        document.content = match hit.url.as_deref().map(str::trim) {
            Some(url) if !self_post && !url.is_empty() => {
                self.extractor.extract_plain_text(url).await
            }
            _ => hit
                .story_text
                .as_deref()
                .map(html_to_plain_text)
                .unwrap_or_default(),
        };
        document
    }

    async fn run_agent(
        &self,
        story_id: u64,
        cancel: &CancellationToken,
        progress: &ProgressReporter<String>,
    ) -> Result<String> {
        progress.stage(70, "Connecting to agent...");
        let folder = self.vault.folder_sandbox(STORIES_FOLDER)?;
        let config = SessionConfig::new(
            folder.root()?,
            resolve_model(self.model.as_deref()),
            insight_system_message(),
            PermissionGate::new(folder),
        );
        let mut session = start_session(self.transport.as_ref(), config).await?;

        progress.stage(80, "Generating insight...");
        session.send(&insight_prompt(story_id)).await?;

        let mut reducer = SessionProgress::new(80, "Generating insight...");
        drive_session(session.as_mut(), &mut reducer, cancel, |percentage, message| {
            progress.stage(percentage, message)
        })
        .await?;

        reducer
            .response()
            .map(str::to_string)
            .ok_or(DigestError::EmptyResponse)
    }
}
