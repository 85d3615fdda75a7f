use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::Interest;
use crate::pipeline::DigestSettings;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub vault_path: Option<PathBuf>,
    pub story_limit: usize,
    pub interests: Vec<Interest>,
    pub model: Option<String>,
    pub max_stories_per_group: usize,
    pub user_agent: String,
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            vault_path: non_empty("HN_VAULT_PATH").map(PathBuf::from),
            story_limit: non_empty("HN_STORY_LIMIT")
                .unwrap_or_else(|| "50".to_string())
                .trim()
                .parse()
                .context("HN_STORY_LIMIT must be a valid number")?,
            interests: non_empty("HN_DIGEST_INTERESTS")
                .map(|raw| Interest::parse_list(&raw))
                .unwrap_or_default(),
            model: non_empty("HN_DIGEST_MODEL"),
            max_stories_per_group: non_empty("HN_MAX_STORIES_PER_GROUP")
                .unwrap_or_else(|| "5".to_string())
                .trim()
                .parse()
                .context("HN_MAX_STORIES_PER_GROUP must be a valid number")?,
            user_agent: non_empty("HN_USER_AGENT").unwrap_or_else(|| "HNReader".to_string()),
            http_timeout: Duration::from_secs(
                non_empty("HN_HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|| "30".to_string())
                    .trim()
                    .parse()
                    .context("HN_HTTP_TIMEOUT_SECS must be a valid number")?,
            ),
        })
    }

    /// Settings for a digest run.
    pub fn digest_settings(&self) -> DigestSettings {
        DigestSettings::default()
            .with_story_limit(self.story_limit)
            .with_interests(self.interests.clone())
            .with_max_stories_per_group(self.max_stories_per_group)
            .with_model(self.model.clone())
    }
}
