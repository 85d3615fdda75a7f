//! The digest document the agent writes and the pipeline enriches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Root of `news_digest.json`.
///
/// Only one digest exists at a time; each generation replaces the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DigestOutput {
    pub summary: String,

    pub groups: Vec<DigestGroup>,

    /// Set by the pipeline after the agent finishes
    pub generated_at: Option<DateTime<Utc>>,
}

/// Stories matching one user interest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DigestGroup {
    #[serde(rename = "interest")]
    pub interest_name: String,

    pub interest_description: String,

    pub summary: String,

    pub stories: Vec<DigestStory>,
}

/// One story entry inside a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DigestStory {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    pub title: String,

    pub url: String,

    pub author: String,

    pub summary: String,

    pub created_at: String,

    /// Filled from the extractor's image cache after the agent finishes
    pub image_url: Option<String>,
}

impl DigestOutput {
    /// Total number of stories across all groups.
    pub fn story_count(&self) -> usize {
        self.groups.iter().map(|group| group.stories.len()).sum()
    }

    /// Iterate every story mutably, group by group.
    pub fn stories_mut(&mut self) -> impl Iterator<Item = &mut DigestStory> {
        self.groups
            .iter_mut()
            .flat_map(|group| group.stories.iter_mut())
    }

    /// Story ids that appear in more than one group.
    ///
    /// The agent is told to place each story once; this is for logging
    /// when it doesn't.
    pub fn duplicate_story_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for story in self.groups.iter().flat_map(|group| &group.stories) {
            if !seen.insert(story.id.as_str()) && !duplicates.contains(&story.id) {
                duplicates.push(story.id.clone());
            }
        }
        duplicates
    }
}

// Agents occasionally write numeric ids.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}
