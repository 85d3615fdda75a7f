use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::StorySource;
use crate::models::{SearchResponse, StoryHit};

const DEFAULT_BASE_URL: &str = "https://hn.algolia.com/api/v1";

/// Algolia HN Search API client
pub struct AlgoliaClient {
    client: reqwest::Client,
    base_url: String,
}

/// Algolia item response (only the fields we map)
#[derive(Debug, Deserialize)]
struct AlgoliaItem {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    points: Option<i64>,
    created_at: DateTime<Utc>,
}

impl AlgoliaClient {
    /// Create a new Algolia client
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at another base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Search URL for stories created after `since`
    pub fn recent_stories_url(&self, since: DateTime<Utc>, limit: usize) -> String {
        format!(
            "{}/search?tags=story&numericFilters=created_at_i>{}&hitsPerPage={}",
            self.base_url,
            since.timestamp(),
            limit
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to send Algolia request: {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Algolia API error {}: {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse Algolia response")
    }
}

#[async_trait]
impl StorySource for AlgoliaClient {
    async fn recent_stories(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<StoryHit>> {
        let url = self.recent_stories_url(since, limit);
        let response: SearchResponse = self.get_json(&url).await?;

        debug!(
            hits = response.hits.len(),
            total = response.total_hits,
            "Fetched recent stories"
        );
        Ok(response.hits)
    }

    async fn story(&self, story_id: u64) -> Result<StoryHit> {
        let url = format!("{}/items/{}", self.base_url, story_id);
        let item: AlgoliaItem = self.get_json(&url).await?;

        Ok(StoryHit {
            id: item.id.to_string(),
            title: item.title,
            author: item.author,
            url: item.url,
            story_text: item.text,
            points: item.points,
            num_comments: None,
            created_at: item.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_recent_stories_url() {
        let client = AlgoliaClient::new("HNReader", Duration::from_secs(5)).unwrap();
        let since = Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap();

        assert_eq!(
            client.recent_stories_url(since, 50),
            "https://hn.algolia.com/api/v1/search?tags=story&numericFilters=created_at_i>1725148800&hitsPerPage=50"
        );
    }

    #[test]
    fn test_parse_item() {
        let json = r#"{"id": 8863, "created_at": "2007-04-04T19:16:40.000Z", "type": "story",
            "author": "dhouston", "title": "My YC app: Dropbox", "url": "http://www.getdropbox.com/u/2/screencast.html",
            "text": null, "points": 104, "children": []}"#;

        let item: AlgoliaItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.id, 8863);
        assert_eq!(item.author.as_deref(), Some("dhouston"));
    }
}
