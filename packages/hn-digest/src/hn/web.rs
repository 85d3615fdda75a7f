//! Comment scraping from the news.ycombinator.com item page.
//!
//! One request returns every comment with its indent level, which is much
//! cheaper than walking the Firebase API item by item.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use extraction::PageFetcher;
use scraper::{ElementRef, Html, Selector};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use super::CommentSource;
use crate::models::FlatComment;

const DEFAULT_BASE_URL: &str = "https://news.ycombinator.com";

/// Markers HN leaves on removed comments.
const REMOVED_MARKERS: &[&str] = &["[deleted]", "[flagged]", "[dead]", "class=\"cdd\""];

struct CommentSelectors {
    row: Selector,
    indent: Selector,
    author: Selector,
    age: Selector,
    text: Selector,
    reply_link: Selector,
    parent_ref: Selector,
}

fn selectors() -> Option<&'static CommentSelectors> {
    static SELECTORS: OnceLock<Option<CommentSelectors>> = OnceLock::new();
    SELECTORS
        .get_or_init(|| {
            Some(CommentSelectors {
                row: Selector::parse("tr.comtr").ok()?,
                indent: Selector::parse("td.ind").ok()?,
                author: Selector::parse("a.hnuser").ok()?,
                age: Selector::parse("span.age").ok()?,
                text: Selector::parse("div.commtext").ok()?,
                reply_link: Selector::parse(r#"a[href*="reply"]"#).ok()?,
                parent_ref: Selector::parse("span.par").ok()?,
            })
        })
        .as_ref()
}

/// Scrapes comments from HN item pages through a [`PageFetcher`].
pub struct HnWebClient {
    fetcher: Arc<dyn PageFetcher>,
    base_url: String,
}

impl HnWebClient {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Item page URL for a story.
    pub fn item_url(&self, story_id: u64) -> String {
        format!("{}/item?id={}", self.base_url, story_id)
    }
}

#[async_trait]
impl CommentSource for HnWebClient {
    async fn fetch_comments(&self, story_id: u64) -> Vec<FlatComment> {
        let url = self.item_url(story_id);

        let page = match self.fetcher.get(&url).await {
            Ok(page) if page.is_success() => page,
            Ok(page) => {
                warn!(story_id, status = page.status, "Comment page request failed");
                return Vec::new();
            }
            Err(e) => {
                warn!(story_id, error = %e, "Error fetching comments from web");
                return Vec::new();
            }
        };

        let comments = parse_comments(&page.body);
        debug!(story_id, count = comments.len(), "Scraped comments");
        comments
    }
}

/// Parse every live comment row from an item page, in page order.
///
/// Rows without a numeric id, an author or any text are skipped, as are
/// deleted, flagged and dead comments.
pub fn parse_comments(html: &str) -> Vec<FlatComment> {
    let Some(selectors) = selectors() else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&selectors.row)
        .filter_map(|row| parse_row(row, selectors))
        .collect()
}

fn parse_row(row: ElementRef<'_>, selectors: &CommentSelectors) -> Option<FlatComment> {
    let id: u64 = row.value().id()?.parse().ok()?;

    let depth = row
        .select(&selectors.indent)
        .next()
        .and_then(|cell| cell.value().attr("indent"))
        .and_then(|indent| indent.trim().parse().ok())
        .unwrap_or(0);

    let author = row
        .select(&selectors.author)
        .next()
        .map(|link| link.text().collect::<String>().trim().to_string())
        .filter(|author| !author.is_empty())?;

    let timestamp = parse_timestamp(
        row.select(&selectors.age)
            .next()
            .and_then(|age| age.value().attr("title")),
    );

    let text_node = row.select(&selectors.text).next()?;
    let raw_text = clean_comment_html(text_node, selectors);

    let row_html = row.html();
    if raw_text.is_empty() || REMOVED_MARKERS.iter().any(|marker| row_html.contains(marker)) {
        return None;
    }

    Some(FlatComment {
        id,
        author,
        raw_text,
        depth,
        timestamp,
    })
}

fn clean_comment_html(text_node: ElementRef<'_>, selectors: &CommentSelectors) -> String {
    let mut html = text_node.inner_html();
    for removed in text_node
        .select(&selectors.reply_link)
        .chain(text_node.select(&selectors.parent_ref))
    {
        html = html.replace(&removed.html(), "");
    }
    html.trim().to_string()
}

/// HN's age title looks like `"2026-01-27T19:04:50 1769540690"`; prefer the
/// unix part, fall back to the ISO part, then to now.
fn parse_timestamp(title: Option<&str>) -> i64 {
    let mut parts = title.unwrap_or_default().split_whitespace();
    let iso = parts.next();

    if let Some(unix) = parts.next().and_then(|unix| unix.parse().ok()) {
        return unix;
    }

    iso.and_then(|iso| NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S").ok())
        .map(|naive| naive.and_utc().timestamp())
        .unwrap_or_else(|| Utc::now().timestamp())
}
