//! Markdown rendering of a story and its discussion.

use scraper::{ElementRef, Html};
use std::fmt::Write;

use super::tree::CommentNode;
use crate::models::StoryHit;

/// Placeholder written when a story has no body.
pub const NO_CONTENT: &str = "*NO CONTENT FOR THIS STORY*";

/// The story header rendered above the discussion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryDocument {
    pub id: u64,
    pub title: String,
    pub author: String,
    /// Plain-text body; empty for link posts
    pub content: String,
}

impl StoryDocument {
    /// Build a document from a search hit, flattening the HTML body.
    pub fn from_hit(id: u64, hit: &StoryHit) -> Self {
        Self {
            id,
            title: hit.title.clone().unwrap_or_default(),
            author: hit.author.clone().unwrap_or_default(),
            content: hit
                .story_text
                .as_deref()
                .map(html_to_plain_text)
                .unwrap_or_default(),
        }
    }
}

/// Render a story and its comment forest as markdown.
///
/// Comments are written depth-first, one line each; replies are indented
/// two spaces per level and prefixed with `↳`. Multi-line comments are
/// folded with ` | ` and empty ones are skipped (with their replies).
pub fn story_markdown(story: &StoryDocument, roots: &[CommentNode]) -> String {
    let mut markdown = String::new();
    let _ = writeln!(markdown, "# {}", story.title);
    let _ = writeln!(markdown, "ID:{}|By:{}", story.id, story.author);
    markdown.push('\n');
    markdown.push_str("## Content\n");
    if story.content.trim().is_empty() {
        markdown.push_str(NO_CONTENT);
    } else {
        let _ = writeln!(markdown, "{}", story.content.trim());
    }
    markdown.push('\n');
    markdown.push_str("---\n");
    markdown.push_str("## Discussion\n");

    for root in roots {
        append_node(root, &mut markdown);
    }

    markdown
}

fn append_node(root: &CommentNode, markdown: &mut String) {
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        let content = fold_lines(&html_to_plain_text(&node.comment.raw_text));
        if content.is_empty() {
            continue;
        }

        if node.depth() > 0 {
            markdown.push_str(&" ".repeat(node.depth() * 2));
            markdown.push_str("↳ ");
        }
        let _ = writeln!(markdown, "@{}: {}", node.author(), content);

        pending.extend(node.children.iter().rev());
    }
}

fn fold_lines(content: &str) -> String {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Reduce a comment or story HTML fragment to text.
///
/// Entities are decoded; `<p>` and `<br>` start new lines.
pub fn html_to_plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::new();
    collect(fragment.root_element(), &mut text);
    text.trim().to_string()
}

fn collect(element: ElementRef<'_>, out: &mut String) {
    let mut pending: Vec<_> = element.children().rev().collect();
    while let Some(node) = pending.pop() {
        if let Some(child) = ElementRef::wrap(node) {
            if matches!(child.value().name(), "p" | "br") {
                out.push('\n');
            }
            pending.extend(node.children().rev());
        } else if let Some(text) = node.value().as_text() {
            out.push_str(text);
        }
    }
}
