//! HTML helpers: visible-text extraction and lead-image discovery.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Elements whose entire subtree is dropped before reading text.
pub const REMOVABLE_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "iframe", "svg", "form",
];

/// Marker appended when text is cut to the character budget.
pub const TRUNCATION_MARKER: &str = "\n[truncated]";

const OG_IMAGE_SELECTOR: &str = r#"meta[property="og:image"]"#;
const CONTENT_IMAGE_SELECTOR: &str =
    r#"article img[src], main img[src], div[class*="content"] img[src]"#;
const ANY_IMAGE_SELECTOR: &str = "img[src]";

/// Extract normalised visible text from a parsed document.
///
/// Non-content subtrees ([`REMOVABLE_TAGS`]) are skipped, entities are
/// decoded by the parser, whitespace runs inside a line collapse to a
/// single space, blank lines are dropped.
pub fn visible_text(document: &Html) -> String {
    let mut raw = String::new();
    collect_text(document.root_element(), &mut raw);
    normalize_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    // Explicit stack: untrusted pages can nest arbitrarily deep.
    let mut pending: Vec<_> = element.children().rev().collect();
    while let Some(node) = pending.pop() {
        if let Some(child) = ElementRef::wrap(node) {
            let name = child.value().name();
            if REMOVABLE_TAGS.iter().any(|tag| tag.eq_ignore_ascii_case(name)) {
                continue;
            }
            pending.extend(node.children().rev());
        } else if let Some(text) = node.value().as_text() {
            out.push_str(text);
        }
    }
}

/// Collapse intra-line whitespace, drop blank lines, join with `\n`.
pub fn normalize_whitespace(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Cut `text` to `max_chars` characters, appending [`TRUNCATION_MARKER`]
/// when anything was removed.
pub fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => {
            let mut truncated = text[..byte_index].to_string();
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
        None => text,
    }
}

/// Find the best lead image for a page.
///
/// Priority: `og:image` meta content, then the first image inside an
/// article/main/content container, then the first image anywhere. The
/// first candidate found wins even if it normalises to nothing.
pub fn lead_image_url(document: &Html, base_url: &str) -> Option<String> {
    if let Some(content) = first_attr(document, OG_IMAGE_SELECTOR, "content") {
        return normalize_image_url(&content, base_url);
    }

    if let Some(src) = first_attr(document, CONTENT_IMAGE_SELECTOR, "src") {
        return normalize_image_url(&src, base_url);
    }

    first_attr(document, ANY_IMAGE_SELECTOR, "src")
        .and_then(|src| normalize_image_url(&src, base_url))
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .find(|value| !value.trim().is_empty())
        .map(|value| value.to_string())
}

/// Make an image reference absolute against `base_url`.
///
/// `data:` URIs, unparseable references and anything that is not
/// http(s) after resolution yield `None`.
pub fn normalize_image_url(image_url: &str, base_url: &str) -> Option<String> {
    let image_url = image_url.trim();
    if image_url.is_empty() {
        return None;
    }

    if image_url
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
    {
        return None;
    }

    let resolved = match Url::parse(image_url) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(base_url).ok()?.join(image_url).ok()?
        }
        Err(_) => return None,
    };

    is_http_scheme(&resolved).then(|| resolved.to_string())
}

/// Keep only absolute http(s) URLs.
pub fn sanitize_image_url(image_url: Option<&str>) -> Option<String> {
    let image_url = image_url?.trim();
    if image_url.is_empty() {
        return None;
    }

    let parsed = Url::parse(image_url).ok()?;
    is_http_scheme(&parsed).then(|| parsed.to_string())
}

fn is_http_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_text_strips_non_content() {
        let html = r#"
            <html><head><style>.x { color: red }</style><script>var a = 1;</script></head>
            <body>
              <header>Site header</header>
              <nav><a href="/">Home</a></nav>
              <article>
                <h1>Title   here</h1>
                <p>First   paragraph &amp; more.</p>

                <p>Second</p>
              </article>
              <form><input value="x">Subscribe</form>
              <footer>Footer text</footer>
            </body></html>
        "#;

        let text = visible_text(&Html::parse_document(html));

        assert_eq!(text, "Title here\nFirst paragraph & more.\nSecond");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \t b  \n\n \n c  "), "a b\nc");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello".to_string(), 5), "hello");
        assert_eq!(truncate_chars("hello!".to_string(), 5), "hello\n[truncated]");
        assert_eq!(truncate_chars("héllo wörld".to_string(), 4), "héll\n[truncated]");
    }

    #[test]
    fn test_og_image_relative() {
        let html = r#"<html><head><meta property="og:image" content="/img/a.png"></head>
            <body><img src="/other.png"></body></html>"#;

        let image = lead_image_url(&Html::parse_document(html), "https://example.com/post");

        assert_eq!(image.as_deref(), Some("https://example.com/img/a.png"));
    }

    #[test]
    fn test_content_image_before_any_image() {
        let html = r#"<body><div><img src="logo.png"></div>
            <article><p>x</p><img src="https://cdn.example.com/hero.jpg"></article></body>"#;

        let image = lead_image_url(&Html::parse_document(html), "https://example.com/post");

        assert_eq!(image.as_deref(), Some("https://cdn.example.com/hero.jpg"));
    }

    #[test]
    fn test_content_class_container() {
        let html = r#"<body><img src="/a.png"><div class="post-content"><img src="/b.png"></div></body>"#;

        let image = lead_image_url(&Html::parse_document(html), "https://example.com/x/y");

        assert_eq!(image.as_deref(), Some("https://example.com/b.png"));
    }

    #[test]
    fn test_any_image_fallback() {
        let html = r#"<body><p>hi</p><img src="pic.gif"></body>"#;

        let image = lead_image_url(&Html::parse_document(html), "https://example.com/dir/page");

        assert_eq!(image.as_deref(), Some("https://example.com/dir/pic.gif"));
    }

    #[test]
    fn test_no_image() {
        let image = lead_image_url(&Html::parse_document("<p>text</p>"), "https://example.com");
        assert!(image.is_none());
    }

    #[test]
    fn test_rejects_data_and_other_schemes() {
        assert!(normalize_image_url("data:image/png;base64,AAAA", "https://e.com").is_none());
        assert!(normalize_image_url("DATA:image/png;base64,AAAA", "https://e.com").is_none());
        assert!(normalize_image_url("ftp://e.com/a.png", "https://e.com").is_none());
        assert!(normalize_image_url("javascript:alert(1)", "https://e.com").is_none());
    }

    #[test]
    fn test_sanitize_image_url() {
        assert_eq!(
            sanitize_image_url(Some("https://e.com/a.png")).as_deref(),
            Some("https://e.com/a.png")
        );
        assert!(sanitize_image_url(Some("/relative.png")).is_none());
        assert!(sanitize_image_url(Some("   ")).is_none());
        assert!(sanitize_image_url(None).is_none());
    }
}
