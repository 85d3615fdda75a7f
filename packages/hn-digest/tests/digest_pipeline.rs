//! End-to-end digest runs against mock sources and a scripted agent.

use extraction::testing::MockFetcher;
use extraction::ContentExtractor;
use hn_digest::models::{DigestOutput, DigestProgress, FlatComment, Interest, ProgressReporter};
use hn_digest::pipeline::{DigestPipeline, DigestSettings, PipelineOutcome};
use hn_digest::testing::{
    story_hit, MockCommentSource, MockStorySource, ScriptStep, ScriptedTransport,
};
use hn_digest::vault::{VaultFiles, KNOWLEDGE_BASE_FOLDER};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const ARTICLE_URL: &str = "https://blog.example.com/post";

struct Harness {
    _dir: TempDir,
    vault: VaultFiles,
    stories: MockStorySource,
    transport: ScriptedTransport,
    pipeline: DigestPipeline,
}

fn harness(stories: MockStorySource, transport: ScriptedTransport) -> Harness {
    let dir = TempDir::new().unwrap();
    let vault = VaultFiles::new(Some(dir.path()));

    let fetcher = MockFetcher::new().with_page(
        ARTICLE_URL,
        r#"<html><head><meta property="og:image" content="/img/a.png"></head>
           <body><p>Rust 2.0 announced</p></body></html>"#,
    );
    let comments = MockCommentSource::new().with_comments(
        1,
        vec![
            FlatComment::new(10, "alice", "Finally!", 0),
            FlatComment::new(11, "bob", "Agreed", 1),
        ],
    );
    let settings = DigestSettings::default()
        .with_interests(vec![Interest::new("Rust", Some("The language"))])
        .with_max_stories_per_group(3);

    let pipeline = DigestPipeline::new(
        Arc::new(stories.clone()),
        Arc::new(comments),
        vault.clone(),
        Arc::new(transport.clone()),
        ContentExtractor::from_fetcher(Arc::new(fetcher)),
        settings,
    );

    Harness {
        _dir: dir,
        vault,
        stories,
        transport,
        pipeline,
    }
}

fn default_stories() -> MockStorySource {
    MockStorySource::new()
        .with_story(story_hit(1, "Rust 2.0", Some(ARTICLE_URL)))
        .with_story(story_hit(2, "Ask HN: Favourite crates?", None))
}

fn agent_digest() -> String {
    json!({
        "summary": "A big day for Rust.",
        "groups": [{
            "interest": "Rust",
            "interestDescription": "The language",
            "summary": "Rust 2.0 and crates.",
            "stories": [
                {"id": "1", "title": "Rust 2.0", "url": ARTICLE_URL, "author": "author1",
                 "summary": "Announced.", "createdAt": "2025-01-01T00:00:00Z"},
                {"id": 2, "title": "Ask HN: Favourite crates?", "url": "", "author": "author2",
                 "summary": "Crates.", "createdAt": "2025-01-01T00:00:00Z",
                 "imageUrl": "https://cdn.example.com/agent.png"}
            ]
        }]
    })
    .to_string()
}

async fn run(harness: &Harness, cancel: &CancellationToken) -> (PipelineOutcome<DigestOutput>, Vec<DigestProgress>) {
    let (progress, mut updates) = ProgressReporter::channel();
    let outcome = harness.pipeline.run(cancel, &progress).await;
    drop(progress);

    let mut reports = Vec::new();
    while let Some(update) = updates.recv().await {
        reports.push(update);
    }
    (outcome, reports)
}

#[tokio::test]
async fn test_full_run_produces_enriched_digest() {
    let transport = ScriptedTransport::new().with_script(vec![
        ScriptStep::tool("scrape_article", json!({"url": ARTICLE_URL})),
        ScriptStep::tool("read_comments", json!({"story_id": 1})),
        ScriptStep::write("news_digest.json", agent_digest()),
        ScriptStep::Delta("Digest ".into()),
        ScriptStep::Delta("written.".into()),
        ScriptStep::Message("Digest written.".into()),
        ScriptStep::Idle,
    ]);
    let harness = harness(default_stories(), transport);

    let (outcome, reports) = run(&harness, &CancellationToken::new()).await;

    let digest = match outcome {
        PipelineOutcome::Completed(digest) => digest,
        other => panic!("expected completion, got {:?}", other),
    };
    let stories = &digest.groups[0].stories;
    assert_eq!(
        stories[0].image_url.as_deref(),
        Some("https://blog.example.com/img/a.png")
    );
    assert_eq!(
        stories[1].image_url.as_deref(),
        Some("https://cdn.example.com/agent.png")
    );
    assert_eq!(stories[1].id, "2");
    assert!(digest.generated_at.is_some());

    // The enriched digest replaced the agent's file
    assert_eq!(harness.vault.load_digest().await.unwrap(), Some(digest.clone()));

    let raw = harness
        .vault
        .read_text(&VaultFiles::raw_data_path())
        .await
        .unwrap();
    let raw: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(raw.as_array().unwrap().len(), 2);
    assert_eq!(raw[0]["objectID"], "1");

    let messages: Vec<_> = reports.iter().map(|r| (r.percentage, r.message.as_str())).collect();
    assert_eq!(
        messages,
        vec![
            (2, "Initializing knowledge base..."),
            (5, "Fetching trending stories from Hacker News..."),
            (15, "Found 2 trending stories"),
            (30, "Saved 2 stories to knowledge base"),
            (35, "Starting AI agent..."),
            (60, "Agent: executing scrape_article..."),
            (60, "Agent: processing results..."),
            (60, "Agent: executing read_comments..."),
            (60, "Agent: processing results..."),
            (60, "Agent is writing the digest..."),
            (95, "Loading generated digest..."),
            (95, "Enriching stories with images..."),
            (100, "Digest ready!"),
        ]
    );
    let last = reports.last().unwrap();
    assert!(last.is_complete && !last.has_error && !last.is_cancelled);
    assert_eq!(last.result.as_ref(), Some(&digest));
}

#[tokio::test]
async fn test_session_is_confined_to_digest_folder() {
    let transport = ScriptedTransport::new().with_script(vec![
        ScriptStep::write("../stories/evil.md", "x"),
        ScriptStep::write("/etc/hn-digest-test", "x"),
        ScriptStep::tool("read_comments", json!({"story_id": 1, "filePath": "../../secret"})),
        ScriptStep::write("news_digest.json", agent_digest()),
        ScriptStep::Idle,
    ]);
    let harness = harness(default_stories(), transport);

    let (outcome, _) = run(&harness, &CancellationToken::new()).await;
    assert!(outcome.is_completed());

    let log = harness.transport.log();
    assert_eq!(
        log.denied_writes,
        vec!["../stories/evil.md", "/etc/hn-digest-test"]
    );
    assert!(log.tool_results[0].1.as_ref().unwrap_err().contains("Permission denied"));
    assert!(!harness
        .vault
        .file_exists("stories/evil.md")
        .await
        .unwrap());

    let session = &log.sessions[0];
    assert!(session
        .working_directory
        .ends_with(format!("{}/news_digest", KNOWLEDGE_BASE_FOLDER)));
    assert_eq!(session.tools, vec!["read_comments", "scrape_article"]);
    assert!(session.streaming);
    assert_eq!(session.model, "claude-sonnet-4.5");

    assert!(log.system_prompts[0].contains("Do NOT modify unprocessed_data_news_digest.json."));
    assert!(log.prompts[0].contains("- Rust: The language"));
    assert!(log.prompts[0].contains("should not exceed 3."));
}

#[tokio::test]
async fn test_missing_digest_fails() {
    let transport = ScriptedTransport::new().with_script(vec![ScriptStep::Idle]);
    let harness = harness(default_stories(), transport);

    let (outcome, reports) = run(&harness, &CancellationToken::new()).await;

    assert_eq!(
        outcome,
        PipelineOutcome::Failed("Failed to generate digest: agent did not produce a digest".into())
    );
    let last = reports.last().unwrap();
    assert!(last.has_error);
    assert_eq!(last.percentage, 0);
    assert!(!last.is_complete);
}

#[tokio::test]
async fn test_agent_error_fails() {
    let transport = ScriptedTransport::new().with_script(vec![
        ScriptStep::tool("scrape_article", json!({"url": ARTICLE_URL})),
        ScriptStep::Error("rate limited".into()),
        ScriptStep::write("news_digest.json", agent_digest()),
        ScriptStep::Idle,
    ]);
    let harness = harness(default_stories(), transport);

    let (outcome, _) = run(&harness, &CancellationToken::new()).await;

    match outcome {
        PipelineOutcome::Failed(message) => assert!(message.contains("rate limited")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(harness.vault.load_digest().await.unwrap().is_none());
}

#[tokio::test]
async fn test_stream_ending_early_fails() {
    let transport = ScriptedTransport::new().with_script(vec![ScriptStep::write(
        "news_digest.json",
        agent_digest(),
    )]);
    let harness = harness(default_stories(), transport);

    let (outcome, _) = run(&harness, &CancellationToken::new()).await;

    assert!(matches!(outcome, PipelineOutcome::Failed(message) if message.contains("closed")));
}

#[tokio::test]
async fn test_story_source_failure_fails() {
    let harness = harness(
        MockStorySource::new().with_failure("algolia down"),
        ScriptedTransport::new(),
    );

    let (outcome, _) = run(&harness, &CancellationToken::new()).await;

    match outcome {
        PipelineOutcome::Failed(message) => assert!(message.contains("algolia down")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(harness.transport.log().sessions.is_empty());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let harness = harness(default_stories(), ScriptedTransport::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (outcome, reports) = run(&harness, &cancel).await;

    assert_eq!(outcome, PipelineOutcome::Cancelled);
    assert_eq!(harness.stories.call_count(), 0);
    assert_eq!(reports.len(), 1);
    assert!(reports[0].is_cancelled);
    assert_eq!(reports[0].message, "Digest generation cancelled.");
    assert!(reports[0].error_message.is_none());
}

#[tokio::test]
async fn test_cancel_while_agent_works_aborts_session() {
    let transport = ScriptedTransport::new().with_script(vec![
        ScriptStep::tool("read_comments", json!({"story_id": 1})),
        ScriptStep::Hang,
    ]);
    let harness = harness(default_stories(), transport);
    let cancel = CancellationToken::new();
    let (progress, mut updates) = ProgressReporter::channel();

    let watcher = async {
        while let Some(update) = updates.recv().await {
            if update.message == "Agent: processing results..." {
                cancel.cancel();
            }
            if update.is_terminal() {
                return update;
            }
        }
        panic!("progress channel closed before a terminal report");
    };
    let (outcome, last) = tokio::join!(harness.pipeline.run(&cancel, &progress), watcher);

    assert_eq!(outcome, PipelineOutcome::Cancelled);
    assert!(last.is_cancelled);
    assert_eq!(last.percentage, 0);
    assert_eq!(harness.transport.log().aborts, 1);
    assert!(harness.vault.load_digest().await.unwrap().is_none());
}
