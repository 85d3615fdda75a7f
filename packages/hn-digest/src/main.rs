//! Command-line access to the digest core.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use extraction::{ContentExtractor, ExtractorConfig, PageFetcher};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use hn_digest::agent::{PermissionDecision, PermissionGate, PermissionRequest};
use hn_digest::comments::{story_markdown, CommentCache, StoryDocument};
use hn_digest::hn::{AlgoliaClient, HnWebClient, StorySource};
use hn_digest::vault::{VaultFiles, NEWS_DIGEST_FOLDER};
use hn_digest::Config;

#[derive(Parser)]
#[command(name = "hn-digest")]
#[command(about = "Hacker News digest knowledge base tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the knowledge base folders and instruction files
    Init,

    /// Extract an article's plain text
    Scrape { url: String },

    /// Print a story and its discussion as markdown
    Comments { story_id: u64 },

    /// Inspect the current digest
    Digest {
        #[command(subcommand)]
        command: DigestCommands,
    },

    /// Check whether a path is inside the digest sandbox
    CheckPath { path: String },
}

#[derive(Subcommand)]
enum DigestCommands {
    /// Print the current digest as JSON
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hn_digest=debug,extraction=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Init => cmd_init(&config).await,
        Commands::Scrape { url } => cmd_scrape(&config, &url).await,
        Commands::Comments { story_id } => cmd_comments(&config, story_id).await,
        Commands::Digest {
            command: DigestCommands::Show,
        } => cmd_digest_show(&config).await,
        Commands::CheckPath { path } => cmd_check_path(&config, &path),
    }
}

fn vault(config: &Config) -> Result<VaultFiles> {
    match config.vault_path.as_deref() {
        Some(path) => Ok(VaultFiles::new(Some(path))),
        None => bail!("HN_VAULT_PATH must be set"),
    }
}

fn extractor_config(config: &Config) -> ExtractorConfig {
    ExtractorConfig::default()
        .with_identity(config.user_agent.clone())
        .with_user_agent(config.user_agent.clone())
        .with_timeout(config.http_timeout)
}

fn fetcher(config: &Config) -> Result<Arc<dyn PageFetcher>> {
    let fetcher = extractor_config(config)
        .http_fetcher()
        .context("Failed to create HTTP fetcher")?;
    Ok(Arc::new(fetcher))
}

async fn cmd_init(config: &Config) -> Result<()> {
    let vault = vault(config)?;
    vault
        .initialize_knowledge_base()
        .await
        .context("Failed to initialize knowledge base")?;

    if let Some(root) = vault.base_path() {
        println!("Knowledge base ready at {}", root.display());
    }
    Ok(())
}

async fn cmd_scrape(config: &Config, url: &str) -> Result<()> {
    let url = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;

    let extractor =
        ContentExtractor::from_fetcher(fetcher(config)?).with_config(extractor_config(config));

    let text = extractor.extract_plain_text(url.as_str()).await;
    println!("{}", text);

    match extractor.cached_image_url(url.as_str()) {
        Some(Some(image)) => println!("\nImage: {}", image),
        Some(None) => println!("\nImage: none"),
        None => {}
    }
    Ok(())
}

async fn cmd_comments(config: &Config, story_id: u64) -> Result<()> {
    let stories = AlgoliaClient::new(&config.user_agent, config.http_timeout)?;
    let story = stories
        .story(story_id)
        .await
        .with_context(|| format!("Failed to fetch story {}", story_id))?;

    let comments = CommentCache::new(Arc::new(HnWebClient::new(fetcher(config)?)));
    let roots = comments.get_or_fetch(story_id).await;

    print!(
        "{}",
        story_markdown(&StoryDocument::from_hit(story_id, &story), &roots)
    );
    Ok(())
}

async fn cmd_digest_show(config: &Config) -> Result<()> {
    let vault = vault(config)?;

    match vault.load_digest().await.context("Failed to load digest")? {
        Some(digest) => println!("{}", serde_json::to_string_pretty(&digest)?),
        None => println!("No digest has been generated yet"),
    }
    Ok(())
}

fn cmd_check_path(config: &Config, path: &str) -> Result<()> {
    let sandbox = vault(config)?
        .folder_sandbox(NEWS_DIGEST_FOLDER)
        .context("Failed to locate digest folder")?;
    let gate = PermissionGate::new(sandbox);

    match gate.evaluate(&PermissionRequest::new("check").with_path("path", path)) {
        PermissionDecision::Approved => println!("approved: {}", path),
        PermissionDecision::Denied { reason } => println!("denied: {}", reason),
    }
    Ok(())
}
