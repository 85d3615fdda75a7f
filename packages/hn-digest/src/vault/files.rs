//! File operations inside the knowledge base.
//!
//! All relative paths resolve against `<vault>/hn_knowledge_base/` through
//! [`SandboxRoot`].

use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::sandbox::SandboxRoot;
use super::templates::INSTRUCTION_FILES;
use crate::error::{VaultError, VaultResult};
use crate::models::{DigestOutput, StoryHit};

/// Knowledge-base folder created inside the selected vault.
pub const KNOWLEDGE_BASE_FOLDER: &str = "hn_knowledge_base";

/// Folder holding the digest and its raw input.
pub const NEWS_DIGEST_FOLDER: &str = "news_digest";

/// Folder holding per-story markdown files.
pub const STORIES_FOLDER: &str = "stories";

pub const DIGEST_FILE_NAME: &str = "news_digest.json";
pub const UNPROCESSED_DIGEST_DATA_FILE_NAME: &str = "unprocessed_data_news_digest.json";
pub const AGENT_INSTRUCTIONS_FILE_NAME: &str = "Agent.md";

/// Knowledge-base file service.
///
/// Cheap to clone; clones share the sandbox root.
#[derive(Debug, Clone, Default)]
pub struct VaultFiles {
    sandbox: SandboxRoot,
}

impl VaultFiles {
    /// Create a service for a vault folder (or none yet).
    pub fn new(vault_path: Option<&Path>) -> Self {
        let files = Self::default();
        files.set_vault_path(vault_path);
        files
    }

    /// Point the service at another vault folder, or unset it.
    pub fn set_vault_path(&self, vault_path: Option<&Path>) {
        let root = vault_path
            .filter(|path| !path.as_os_str().is_empty())
            .map(|path| path.join(KNOWLEDGE_BASE_FOLDER));
        self.sandbox.set_root(root.as_deref());
    }

    /// The knowledge-base sandbox.
    pub fn sandbox(&self) -> &SandboxRoot {
        &self.sandbox
    }

    /// Absolute knowledge-base root, if configured.
    pub fn base_path(&self) -> Option<PathBuf> {
        self.sandbox.root().ok()
    }

    /// A sandbox confined to one knowledge-base folder.
    pub fn folder_sandbox(&self, folder: &str) -> VaultResult<SandboxRoot> {
        self.sandbox.child(folder)
    }

    /// Relative path of the digest file.
    pub fn digest_path() -> String {
        format!("{}/{}", NEWS_DIGEST_FOLDER, DIGEST_FILE_NAME)
    }

    /// Relative path of the raw story data file.
    pub fn raw_data_path() -> String {
        format!("{}/{}", NEWS_DIGEST_FOLDER, UNPROCESSED_DIGEST_DATA_FILE_NAME)
    }

    /// Relative path of a story markdown file.
    pub fn story_path(story_id: u64) -> String {
        format!("{}/{}.md", STORIES_FOLDER, story_id)
    }

    pub async fn file_exists(&self, relative: &str) -> VaultResult<bool> {
        let path = self.sandbox.resolve(relative)?;
        Ok(fs::metadata(&path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false))
    }

    pub async fn folder_exists(&self, relative: &str) -> VaultResult<bool> {
        let path = self.sandbox.resolve(relative)?;
        Ok(fs::metadata(&path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false))
    }

    pub async fn create_folder(&self, relative: &str) -> VaultResult<()> {
        let path = self.sandbox.resolve(relative)?;
        fs::create_dir_all(&path)
            .await
            .map_err(|e| VaultError::io(&path, e))
    }

    pub async fn read_text(&self, relative: &str) -> VaultResult<String> {
        let path = self.sandbox.resolve(relative)?;
        fs::read_to_string(&path)
            .await
            .map_err(|e| VaultError::io(&path, e))
    }

    /// Write a file, creating parent folders.
    ///
    /// Content goes to a uniquely named temporary sibling first and is
    /// persisted into place, so readers never see a half-written file.
    pub async fn write_text(&self, relative: &str, content: &str) -> VaultResult<()> {
        let path = self.sandbox.resolve(relative)?;
        write_atomic(&path, content).await
    }

    /// Delete a file; a missing file is not an error.
    pub async fn delete_file(&self, relative: &str) -> VaultResult<()> {
        let path = self.sandbox.resolve(relative)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultError::io(&path, e)),
        }
    }

    /// Delete a folder; a missing folder is not an error.
    pub async fn delete_folder(&self, relative: &str, recursive: bool) -> VaultResult<()> {
        let path = self.sandbox.resolve(relative)?;
        let result = if recursive {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_dir(&path).await
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultError::io(&path, e)),
        }
    }

    /// List files directly inside a folder, relative to the knowledge-base
    /// root and sorted. `extension` filters by file extension (no dot).
    pub async fn list_files(
        &self,
        relative: &str,
        extension: Option<&str>,
    ) -> VaultResult<Vec<PathBuf>> {
        let dir = self.sandbox.resolve(relative)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(VaultError::io(&dir, e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| VaultError::io(&dir, e))?
        {
            let path = entry.path();
            let is_file = entry
                .file_type()
                .await
                .map(|kind| kind.is_file())
                .unwrap_or(false);
            let matches = extension.map_or(true, |wanted| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
            });
            if is_file && matches {
                files.push(self.sandbox.relative(&path)?);
            }
        }

        files.sort();
        Ok(files)
    }

    /// Create the folder tree and deploy instruction files.
    ///
    /// Idempotent: existing instruction files are left untouched.
    pub async fn initialize_knowledge_base(&self) -> VaultResult<()> {
        self.create_folder("").await?;
        for folder in [NEWS_DIGEST_FOLDER, STORIES_FOLDER] {
            self.create_folder(folder).await?;
        }

        for file in INSTRUCTION_FILES {
            let relative = file.relative_path();
            if self.file_exists(&relative).await? {
                continue;
            }
            self.write_text(&relative, &file.render()).await?;
            debug!(path = %relative, "Deployed instruction file");
        }

        info!(root = ?self.base_path(), "Knowledge base initialized");
        Ok(())
    }

    /// Remove the whole knowledge base. Does nothing when unconfigured.
    pub async fn cleanup_knowledge_base(&self) -> VaultResult<()> {
        if !self.sandbox.is_configured() {
            return Ok(());
        }
        self.delete_folder("", true).await
    }

    /// Load the digest file.
    ///
    /// A missing or unreadable digest is `None`; unreadable ones are logged.
    pub async fn load_digest(&self) -> VaultResult<Option<DigestOutput>> {
        let relative = Self::digest_path();
        if !self.file_exists(&relative).await? {
            return Ok(None);
        }

        let json = self.read_text(&relative).await?;
        match serde_json::from_str(&json) {
            Ok(digest) => Ok(Some(digest)),
            Err(e) => {
                warn!(error = %e, "Error loading digest JSON");
                Ok(None)
            }
        }
    }

    /// Validate and store digest JSON, replacing any previous digest.
    pub async fn write_digest_json(&self, digest_json: &str) -> VaultResult<()> {
        if digest_json.trim().is_empty() {
            return Err(VaultError::InvalidDigest("digest JSON is empty".into()));
        }
        serde_json::from_str::<DigestOutput>(digest_json)
            .map_err(|e| VaultError::InvalidDigest(e.to_string()))?;

        self.replace_digest(digest_json).await
    }

    /// Serialize and store a digest, replacing any previous digest.
    pub async fn save_digest(&self, digest: &DigestOutput) -> VaultResult<()> {
        let json = serde_json::to_string_pretty(digest)
            .map_err(|e| VaultError::InvalidDigest(e.to_string()))?;
        self.replace_digest(&json).await?;
        debug!(stories = digest.story_count(), "Saved digest");
        Ok(())
    }

    async fn replace_digest(&self, json: &str) -> VaultResult<()> {
        let relative = Self::digest_path();
        self.delete_file(&relative).await?;
        self.write_text(&relative, json).await
    }

    /// Store the raw story list the digest agent reads.
    pub async fn write_raw_stories(&self, stories: &[StoryHit]) -> VaultResult<()> {
        let json = serde_json::to_string_pretty(stories)
            .map_err(|e| VaultError::InvalidDigest(e.to_string()))?;
        self.write_text(&Self::raw_data_path(), &json).await
    }

    pub async fn save_story_markdown(&self, story_id: u64, markdown: &str) -> VaultResult<()> {
        if markdown.trim().is_empty() {
            return Err(VaultError::InvalidDigest(format!(
                "markdown for story {} is empty",
                story_id
            )));
        }
        self.write_text(&Self::story_path(story_id), markdown).await
    }

    pub async fn delete_story(&self, story_id: u64) -> VaultResult<()> {
        self.delete_file(&Self::story_path(story_id)).await
    }
}

async fn write_atomic(path: &Path, content: &str) -> VaultResult<()> {
    let parent = path
        .parent()
        .ok_or_else(|| VaultError::AccessDenied {
            path: path.display().to_string(),
        })?
        .to_path_buf();
    fs::create_dir_all(&parent)
        .await
        .map_err(|e| VaultError::io(&parent, e))?;

    let target = path.to_path_buf();
    let content = content.to_owned();
    tokio::task::spawn_blocking(move || persist_in(&parent, &target, content.as_bytes()))
        .await
        .map_err(|e| VaultError::io(path, std::io::Error::other(e)))?
}

/// Each writer gets its own uniquely named temp file, so concurrent writes to
/// one path never step on each other; the last rename wins.
fn persist_in(parent: &Path, target: &Path, content: &[u8]) -> VaultResult<()> {
    let mut temp = tempfile::Builder::new()
        .prefix(".vault.")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| VaultError::io(parent, e))?;

    temp.write_all(content)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| VaultError::io(temp.path(), e))?;

    temp.persist(target)
        .map_err(|e| VaultError::io(target, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DigestGroup, DigestStory};
    use tempfile::TempDir;

    fn vault() -> (TempDir, VaultFiles) {
        let dir = TempDir::new().unwrap();
        let files = VaultFiles::new(Some(dir.path()));
        (dir, files)
    }

    fn digest(interest: &str, story_id: &str) -> DigestOutput {
        DigestOutput {
            summary: format!("{} day", interest),
            groups: vec![DigestGroup {
                interest_name: interest.into(),
                interest_description: format!("About {}", interest),
                summary: String::new(),
                stories: vec![DigestStory {
                    id: story_id.into(),
                    ..Default::default()
                }],
            }],
            generated_at: None,
        }
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let (dir, files) = vault();

        files.initialize_knowledge_base().await.unwrap();
        let root = dir.path().join(KNOWLEDGE_BASE_FOLDER);
        assert!(root.join("news_digest/Agent.md").is_file());
        assert!(root.join("stories/Agent.md").is_file());
        assert!(root.join("Agent.md").is_file());

        std::fs::write(root.join("news_digest/Agent.md"), "custom").unwrap();
        files.initialize_knowledge_base().await.unwrap();

        assert_eq!(
            std::fs::read_to_string(root.join("news_digest/Agent.md")).unwrap(),
            "custom"
        );
    }

    #[tokio::test]
    async fn test_deployed_instructions_are_rendered() {
        let (_dir, files) = vault();
        files.initialize_knowledge_base().await.unwrap();

        let instructions = files.read_text("news_digest/Agent.md").await.unwrap();

        assert!(instructions.contains(UNPROCESSED_DIGEST_DATA_FILE_NAME));
        assert!(!instructions.contains("{{"));
    }

    #[tokio::test]
    async fn test_unconfigured_vault() {
        let files = VaultFiles::new(None);

        assert!(matches!(
            files.read_text("a.txt").await,
            Err(VaultError::NotConfigured)
        ));
        assert!(files.cleanup_knowledge_base().await.is_ok());
    }

    #[tokio::test]
    async fn test_traversal_is_denied() {
        let (_dir, files) = vault();

        let result = files.write_text("../outside.txt", "x").await;

        assert!(matches!(result, Err(VaultError::AccessDenied { .. })));
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let (_dir, files) = vault();

        files.write_text("a/b/c.txt", "hello").await.unwrap();
        assert!(files.file_exists("a/b/c.txt").await.unwrap());
        assert!(files.folder_exists("a/b").await.unwrap());
        assert_eq!(files.read_text("a/b/c.txt").await.unwrap(), "hello");

        files.delete_file("a/b/c.txt").await.unwrap();
        files.delete_file("a/b/c.txt").await.unwrap();
        assert!(!files.file_exists("a/b/c.txt").await.unwrap());

        files.delete_folder("a", true).await.unwrap();
        assert!(!files.folder_exists("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_files_filters_extension() {
        let (_dir, files) = vault();
        files.write_text("stories/2.md", "b").await.unwrap();
        files.write_text("stories/1.md", "a").await.unwrap();
        files.write_text("stories/notes.txt", "c").await.unwrap();
        files.create_folder("stories/sub.md").await.unwrap();

        let listed = files.list_files("stories", Some("md")).await.unwrap();

        assert_eq!(
            listed,
            vec![PathBuf::from("stories/1.md"), PathBuf::from("stories/2.md")]
        );
        assert_eq!(files.list_files("stories", None).await.unwrap().len(), 3);
        assert!(files.list_files("missing", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_digest_replaces_first() {
        let (_dir, files) = vault();

        files.save_digest(&digest("Rust", "1")).await.unwrap();
        files
            .write_digest_json(&serde_json::to_string(&digest("AI", "2")).unwrap())
            .await
            .unwrap();

        let loaded = files.load_digest().await.unwrap().unwrap();
        assert_eq!(loaded, digest("AI", "2"));
        assert_eq!(loaded.groups.len(), 1);
    }

    #[tokio::test]
    async fn test_write_digest_json_validates() {
        let (_dir, files) = vault();
        files.save_digest(&digest("Rust", "1")).await.unwrap();

        assert!(matches!(
            files.write_digest_json("not json").await,
            Err(VaultError::InvalidDigest(_))
        ));
        assert!(matches!(
            files.write_digest_json("  ").await,
            Err(VaultError::InvalidDigest(_))
        ));

        // The previous digest survives a rejected write
        assert_eq!(files.load_digest().await.unwrap().unwrap(), digest("Rust", "1"));
    }

    #[tokio::test]
    async fn test_load_digest_missing_or_corrupt() {
        let (_dir, files) = vault();
        assert!(files.load_digest().await.unwrap().is_none());

        files.write_text(&VaultFiles::digest_path(), "{oops").await.unwrap();
        assert!(files.load_digest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_story_markdown_lifecycle() {
        let (_dir, files) = vault();

        files.save_story_markdown(42, "# Title").await.unwrap();
        assert!(files.file_exists("stories/42.md").await.unwrap());
        assert!(files.save_story_markdown(43, " ").await.is_err());

        files.delete_story(42).await.unwrap();
        assert!(!files.file_exists("stories/42.md").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_writers_to_one_path() {
        let (_dir, files) = vault();
        let raw = VaultFiles::raw_data_path();

        let mut writers = Vec::new();
        for writer in 0..8 {
            let files = files.clone();
            let raw = raw.clone();
            writers.push(tokio::spawn(async move {
                for round in 0..25 {
                    files
                        .write_text(&raw, &format!("writer {} round {}", writer, round))
                        .await?;
                }
                Ok::<_, VaultError>(())
            }));
        }
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let content = files.read_text(&raw).await.unwrap();
        assert!(content.starts_with("writer ") && content.contains(" round 24"));
        let leftovers = files.list_files(NEWS_DIGEST_FOLDER, Some("tmp")).await.unwrap();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_removes_everything() {
        let (dir, files) = vault();
        files.initialize_knowledge_base().await.unwrap();

        files.cleanup_knowledge_base().await.unwrap();

        assert!(!dir.path().join(KNOWLEDGE_BASE_FOLDER).exists());
    }
}
