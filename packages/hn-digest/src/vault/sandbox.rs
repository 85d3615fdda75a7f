//! Path confinement for the knowledge base.
//!
//! Every file operation and every permission check resolves paths through
//! [`SandboxRoot::resolve`].

use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::warn;

use crate::error::{VaultError, VaultResult};

/// A replaceable absolute root directory.
///
/// Clones share the same root, so swapping the vault folder is seen by
/// every holder at once.
#[derive(Debug, Clone, Default)]
pub struct SandboxRoot {
    root: Arc<RwLock<Option<PathBuf>>>,
}

impl SandboxRoot {
    /// Create a sandbox rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let sandbox = Self::default();
        sandbox.set_root(Some(root.as_ref()));
        sandbox
    }

    /// Create a sandbox with no root; every resolution fails until one is set.
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// Replace the root. `None` or an empty path unsets it.
    ///
    /// Relative roots are made absolute against the current directory and
    /// normalised lexically.
    pub fn set_root(&self, root: Option<&Path>) {
        let root = root
            .filter(|root| !root.as_os_str().is_empty())
            .map(absolute);

        match self.root.write() {
            Ok(mut guard) => *guard = root,
            Err(poisoned) => *poisoned.into_inner() = root,
        }
    }

    /// The current root.
    pub fn root(&self) -> VaultResult<PathBuf> {
        let guard = match self.root.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone().ok_or(VaultError::NotConfigured)
    }

    pub fn is_configured(&self) -> bool {
        self.root().is_ok()
    }

    /// Resolve `path` against the root.
    ///
    /// Relative paths are joined to the root; absolute paths are taken as
    /// is. The result is normalised lexically and must be the root or a
    /// descendant of it, compared component by component so a sibling
    /// like `root2` never passes for `root`. Existing paths are re-checked
    /// after resolving symlinks.
    pub fn resolve(&self, path: impl AsRef<Path>) -> VaultResult<PathBuf> {
        let root = self.root()?;
        let path = path.as_ref();

        let resolved = normalize_path(&root.join(path));
        if !resolved.starts_with(&root) {
            warn!(path = %path.display(), root = %root.display(), "Path escapes sandbox");
            return Err(access_denied(path));
        }

        let canonical_root = canonicalize_allow_missing(&root);
        if !canonicalize_allow_missing(&resolved).starts_with(&canonical_root) {
            warn!(path = %path.display(), root = %root.display(), "Path escapes sandbox through a symlink");
            return Err(access_denied(path));
        }

        Ok(resolved)
    }

    /// A new sandbox rooted at `relative` under this one.
    ///
    /// The child does not follow later root changes of the parent.
    pub fn child(&self, relative: impl AsRef<Path>) -> VaultResult<SandboxRoot> {
        Ok(SandboxRoot::new(self.resolve(relative)?))
    }

    /// Express a resolved path relative to the root.
    pub fn relative(&self, path: &Path) -> VaultResult<PathBuf> {
        let root = self.root()?;
        path.strip_prefix(&root)
            .map(Path::to_path_buf)
            .map_err(|_| access_denied(path))
    }
}

fn access_denied(path: &Path) -> VaultError {
    VaultError::AccessDenied {
        path: path.display().to_string(),
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize_path(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize_path(&cwd.join(path)),
        Err(_) => normalize_path(path),
    }
}

/// Resolve `.` and `..` without touching the filesystem.
///
/// `..` at the top of an absolute path stays at the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Canonicalize the longest existing ancestor and re-append the rest.
fn canonicalize_allow_missing(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut missing = Vec::new();

    loop {
        if let Ok(canonical) = std::fs::canonicalize(existing) {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_inside_root() {
        let sandbox = SandboxRoot::new("/vault/kb");

        assert_eq!(
            sandbox.resolve("news_digest/news_digest.json").unwrap(),
            PathBuf::from("/vault/kb/news_digest/news_digest.json")
        );
        assert_eq!(sandbox.resolve("").unwrap(), PathBuf::from("/vault/kb"));
        assert_eq!(sandbox.resolve("a/../b/./c").unwrap(), PathBuf::from("/vault/kb/b/c"));
        assert_eq!(sandbox.resolve("/vault/kb/x").unwrap(), PathBuf::from("/vault/kb/x"));
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let sandbox = SandboxRoot::new("/vault/kb");

        for path in ["..", "../kb2/file", "../../etc/passwd", "a/../../x", "/etc/passwd", "/vault/kb2"] {
            assert!(
                matches!(sandbox.resolve(path), Err(VaultError::AccessDenied { .. })),
                "{} should be denied",
                path
            );
        }
    }

    #[test]
    fn test_unconfigured() {
        let sandbox = SandboxRoot::unconfigured();
        assert!(matches!(sandbox.resolve("a"), Err(VaultError::NotConfigured)));

        sandbox.set_root(Some(Path::new("/vault")));
        assert!(sandbox.resolve("a").is_ok());

        sandbox.set_root(Some(Path::new("")));
        assert!(matches!(sandbox.resolve("a"), Err(VaultError::NotConfigured)));
    }

    #[test]
    fn test_clones_share_root() {
        let sandbox = SandboxRoot::unconfigured();
        let clone = sandbox.clone();

        sandbox.set_root(Some(Path::new("/vault/a")));

        assert_eq!(clone.root().unwrap(), PathBuf::from("/vault/a"));
    }

    #[test]
    fn test_child_sandbox() {
        let sandbox = SandboxRoot::new("/vault/kb");
        let child = sandbox.child("stories").unwrap();

        assert!(child.resolve("1.md").is_ok());
        assert!(child.resolve("../news_digest/news_digest.json").is_err());
        assert!(sandbox.child("../elsewhere").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_is_denied() {
        let outside = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("link")).unwrap();

        let sandbox = SandboxRoot::new(root.path());

        assert!(sandbox.resolve("link/secret.txt").is_err());
        assert!(sandbox.resolve("real/file.txt").is_ok());
    }
}
