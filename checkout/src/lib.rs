//! Checkout provider: the minimal contract the core pipeline consumes to
//! reach source text for a (base, head) pair. Real VCS/hosting mechanics
//! (cloning, worktree management, credential loading) are external
//! collaborators and are not implemented here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of change a file underwent between base and head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileChangeType {
    Added,
    Modified,
    Removed,
    Renamed,
    Copied,
}

/// One file-level change between base and head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub change_type: FileChangeType,
    pub language: Option<String>,
    pub old_path: Option<String>,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("worktree path does not exist: {0}")]
    MissingWorktree(PathBuf),
    #[error("failed to walk worktree: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("{0}")]
    Other(String),
}

/// The core-consumed checkout contract (spec §6). Synchronous: by the time
/// the pipeline runs, worktrees are already materialised on disk.
pub trait CheckoutProvider {
    fn file_changes(&self, base: &str, head: &str) -> Result<Vec<FileChange>, CheckoutError>;
    fn base_worktree_path(&self) -> &Path;
    fn head_worktree_path(&self) -> &Path;
}

/// A reference `CheckoutProvider` backed by two plain directories on disk —
/// no `git` subprocess, just a diff-by-walk over two worktree snapshots.
/// Useful for tests and for the CLI binary when the caller has already
/// materialised base/head checkouts elsewhere.
pub struct FilesystemCheckoutProvider {
    base_dir: PathBuf,
    head_dir: PathBuf,
    language_extensions: Vec<(String, Vec<String>)>,
}

impl FilesystemCheckoutProvider {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        head_dir: impl Into<PathBuf>,
        language_extensions: Vec<(String, Vec<String>)>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            head_dir: head_dir.into(),
            language_extensions,
        }
    }

    fn language_for(&self, rel_path: &str) -> Option<String> {
        let ext = Path::new(rel_path).extension()?.to_str()?;
        let dotted = format!(".{ext}");
        self.language_extensions
            .iter()
            .find(|(_, exts)| exts.iter().any(|e| e == &dotted))
            .map(|(lang, _)| lang.clone())
    }

    fn list_rel_files(root: &Path) -> Result<Vec<String>, CheckoutError> {
        if !root.exists() {
            return Err(CheckoutError::MissingWorktree(root.to_path_buf()));
        }
        let mut out = Vec::new();
        for entry in walkdir::WalkDir::new(root) {
            let entry = entry?;
            if entry.file_type().is_file() {
                if let Ok(rel) = entry.path().strip_prefix(root) {
                    out.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        out.sort();
        Ok(out)
    }
}

impl CheckoutProvider for FilesystemCheckoutProvider {
    fn file_changes(&self, _base: &str, _head: &str) -> Result<Vec<FileChange>, CheckoutError> {
        let base_files = Self::list_rel_files(&self.base_dir)?;
        let head_files = Self::list_rel_files(&self.head_dir)?;

        let mut changes = Vec::new();
        for path in &head_files {
            let head_text = std::fs::read_to_string(self.head_dir.join(path)).ok();
            if base_files.contains(path) {
                let base_text = std::fs::read_to_string(self.base_dir.join(path)).ok();
                if base_text != head_text {
                    changes.push(FileChange {
                        path: path.clone(),
                        change_type: FileChangeType::Modified,
                        language: self.language_for(path),
                        old_path: None,
                    });
                }
            } else {
                changes.push(FileChange {
                    path: path.clone(),
                    change_type: FileChangeType::Added,
                    language: self.language_for(path),
                    old_path: None,
                });
            }
        }
        for path in &base_files {
            if !head_files.contains(path) {
                changes.push(FileChange {
                    path: path.clone(),
                    change_type: FileChangeType::Removed,
                    language: self.language_for(path),
                    old_path: None,
                });
            }
        }
        changes.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(changes)
    }

    fn base_worktree_path(&self) -> &Path {
        &self.base_dir
    }

    fn head_worktree_path(&self) -> &Path {
        &self.head_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn detects_added_modified_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("base");
        let head = tmp.path().join("head");
        fs::create_dir_all(&base).unwrap();
        fs::create_dir_all(&head).unwrap();

        fs::write(base.join("gone.py"), "x = 1\n").unwrap();
        fs::write(base.join("same.py"), "x = 1\n").unwrap();
        fs::write(head.join("same.py"), "x = 1\n").unwrap();
        fs::write(head.join("new.py"), "x = 2\n").unwrap();

        let provider = FilesystemCheckoutProvider::new(
            &base,
            &head,
            vec![("python".into(), vec![".py".into()])],
        );
        let changes = provider.file_changes("base", "head").unwrap();

        assert!(
            changes
                .iter()
                .any(|c| c.path == "gone.py" && c.change_type == FileChangeType::Removed)
        );
        assert!(
            changes
                .iter()
                .any(|c| c.path == "new.py" && c.change_type == FileChangeType::Added)
        );
        assert!(!changes.iter().any(|c| c.path == "same.py"));
    }
}
