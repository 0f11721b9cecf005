//! Generated file collection and disk writer
//!
//! Renderers never touch the filesystem. They return a [`FileSet`] of
//! relative paths and contents; the CLI decides where (and whether) the set
//! lands on disk. Paths are insertion-ordered so output listings are stable
//! run to run.

use anyhow::Context;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors produced while assembling a file set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("duplicate generated path: {0}")]
    DuplicatePath(PathBuf),
}

/// A single rendered file, relative to the output root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Insertion-ordered set of rendered files
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    files: IndexMap<PathBuf, String>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rendered file. Two renderers producing the same path is a
    /// generator bug, not a user error, so it is rejected rather than
    /// silently overwritten.
    pub fn push(&mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Result<(), EmitError> {
        let path = path.into();
        if self.files.contains_key(&path) {
            return Err(EmitError::DuplicatePath(path));
        }
        self.files.insert(path, contents.into());
        Ok(())
    }

    /// Fold another set into this one
    pub fn merge(&mut self, other: FileSet) -> Result<(), EmitError> {
        for (path, contents) in other.files {
            self.push(path, contents)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.files.contains_key(path.as_ref())
    }

    /// Contents of a rendered file, if present
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = GeneratedFile> + '_ {
        self.files.iter().map(|(path, contents)| GeneratedFile {
            path: path.clone(),
            contents: contents.clone(),
        })
    }

    /// Relative paths in insertion order, for dry-run listings
    pub fn manifest(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }

    /// Write every file under `root`, creating directories as needed.
    /// Returns the absolute paths written.
    pub fn write_to(&self, root: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.files.len());
        for (rel, contents) in &self.files {
            let target = root.join(rel);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating directory {}", parent.display()))?;
            }
            std::fs::write(&target, contents)
                .with_context(|| format!("writing {}", target.display()))?;
            debug!("wrote {}", target.display());
            written.push(target);
        }
        Ok(written)
    }
}

/// Header stamped on every generated file. `comment` is the line prefix for
/// the target syntax (`#` for YAML and Python).
pub fn generated_banner(comment: &str) -> String {
    format!(
        "{c} Generated by andamio {v}. Do not edit by hand.\n\
         {c} Rerun `andamio generate` to refresh this file.\n\n",
        c = comment,
        v = env!("CARGO_PKG_VERSION"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ========================================================================
    // FILE SET TESTS
    // ========================================================================

    #[test]
    fn test_push_and_iter_preserves_order() {
        let mut set = FileSet::new();
        set.push("b/second.yaml", "two").unwrap();
        set.push("a/first.yaml", "one").unwrap();

        let manifest = set.manifest();
        assert_eq!(manifest[0], PathBuf::from("b/second.yaml"));
        assert_eq!(manifest[1], PathBuf::from("a/first.yaml"));
    }

    #[test]
    fn test_push_rejects_duplicate() {
        let mut set = FileSet::new();
        set.push("same.yaml", "one").unwrap();
        let err = set.push("same.yaml", "two").unwrap_err();
        assert_eq!(err, EmitError::DuplicatePath(PathBuf::from("same.yaml")));
        // original contents survive
        assert_eq!(set.get("same.yaml"), Some("one"));
    }

    #[test]
    fn test_merge_disjoint_sets() {
        let mut a = FileSet::new();
        a.push("a.txt", "a").unwrap();
        let mut b = FileSet::new();
        b.push("b.txt", "b").unwrap();

        a.merge(b).unwrap();
        assert_eq!(a.len(), 2);
        assert!(a.contains("b.txt"));
    }

    #[test]
    fn test_merge_conflicting_sets_fails() {
        let mut a = FileSet::new();
        a.push("x.txt", "a").unwrap();
        let mut b = FileSet::new();
        b.push("x.txt", "b").unwrap();

        assert!(a.merge(b).is_err());
    }

    // ========================================================================
    // WRITE TESTS
    // ========================================================================

    #[test]
    fn test_write_to_creates_directories() {
        let temp = TempDir::new().unwrap();
        let mut set = FileSet::new();
        set.push("nested/dir/file.yaml", "contents: yes\n").unwrap();

        let written = set.write_to(temp.path()).unwrap();
        assert_eq!(written.len(), 1);
        assert!(temp.path().join("nested/dir/file.yaml").exists());

        let body = std::fs::read_to_string(&written[0]).unwrap();
        assert_eq!(body, "contents: yes\n");
    }

    #[test]
    fn test_write_empty_set() {
        let temp = TempDir::new().unwrap();
        let written = FileSet::new().write_to(temp.path()).unwrap();
        assert!(written.is_empty());
    }

    // ========================================================================
    // BANNER TESTS
    // ========================================================================

    #[test]
    fn test_generated_banner_prefix() {
        let banner = generated_banner("#");
        assert!(banner.starts_with("# Generated by andamio"));
        assert!(banner.ends_with("\n\n"));
        for line in banner.lines().filter(|l| !l.is_empty()) {
            assert!(line.starts_with('#'));
        }
    }
}
