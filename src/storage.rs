//! Storage adapter over which all coordination happens.
//!
//! Workers never talk to each other; every observable side effect goes
//! through a [`Storage`] implementation. `LocalStorage` covers shared local
//! or network-mounted filesystems; object-store backends implement the same
//! trait out of tree.

use crate::error::{Result, SweepError};
use std::fs;
use std::path::Path;

/// Uniform file operations over a storage URL space.
///
/// `write` must create missing parent locations. None of the operations are
/// guaranteed atomic; in particular `write` is NOT create-if-absent, which
/// the lock protocol's correctness assumptions call out explicitly.
pub trait Storage: Send + Sync {
    /// Whether an object exists at `url`.
    fn exists(&self, url: &str) -> Result<bool>;

    /// Immediate children of `url` as full urls, sorted. A missing prefix
    /// yields an empty list so pollers can watch a prefix that has not been
    /// populated yet.
    fn list(&self, url: &str) -> Result<Vec<String>>;

    /// Remove the object at `url`; `recursive` removes a whole subtree.
    fn remove(&self, url: &str, recursive: bool) -> Result<()>;

    /// Copy a local file or directory tree to `url`.
    fn upload(&self, local: &Path, url: &str) -> Result<()>;

    /// Read the object at `url` as UTF-8 text.
    fn read_to_string(&self, url: &str) -> Result<String>;

    /// Write text to `url`, creating missing parents.
    fn write(&self, url: &str, contents: &str) -> Result<()>;
}

/// Join a url prefix and a child segment with exactly one separator.
pub fn join(base: &str, segment: &str) -> String {
    let base = base.trim_end_matches('/');
    format!("{}/{}", base, segment)
}

/// Storage over the local filesystem (including network mounts).
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        LocalStorage
    }
}

impl Storage for LocalStorage {
    fn exists(&self, url: &str) -> Result<bool> {
        Ok(Path::new(url).exists())
    }

    fn list(&self, url: &str) -> Result<Vec<String>> {
        let path = Path::new(url);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(path).map_err(|e| SweepError::storage(url, e))?;
        let mut children = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SweepError::storage(url, e))?;
            children.push(entry.path().to_string_lossy().into_owned());
        }
        children.sort();
        Ok(children)
    }

    fn remove(&self, url: &str, recursive: bool) -> Result<()> {
        let path = Path::new(url);
        let result = if recursive && path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|e| SweepError::storage(url, e))
    }

    fn upload(&self, local: &Path, url: &str) -> Result<()> {
        copy_tree(local, Path::new(url)).map_err(|e| SweepError::storage(url, e))
    }

    fn read_to_string(&self, url: &str) -> Result<String> {
        fs::read_to_string(url).map_err(|e| SweepError::storage(url, e))
    }

    fn write(&self, url: &str, contents: &str) -> Result<()> {
        let path = Path::new(url);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SweepError::storage(url, e))?;
        }
        fs::write(path, contents).map_err(|e| SweepError::storage(url, e))
    }
}

fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    if src.is_dir() {
        fs::create_dir_all(dst)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_tree(&entry.path(), &dst.join(entry.file_name()))?;
        }
    } else {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, dst)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parents() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new();
        let url = temp.path().join("a/b/c.txt").to_string_lossy().into_owned();

        storage.write(&url, "hello").unwrap();
        assert!(storage.exists(&url).unwrap());
        assert_eq!(storage.read_to_string(&url).unwrap(), "hello");
    }

    #[test]
    fn test_list_missing_prefix_is_empty() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new();
        let url = temp.path().join("nowhere").to_string_lossy().into_owned();
        assert!(storage.list(&url).unwrap().is_empty());
    }

    #[test]
    fn test_list_returns_sorted_children() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new();
        let root = temp.path().to_string_lossy().into_owned();

        storage.write(&join(&root, "b/x.txt"), "").unwrap();
        storage.write(&join(&root, "a/x.txt"), "").unwrap();

        let children = storage.list(&root).unwrap();
        assert_eq!(children.len(), 2);
        assert!(children[0].ends_with("/a"));
        assert!(children[1].ends_with("/b"));
    }

    #[test]
    fn test_upload_copies_tree() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("sub/file.txt"), "data").unwrap();

        let dst = temp.path().join("dst").to_string_lossy().into_owned();
        storage.upload(&src, &dst).unwrap();

        let copied = join(&join(&dst, "sub"), "file.txt");
        assert_eq!(storage.read_to_string(&copied).unwrap(), "data");
    }

    #[test]
    fn test_remove_recursive() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new();
        let root = temp.path().join("tree").to_string_lossy().into_owned();
        storage.write(&join(&root, "a/b.txt"), "").unwrap();

        storage.remove(&root, true).unwrap();
        assert!(!storage.exists(&root).unwrap());
    }
}
