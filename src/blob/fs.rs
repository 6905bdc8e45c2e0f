//! Directory-backed blob store.
//!
//! Keys map onto relative paths under a root directory. Writes go through a
//! temporary file and an atomic rename so readers never see partial objects.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use super::{check_key, BlobError, BlobPage, BlobResult, BlobStore};

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open (and create if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> BlobResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> BlobResult<PathBuf> {
        check_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, seg| path.join(seg)))
    }

    fn collect_keys(dir: &Path, rel: &str, acc: &mut Vec<String>) -> BlobResult<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            // In-flight writes
            if name.ends_with(".partial") {
                continue;
            }
            let key = if rel.is_empty() { name } else { format!("{rel}/{name}") };
            if entry.file_type()?.is_dir() {
                Self::collect_keys(&entry.path(), &key, acc)?;
            } else {
                acc.push(key);
            }
        }
        Ok(())
    }
}

impl BlobStore for FsBlobStore {
    fn get(&self, key: &str) -> BlobResult<Box<dyn Read + Send + '_>> {
        let path = self.path_for(key)?;
        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> BlobResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("partial");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(bytes)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&temp_path, &path)?;

        tracing::trace!(key, content_type, size = bytes.len(), "Stored blob");
        Ok(())
    }

    fn delete(&self, keys: &[String]) -> BlobResult<()> {
        for key in keys {
            let path = self.path_for(key)?;
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn list(&self, prefix: &str, after: Option<&str>, limit: usize) -> BlobResult<BlobPage> {
        let prefix = prefix.trim_end_matches('/');
        let start = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.path_for(prefix)?
        };

        let mut keys = Vec::new();
        Self::collect_keys(&start, prefix, &mut keys)?;
        keys.sort();

        let mut remaining = keys
            .into_iter()
            .filter(|k| after.is_none_or(|a| k.as_str() > a))
            .peekable();
        let page: Vec<String> = remaining.by_ref().take(limit).collect();
        let next = if remaining.peek().is_some() {
            page.last().cloned()
        } else {
            None
        };

        Ok(BlobPage { keys: page, next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_get_delete() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();

        store.put("artifacts/a.png", b"png-bytes", "image/png").unwrap();
        assert_eq!(store.get_bytes("artifacts/a.png").unwrap(), b"png-bytes");
        assert!(!dir.path().join("artifacts/a.partial").exists());

        store.delete(&["artifacts/a.png".to_string(), "artifacts/missing.png".to_string()]).unwrap();
        assert!(matches!(
            store.get("artifacts/a.png"),
            Err(BlobError::NotFound { .. })
        ));
    }

    #[test]
    fn test_rejects_escaping_keys() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();

        assert!(matches!(
            store.put("../outside", b"x", "text/plain"),
            Err(BlobError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_list_paginates_in_order() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        for name in ["c", "a", "b"] {
            store
                .put(&format!("artifacts/{name}.jpg"), b"x", "image/jpeg")
                .unwrap();
        }
        store.put("other/z.jpg", b"x", "image/jpeg").unwrap();

        let first = store.list("artifacts", None, 2).unwrap();
        assert_eq!(first.keys, vec!["artifacts/a.jpg", "artifacts/b.jpg"]);
        assert_eq!(first.next.as_deref(), Some("artifacts/b.jpg"));

        let second = store.list("artifacts", first.next.as_deref(), 2).unwrap();
        assert_eq!(second.keys, vec!["artifacts/c.jpg"]);
        assert!(second.next.is_none());
    }

    #[test]
    fn test_list_missing_prefix_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();

        let page = store.list("artifacts", None, 10).unwrap();
        assert!(page.keys.is_empty());
        assert!(page.next.is_none());
    }
}
