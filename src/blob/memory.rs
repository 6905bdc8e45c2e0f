//! In-process blob store.
//!
//! Clones share the same underlying map, so a handle kept by a caller sees
//! every write made through a handle moved into an export or import.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{check_key, BlobError, BlobPage, BlobResult, BlobStore};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Blob store held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Whether an object exists under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    /// All stored keys in ascending order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    /// Content type recorded for `key`.
    #[must_use]
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.read().get(key).map(|o| o.content_type.clone())
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> BlobResult<Box<dyn Read + Send + '_>> {
        let objects = self.objects.read();
        let object = objects.get(key).ok_or_else(|| BlobError::NotFound {
            key: key.to_string(),
        })?;
        Ok(Box::new(Cursor::new(object.bytes.clone())))
    }

    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> BlobResult<()> {
        check_key(key)?;
        self.objects.write().insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn delete(&self, keys: &[String]) -> BlobResult<()> {
        let mut objects = self.objects.write();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    fn list(&self, prefix: &str, after: Option<&str>, limit: usize) -> BlobResult<BlobPage> {
        let prefix = prefix.trim_end_matches('/');
        let objects = self.objects.read();
        let mut remaining = objects
            .keys()
            .filter(|k| prefix.is_empty() || k.starts_with(&format!("{prefix}/")))
            .filter(|k| after.is_none_or(|a| k.as_str() > a))
            .peekable();
        let keys: Vec<String> = remaining.by_ref().take(limit).cloned().collect();
        let next = if remaining.peek().is_some() {
            keys.last().cloned()
        } else {
            None
        };
        Ok(BlobPage { keys, next })
    }
}
