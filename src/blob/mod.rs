//! Binary object storage.
//!
//! Media bytes live in a content store addressed by opaque string keys of
//! the form `<prefix>/<uuid>.<ext>`. The relational store only keeps
//! locators pointing at these keys.
//!
//! # Submodules
//!
//! - [`fs`] - Directory-backed store
//! - [`memory`] - In-process store (tests, dry runs)

pub mod fs;
pub mod memory;

use std::io::Read;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

/// Content type used when the key extension is unknown.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Errors raised by a blob store backend.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// No object stored under the key.
    #[error("Blob not found: {key}")]
    NotFound {
        /// The missing key.
        key: String,
    },

    /// Key is empty or escapes the store root.
    #[error("Invalid blob key: {key}")]
    InvalidKey {
        /// The rejected key.
        key: String,
    },

    /// IO error while reading or writing an object.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for blob operations.
pub type BlobResult<T> = std::result::Result<T, BlobError>;

/// One page of a prefix listing.
#[derive(Debug, Clone, Default)]
pub struct BlobPage {
    /// Keys on this page, in ascending order.
    pub keys: Vec<String>,
    /// Token to pass back for the next page; `None` when exhausted.
    pub next: Option<String>,
}

/// A content-addressable object store.
///
/// Implementations must be usable from the export producer thread, hence
/// the `Send + Sync` bound.
pub trait BlobStore: Send + Sync {
    /// Open an object for streaming reads.
    ///
    /// # Errors
    ///
    /// Returns `BlobError::NotFound` if no object is stored under `key`.
    fn get(&self, key: &str) -> BlobResult<Box<dyn Read + Send + '_>>;

    /// Store an object, replacing any previous one under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> BlobResult<()>;

    /// Delete a batch of objects. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails part-way.
    fn delete(&self, keys: &[String]) -> BlobResult<()>;

    /// List keys under `prefix`, `limit` at a time, resuming after `after`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be listed.
    fn list(&self, prefix: &str, after: Option<&str>, limit: usize) -> BlobResult<BlobPage>;

    /// Read a whole object into memory.
    ///
    /// # Errors
    ///
    /// Propagates `get` and read failures.
    fn get_bytes(&self, key: &str) -> BlobResult<Vec<u8>> {
        let mut reader = self.get(key)?;
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

impl<T: BlobStore + ?Sized> BlobStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> BlobResult<Box<dyn Read + Send + '_>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> BlobResult<()> {
        (**self).put(key, bytes, content_type)
    }

    fn delete(&self, keys: &[String]) -> BlobResult<()> {
        (**self).delete(keys)
    }

    fn list(&self, prefix: &str, after: Option<&str>, limit: usize) -> BlobResult<BlobPage> {
        (**self).list(prefix, after, limit)
    }
}

/// Mint a fresh key under `prefix`, keeping the extension of `name_hint`.
///
/// ```ignore
/// let key = new_blob_key("artifacts", "images/photo.PNG");
/// // "artifacts/3f2c...e1.png"
/// ```
#[must_use]
pub fn new_blob_key(prefix: &str, name_hint: &str) -> String {
    let id = uuid::Uuid::new_v4();
    let prefix = prefix.trim_end_matches('/');
    match extension_of(name_hint) {
        Some(ext) => format!("{prefix}/{id}.{ext}"),
        None => format!("{prefix}/{id}"),
    }
}

/// Lowercased file extension of the last path segment, if any.
#[must_use]
pub fn extension_of(name: &str) -> Option<String> {
    let basename = name.rsplit('/').next().unwrap_or(name);
    let (stem, ext) = basename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Guess a content type from a key or file name.
#[must_use]
pub fn content_type_for(name: &str) -> String {
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}

/// Reject keys that are empty, absolute, or walk out of the store.
pub(crate) fn check_key(key: &str) -> BlobResult<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(BlobError::InvalidKey { key: key.to_string() });
    }
    Ok(())
}
