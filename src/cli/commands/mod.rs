//! Command implementations.

pub mod completions;
pub mod export;
pub mod gc;
pub mod import;
pub mod init;
pub mod preview;
pub mod version;

use std::path::{Path, PathBuf};

use crate::blob::FsBlobStore;
use crate::config::{resolve_blob_dir, resolve_db_path};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;

/// Open the database, requiring `folio init` to have run.
pub(crate) fn open_storage(db_path: Option<&PathBuf>) -> Result<SqliteStorage> {
    let db_path = resolve_db_path(db_path.map(PathBuf::as_path)).ok_or(Error::NotInitialized)?;
    if !db_path.exists() {
        return Err(Error::NotInitialized);
    }
    SqliteStorage::open(&db_path)
}

/// Open the filesystem blob store.
pub(crate) fn open_blobs(blob_dir: Option<&PathBuf>) -> Result<FsBlobStore> {
    let root = resolve_blob_dir(blob_dir.map(PathBuf::as_path))
        .ok_or_else(|| Error::Config("Could not determine blob directory".to_string()))?;
    Ok(FsBlobStore::open(root)?)
}

/// Fail with `ArchiveNotFound` unless `path` is an existing file.
pub(crate) fn require_archive(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::ArchiveNotFound {
            path: path.to_path_buf(),
        })
    }
}
