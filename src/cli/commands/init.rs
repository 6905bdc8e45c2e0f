//! Initialize the Folio database and blob store.
//!
//! Both live under `~/.folio/` unless `--db` / `--blobs` (or `FOLIO_DB` /
//! `FOLIO_BLOB_DIR`) point elsewhere. With `FOLIO_TEST_DB=1` the database goes
//! to `~/.folio/test/folio.db` instead.

use crate::config::{global_folio_dir, resolve_blob_dir, resolve_db_path};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    blobs: PathBuf,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if the database exists and `force` is not
/// set, or an error if a directory or the database cannot be created.
pub fn execute(
    db_path: Option<&PathBuf>,
    blob_dir: Option<&PathBuf>,
    force: bool,
    json: bool,
) -> Result<()> {
    let db_path = resolve_db_path(db_path.map(PathBuf::as_path))
        .ok_or_else(|| Error::Config("Could not determine database path".to_string()))?;
    let blob_dir = resolve_blob_dir(blob_dir.map(PathBuf::as_path))
        .ok_or_else(|| Error::Config("Could not determine blob directory".to_string()))?;

    if db_path.exists() {
        if !force {
            return Err(Error::AlreadyInitialized { path: db_path });
        }
        fs::remove_file(&db_path)?;
    }

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir_all(&blob_dir)?;

    // Opening applies the schema
    SqliteStorage::open(&db_path)?;

    // Keep the default data directory out of accidental commits
    if let Some(base_dir) = global_folio_dir().filter(|dir| db_path.starts_with(dir)) {
        let gitignore_path = base_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, "# Everything in ~/.folio is local-only\n*\n")?;
        }
    }

    if json {
        let output = InitOutput {
            database: db_path,
            blobs: blob_dir,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized Folio");
        println!("  Database: {}", db_path.display());
        println!("  Blobs:    {}", blob_dir.display());
    }

    Ok(())
}
