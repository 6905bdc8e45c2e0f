//! Garbage collection command: delete blobs nothing references.

use std::path::PathBuf;

use crate::config::load_exchange_config;
use crate::error::Result;
use crate::exchange::sweep_orphans;

use super::{open_blobs, open_storage};

/// Execute the gc command.
///
/// # Errors
///
/// Returns an error if the store can't be opened or read.
pub fn execute(
    dry_run: bool,
    db_path: Option<&PathBuf>,
    blob_dir: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let storage = open_storage(db_path)?;
    let blobs = open_blobs(blob_dir)?;
    let config = load_exchange_config()?;

    let stats = sweep_orphans(&storage, &blobs, &config, dry_run)?;

    if json {
        println!("{}", serde_json::to_string(&stats)?);
    } else if dry_run {
        println!(
            "Scanned {} blob(s): {} referenced, {} orphaned (dry run, nothing deleted)",
            stats.scanned, stats.referenced, stats.orphaned
        );
    } else {
        println!(
            "Scanned {} blob(s): {} referenced, {} deleted",
            stats.scanned, stats.referenced, stats.deleted
        );
        if stats.failed > 0 {
            println!("  {} delete(s) failed (see log)", stats.failed);
        }
    }
    Ok(())
}
