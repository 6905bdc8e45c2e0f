//! Orphan blob sweep.
//!
//! Blob cleanup during import is best-effort, so stores accumulate objects
//! nothing points at. The sweep lists every key under the blob prefix and
//! deletes those not referenced by any artifact or site setting.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::blob::BlobStore;
use crate::config::ExchangeConfig;
use crate::storage::SqliteStorage;

use super::locator::LocatorGrammar;
use super::types::{ExchangeResult, SweepStats};

/// Every blob key referenced anywhere in the store.
///
/// Payloads are scanned whole, whatever their schema.
///
/// # Errors
///
/// Returns an error if the store can't be read.
pub fn referenced_keys(
    storage: &SqliteStorage,
    grammar: &LocatorGrammar,
) -> ExchangeResult<HashSet<String>> {
    let mut keys = Vec::new();
    for artifact in storage.list_all_artifacts()? {
        grammar.collect_into(&artifact.data_blob, &mut keys);
    }
    for setting in storage.list_settings()? {
        grammar.collect_into(&setting.value, &mut keys);
    }
    Ok(keys.into_iter().collect())
}

/// Delete unreferenced blobs under the configured prefix.
///
/// With `dry_run`, orphans are counted but kept. Listing and delete failures
/// are logged and counted; the sweep stops at the first listing failure.
///
/// # Errors
///
/// Returns an error only if the references can't be collected, in which
/// case nothing is deleted.
pub fn sweep_orphans<B: BlobStore + ?Sized>(
    storage: &SqliteStorage,
    blobs: &B,
    config: &ExchangeConfig,
    dry_run: bool,
) -> ExchangeResult<SweepStats> {
    let grammar = LocatorGrammar::from_config(config);
    let referenced = referenced_keys(storage, &grammar)?;
    let batch = config.sweep_batch.max(1);

    let mut stats = SweepStats {
        dry_run,
        ..SweepStats::default()
    };
    let mut pending: Vec<String> = Vec::with_capacity(batch);
    let mut after: Option<String> = None;

    loop {
        let page = match blobs.list(grammar.prefix(), after.as_deref(), batch) {
            Ok(page) => page,
            Err(e) => {
                warn!(prefix = %grammar.prefix(), error = %e, "Blob listing failed, stopping sweep");
                break;
            }
        };

        for key in page.keys {
            stats.scanned += 1;
            if referenced.contains(&key) {
                stats.referenced += 1;
                continue;
            }
            stats.orphaned += 1;
            debug!(key = %key, "Orphaned blob");
            if !dry_run {
                pending.push(key);
                if pending.len() >= batch {
                    delete_batch(blobs, &mut pending, &mut stats);
                }
            }
        }

        match page.next {
            Some(next) => after = Some(next),
            None => break,
        }
    }

    delete_batch(blobs, &mut pending, &mut stats);

    info!(
        scanned = stats.scanned,
        orphaned = stats.orphaned,
        deleted = stats.deleted,
        failed = stats.failed,
        dry_run,
        "Sweep complete"
    );
    Ok(stats)
}

fn delete_batch<B: BlobStore + ?Sized>(blobs: &B, pending: &mut Vec<String>, stats: &mut SweepStats) {
    if pending.is_empty() {
        return;
    }
    match blobs.delete(pending) {
        Ok(()) => stats.deleted += pending.len(),
        Err(e) => {
            warn!(count = pending.len(), error = %e, "Blob delete batch failed");
            stats.failed += pending.len();
        }
    }
    pending.clear();
}
