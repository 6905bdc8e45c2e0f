//! Archive exchange.
//!
//! Moves content between stores as a single zip archive:
//!
//! - **Export**: selected categories, projects and settings → manifest plus
//!   deduplicated media, streamed to any `Write` sink
//! - **Import**: archive → store, reconciling every existing entity with a
//!   per-name clobber / merge / skip policy
//! - **Preview**: which archive entities already exist locally
//! - **Sweep**: delete blobs nothing references
//!
//! # Archive layout
//!
//! ```text
//! manifest.json               written first, no hashes
//! images/<basename>           one entry per distinct blob key
//! manifest-with-hashes.json   written last, SHA-256 per media path
//! ```
//!
//! Readers prefer `manifest-with-hashes.json` and fall back to
//! `manifest.json` for archives whose export was interrupted.
//!
//! # Example
//!
//! ```ignore
//! use folio::exchange::{spawn_export, ConflictPolicy, ExportSelection, Importer, Resolution};
//!
//! let mut stream = spawn_export(storage, blobs, &config, ExportSelection::everything())?;
//! std::io::copy(&mut stream, &mut file)?;
//! let stats = stream.finish()?;
//!
//! let policy = ConflictPolicy::uniform(Resolution::Merge);
//! let summary = Importer::new(&mut storage, &blobs, &config, "me").import(file, &policy)?;
//! ```

mod archive;
mod export;
mod hash;
mod import;
mod locator;
mod preview;
mod schema;
mod stream;
mod sweep;
mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use archive::{
    parse_manifest, ArchiveReader, ArchiveWriter, HASHED_MANIFEST_ENTRY, MANIFEST_ENTRY, MEDIA_DIR,
};
pub use export::Exporter;
pub use hash::{digest, digest_reader};
pub use import::Importer;
pub use locator::LocatorGrammar;
pub use preview::preview;
pub use schema::{SchemaRegistry, SchemaSpec, Validator};
pub use stream::{spawn_export, ChannelWriter, ExportStream};
pub use sweep::{referenced_keys, sweep_orphans};
pub use types::{
    ConflictPolicy, EntityKind, ExchangeError, ExchangeResult, ExportArtifact, ExportAttribute,
    ExportCategory, ExportManifest, ExportProject, ExportSelection, ExportSetting, ExportStats,
    ImportPreview, ImportSummary, PreviewEntry, ProjectPreview, Resolution, SweepStats,
    MANIFEST_VERSION,
};
