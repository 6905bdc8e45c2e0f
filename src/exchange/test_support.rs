//! Shared fixtures for exchange tests.

use std::io::{Cursor, Write};

use serde_json::json;

use crate::blob::{BlobStore, MemoryBlobStore};
use crate::config::ExchangeConfig;
use crate::model::{Artifact, Category, CoverAssignment, Project, ProjectAttribute};
use crate::storage::SqliteStorage;

use super::archive::{ArchiveWriter, MANIFEST_ENTRY};
use super::export::Exporter;
use super::import::Importer;
use super::types::{ConflictPolicy, ExportManifest, ExportSelection, ExportStats, ImportSummary};

pub const PNG_A: &[u8] = b"\x89PNG\r\n\x1a\nchair-photo";
pub const PNG_B: &[u8] = b"\x89PNG\r\n\x1a\nother-photo";

pub fn seed_project(storage: &mut SqliteStorage, name: &str) -> Project {
    let mut project = Project::new(name, name.to_uppercase());
    project.description = Some(format!("The {name}"));
    storage.create_project(&project, "seed").unwrap();
    project
}

/// Category `wood`, project `chair` linked to it with one attribute and one
/// cover image backed by `PNG_A`.
pub fn seed_chair(storage: &mut SqliteStorage, blobs: &MemoryBlobStore) -> (Project, Artifact) {
    let category = Category::new("wood", "Wood", true);
    storage.create_category(&category, "seed").unwrap();

    let project = seed_project(storage, "chair");
    storage
        .link_project_category(&project.id, &category.id, "seed")
        .unwrap();
    storage
        .insert_attributes(&[ProjectAttribute::new(&project.id, "year", "1962")], "seed")
        .unwrap();

    blobs.put("artifacts/chair.png", PNG_A, "image/png").unwrap();
    let artifact = Artifact::new(
        &project.id,
        "image-v1",
        json!({"imageUrl": "/artifacts/chair.png", "alt": "Oak chair"}),
    );
    storage.insert_artifact(&artifact, "seed").unwrap();
    storage
        .set_cover(
            &CoverAssignment::with_defaults(&project.id, &artifact.id, None, None, None),
            "seed",
        )
        .unwrap();

    (project, artifact)
}

pub fn export_archive(
    storage: &SqliteStorage,
    blobs: &MemoryBlobStore,
    selection: &ExportSelection,
) -> (Vec<u8>, ExportStats) {
    let mut out = Vec::new();
    let stats = Exporter::new(storage, blobs, &ExchangeConfig::default())
        .export(selection, &mut out)
        .unwrap();
    (out, stats)
}

pub fn import_archive<B: BlobStore + ?Sized>(
    storage: &mut SqliteStorage,
    blobs: &B,
    archive: &[u8],
    policy: &ConflictPolicy,
) -> ImportSummary {
    Importer::new(storage, blobs, &ExchangeConfig::default(), "importer")
        .import(Cursor::new(archive), policy)
        .unwrap()
}

pub fn count(storage: &SqliteStorage, table: &str) -> i64 {
    storage
        .conn()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

/// Build an archive from a hand-written manifest and media entries.
pub fn write_archive(manifest: &ExportManifest, media: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut writer = ArchiveWriter::new(&mut out);
    writer.write_manifest(MANIFEST_ENTRY, manifest).unwrap();
    for (path, bytes) in media {
        writer.write_media(path, bytes).unwrap();
    }
    writer.finish().unwrap();
    out
}

/// Build a zip with arbitrary entries, bypassing manifest serialization.
pub fn raw_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        zip.start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn manifest_from(value: serde_json::Value) -> ExportManifest {
    serde_json::from_value(value).unwrap()
}
