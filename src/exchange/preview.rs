//! Conflict preview.
//!
//! Reads an archive's manifest and reports, without writing anything, which
//! of its categories and projects already exist locally. Callers use this to
//! build a [`ConflictPolicy`](super::types::ConflictPolicy) before importing.

use std::collections::HashSet;
use std::io::{Read, Seek};

use crate::storage::SqliteStorage;

use super::archive::ArchiveReader;
use super::types::{ExchangeResult, ImportPreview, PreviewEntry, ProjectPreview};

/// Preview an archive against the live store.
///
/// # Errors
///
/// Returns the same structural errors as an import would.
pub fn preview<R: Read + Seek>(storage: &SqliteStorage, source: R) -> ExchangeResult<ImportPreview> {
    let mut archive = ArchiveReader::open(source)?;
    let (manifest, hashed_manifest) = archive.manifest()?;
    let media: HashSet<String> = archive.media_entries().into_iter().collect();

    let local_categories: HashSet<String> =
        storage.list_categories()?.into_iter().map(|c| c.name).collect();
    let local_projects: HashSet<String> =
        storage.list_projects()?.into_iter().map(|p| p.name).collect();

    let categories = manifest
        .categories
        .iter()
        .map(|c| PreviewEntry {
            name: c.name.clone(),
            display_name: c.display_name.clone(),
            exists: local_categories.contains(&c.name),
        })
        .collect();

    let mut seen = HashSet::new();
    let projects = manifest
        .projects
        .iter()
        .map(|p| {
            let media_artifacts = p
                .artifacts
                .iter()
                .filter(|a| {
                    a.local_image_path
                        .iter()
                        .chain(a.local_media_paths.values())
                        .all(|path| media.contains(path))
                })
                .count();
            ProjectPreview {
                name: p.name.clone(),
                display_name: p.display_name.clone(),
                exists: local_projects.contains(&p.name),
                artifacts: p.artifacts.len(),
                media_artifacts,
                categories: p.categories.clone(),
                duplicate: !seen.insert(p.name.as_str()),
            }
        })
        .collect();

    let settings = manifest
        .site_settings
        .as_ref()
        .map(|s| s.keys().cloned().collect())
        .unwrap_or_default();

    Ok(ImportPreview {
        version: manifest.version,
        exported_at: manifest.exported_at.clone(),
        hashed_manifest,
        categories,
        projects,
        settings,
        media_entries: media.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use serde_json::json;

    use crate::blob::MemoryBlobStore;
    use crate::exchange::test_support::{
        count, export_archive, manifest_from, raw_archive, seed_chair, seed_project,
        write_archive, PNG_A,
    };
    use crate::exchange::types::{ExchangeError, ExportSelection};

    #[test]
    fn test_preview_flags_existing_entities() {
        let mut source = SqliteStorage::open_memory().unwrap();
        let blobs = MemoryBlobStore::new();
        seed_chair(&mut source, &blobs);
        seed_project(&mut source, "stool");
        let (archive, _) = export_archive(&source, &blobs, &ExportSelection::everything());

        let mut storage = SqliteStorage::open_memory().unwrap();
        seed_project(&mut storage, "chair");
        let events = count(&storage, "events");

        let report = preview(&storage, Cursor::new(archive)).unwrap();

        assert_eq!(report.version, 1);
        assert!(report.hashed_manifest);
        assert_eq!(report.media_entries, 1);
        assert_eq!(report.categories.len(), 1);
        assert!(!report.categories[0].exists);

        let chair = report.projects.iter().find(|p| p.name == "chair").unwrap();
        assert!(chair.exists);
        assert_eq!(chair.artifacts, 1);
        assert_eq!(chair.media_artifacts, 1);
        assert_eq!(chair.categories, vec!["wood"]);

        let stool = report.projects.iter().find(|p| p.name == "stool").unwrap();
        assert!(!stool.exists);

        assert_eq!(count(&storage, "events"), events);
    }

    #[test]
    fn test_preview_reports_missing_media_and_duplicates() {
        let manifest = manifest_from(json!({
            "version": 1,
            "exportedAt": "2026-01-01T00:00:00Z",
            "projects": [
                {"name": "desk", "displayName": "Desk", "artifacts": [
                    {"schema": "image-v1", "dataBlob": {"imageUrl": "/artifacts/a.png"},
                     "_localImagePath": "images/a.png"},
                    {"schema": "image-v1", "dataBlob": {"imageUrl": "/artifacts/b.png"},
                     "_localImagePath": "images/b.png"},
                    {"schema": "text-v1", "dataBlob": {"text": "notes"}}
                ]},
                {"name": "desk", "displayName": "Desk again"}
            ],
            "siteSettings": {"footer": {"text": "hi"}}
        }));
        let archive = write_archive(&manifest, &[("images/a.png", PNG_A)]);
        let storage = SqliteStorage::open_memory().unwrap();

        let report = preview(&storage, Cursor::new(archive)).unwrap();

        assert!(!report.hashed_manifest);
        assert_eq!(report.projects[0].artifacts, 3);
        assert_eq!(report.projects[0].media_artifacts, 2);
        assert!(!report.projects[0].duplicate);
        assert!(report.projects[1].duplicate);
        assert_eq!(report.settings, vec!["footer"]);
    }

    #[test]
    fn test_preview_rejects_bad_archives() {
        let storage = SqliteStorage::open_memory().unwrap();
        let err = preview(&storage, Cursor::new(raw_archive(&[("notes.txt", &b"x"[..])]))).unwrap_err();
        assert!(matches!(err, ExchangeError::MissingManifest));
    }
}
