//! Archive export.
//!
//! The exporter walks the selected part of the content store, assigns every
//! referenced blob key one archive path, writes the manifest, streams the
//! media one payload at a time, and finally writes the manifest again with
//! content hashes filled in.
//!
//! # Failure policy
//!
//! A media fetch failure leaves that payload out of the archive (and out of
//! the hashed manifest). Any write failure on the sink aborts the export.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::blob::BlobStore;
use crate::config::ExchangeConfig;
use crate::model::{Category, Project};
use crate::storage::SqliteStorage;

use super::archive::{ArchiveWriter, HASHED_MANIFEST_ENTRY, MANIFEST_ENTRY, MEDIA_DIR};
use super::hash::digest;
use super::locator::LocatorGrammar;
use super::schema::SchemaRegistry;
use super::types::{
    ExchangeError, ExchangeResult, ExportArtifact, ExportAttribute, ExportCategory,
    ExportManifest, ExportProject, ExportSelection, ExportSetting, ExportStats,
};

/// Setting fields the manifest carries as typed members.
const RESERVED_SETTING_FIELDS: [&str; 2] = ["_localImagePath", "imageHash"];

/// Blob keys queued for one export, each with its archive path.
#[derive(Debug, Default)]
struct MediaQueue {
    paths: HashMap<String, String>,
    order: Vec<(String, String)>,
    taken: HashSet<String>,
}

impl MediaQueue {
    /// The archive path for `key`, assigning one on first sight.
    fn assign(&mut self, key: &str) -> String {
        if let Some(path) = self.paths.get(key) {
            return path.clone();
        }

        let basename = key.rsplit('/').next().unwrap_or(key);
        let mut path = format!("{MEDIA_DIR}/{basename}");
        let mut n = 1;
        while self.taken.contains(&path) {
            path = match basename.rsplit_once('.') {
                Some((stem, ext)) => format!("{MEDIA_DIR}/{stem}-{n}.{ext}"),
                None => format!("{MEDIA_DIR}/{basename}-{n}"),
            };
            n += 1;
        }

        self.taken.insert(path.clone());
        self.paths.insert(key.to_string(), path.clone());
        self.order.push((key.to_string(), path.clone()));
        path
    }
}

/// Exporter for content archives.
pub struct Exporter<'a, B: BlobStore + ?Sized> {
    storage: &'a SqliteStorage,
    blobs: &'a B,
    grammar: LocatorGrammar,
    registry: SchemaRegistry,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, B: BlobStore + ?Sized> Exporter<'a, B> {
    #[must_use]
    pub fn new(storage: &'a SqliteStorage, blobs: &'a B, config: &ExchangeConfig) -> Self {
        Self {
            storage,
            blobs,
            grammar: LocatorGrammar::from_config(config),
            registry: SchemaRegistry::builtin(),
            cancel: None,
        }
    }

    /// Use a custom schema registry.
    #[must_use]
    pub fn with_registry(mut self, registry: SchemaRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Stop before the next blob fetch once `flag` is set.
    #[must_use]
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn check_cancelled(&self) -> ExchangeResult<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Acquire) => Err(ExchangeError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Export the selection as an archive written to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the store or writing the sink fails.
    pub fn export<W: Write>(&self, selection: &ExportSelection, sink: W) -> ExchangeResult<ExportStats> {
        let (mut manifest, media) = self.build_manifest(selection)?;

        let mut stats = ExportStats {
            categories: manifest.categories.len(),
            projects: manifest.projects.len(),
            artifacts: manifest.artifact_count(),
            settings: manifest.site_settings.as_ref().map_or(0, BTreeMap::len),
            ..ExportStats::default()
        };

        let mut writer = ArchiveWriter::new(sink);
        writer.write_manifest(MANIFEST_ENTRY, &manifest)?;

        let mut hashes: HashMap<String, String> = HashMap::new();
        for (key, path) in &media.order {
            self.check_cancelled()?;

            let bytes = match self.blobs.get_bytes(key) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(key = %key, error = %e, "Media fetch failed, leaving it out of the archive");
                    stats.media_failed += 1;
                    continue;
                }
            };

            let hash = digest(&bytes);
            writer.write_media(path, &bytes)?;
            debug!(key = %key, path = %path, size = bytes.len(), "Wrote media entry");
            hashes.insert(path.clone(), hash);
            stats.media_written += 1;
        }

        apply_hashes(&mut manifest, &hashes);
        writer.write_manifest(HASHED_MANIFEST_ENTRY, &manifest)?;
        writer.finish()?;

        info!(
            projects = stats.projects,
            artifacts = stats.artifacts,
            media = stats.media_written,
            failed = stats.media_failed,
            "Export complete"
        );
        Ok(stats)
    }

    /// Assemble the manifest (without hashes) and the media queue.
    ///
    /// All reads happen inside one read transaction, so the manifest is a
    /// consistent snapshot.
    fn build_manifest(&self, selection: &ExportSelection) -> ExchangeResult<(ExportManifest, MediaQueue)> {
        let snapshot = self.storage.conn().unchecked_transaction()?;

        let categories = self.select_categories(selection)?;
        let projects = self.select_projects(selection, &categories)?;

        let mut manifest = ExportManifest::new();
        let mut media = MediaQueue::default();

        manifest.categories = categories
            .iter()
            .map(|c| ExportCategory {
                name: c.name.clone(),
                display_name: c.display_name.clone(),
                is_published: c.is_published,
            })
            .collect();

        for project in &projects {
            manifest.projects.push(self.export_project(project, &mut media)?);
        }

        if selection.include_site_settings {
            let mut settings = BTreeMap::new();
            for setting in self.storage.list_settings()? {
                let Value::Object(mut fields) = setting.value else {
                    debug!(key = %setting.key, "Skipping non-object setting");
                    continue;
                };
                for reserved in RESERVED_SETTING_FIELDS {
                    fields.remove(reserved);
                }
                let local_image_path = fields
                    .get("imageUrl")
                    .and_then(Value::as_str)
                    .and_then(|s| self.grammar.extract(s))
                    .map(|key| media.assign(&key));
                settings.insert(
                    setting.key,
                    ExportSetting {
                        fields,
                        local_image_path,
                        image_hash: None,
                    },
                );
            }
            manifest.site_settings = Some(settings);
        }

        snapshot.finish()?;
        Ok((manifest, media))
    }

    fn select_categories(&self, selection: &ExportSelection) -> ExchangeResult<Vec<Category>> {
        let all = self.storage.list_categories()?;
        if selection.categories.is_empty() {
            return Ok(all);
        }
        Ok(all
            .into_iter()
            .filter(|c| selection.categories.contains(&c.name))
            .collect())
    }

    /// Each list filters independently; an empty list doesn't filter.
    fn select_projects(
        &self,
        selection: &ExportSelection,
        categories: &[Category],
    ) -> ExchangeResult<Vec<Project>> {
        let selected_categories: HashSet<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        let mut projects = Vec::new();

        for project in self.storage.list_projects()? {
            if !selection.projects.is_empty() && !selection.projects.contains(&project.name) {
                continue;
            }
            if !selection.categories.is_empty() {
                let links = self.storage.get_project_category_names(&project.id)?;
                if !links.iter().any(|name| selected_categories.contains(name.as_str())) {
                    continue;
                }
            }
            projects.push(project);
        }
        Ok(projects)
    }

    fn export_project(&self, project: &Project, media: &mut MediaQueue) -> ExchangeResult<ExportProject> {
        let categories = self.storage.get_project_category_names(&project.id)?;
        let attributes = self
            .storage
            .get_attributes(&project.id)?
            .into_iter()
            .map(|a| ExportAttribute {
                name: a.name,
                value: a.value,
                show_in_nav: a.show_in_nav,
                is_published: a.is_published,
            })
            .collect();
        let artifacts = self.storage.get_artifacts(&project.id)?;
        let cover = self.storage.get_cover(&project.id)?;

        let mut exported = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let keys = self
                .registry
                .media_keys(&artifact.schema, &artifact.data_blob, &self.grammar);

            let mut local_image_path = None;
            let mut local_media_paths = BTreeMap::new();
            for (i, key) in keys.iter().enumerate() {
                let path = media.assign(key);
                if i == 0 {
                    local_image_path = Some(path);
                } else {
                    local_media_paths.insert(key.clone(), path);
                }
            }

            let cover = cover.as_ref().filter(|c| c.artifact_id == artifact.id);
            exported.push(ExportArtifact {
                id: Some(artifact.id),
                schema: artifact.schema,
                data_blob: artifact.data_blob,
                is_published: artifact.is_published,
                sort_order: Some(artifact.sort_order),
                is_cover: cover.is_some(),
                cover_position_x: cover.map(|c| c.position_x),
                cover_position_y: cover.map(|c| c.position_y),
                cover_zoom: cover.map(|c| c.zoom),
                local_image_path,
                local_media_paths,
                image_hash: None,
            });
        }

        debug!(project = %project.name, artifacts = exported.len(), "Assembled project");

        Ok(ExportProject {
            name: project.name.clone(),
            display_name: project.display_name.clone(),
            description: project.description.clone(),
            is_published: project.is_published,
            sort_order: Some(project.sort_order),
            categories,
            attributes,
            artifacts: exported,
        })
    }
}

/// Fill in hashes by archive path; drop paths that never made it into the archive.
fn apply_hashes(manifest: &mut ExportManifest, hashes: &HashMap<String, String>) {
    for artifact in manifest.projects.iter_mut().flat_map(|p| p.artifacts.iter_mut()) {
        if let Some(path) = artifact.local_image_path.take() {
            if let Some(hash) = hashes.get(&path) {
                artifact.image_hash = Some(hash.clone());
                artifact.local_image_path = Some(path);
            }
        }
        artifact.local_media_paths.retain(|_, path| hashes.contains_key(path));
    }

    for setting in manifest.site_settings.iter_mut().flat_map(BTreeMap::values_mut) {
        if let Some(path) = setting.local_image_path.take() {
            if let Some(hash) = hashes.get(&path) {
                setting.image_hash = Some(hash.clone());
                setting.local_image_path = Some(path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::exchange::archive::ArchiveReader;
    use crate::exchange::test_support::{export_archive, seed_chair, seed_project, PNG_A, PNG_B};
    use crate::model::{Artifact, SiteSetting};
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_media_queue_dedups_and_avoids_collisions() {
        let mut queue = MediaQueue::default();
        let a = queue.assign("artifacts/x.png");
        let again = queue.assign("artifacts/x.png");
        let clash = queue.assign("other/x.png");

        assert_eq!(a, "images/x.png");
        assert_eq!(again, a);
        assert_eq!(clash, "images/x-1.png");
        assert_eq!(queue.order.len(), 2);
    }

    #[test]
    fn test_export_writes_manifest_media_and_hashes() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let blobs = MemoryBlobStore::new();
        seed_chair(&mut storage, &blobs);

        let (bytes, stats) = export_archive(&storage, &blobs, &ExportSelection::everything());
        assert_eq!(stats.categories, 1);
        assert_eq!(stats.projects, 1);
        assert_eq!(stats.artifacts, 1);
        assert_eq!(stats.media_written, 1);
        assert_eq!(stats.media_failed, 0);

        let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        let plain = crate::exchange::archive::parse_manifest(
            &reader.read_entry(MANIFEST_ENTRY).unwrap().unwrap(),
        )
        .unwrap();
        assert!(plain.projects[0].artifacts[0].image_hash.is_none());

        let (manifest, hashed) = reader.manifest().unwrap();
        assert!(hashed);
        let artifact = &manifest.projects[0].artifacts[0];
        assert!(artifact.is_cover);
        assert_eq!(artifact.cover_position_x, Some(50.0));
        assert_eq!(artifact.image_hash.as_deref(), Some(digest(PNG_A).as_str()));

        let path = artifact.local_image_path.clone().unwrap();
        assert_eq!(reader.read_entry(&path).unwrap().unwrap(), PNG_A);
        assert_eq!(manifest.projects[0].categories, vec!["wood"]);
    }

    #[test]
    fn test_no_orphan_archive_entries() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let blobs = MemoryBlobStore::new();
        let project = seed_project(&mut storage, "table");
        blobs.put("artifacts/shared.png", PNG_A, "image/png").unwrap();
        blobs.put("artifacts/poster.jpg", PNG_B, "image/jpeg").unwrap();
        blobs.put("artifacts/clip.mp4", b"mp4", "video/mp4").unwrap();

        // Two artifacts share one image; a video carries two media fields.
        for data in [
            json!({"imageUrl": "/artifacts/shared.png"}),
            json!({"imageUrl": "https://cdn.example.com/artifacts/shared.png"}),
        ] {
            storage
                .insert_artifact(&Artifact::new(&project.id, "image-v1", data), "tester")
                .unwrap();
        }
        storage
            .insert_artifact(
                &Artifact::new(
                    &project.id,
                    "video-v1",
                    json!({"videoUrl": "/artifacts/clip.mp4", "posterUrl": "/artifacts/poster.jpg"}),
                ),
                "tester",
            )
            .unwrap();
        storage
            .replace_setting(
                &SiteSetting {
                    key: "namecard".into(),
                    value: json!({"imageUrl": "/artifacts/shared.png", "zoom": 1}),
                },
                "tester",
            )
            .unwrap();

        let (bytes, stats) = export_archive(&storage, &blobs, &ExportSelection::everything());
        assert_eq!(stats.media_written, 3);

        let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        let (manifest, _) = reader.manifest().unwrap();

        let referenced: HashSet<&str> = manifest.local_paths().collect();
        let entries: HashSet<String> = reader.media_entries().into_iter().collect();
        assert_eq!(entries.len(), 3);
        for entry in &entries {
            assert!(referenced.contains(entry.as_str()), "orphan entry {entry}");
        }
        for path in &referenced {
            assert!(entries.contains(*path), "dangling path {path}");
        }

        let video = &manifest.projects[0].artifacts[2];
        assert_eq!(video.local_media_paths.len(), 1);
        assert!(video.local_media_paths.contains_key("artifacts/poster.jpg"));

        let card = &manifest.site_settings.as_ref().unwrap()["namecard"];
        assert_eq!(card.local_image_path, manifest.projects[0].artifacts[0].local_image_path);
        assert_eq!(card.image_hash.as_deref(), Some(digest(PNG_A).as_str()));
    }

    #[test]
    fn test_failed_fetch_is_omitted() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let blobs = MemoryBlobStore::new();
        let project = seed_project(&mut storage, "lamp");
        storage
            .insert_artifact(
                &Artifact::new(&project.id, "image-v1", json!({"imageUrl": "/artifacts/gone.png"})),
                "tester",
            )
            .unwrap();

        let (bytes, stats) = export_archive(&storage, &blobs, &ExportSelection::everything());
        assert_eq!(stats.media_failed, 1);
        assert_eq!(stats.media_written, 0);

        let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        assert!(reader.media_entries().is_empty());
        let (manifest, _) = reader.manifest().unwrap();
        let artifact = &manifest.projects[0].artifacts[0];
        assert!(artifact.local_image_path.is_none());
        assert!(artifact.image_hash.is_none());
        // The payload still carries its original locator.
        assert_eq!(artifact.data_blob["imageUrl"], "/artifacts/gone.png");
    }

    #[test]
    fn test_selection_filters() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let blobs = MemoryBlobStore::new();
        seed_chair(&mut storage, &blobs);
        seed_project(&mut storage, "stool");

        let by_category = ExportSelection {
            categories: vec!["wood".into()],
            projects: vec![],
            include_site_settings: false,
        };
        let (bytes, stats) = export_archive(&storage, &blobs, &by_category);
        assert_eq!(stats.projects, 1);
        let (manifest, _) = ArchiveReader::open(Cursor::new(bytes)).unwrap().manifest().unwrap();
        assert_eq!(manifest.projects[0].name, "chair");
        assert!(manifest.site_settings.is_none());

        let by_project = ExportSelection {
            categories: vec![],
            projects: vec!["stool".into()],
            include_site_settings: true,
        };
        let (bytes, stats) = export_archive(&storage, &blobs, &by_project);
        assert_eq!(stats.projects, 1);
        assert_eq!(stats.categories, 1);
        assert_eq!(stats.media_written, 0);
        let (manifest, _) = ArchiveReader::open(Cursor::new(bytes)).unwrap().manifest().unwrap();
        assert_eq!(manifest.projects[0].name, "stool");
    }

    #[test]
    fn test_write_failure_is_fatal() {
        struct FailingSink;
        impl Write for FailingSink {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut storage = SqliteStorage::open_memory().unwrap();
        let blobs = MemoryBlobStore::new();
        seed_chair(&mut storage, &blobs);

        let exporter = Exporter::new(&storage, &blobs, &ExchangeConfig::default());
        assert!(exporter.export(&ExportSelection::everything(), FailingSink).is_err());
    }

    #[test]
    fn test_cancel_flag_stops_before_fetch() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let blobs = MemoryBlobStore::new();
        seed_chair(&mut storage, &blobs);

        let flag = Arc::new(AtomicBool::new(true));
        let exporter =
            Exporter::new(&storage, &blobs, &ExchangeConfig::default()).with_cancel(flag);
        let result = exporter.export(&ExportSelection::everything(), Vec::new());
        assert!(matches!(result, Err(ExchangeError::Cancelled)));
    }
}
