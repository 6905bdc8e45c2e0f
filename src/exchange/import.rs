//! Archive import.
//!
//! The importer reconciles an archive against the live store in three passes:
//! categories, then projects (attributes, artifacts, cover), then site
//! settings. Each existing entity is handled per the [`ConflictPolicy`].
//!
//! # Artifact dedup during a merge
//!
//! Each incoming artifact is matched, in order, by:
//! 1. id, against the project's existing artifacts
//! 2. content hash, against hashes already stored on existing artifacts
//! 3. content hash, against hashes computed on demand for existing image
//!    artifacts that have none yet (persisted as they are computed)
//!
//! Unmatched artifacts are inserted, uploading their media from the archive.
//!
//! Only structural problems (no manifest, wrong version, bad JSON) fail the
//! import. Everything else becomes a warning in the [`ImportSummary`].

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::io::{Read, Seek};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::blob::{content_type_for, new_blob_key, BlobStore};
use crate::config::ExchangeConfig;
use crate::model::artifact::STORED_HASH_FIELD;
use crate::model::{Artifact, Category, CoverAssignment, Project, ProjectAttribute, SiteSetting};
use crate::storage::SqliteStorage;

use super::archive::ArchiveReader;
use super::hash::{digest, digest_reader};
use super::locator::LocatorGrammar;
use super::schema::SchemaRegistry;
use super::sweep::referenced_keys;
use super::types::{
    ConflictPolicy, EntityKind, ExchangeError, ExchangeResult, ExportArtifact, ExportAttribute,
    ExportManifest, ExportProject, ExportSetting, ImportSummary, Resolution,
};

/// A payload uploaded from the archive during this import.
#[derive(Debug, Clone)]
struct UploadedMedia {
    key: String,
    hash: String,
}

/// State scoped to one import call.
struct ImportRun<R: Read + Seek> {
    archive: ArchiveReader<R>,
    /// Archive path → uploaded blob, so each entry is uploaded once.
    uploads: HashMap<String, UploadedMedia>,
    /// Archive path → digest, for entries hashed without uploading.
    entry_hashes: HashMap<String, String>,
    summary: ImportSummary,
}

enum ProjectOutcome {
    Created,
    Clobbered,
    Merged,
    Skipped,
}

enum ArtifactMatch {
    Existing(String),
    Created(String),
    Rejected,
}

/// Hash lookups over one project's existing artifacts, built on first use.
struct HashIndex {
    existing: Vec<Artifact>,
    known: Option<HashMap<String, String>>,
    backlog: Option<VecDeque<Artifact>>,
}

impl HashIndex {
    fn new(existing: Vec<Artifact>) -> Self {
        Self {
            existing,
            known: None,
            backlog: None,
        }
    }

    /// `hash → artifact id` from stored hashes.
    fn known(&mut self) -> &mut HashMap<String, String> {
        self.known.get_or_insert_with(|| {
            self.existing
                .iter()
                .filter_map(|a| a.stored_hash().map(|h| (h.to_string(), a.id.clone())))
                .collect()
        })
    }

    fn record(&mut self, hash: String, id: String) {
        self.known().entry(hash).or_insert(id);
    }
}

/// Importer for content archives.
pub struct Importer<'a, B: BlobStore + ?Sized> {
    storage: &'a mut SqliteStorage,
    blobs: &'a B,
    grammar: LocatorGrammar,
    registry: SchemaRegistry,
    prefix: String,
    actor: String,
}

impl<'a, B: BlobStore + ?Sized> Importer<'a, B> {
    /// Create an importer writing as `actor`.
    #[must_use]
    pub fn new(
        storage: &'a mut SqliteStorage,
        blobs: &'a B,
        config: &ExchangeConfig,
        actor: &str,
    ) -> Self {
        Self {
            storage,
            blobs,
            grammar: LocatorGrammar::from_config(config),
            registry: SchemaRegistry::builtin(),
            prefix: config.blob_prefix.clone(),
            actor: actor.to_string(),
        }
    }

    /// Use a custom schema registry.
    #[must_use]
    pub fn with_registry(mut self, registry: SchemaRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Import an archive.
    ///
    /// # Errors
    ///
    /// Returns an error only if the archive is structurally invalid; nothing
    /// is written in that case.
    pub fn import<R: Read + Seek>(
        &mut self,
        source: R,
        policy: &ConflictPolicy,
    ) -> ExchangeResult<ImportSummary> {
        let mut archive = ArchiveReader::open(source)?;
        let (manifest, hashed) = archive.manifest()?;
        debug!(
            hashed,
            categories = manifest.categories.len(),
            projects = manifest.projects.len(),
            "Read manifest"
        );

        let mut run = ImportRun {
            archive,
            uploads: HashMap::new(),
            entry_hashes: HashMap::new(),
            summary: ImportSummary::default(),
        };

        let category_ids = self.import_categories(&manifest, policy, &mut run);
        self.import_projects(&manifest, policy, &category_ids, &mut run);
        if let Some(settings) = &manifest.site_settings {
            self.import_settings(settings, &mut run);
        }

        let summary = run.summary;
        info!(
            projects_created = summary.projects_created,
            projects_merged = summary.projects_merged,
            projects_clobbered = summary.projects_clobbered,
            projects_skipped = summary.projects_skipped,
            artifacts_created = summary.artifacts_created,
            artifacts_skipped = summary.artifacts_skipped,
            warnings = summary.warnings.len(),
            "Import complete"
        );
        Ok(summary)
    }

    // ── Categories ──────────────────────────────────────────

    /// Returns `name → id` for every category known after the pass.
    fn import_categories<R: Read + Seek>(
        &mut self,
        manifest: &ExportManifest,
        policy: &ConflictPolicy,
        run: &mut ImportRun<R>,
    ) -> HashMap<String, String> {
        let mut ids = HashMap::new();

        for incoming in &manifest.categories {
            let existing = match self.storage.get_category_by_name(&incoming.name) {
                Ok(existing) => existing,
                Err(e) => {
                    run.summary.warn(format!("Category '{}': {e}", incoming.name));
                    continue;
                }
            };

            match existing {
                None => {
                    let category =
                        Category::new(&incoming.name, &incoming.display_name, incoming.is_published);
                    match self.storage.create_category(&category, &self.actor) {
                        Ok(()) => {
                            run.summary.categories_created += 1;
                            ids.insert(category.name, category.id);
                        }
                        Err(e) => run.summary.warn(format!("Category '{}': {e}", incoming.name)),
                    }
                }
                Some(existing) => {
                    match policy.resolve(EntityKind::Category, &incoming.name) {
                        Resolution::Skip => {
                            debug!(category = %incoming.name, "Keeping existing category");
                            run.summary.categories_skipped += 1;
                        }
                        Resolution::Merge | Resolution::Clobber => {
                            match self.storage.update_category(
                                &existing.id,
                                &incoming.display_name,
                                incoming.is_published,
                                &self.actor,
                            ) {
                                Ok(()) => run.summary.categories_updated += 1,
                                Err(e) => {
                                    run.summary.warn(format!("Category '{}': {e}", incoming.name));
                                }
                            }
                        }
                    }
                    ids.insert(existing.name, existing.id);
                }
            }
        }

        match self.storage.list_categories() {
            Ok(all) => {
                for category in all {
                    ids.entry(category.name).or_insert(category.id);
                }
            }
            Err(e) => run.summary.warn(format!("Could not list categories: {e}")),
        }

        ids
    }

    // ── Projects ────────────────────────────────────────────

    fn import_projects<R: Read + Seek>(
        &mut self,
        manifest: &ExportManifest,
        policy: &ConflictPolicy,
        category_ids: &HashMap<String, String>,
        run: &mut ImportRun<R>,
    ) {
        let mut seen = HashSet::new();

        for incoming in &manifest.projects {
            if !seen.insert(incoming.name.as_str()) {
                debug!(project = %incoming.name, "Ignoring repeated project in manifest");
                continue;
            }

            let existing = match self.storage.get_project_by_name(&incoming.name) {
                Ok(existing) => existing,
                Err(e) => {
                    run.summary.warn(format!("Project '{}': {e}", incoming.name));
                    continue;
                }
            };

            let outcome = match existing {
                None => self
                    .create_project(incoming, category_ids, run)
                    .map(|()| ProjectOutcome::Created),
                Some(existing) => match policy.resolve(EntityKind::Project, &incoming.name) {
                    Resolution::Skip => Ok(ProjectOutcome::Skipped),
                    Resolution::Clobber => self
                        .clobber_project(&existing, incoming, category_ids, run)
                        .map(|()| ProjectOutcome::Clobbered),
                    Resolution::Merge => self
                        .merge_project(&existing, incoming, category_ids, run)
                        .map(|()| ProjectOutcome::Merged),
                },
            };

            match outcome {
                Ok(ProjectOutcome::Created) => run.summary.projects_created += 1,
                Ok(ProjectOutcome::Clobbered) => run.summary.projects_clobbered += 1,
                Ok(ProjectOutcome::Merged) => run.summary.projects_merged += 1,
                Ok(ProjectOutcome::Skipped) => {
                    debug!(project = %incoming.name, "Keeping existing project");
                    run.summary.projects_skipped += 1;
                }
                Err(e) => run.summary.warn(format!("Project '{}': {e}", incoming.name)),
            }
        }
    }

    fn create_project<R: Read + Seek>(
        &mut self,
        incoming: &ExportProject,
        category_ids: &HashMap<String, String>,
        run: &mut ImportRun<R>,
    ) -> ExchangeResult<()> {
        let mut project = Project::new(&incoming.name, &incoming.display_name);
        project.description.clone_from(&incoming.description);
        project.is_published = incoming.is_published;
        project.sort_order = incoming.sort_order.unwrap_or(0);
        self.storage.create_project(&project, &self.actor)?;

        self.link_categories(&project.id, &incoming.categories, category_ids)?;

        let mut attributes: Vec<ProjectAttribute> = Vec::new();
        for attr in &incoming.attributes {
            match attributes.iter_mut().find(|a| a.name == attr.name) {
                Some(pending) => overwrite_attribute(pending, attr),
                None => attributes.push(new_attribute(&project.id, attr)),
            }
        }
        self.storage.insert_attributes(&attributes, &self.actor)?;

        let mut cover = None;
        for (position, artifact) in incoming.artifacts.iter().enumerate() {
            match self.insert_artifact(&project.id, artifact, position, None, run) {
                Ok(Some(id)) => {
                    run.summary.artifacts_created += 1;
                    if artifact.is_cover && cover.is_none() {
                        cover = Some(cover_for(&project.id, &id, artifact));
                    }
                }
                Ok(None) => {}
                Err(e) => run.summary.warn(format!(
                    "Project '{}': artifact {position} not created: {e}",
                    incoming.name
                )),
            }
        }

        if let Some(cover) = cover {
            self.storage.set_cover(&cover, &self.actor)?;
        }

        debug!(project = %incoming.name, "Created project");
        Ok(())
    }

    fn clobber_project<R: Read + Seek>(
        &mut self,
        existing: &Project,
        incoming: &ExportProject,
        category_ids: &HashMap<String, String>,
        run: &mut ImportRun<R>,
    ) -> ExchangeResult<()> {
        let old_keys: Vec<String> = self
            .storage
            .get_artifacts(&existing.id)?
            .iter()
            .flat_map(|a| self.registry.media_keys(&a.schema, &a.data_blob, &self.grammar))
            .collect();

        self.storage.delete_project(&existing.id, &self.actor)?;
        self.create_project(incoming, category_ids, run)?;
        self.release_blobs(old_keys);

        debug!(project = %incoming.name, "Clobbered project");
        Ok(())
    }

    fn merge_project<R: Read + Seek>(
        &mut self,
        existing: &Project,
        incoming: &ExportProject,
        category_ids: &HashMap<String, String>,
        run: &mut ImportRun<R>,
    ) -> ExchangeResult<()> {
        self.storage.update_project_fields(
            &existing.id,
            &incoming.display_name,
            incoming.description.as_deref(),
            incoming.is_published,
            &self.actor,
        )?;
        self.link_categories(&existing.id, &incoming.categories, category_ids)?;
        self.merge_attributes(&existing.id, &incoming.attributes)?;

        let current = self.storage.get_artifacts(&existing.id)?;
        let mut known_ids: HashSet<String> = current.iter().map(|a| a.id.clone()).collect();
        let mut index = HashIndex::new(current);
        let mut cover = None;

        for (position, artifact) in incoming.artifacts.iter().enumerate() {
            let outcome =
                self.merge_artifact(&existing.id, artifact, position, &mut known_ids, &mut index, run);
            let id = match outcome {
                Ok(ArtifactMatch::Existing(id)) => {
                    run.summary.artifacts_skipped += 1;
                    id
                }
                Ok(ArtifactMatch::Created(id)) => {
                    run.summary.artifacts_created += 1;
                    id
                }
                Ok(ArtifactMatch::Rejected) => continue,
                Err(e) => {
                    run.summary.warn(format!(
                        "Project '{}': artifact {position} not merged: {e}",
                        incoming.name
                    ));
                    continue;
                }
            };
            if artifact.is_cover && cover.is_none() {
                cover = Some(cover_for(&existing.id, &id, artifact));
            }
        }

        if let Some(cover) = cover {
            self.storage.set_cover(&cover, &self.actor)?;
        }

        debug!(project = %incoming.name, "Merged project");
        Ok(())
    }

    fn merge_attributes(&mut self, project_id: &str, incoming: &[ExportAttribute]) -> ExchangeResult<()> {
        let current: HashMap<String, String> = self
            .storage
            .get_attributes(project_id)?
            .into_iter()
            .map(|a| (a.name, a.id))
            .collect();

        let mut fresh: Vec<ProjectAttribute> = Vec::new();
        for attr in incoming {
            if let Some(id) = current.get(&attr.name) {
                self.storage.update_attribute(
                    id,
                    &attr.value,
                    attr.show_in_nav,
                    attr.is_published,
                    &self.actor,
                )?;
            } else if let Some(pending) = fresh.iter_mut().find(|a| a.name == attr.name) {
                overwrite_attribute(pending, attr);
            } else {
                fresh.push(new_attribute(project_id, attr));
            }
        }

        self.storage.insert_attributes(&fresh, &self.actor)?;
        Ok(())
    }

    fn merge_artifact<R: Read + Seek>(
        &mut self,
        project_id: &str,
        incoming: &ExportArtifact,
        position: usize,
        known_ids: &mut HashSet<String>,
        index: &mut HashIndex,
        run: &mut ImportRun<R>,
    ) -> ExchangeResult<ArtifactMatch> {
        if let Some(id) = incoming.id.as_deref().filter(|id| known_ids.contains(*id)) {
            debug!(artifact = %id, "Matched artifact by id");
            return Ok(ArtifactMatch::Existing(id.to_string()));
        }

        let hash = match (incoming.hash(), &incoming.local_image_path) {
            (Some(hash), _) => Some(hash.to_string()),
            (None, Some(path)) => self.entry_hash(path, run)?,
            (None, None) => None,
        };

        if let Some(hash) = &hash {
            if let Some(id) = index.known().get(hash) {
                debug!(artifact = %id, "Matched artifact by stored hash");
                return Ok(ArtifactMatch::Existing(id.clone()));
            }
            if let Some(id) = self.backfill_until(hash, index) {
                debug!(artifact = %id, "Matched artifact by backfilled hash");
                return Ok(ArtifactMatch::Existing(id));
            }
        }

        match self.insert_artifact(project_id, incoming, position, hash.clone(), run)? {
            Some(id) => {
                known_ids.insert(id.clone());
                if let Some(hash) = hash {
                    index.record(hash, id.clone());
                }
                Ok(ArtifactMatch::Created(id))
            }
            None => Ok(ArtifactMatch::Rejected),
        }
    }

    /// Hash existing un-hashed image artifacts one at a time until one
    /// matches `target`. Computed hashes are persisted and indexed.
    fn backfill_until(&mut self, target: &str, index: &mut HashIndex) -> Option<String> {
        if index.backlog.is_none() {
            let backlog = index
                .existing
                .iter()
                .filter(|a| a.stored_hash().is_none() && self.registry.supports_backfill(&a.schema))
                .cloned()
                .collect();
            index.backlog = Some(backlog);
        }

        while let Some(mut artifact) = index.backlog.as_mut().and_then(VecDeque::pop_front) {
            let Some(key) =
                self.registry
                    .primary_media_key(&artifact.schema, &artifact.data_blob, &self.grammar)
            else {
                continue;
            };

            let hash = match self
                .blobs
                .get(&key)
                .map_err(ExchangeError::from)
                .and_then(|reader| digest_reader(reader).map_err(ExchangeError::from))
            {
                Ok(hash) => hash,
                Err(e) => {
                    warn!(artifact = %artifact.id, key = %key, error = %e, "Hash backfill fetch failed");
                    continue;
                }
            };

            artifact.set_stored_hash(&hash);
            match self
                .storage
                .update_artifact_data(&artifact.id, &artifact.data_blob, &self.actor)
            {
                Ok(()) => debug!(artifact = %artifact.id, "Backfilled content hash"),
                Err(e) => warn!(artifact = %artifact.id, error = %e, "Could not persist backfilled hash"),
            }

            index.record(hash.clone(), artifact.id.clone());
            if hash == target {
                return Some(artifact.id);
            }
        }
        None
    }

    /// Insert one incoming artifact, uploading its media first.
    ///
    /// Returns `None` (after recording a warning) if the payload is invalid
    /// or its media is missing from the archive.
    fn insert_artifact<R: Read + Seek>(
        &mut self,
        project_id: &str,
        incoming: &ExportArtifact,
        position: usize,
        known_hash: Option<String>,
        run: &mut ImportRun<R>,
    ) -> ExchangeResult<Option<String>> {
        if let Err(problem) = self.registry.validate(&incoming.schema, &incoming.data_blob) {
            run.summary.warn(format!(
                "Artifact {position} ({}) rejected: {problem}",
                incoming.schema
            ));
            return Ok(None);
        }

        let mut data = incoming.data_blob.clone();
        let source_keys = self
            .registry
            .media_keys(&incoming.schema, &data, &self.grammar);
        let mut replacements: HashMap<String, String> = HashMap::new();
        let mut primary: Option<UploadedMedia> = None;

        if let Some(path) = &incoming.local_image_path {
            let Some(media) = self.upload(path, run)? else {
                run.summary.warn(format!(
                    "Artifact {position}: media '{path}' is missing from the archive"
                ));
                return Ok(None);
            };
            if let Some(source) = source_keys.first() {
                replacements.insert(source.clone(), media.key.clone());
            }
            primary = Some(media);
        }

        for (source, path) in &incoming.local_media_paths {
            let Some(media) = self.upload(path, run)? else {
                run.summary.warn(format!(
                    "Artifact {position}: media '{path}' is missing from the archive"
                ));
                return Ok(None);
            };
            replacements.insert(source.clone(), media.key);
        }

        if !replacements.is_empty() {
            self.registry
                .rewrite_media(&incoming.schema, &mut data, &self.grammar, |key| {
                    replacements.get(key).cloned()
                });
        }
        if let (Some(media), None) = (&primary, source_keys.first()) {
            self.registry
                .set_primary_media(&incoming.schema, &mut data, &self.grammar, &media.key);
        }

        let hash = known_hash
            .or_else(|| incoming.hash().map(str::to_string))
            .or_else(|| primary.as_ref().map(|m| m.hash.clone()));

        let reusable_id = match incoming.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) if !self.storage.artifact_exists(id)? => Some(id.to_string()),
            _ => None,
        };

        let mut artifact = Artifact::new(project_id, &incoming.schema, data);
        if let Some(id) = reusable_id {
            artifact.id = id;
        }
        artifact.is_published = incoming.is_published;
        artifact.sort_order = incoming
            .sort_order
            .unwrap_or_else(|| i64::try_from(position).unwrap_or(i64::MAX));
        if let Some(hash) = &hash {
            artifact.set_stored_hash(hash);
        }

        self.storage.insert_artifact(&artifact, &self.actor)?;
        Ok(Some(artifact.id))
    }

    // ── Settings ────────────────────────────────────────────

    fn import_settings<R: Read + Seek>(
        &mut self,
        settings: &BTreeMap<String, ExportSetting>,
        run: &mut ImportRun<R>,
    ) {
        for (key, setting) in settings {
            let mut fields = setting.fields.clone();

            if let Some(path) = &setting.local_image_path {
                let media = match run.archive.read_entry(path) {
                    Ok(Some(bytes)) => self.put_media(path, &bytes, run),
                    Ok(None) => {
                        run.summary
                            .warn(format!("Setting '{key}': media '{path}' is missing from the archive"));
                        continue;
                    }
                    Err(e) => Err(e),
                };
                let media = match media {
                    Ok(media) => media,
                    Err(e) => {
                        run.summary.warn(format!("Setting '{key}': {e}"));
                        continue;
                    }
                };
                fields.insert("imageUrl".to_string(), Value::String(self.grammar.render(&media.key)));
                let hash = setting.image_hash.clone().unwrap_or(media.hash);
                fields.insert(STORED_HASH_FIELD.to_string(), Value::String(hash));
            } else if let Some(hash) = &setting.image_hash {
                fields.insert(STORED_HASH_FIELD.to_string(), Value::String(hash.clone()));
            }

            let setting = SiteSetting {
                key: key.clone(),
                value: Value::Object(fields),
            };
            match self.storage.replace_setting(&setting, &self.actor) {
                Ok(()) => run.summary.settings_replaced += 1,
                Err(e) => run.summary.warn(format!("Setting '{key}': {e}")),
            }
        }
    }

    // ── Media ───────────────────────────────────────────────

    fn link_categories(
        &mut self,
        project_id: &str,
        names: &[String],
        category_ids: &HashMap<String, String>,
    ) -> ExchangeResult<()> {
        for name in names {
            match category_ids.get(name) {
                Some(category_id) => {
                    self.storage
                        .link_project_category(project_id, category_id, &self.actor)?;
                }
                None => debug!(category = %name, "Ignoring link to unknown category"),
            }
        }
        Ok(())
    }

    /// Upload an archive entry once per import. `None` if the entry is absent.
    fn upload<R: Read + Seek>(
        &self,
        path: &str,
        run: &mut ImportRun<R>,
    ) -> ExchangeResult<Option<UploadedMedia>> {
        if let Some(media) = run.uploads.get(path) {
            return Ok(Some(media.clone()));
        }
        let Some(bytes) = run.archive.read_entry(path)? else {
            return Ok(None);
        };
        let media = self.put_media(path, &bytes, run)?;
        run.uploads.insert(path.to_string(), media.clone());
        Ok(Some(media))
    }

    fn put_media<R: Read + Seek>(
        &self,
        path: &str,
        bytes: &[u8],
        run: &mut ImportRun<R>,
    ) -> ExchangeResult<UploadedMedia> {
        let hash = digest(bytes);
        let key = new_blob_key(&self.prefix, path);
        self.blobs.put(&key, bytes, &content_type_for(path))?;
        run.summary.images_uploaded += 1;
        run.entry_hashes.insert(path.to_string(), hash.clone());
        debug!(path = %path, key = %key, size = bytes.len(), "Uploaded media");
        Ok(UploadedMedia { key, hash })
    }

    /// Digest of an archive entry, for manifests that carry no hash.
    fn entry_hash<R: Read + Seek>(
        &self,
        path: &str,
        run: &mut ImportRun<R>,
    ) -> ExchangeResult<Option<String>> {
        if let Some(hash) = run.entry_hashes.get(path) {
            return Ok(Some(hash.clone()));
        }
        let Some(bytes) = run.archive.read_entry(path)? else {
            return Ok(None);
        };
        let hash = digest(&bytes);
        run.entry_hashes.insert(path.to_string(), hash.clone());
        Ok(Some(hash))
    }

    /// Delete blobs of a clobbered project that nothing references anymore.
    fn release_blobs(&self, keys: Vec<String>) {
        if keys.is_empty() {
            return;
        }
        let referenced = match referenced_keys(&*self.storage, &self.grammar) {
            Ok(referenced) => referenced,
            Err(e) => {
                warn!(error = %e, "Skipping blob cleanup, could not collect references");
                return;
            }
        };

        let orphans: Vec<String> = keys
            .into_iter()
            .filter(|k| !referenced.contains(k))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if orphans.is_empty() {
            return;
        }

        match self.blobs.delete(&orphans) {
            Ok(()) => debug!(count = orphans.len(), "Released blobs of clobbered project"),
            Err(e) => warn!(count = orphans.len(), error = %e, "Blob cleanup failed"),
        }
    }
}

fn new_attribute(project_id: &str, attr: &ExportAttribute) -> ProjectAttribute {
    let mut created = ProjectAttribute::new(project_id, &attr.name, &attr.value);
    created.show_in_nav = attr.show_in_nav;
    created.is_published = attr.is_published;
    created
}

fn overwrite_attribute(target: &mut ProjectAttribute, attr: &ExportAttribute) {
    target.value.clone_from(&attr.value);
    target.show_in_nav = attr.show_in_nav;
    target.is_published = attr.is_published;
}

fn cover_for(project_id: &str, artifact_id: &str, incoming: &ExportArtifact) -> CoverAssignment {
    CoverAssignment::with_defaults(
        project_id,
        artifact_id,
        incoming.cover_position_x,
        incoming.cover_position_y,
        incoming.cover_zoom,
    )
}
