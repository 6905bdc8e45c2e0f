//! Type definitions for archive exchange.
//!
//! This module defines the manifest wire format, the conflict policy, the
//! summaries returned by each operation, and the exchange error type.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::blob::BlobError;

/// The only manifest version this build reads and writes.
pub const MANIFEST_VERSION: u64 = 1;

/// Archive manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportManifest {
    pub version: u64,
    pub exported_at: String,
    #[serde(default)]
    pub categories: Vec<ExportCategory>,
    #[serde(default)]
    pub projects: Vec<ExportProject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_settings: Option<BTreeMap<String, ExportSetting>>,
}

impl ExportManifest {
    /// Create an empty manifest stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: MANIFEST_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            categories: Vec::new(),
            projects: Vec::new(),
            site_settings: None,
        }
    }

    /// Number of artifacts across all projects.
    #[must_use]
    pub fn artifact_count(&self) -> usize {
        self.projects.iter().map(|p| p.artifacts.len()).sum()
    }

    /// Every archive path the manifest references, artifacts and settings alike.
    pub fn local_paths(&self) -> impl Iterator<Item = &str> {
        let artifact_paths = self.projects.iter().flat_map(|p| &p.artifacts).flat_map(|a| {
            a.local_image_path
                .as_deref()
                .into_iter()
                .chain(a.local_media_paths.values().map(String::as_str))
        });
        let setting_paths = self
            .site_settings
            .iter()
            .flat_map(BTreeMap::values)
            .filter_map(|s| s.local_image_path.as_deref());
        artifact_paths.chain(setting_paths)
    }
}

impl Default for ExportManifest {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportCategory {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportProject {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
    /// Names of linked categories.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<ExportAttribute>,
    #[serde(default)]
    pub artifacts: Vec<ExportArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportAttribute {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub show_in_nav: bool,
    #[serde(default = "default_true")]
    pub is_published: bool,
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub schema: String,
    #[serde(default)]
    pub data_blob: Value,
    #[serde(default = "default_true")]
    pub is_published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_cover: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_position_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_position_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_zoom: Option<f64>,
    /// Archive path of the primary media payload.
    #[serde(
        rename = "_localImagePath",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub local_image_path: Option<String>,
    /// Archive paths of secondary media, keyed by their source blob key.
    #[serde(
        rename = "_localMediaPaths",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub local_media_paths: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_hash: Option<String>,
}

impl ExportArtifact {
    /// The incoming content hash, ignoring empty strings.
    #[must_use]
    pub fn hash(&self) -> Option<&str> {
        self.image_hash.as_deref().filter(|h| !h.is_empty())
    }
}

/// A site setting as carried in the manifest.
///
/// Arbitrary setting fields are kept as-is; only the archive path and the
/// hash are typed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExportSetting {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(
        rename = "_localImagePath",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub local_image_path: Option<String>,
    #[serde(rename = "imageHash", default, skip_serializing_if = "Option::is_none")]
    pub image_hash: Option<String>,
}

// ── Conflict policy ──────────────────────────────────────────

/// How an incoming entity that already exists locally is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Replace the local entity and everything it owns.
    Clobber,
    /// Reconcile field by field, additive for sub-entities.
    Merge,
    /// Keep the local entity untouched.
    #[default]
    Skip,
}

impl Resolution {
    /// All resolutions, in display order.
    pub const ALL: [Self; 3] = [Self::Clobber, Self::Merge, Self::Skip];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Clobber => "clobber",
            Self::Merge => "merge",
            Self::Skip => "skip",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity kinds the policy can address by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Category,
    Project,
}

/// Caller-supplied conflict policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConflictPolicy {
    pub default_resolution: Resolution,
    pub per_project: HashMap<String, Resolution>,
    pub per_category: HashMap<String, Resolution>,
}

impl ConflictPolicy {
    /// A policy applying `resolution` to everything.
    #[must_use]
    pub fn uniform(resolution: Resolution) -> Self {
        Self {
            default_resolution: resolution,
            ..Self::default()
        }
    }

    /// `per_kind[name]`, falling back to the default.
    #[must_use]
    pub fn resolve(&self, kind: EntityKind, name: &str) -> Resolution {
        let overrides = match kind {
            EntityKind::Category => &self.per_category,
            EntityKind::Project => &self.per_project,
        };
        overrides
            .get(name)
            .copied()
            .unwrap_or(self.default_resolution)
    }
}

// ── Summaries ────────────────────────────────────────────────

/// Observational accounting of one import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub categories_created: usize,
    pub categories_updated: usize,
    pub categories_skipped: usize,
    pub projects_created: usize,
    pub projects_clobbered: usize,
    pub projects_merged: usize,
    pub projects_skipped: usize,
    pub artifacts_created: usize,
    pub artifacts_skipped: usize,
    pub images_uploaded: usize,
    pub settings_replaced: usize,
    pub warnings: Vec<String>,
}

impl ImportSummary {
    /// Record an entity-level problem.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    /// Total projects touched in any way.
    #[must_use]
    pub fn projects_total(&self) -> usize {
        self.projects_created + self.projects_clobbered + self.projects_merged + self.projects_skipped
    }
}

/// Statistics for an export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStats {
    pub categories: usize,
    pub projects: usize,
    pub artifacts: usize,
    pub settings: usize,
    /// Media entries written to the archive.
    pub media_written: usize,
    /// Media keys whose fetch failed and were left out.
    pub media_failed: usize,
}

/// What to export. Empty lists mean "all".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSelection {
    pub categories: Vec<String>,
    pub projects: Vec<String>,
    pub include_site_settings: bool,
}

impl Default for ExportSelection {
    fn default() -> Self {
        Self::everything()
    }
}

impl ExportSelection {
    /// Select the whole store.
    #[must_use]
    pub fn everything() -> Self {
        Self {
            categories: Vec::new(),
            projects: Vec::new(),
            include_site_settings: true,
        }
    }

    #[must_use]
    pub fn is_everything(&self) -> bool {
        self.categories.is_empty() && self.projects.is_empty()
    }
}

/// One manifest entity and whether it already exists locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewEntry {
    pub name: String,
    pub display_name: String,
    pub exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPreview {
    pub name: String,
    pub display_name: String,
    pub exists: bool,
    pub artifacts: usize,
    /// Artifacts that would be created on a clean insert (local media present).
    pub media_artifacts: usize,
    pub categories: Vec<String>,
    /// Repeated names that an import would ignore.
    pub duplicate: bool,
}

/// Conflict preview of an archive against the live store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub version: u64,
    pub exported_at: String,
    pub hashed_manifest: bool,
    pub categories: Vec<PreviewEntry>,
    pub projects: Vec<ProjectPreview>,
    pub settings: Vec<String>,
    pub media_entries: usize,
}

/// Result of an orphan blob sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepStats {
    pub scanned: usize,
    pub referenced: usize,
    pub orphaned: usize,
    pub deleted: usize,
    pub failed: usize,
    pub dry_run: bool,
}

// ── Errors ───────────────────────────────────────────────────

/// Exchange-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// IO error on the archive source or sink.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest JSON could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Container format error.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Content store error.
    #[error("Database error: {0}")]
    Database(String),

    #[error("Blob store error: {0}")]
    Blob(#[from] BlobError),

    /// Neither manifest entry exists in the archive.
    #[error("Archive has no manifest")]
    MissingManifest,

    #[error("Unsupported manifest version: {found}")]
    UnsupportedVersion { found: String },

    /// Manifest JSON is well-formed but doesn't have the manifest shape.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// The export consumer went away before the archive was complete.
    #[error("Export cancelled: the consumer closed the stream")]
    Cancelled,
}

impl ExchangeError {
    /// Whether this error means the sink stopped accepting bytes.
    #[must_use]
    pub fn is_broken_pipe(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Io(e) | Self::Archive(zip::result::ZipError::Io(e)) => {
                e.kind() == std::io::ErrorKind::BrokenPipe
            }
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for ExchangeError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<crate::error::Error> for ExchangeError {
    fn from(err: crate::error::Error) -> Self {
        use crate::error::Error;
        match err {
            Error::Exchange(e) => e,
            Error::Io(e) => Self::Io(e),
            Error::Json(e) => Self::Json(e),
            Error::Blob(e) => Self::Blob(e),
            other => Self::Database(other.to_string()),
        }
    }
}

/// Result type for exchange operations.
pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;
