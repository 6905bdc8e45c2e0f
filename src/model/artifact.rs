//! Artifact and cover models.
//!
//! An artifact is one content block of a project (image, video, text...).
//! Its `data_blob` is schema-shaped JSON; media locators inside it point at
//! blob store keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field of `data_blob` holding the stored content hash of the primary media.
pub const STORED_HASH_FIELD: &str = "imageHash";

/// Default cover crop position (percent) and zoom.
pub const DEFAULT_COVER_POSITION: f64 = 50.0;
pub const DEFAULT_COVER_ZOOM: f64 = 1.0;

/// A content block belonging to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Unique identifier (`art_` prefix for locally minted ids)
    pub id: String,

    pub project_id: String,

    /// Discriminated type tag, e.g. `image-v1`
    pub schema: String,

    /// Schema-dependent payload
    pub data_blob: Value,

    pub is_published: bool,

    #[serde(default)]
    pub sort_order: i64,
}

impl Artifact {
    /// Create a new artifact with a fresh id.
    pub fn new(project_id: impl Into<String>, schema: impl Into<String>, data_blob: Value) -> Self {
        Self {
            id: super::new_id("art"),
            project_id: project_id.into(),
            schema: schema.into(),
            data_blob,
            is_published: true,
            sort_order: 0,
        }
    }

    /// The content hash persisted on this artifact, if any.
    #[must_use]
    pub fn stored_hash(&self) -> Option<&str> {
        self.data_blob
            .get(STORED_HASH_FIELD)
            .and_then(Value::as_str)
            .filter(|h| !h.is_empty())
    }

    /// Persist a content hash into the payload.
    ///
    /// Non-object payloads are left untouched.
    pub fn set_stored_hash(&mut self, hash: &str) {
        if let Value::Object(map) = &mut self.data_blob {
            map.insert(STORED_HASH_FIELD.to_string(), Value::String(hash.to_string()));
        }
    }
}

/// The single artifact representing a project visually, with crop metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverAssignment {
    pub project_id: String,
    pub artifact_id: String,
    pub position_x: f64,
    pub position_y: f64,
    pub zoom: f64,
}

impl CoverAssignment {
    /// Build a cover, filling unspecified crop values with defaults (50/50, zoom 1).
    #[must_use]
    pub fn with_defaults(
        project_id: &str,
        artifact_id: &str,
        position_x: Option<f64>,
        position_y: Option<f64>,
        zoom: Option<f64>,
    ) -> Self {
        Self {
            project_id: project_id.to_string(),
            artifact_id: artifact_id.to_string(),
            position_x: position_x.unwrap_or(DEFAULT_COVER_POSITION),
            position_y: position_y.unwrap_or(DEFAULT_COVER_POSITION),
            zoom: zoom.unwrap_or(DEFAULT_COVER_ZOOM),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stored_hash_roundtrip() {
        let mut artifact = Artifact::new("proj_1", "image-v1", json!({"imageUrl": "/artifacts/a.png"}));
        assert!(artifact.stored_hash().is_none());

        artifact.set_stored_hash("abc123");
        assert_eq!(artifact.stored_hash(), Some("abc123"));
        assert_eq!(artifact.data_blob["imageUrl"], "/artifacts/a.png");
    }

    #[test]
    fn test_empty_stored_hash_is_absent() {
        let artifact = Artifact::new("proj_1", "image-v1", json!({"imageHash": ""}));
        assert!(artifact.stored_hash().is_none());
    }

    #[test]
    fn test_set_stored_hash_ignores_non_object() {
        let mut artifact = Artifact::new("proj_1", "text-v1", json!("plain"));
        artifact.set_stored_hash("abc");
        assert_eq!(artifact.data_blob, json!("plain"));
    }

    #[test]
    fn test_cover_defaults() {
        let cover = CoverAssignment::with_defaults("proj_1", "art_1", None, Some(20.0), None);
        assert_eq!(cover.position_x, 50.0);
        assert_eq!(cover.position_y, 20.0);
        assert_eq!(cover.zoom, 1.0);
    }
}
