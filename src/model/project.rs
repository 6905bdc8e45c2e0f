//! Project model for Folio.
//!
//! A project owns its attributes, artifacts, cover assignment and category
//! links. Deleting a project removes all of them.

use serde::{Deserialize, Serialize};

/// A project in the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier (`proj_` prefix)
    pub id: String,

    /// Unique slug, the natural key used during import
    pub name: String,

    /// Display name for the project
    pub display_name: String,

    /// Optional description
    pub description: Option<String>,

    pub is_published: bool,

    /// Position in listings (ascending)
    #[serde(default)]
    pub sort_order: i64,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Project {
    /// Create a new project with default values.
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: super::new_id("proj"),
            name: name.into(),
            display_name: display_name.into(),
            description: None,
            is_published: false,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A named key/value attribute attached to a project.
///
/// At most one attribute exists per `(project_id, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAttribute {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub value: String,
    /// Whether the attribute is surfaced in site navigation
    pub show_in_nav: bool,
    pub is_published: bool,
}

impl ProjectAttribute {
    /// Create a new attribute for a project.
    pub fn new(
        project_id: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: super::new_id("attr"),
            project_id: project_id.into(),
            name: name.into(),
            value: value.into(),
            show_in_nav: false,
            is_published: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project() {
        let project = Project::new("chair", "Chair");

        assert!(project.id.starts_with("proj_"));
        assert_eq!(project.name, "chair");
        assert_eq!(project.display_name, "Chair");
        assert!(project.description.is_none());
        assert!(!project.is_published);
        assert_eq!(project.sort_order, 0);
    }

    #[test]
    fn test_new_attribute_defaults() {
        let attr = ProjectAttribute::new("proj_1", "year", "2021");

        assert!(attr.id.starts_with("attr_"));
        assert_eq!(attr.project_id, "proj_1");
        assert!(!attr.show_in_nav);
        assert!(attr.is_published);
    }
}
