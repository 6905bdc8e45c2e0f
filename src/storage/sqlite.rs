//! SQLite storage implementation.
//!
//! This module provides the content store backend for Folio using SQLite.
//! It follows the MutationContext pattern for transaction discipline and audit logging.

use crate::error::{Error, Result};
use crate::model::{Artifact, Category, CoverAssignment, Project, ProjectAttribute, SiteSetting};
use crate::storage::events::{insert_event, Event, EventType};
use crate::storage::schema::apply_schema;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation, tracking side effects.
///
/// Passed to mutation closures to record audit events, which are written
/// in the same transaction just before commit.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Actor performing the operation (user name, `import`, ...).
    pub actor: String,
    /// Events to write at the end of the transaction.
    pub events: Vec<Event>,
}

impl MutationContext {
    /// Create a new mutation context.
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
        }
    }

    /// Record an event for this operation.
    pub fn record_event(&mut self, entity_type: &str, entity_id: &str, event_type: EventType) {
        self.events
            .push(Event::new(entity_type, entity_id, event_type, &self.actor));
    }

    /// Record an event with old/new values for field tracking.
    pub fn record_change(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        event_type: EventType,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events.push(
            Event::new(entity_type, entity_id, event_type, &self.actor)
                .with_values(old_value, new_value),
        );
    }
}

fn json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Value> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn map_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        is_published: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn map_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        description: row.get(3)?,
        is_published: row.get(4)?,
        sort_order: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn map_attribute(row: &Row<'_>) -> rusqlite::Result<ProjectAttribute> {
    Ok(ProjectAttribute {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        value: row.get(3)?,
        show_in_nav: row.get(4)?,
        is_published: row.get(5)?,
    })
}

fn map_artifact(row: &Row<'_>) -> rusqlite::Result<Artifact> {
    Ok(Artifact {
        id: row.get(0)?,
        project_id: row.get(1)?,
        schema: row.get(2)?,
        data_blob: json_column(row, 3)?,
        is_published: row.get(4)?,
        sort_order: row.get(5)?,
    })
}

const CATEGORY_COLUMNS: &str = "id, name, display_name, is_published, created_at, updated_at";
const PROJECT_COLUMNS: &str =
    "id, name, display_name, description, is_published, sort_order, created_at, updated_at";
const ATTRIBUTE_COLUMNS: &str = "id, project_id, name, value, show_in_nav, is_published";
const ARTIFACT_COLUMNS: &str = "id, project_id, schema, data_blob, is_published, sort_order";

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;

        if let Some(timeout) = timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        } else {
            // Default 5 second timeout
            conn.busy_timeout(Duration::from_secs(5))?;
        }

        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Writes audit events
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, actor);

        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            insert_event(&tx, event)?;
        }

        tx.commit()?;

        Ok(result)
    }

    // ===================
    // Category Operations
    // ===================

    /// List all categories ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name"
        ))?;
        let rows = stmt.query_map([], map_category)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Look up a category by its natural key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let category = self
            .conn
            .query_row(
                &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = ?1"),
                [name],
                map_category,
            )
            .optional()?;
        Ok(category)
    }

    /// Insert a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (e.g. duplicate name).
    pub fn create_category(&mut self, category: &Category, actor: &str) -> Result<()> {
        self.mutate("create_category", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO categories (id, name, display_name, is_published, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    category.id,
                    category.name,
                    category.display_name,
                    category.is_published,
                    category.created_at,
                    category.updated_at,
                ],
            )?;
            ctx.record_event("category", &category.id, EventType::CategoryCreated);
            Ok(())
        })
    }

    /// Update a category's display fields in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the category doesn't exist or the update fails.
    pub fn update_category(
        &mut self,
        id: &str,
        display_name: &str,
        is_published: bool,
        actor: &str,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.mutate("update_category", actor, |tx, ctx| {
            let rows = tx.execute(
                "UPDATE categories SET display_name = ?1, is_published = ?2, updated_at = ?3 WHERE id = ?4",
                rusqlite::params![display_name, is_published, now, id],
            )?;
            if rows == 0 {
                return Err(Error::Other(format!("Category not found: {id}")));
            }
            ctx.record_event("category", id, EventType::CategoryUpdated);
            Ok(())
        })
    }

    // ==================
    // Project Operations
    // ==================

    /// List all projects in display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY sort_order, name"
        ))?;
        let rows = stmt.query_map([], map_project)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Look up a project by its unique slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        let project = self
            .conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE name = ?1"),
                [name],
                map_project,
            )
            .optional()?;
        Ok(project)
    }

    /// Insert a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (e.g. duplicate name).
    pub fn create_project(&mut self, project: &Project, actor: &str) -> Result<()> {
        self.mutate("create_project", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO projects (id, name, display_name, description, is_published, sort_order, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    project.id,
                    project.name,
                    project.display_name,
                    project.description,
                    project.is_published,
                    project.sort_order,
                    project.created_at,
                    project.updated_at,
                ],
            )?;
            ctx.record_event("project", &project.id, EventType::ProjectCreated);
            Ok(())
        })
    }

    /// Overwrite a project's scalar fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the project doesn't exist or the update fails.
    pub fn update_project_fields(
        &mut self,
        id: &str,
        display_name: &str,
        description: Option<&str>,
        is_published: bool,
        actor: &str,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.mutate("update_project", actor, |tx, ctx| {
            let rows = tx.execute(
                "UPDATE projects SET display_name = ?1, description = ?2, is_published = ?3, updated_at = ?4
                 WHERE id = ?5",
                rusqlite::params![display_name, description, is_published, now, id],
            )?;
            if rows == 0 {
                return Err(Error::ProjectNotFound { name: id.to_string() });
            }
            ctx.record_event("project", id, EventType::ProjectUpdated);
            Ok(())
        })
    }

    /// Delete a project together with its links, attributes, artifacts and cover.
    ///
    /// Child rows are removed explicitly in the same transaction, so the
    /// outcome doesn't depend on foreign key enforcement being on.
    ///
    /// # Errors
    ///
    /// Returns an error if the project doesn't exist or a delete fails.
    pub fn delete_project(&mut self, id: &str, actor: &str) -> Result<()> {
        self.mutate("delete_project", actor, |tx, ctx| {
            tx.execute("DELETE FROM cover_assignments WHERE project_id = ?1", [id])?;
            tx.execute("DELETE FROM project_categories WHERE project_id = ?1", [id])?;
            tx.execute("DELETE FROM project_attributes WHERE project_id = ?1", [id])?;
            tx.execute("DELETE FROM artifacts WHERE project_id = ?1", [id])?;
            let rows = tx.execute("DELETE FROM projects WHERE id = ?1", [id])?;
            if rows == 0 {
                return Err(Error::ProjectNotFound { name: id.to_string() });
            }
            ctx.record_event("project", id, EventType::ProjectDeleted);
            Ok(())
        })
    }

    // =======================
    // Category Link Operations
    // =======================

    /// Link a project to a category.
    ///
    /// Returns `false` if the link already existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (e.g. unknown ids).
    pub fn link_project_category(
        &mut self,
        project_id: &str,
        category_id: &str,
        actor: &str,
    ) -> Result<bool> {
        self.mutate("link_project_category", actor, |tx, ctx| {
            let rows = tx.execute(
                "INSERT OR IGNORE INTO project_categories (project_id, category_id) VALUES (?1, ?2)",
                rusqlite::params![project_id, category_id],
            )?;
            if rows > 0 {
                ctx.record_change(
                    "project",
                    project_id,
                    EventType::ProjectLinked,
                    None,
                    Some(category_id.to_string()),
                );
            }
            Ok(rows > 0)
        })
    }

    /// Names of the categories a project is linked to, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_project_category_names(&self, project_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.name FROM project_categories pc
             JOIN categories c ON c.id = pc.category_id
             WHERE pc.project_id = ?1
             ORDER BY c.name",
        )?;
        let rows = stmt.query_map([project_id], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    // ===================
    // Attribute Operations
    // ===================

    /// Attributes of a project ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_attributes(&self, project_id: &str) -> Result<Vec<ProjectAttribute>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ATTRIBUTE_COLUMNS} FROM project_attributes WHERE project_id = ?1 ORDER BY name"
        ))?;
        let rows = stmt.query_map([project_id], map_attribute)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Bulk-insert attributes in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; nothing is written in that case.
    pub fn insert_attributes(&mut self, attributes: &[ProjectAttribute], actor: &str) -> Result<()> {
        if attributes.is_empty() {
            return Ok(());
        }
        self.mutate("insert_attributes", actor, |tx, ctx| {
            let mut stmt = tx.prepare(
                "INSERT INTO project_attributes (id, project_id, name, value, show_in_nav, is_published)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for attr in attributes {
                stmt.execute(rusqlite::params![
                    attr.id,
                    attr.project_id,
                    attr.name,
                    attr.value,
                    attr.show_in_nav,
                    attr.is_published,
                ])?;
                ctx.record_event("attribute", &attr.id, EventType::AttributeCreated);
            }
            Ok(())
        })
    }

    /// Overwrite an attribute's value and flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn update_attribute(
        &mut self,
        id: &str,
        value: &str,
        show_in_nav: bool,
        is_published: bool,
        actor: &str,
    ) -> Result<()> {
        self.mutate("update_attribute", actor, |tx, ctx| {
            let old: Option<String> = tx
                .query_row("SELECT value FROM project_attributes WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            tx.execute(
                "UPDATE project_attributes SET value = ?1, show_in_nav = ?2, is_published = ?3 WHERE id = ?4",
                rusqlite::params![value, show_in_nav, is_published, id],
            )?;
            ctx.record_change(
                "attribute",
                id,
                EventType::AttributeUpdated,
                old,
                Some(value.to_string()),
            );
            Ok(())
        })
    }

    // ==================
    // Artifact Operations
    // ==================

    /// Artifacts of a project in display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a payload isn't valid JSON.
    pub fn get_artifacts(&self, project_id: &str) -> Result<Vec<Artifact>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ARTIFACT_COLUMNS} FROM artifacts WHERE project_id = ?1 ORDER BY sort_order, rowid"
        ))?;
        let rows = stmt.query_map([project_id], map_artifact)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Every artifact in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a payload isn't valid JSON.
    pub fn list_all_artifacts(&self) -> Result<Vec<Artifact>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ARTIFACT_COLUMNS} FROM artifacts ORDER BY rowid"))?;
        let rows = stmt.query_map([], map_artifact)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Get an artifact by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_artifact(&self, id: &str) -> Result<Option<Artifact>> {
        let artifact = self
            .conn
            .query_row(
                &format!("SELECT {ARTIFACT_COLUMNS} FROM artifacts WHERE id = ?1"),
                [id],
                map_artifact,
            )
            .optional()?;
        Ok(artifact)
    }

    /// Whether any artifact in the store carries this id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn artifact_exists(&self, id: &str) -> Result<bool> {
        Ok(self
            .conn
            .prepare("SELECT 1 FROM artifacts WHERE id = ?1")?
            .exists([id])?)
    }

    /// Insert an artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the insert fails.
    pub fn insert_artifact(&mut self, artifact: &Artifact, actor: &str) -> Result<()> {
        let data = serde_json::to_string(&artifact.data_blob)?;
        self.mutate("insert_artifact", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO artifacts (id, project_id, schema, data_blob, is_published, sort_order)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    artifact.id,
                    artifact.project_id,
                    artifact.schema,
                    data,
                    artifact.is_published,
                    artifact.sort_order,
                ],
            )?;
            ctx.record_event("artifact", &artifact.id, EventType::ArtifactCreated);
            Ok(())
        })
    }

    /// Replace an artifact's payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact doesn't exist or the update fails.
    pub fn update_artifact_data(&mut self, id: &str, data_blob: &Value, actor: &str) -> Result<()> {
        let data = serde_json::to_string(data_blob)?;
        self.mutate("update_artifact_data", actor, |tx, ctx| {
            let rows = tx.execute(
                "UPDATE artifacts SET data_blob = ?1 WHERE id = ?2",
                rusqlite::params![data, id],
            )?;
            if rows == 0 {
                return Err(Error::Other(format!("Artifact not found: {id}")));
            }
            ctx.record_event("artifact", id, EventType::ArtifactUpdated);
            Ok(())
        })
    }

    // ===============
    // Cover Operations
    // ===============

    /// The cover assignment of a project, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_cover(&self, project_id: &str) -> Result<Option<CoverAssignment>> {
        let cover = self
            .conn
            .query_row(
                "SELECT project_id, artifact_id, position_x, position_y, zoom
                 FROM cover_assignments WHERE project_id = ?1",
                [project_id],
                |row| {
                    Ok(CoverAssignment {
                        project_id: row.get(0)?,
                        artifact_id: row.get(1)?,
                        position_x: row.get(2)?,
                        position_y: row.get(3)?,
                        zoom: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(cover)
    }

    /// Replace a project's cover (delete then insert).
    ///
    /// The artifact must belong to the same project.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the artifact belongs elsewhere, or a
    /// database error if the write fails.
    pub fn set_cover(&mut self, cover: &CoverAssignment, actor: &str) -> Result<()> {
        self.mutate("set_cover", actor, |tx, ctx| {
            let owner: Option<String> = tx
                .query_row(
                    "SELECT project_id FROM artifacts WHERE id = ?1",
                    [&cover.artifact_id],
                    |row| row.get(0),
                )
                .optional()?;
            if owner.as_deref() != Some(cover.project_id.as_str()) {
                return Err(Error::InvalidArgument(format!(
                    "Artifact {} does not belong to project {}",
                    cover.artifact_id, cover.project_id
                )));
            }

            tx.execute(
                "DELETE FROM cover_assignments WHERE project_id = ?1",
                [&cover.project_id],
            )?;
            tx.execute(
                "INSERT INTO cover_assignments (project_id, artifact_id, position_x, position_y, zoom)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    cover.project_id,
                    cover.artifact_id,
                    cover.position_x,
                    cover.position_y,
                    cover.zoom,
                ],
            )?;
            ctx.record_change(
                "project",
                &cover.project_id,
                EventType::CoverSet,
                None,
                Some(cover.artifact_id.clone()),
            );
            Ok(())
        })
    }

    // =================
    // Setting Operations
    // =================

    /// All site settings ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a value isn't valid JSON.
    pub fn list_settings(&self) -> Result<Vec<SiteSetting>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM site_settings ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok(SiteSetting {
                key: row.get(0)?,
                value: json_column(row, 1)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Get a setting by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the value isn't valid JSON.
    pub fn get_setting(&self, key: &str) -> Result<Option<SiteSetting>> {
        let setting = self
            .conn
            .query_row(
                "SELECT key, value FROM site_settings WHERE key = ?1",
                [key],
                |row| {
                    Ok(SiteSetting {
                        key: row.get(0)?,
                        value: json_column(row, 1)?,
                    })
                },
            )
            .optional()?;
        Ok(setting)
    }

    /// Fully replace a setting (delete by key, then insert).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn replace_setting(&mut self, setting: &SiteSetting, actor: &str) -> Result<()> {
        let value = serde_json::to_string(&setting.value)?;
        let now = chrono::Utc::now().timestamp_millis();
        self.mutate("replace_setting", actor, |tx, ctx| {
            tx.execute("DELETE FROM site_settings WHERE key = ?1", [&setting.key])?;
            tx.execute(
                "INSERT INTO site_settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![setting.key, value, now],
            )?;
            ctx.record_event("setting", &setting.key, EventType::SettingReplaced);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::events::get_events;
    use serde_json::json;

    fn seeded() -> (SqliteStorage, Project) {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let project = Project::new("chair", "Chair");
        storage.create_project(&project, "tester").unwrap();
        (storage, project)
    }

    #[test]
    fn test_category_create_and_update() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let category = Category::new("wood", "Wood", false);
        storage.create_category(&category, "tester").unwrap();

        storage
            .update_category(&category.id, "Woodwork", true, "tester")
            .unwrap();

        let found = storage.get_category_by_name("wood").unwrap().unwrap();
        assert_eq!(found.id, category.id);
        assert_eq!(found.display_name, "Woodwork");
        assert!(found.is_published);
        assert!(storage.get_category_by_name("metal").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_project_name_rejected() {
        let (mut storage, _) = seeded();
        let dup = Project::new("chair", "Another chair");
        assert!(storage.create_project(&dup, "tester").is_err());
    }

    #[test]
    fn test_link_is_idempotent() {
        let (mut storage, project) = seeded();
        let category = Category::new("wood", "Wood", true);
        storage.create_category(&category, "tester").unwrap();

        assert!(storage.link_project_category(&project.id, &category.id, "tester").unwrap());
        assert!(!storage.link_project_category(&project.id, &category.id, "tester").unwrap());
        assert_eq!(storage.get_project_category_names(&project.id).unwrap(), vec!["wood"]);
    }

    #[test]
    fn test_artifact_payload_roundtrip() {
        let (mut storage, project) = seeded();
        let artifact = Artifact::new(
            &project.id,
            "image-v1",
            json!({"imageUrl": "/artifacts/a.png", "caption": {"en": "Oak"}}),
        );
        storage.insert_artifact(&artifact, "tester").unwrap();

        let loaded = storage.get_artifact(&artifact.id).unwrap().unwrap();
        assert_eq!(loaded, artifact);
        assert!(storage.artifact_exists(&artifact.id).unwrap());

        storage
            .update_artifact_data(&artifact.id, &json!({"imageUrl": "/artifacts/b.png"}), "tester")
            .unwrap();
        let loaded = storage.get_artifact(&artifact.id).unwrap().unwrap();
        assert_eq!(loaded.data_blob["imageUrl"], "/artifacts/b.png");
    }

    #[test]
    fn test_cover_must_belong_to_project() {
        let (mut storage, project) = seeded();
        let other = Project::new("table", "Table");
        storage.create_project(&other, "tester").unwrap();
        let foreign = Artifact::new(&other.id, "image-v1", json!({}));
        storage.insert_artifact(&foreign, "tester").unwrap();

        let cover = CoverAssignment::with_defaults(&project.id, &foreign.id, None, None, None);
        assert!(matches!(
            storage.set_cover(&cover, "tester"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(storage.get_cover(&project.id).unwrap().is_none());
    }

    #[test]
    fn test_set_cover_replaces_previous() {
        let (mut storage, project) = seeded();
        let first = Artifact::new(&project.id, "image-v1", json!({}));
        let second = Artifact::new(&project.id, "image-v1", json!({}));
        storage.insert_artifact(&first, "tester").unwrap();
        storage.insert_artifact(&second, "tester").unwrap();

        storage
            .set_cover(&CoverAssignment::with_defaults(&project.id, &first.id, None, None, None), "tester")
            .unwrap();
        storage
            .set_cover(
                &CoverAssignment::with_defaults(&project.id, &second.id, Some(10.0), None, Some(2.0)),
                "tester",
            )
            .unwrap();

        let cover = storage.get_cover(&project.id).unwrap().unwrap();
        assert_eq!(cover.artifact_id, second.id);
        assert_eq!(cover.position_x, 10.0);
        assert_eq!(cover.zoom, 2.0);

        let count: i64 = storage
            .conn()
            .query_row("SELECT COUNT(*) FROM cover_assignments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_delete_project_removes_children() {
        let (mut storage, project) = seeded();
        let category = Category::new("wood", "Wood", true);
        storage.create_category(&category, "tester").unwrap();
        storage.link_project_category(&project.id, &category.id, "tester").unwrap();
        storage
            .insert_attributes(&[ProjectAttribute::new(&project.id, "year", "1999")], "tester")
            .unwrap();
        let artifact = Artifact::new(&project.id, "image-v1", json!({}));
        storage.insert_artifact(&artifact, "tester").unwrap();
        storage
            .set_cover(&CoverAssignment::with_defaults(&project.id, &artifact.id, None, None, None), "tester")
            .unwrap();

        storage.delete_project(&project.id, "tester").unwrap();

        assert!(storage.get_project_by_name("chair").unwrap().is_none());
        assert!(storage.get_attributes(&project.id).unwrap().is_empty());
        assert!(storage.get_artifacts(&project.id).unwrap().is_empty());
        assert!(storage.get_cover(&project.id).unwrap().is_none());
        assert!(storage.get_project_category_names(&project.id).unwrap().is_empty());
        // The category itself survives.
        assert!(storage.get_category_by_name("wood").unwrap().is_some());
    }

    #[test]
    fn test_attribute_update_records_change() {
        let (mut storage, project) = seeded();
        let attr = ProjectAttribute::new(&project.id, "material", "oak");
        storage.insert_attributes(std::slice::from_ref(&attr), "tester").unwrap();

        storage.update_attribute(&attr.id, "ash", true, false, "importer").unwrap();

        let attrs = storage.get_attributes(&project.id).unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].value, "ash");
        assert!(attrs[0].show_in_nav);
        assert!(!attrs[0].is_published);

        let events = get_events(storage.conn(), "attribute", &attr.id, None).unwrap();
        let update = events
            .iter()
            .find(|e| e.event_type == EventType::AttributeUpdated)
            .unwrap();
        assert_eq!(update.old_value.as_deref(), Some("oak"));
        assert_eq!(update.actor, "importer");
    }

    #[test]
    fn test_replace_setting() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let first = SiteSetting {
            key: "namecard".into(),
            value: json!({"imageUrl": "/artifacts/a.png", "zoom": 1}),
        };
        storage.replace_setting(&first, "tester").unwrap();
        let second = SiteSetting {
            key: "namecard".into(),
            value: json!({"imageUrl": "/artifacts/b.png"}),
        };
        storage.replace_setting(&second, "tester").unwrap();

        let settings = storage.list_settings().unwrap();
        assert_eq!(settings, vec![second]);
        assert!(storage.get_setting("missing").unwrap().is_none());
    }
}
