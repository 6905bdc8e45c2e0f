//! Configuration management.
//!
//! This module resolves where Folio keeps its database and blobs, who the
//! acting user is for the audit trail, and the exchange settings loaded from
//! `~/.folio/config.json`.
//!
//! # Layout
//!
//! - **Database**: `~/.folio/data/folio.db`
//! - **Blobs**: `~/.folio/blobs/<prefix>/<uuid>.<ext>`
//! - **Config**: `~/.folio/config.json`

mod exchange;

pub use exchange::{load_exchange_config, ExchangeConfig, FolioConfig};

use std::path::{Path, PathBuf};

/// Get the global Folio directory location (`~/.folio/`).
#[must_use]
pub fn global_folio_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".folio"))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `FOLIO_TEST_DB=1` (or any non-empty value).
/// This redirects all database operations to an isolated test database.
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("FOLIO_TEST_DB")
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && value.to_lowercase() != "false"
}

/// Get the test database path (`~/.folio/test/folio.db`).
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    global_folio_dir().map(|dir| dir.join("test").join("folio.db"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `FOLIO_TEST_DB` environment variable → uses test database
/// 3. `FOLIO_DB` environment variable
/// 4. Global location: `~/.folio/data/folio.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_db_path();
    }

    if let Ok(db_path) = std::env::var("FOLIO_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    global_folio_dir().map(|dir| dir.join("data").join("folio.db"))
}

/// Resolve the blob store root directory.
///
/// Priority: explicit path, then `FOLIO_BLOB_DIR`, then `~/.folio/blobs`.
#[must_use]
pub fn resolve_blob_dir(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Ok(dir) = std::env::var("FOLIO_BLOB_DIR") {
        if !dir.trim().is_empty() {
            return Some(PathBuf::from(dir));
        }
    }

    global_folio_dir().map(|dir| dir.join("blobs"))
}

/// Get the default actor name.
///
/// Priority:
/// 1. `FOLIO_ACTOR` environment variable
/// 2. Git user name
/// 3. System username
/// 4. "unknown"
#[must_use]
pub fn default_actor() -> String {
    if let Ok(actor) = std::env::var("FOLIO_ACTOR") {
        if !actor.is_empty() {
            return actor;
        }
    }

    if let Ok(output) = std::process::Command::new("git")
        .args(["config", "user.name"])
        .output()
    {
        if output.status.success() {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !name.is_empty() {
                return name;
            }
        }
    }

    if let Ok(user) = std::env::var("USER") {
        return user;
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_actor() {
        let actor = default_actor();
        assert!(!actor.is_empty());
    }

    #[test]
    fn test_resolve_db_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/folio.db");
        let result = resolve_db_path(Some(&explicit));
        assert_eq!(result, Some(explicit));
    }

    #[test]
    fn test_resolve_blob_dir_with_explicit() {
        let explicit = PathBuf::from("/srv/blobs");
        assert_eq!(resolve_blob_dir(Some(&explicit)), Some(explicit));
    }

    #[test]
    fn test_test_db_path_is_separate() {
        let global = global_folio_dir().unwrap();
        let test = test_db_path().unwrap();

        assert!(test.to_string_lossy().contains("test"));
        assert!(test.ends_with("folio.db"));
        assert_ne!(global.join("data").join("folio.db"), test);
    }

    #[test]
    fn test_truthy_parsing() {
        assert!(!is_truthy(""));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("FALSE"));
        assert!(is_truthy("1"));
        assert!(is_truthy("yes"));
    }
}
