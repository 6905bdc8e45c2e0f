//! Data models for Folio.
//!
//! This module contains the content-store domain models:
//! - Category
//! - Project and ProjectAttribute
//! - Artifact and CoverAssignment
//! - SiteSetting

pub mod artifact;
pub mod category;
pub mod project;
pub mod setting;

pub use artifact::{Artifact, CoverAssignment};
pub use category::Category;
pub use project::{Project, ProjectAttribute};
pub use setting::SiteSetting;

/// Mint a prefixed surrogate id (e.g. `proj_1a2b3c4d5e6f`).
pub(crate) fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}
