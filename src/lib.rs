//! Folio - portfolio content export/import with conflict reconciliation.
//!
//! This crate provides the engine behind the `folio` CLI.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (Category, Project, Artifact, `SiteSetting`)
//! - [`storage`] - SQLite content store
//! - [`blob`] - Media object stores (filesystem, in-memory)
//! - [`exchange`] - Archive export, import, preview and orphan sweep
//! - [`config`] - Path resolution and exchange settings
//! - [`validate`] - Conflict resolution parsing
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod blob;
pub mod cli;
pub mod config;
pub mod error;
pub mod exchange;
pub mod model;
pub mod storage;
pub mod validate;

pub use error::{Error, Result};
