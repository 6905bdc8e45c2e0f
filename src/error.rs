//! Error types for Folio.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::blob::BlobError;
use crate::exchange::ExchangeError;

/// Result type alias for Folio operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    ProjectNotFound,
    ArchiveNotFound,

    // Validation (exit 4)
    InvalidArgument,
    InvalidResolution,

    // Exchange (exit 6)
    ManifestMissing,
    UnsupportedVersion,
    InvalidArchive,
    ExchangeError,
    BlobError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::ProjectNotFound => "PROJECT_NOT_FOUND",
            Self::ArchiveNotFound => "ARCHIVE_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidResolution => "INVALID_RESOLUTION",
            Self::ManifestMissing => "MANIFEST_MISSING",
            Self::UnsupportedVersion => "UNSUPPORTED_VERSION",
            Self::InvalidArchive => "INVALID_ARCHIVE",
            Self::ExchangeError => "EXCHANGE_ERROR",
            Self::BlobError => "BLOB_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::ProjectNotFound | Self::ArchiveNotFound => 3,
            Self::InvalidArgument | Self::InvalidResolution => 4,
            Self::ManifestMissing
            | Self::UnsupportedVersion
            | Self::InvalidArchive
            | Self::ExchangeError
            | Self::BlobError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether a caller should retry with corrected input.
    ///
    /// True for validation errors and transient database contention.
    /// False for structurally invalid archives, I/O, or internal errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument | Self::InvalidResolution | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in Folio operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `folio init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Project not found: {name}")]
    ProjectNotFound { name: String },

    #[error("Archive not found: {path}")]
    ArchiveNotFound { path: PathBuf },

    #[error("Invalid resolution '{input}'")]
    InvalidResolution {
        input: String,
        suggestion: Option<String>,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error("Blob store error: {0}")]
    Blob(#[from] BlobError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::ProjectNotFound { .. } => ErrorCode::ProjectNotFound,
            Self::ArchiveNotFound { .. } => ErrorCode::ArchiveNotFound,
            Self::InvalidResolution { .. } => ErrorCode::InvalidResolution,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Exchange(e) => match e {
                ExchangeError::MissingManifest => ErrorCode::ManifestMissing,
                ExchangeError::UnsupportedVersion { .. } => ErrorCode::UnsupportedVersion,
                ExchangeError::InvalidManifest(_) | ExchangeError::Archive(_) => {
                    ErrorCode::InvalidArchive
                }
                ExchangeError::Database(_) => ErrorCode::DatabaseError,
                ExchangeError::Io(_) => ErrorCode::IoError,
                ExchangeError::Json(_) => ErrorCode::JsonError,
                ExchangeError::Blob(_) => ErrorCode::BlobError,
                ExchangeError::Cancelled => ErrorCode::ExchangeError,
            },
            Self::Blob(_) => ErrorCode::BlobError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => Some("Run `folio init` to create the database".to_string()),

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::ArchiveNotFound { path } => Some(format!(
                "No archive at '{}'. Create one with `folio export -o <file>`.",
                path.display()
            )),

            Self::InvalidResolution { suggestion, .. } => Some(match suggestion {
                Some(s) => format!("Did you mean '{s}'? Valid resolutions: clobber, merge, skip"),
                None => "Valid resolutions: clobber, merge, skip. \
                         Synonyms: replace→clobber, upsert→merge, keep→skip"
                    .to_string(),
            }),

            Self::Exchange(ExchangeError::UnsupportedVersion { .. }) => Some(
                "This archive was produced by an incompatible version. \
                 Re-export it with a matching release."
                    .to_string(),
            ),

            Self::Exchange(ExchangeError::MissingManifest) => Some(
                "The file is not a Folio archive (no manifest.json entry).".to_string(),
            ),

            Self::InvalidArgument(msg) => {
                if msg.contains('=') {
                    Some("Overrides take the form NAME=RESOLUTION, e.g. --project chair=skip".to_string())
                } else {
                    None
                }
            }

            Self::ProjectNotFound { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Exchange(_)
            | Self::Blob(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
