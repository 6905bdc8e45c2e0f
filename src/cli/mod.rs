//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Folio - portfolio content export/import with conflict reconciliation
#[derive(Parser, Debug)]
#[command(name = "folio", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.folio/data/folio.db)
    #[arg(long, global = true, env = "FOLIO_DB")]
    pub db: Option<PathBuf>,

    /// Blob store root (default: ~/.folio/blobs)
    #[arg(long, global = true, env = "FOLIO_BLOB_DIR")]
    pub blobs: Option<PathBuf>,

    /// Actor name for audit trail
    #[arg(long, global = true, env = "FOLIO_ACTOR")]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and blob store
    Init {
        /// Overwrite existing database
        #[arg(long)]
        force: bool,
    },

    /// Write an archive of the store
    Export(ExportArgs),

    /// Reconcile an archive into the store
    Import(ImportArgs),

    /// Show which archive entities already exist locally
    Preview {
        /// Archive to inspect
        file: PathBuf,
    },

    /// Delete blobs nothing references
    Gc {
        /// Count orphans without deleting them
        #[arg(long)]
        dry_run: bool,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Exchange Commands
// ============================================================================

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Archive file to write
    #[arg(short, long)]
    pub output: PathBuf,

    /// Only export these categories (repeatable)
    #[arg(long = "category", value_name = "NAME")]
    pub categories: Vec<String>,

    /// Only export these projects (repeatable)
    #[arg(long = "project", value_name = "NAME")]
    pub projects: Vec<String>,

    /// Leave site settings out of the archive
    #[arg(long)]
    pub no_settings: bool,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Archive file to read
    pub file: PathBuf,

    /// Resolution for existing entities without an override (clobber, merge, skip)
    #[arg(long = "default", value_name = "RESOLUTION")]
    pub default_resolution: Option<String>,

    /// Per-project override (repeatable)
    #[arg(long = "project", value_name = "NAME=RESOLUTION")]
    pub projects: Vec<String>,

    /// Per-category override (repeatable)
    #[arg(long = "category", value_name = "NAME=RESOLUTION")]
    pub categories: Vec<String>,

    /// JSON file with a full conflict policy; flags are applied on top
    #[arg(long, value_name = "JSON_FILE")]
    pub policy: Option<PathBuf>,
}
