//! Export command: stream an archive to a file.
//!
//! The archive is written next to the target as `<name>.partial` and renamed
//! into place only once the export has succeeded, so a failed or interrupted
//! export never leaves a truncated archive behind.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::ExportArgs;
use crate::config::load_exchange_config;
use crate::error::Result;
use crate::exchange::{spawn_export, ExchangeError, ExportSelection, ExportStats};

use super::{open_blobs, open_storage};

/// Execute the export command.
///
/// # Errors
///
/// Returns an error if the store can't be opened or the export fails.
pub fn execute(
    args: &ExportArgs,
    db_path: Option<&PathBuf>,
    blob_dir: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let storage = open_storage(db_path)?;
    let blobs = open_blobs(blob_dir)?;
    let config = load_exchange_config()?;

    let selection = ExportSelection {
        categories: args.categories.clone(),
        projects: args.projects.clone(),
        include_site_settings: !args.no_settings,
    };

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let temp_path = partial_path(&args.output);

    let stream = spawn_export(storage, blobs, &config, selection)?;
    let stats = match write_stream(stream, &temp_path) {
        Ok(stats) => stats,
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                debug!(path = %temp_path.display(), error = %cleanup, "Could not remove partial archive");
            }
            return Err(e);
        }
    };
    fs::rename(&temp_path, &args.output)?;

    if json {
        let output = serde_json::json!({
            "success": true,
            "path": args.output.display().to_string(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Exported to {}", args.output.display());
        println!();
        println!("  Categories: {}", stats.categories);
        println!("  Projects:   {}", stats.projects);
        println!("  Artifacts:  {}", stats.artifacts);
        println!("  Settings:   {}", stats.settings);
        println!("  Media:      {}", stats.media_written);
        if stats.media_failed > 0 {
            println!(
                "  Skipped {} media file(s) that could not be read (see log)",
                stats.media_failed
            );
        }
    }

    Ok(())
}

fn write_stream(mut stream: crate::exchange::ExportStream, temp_path: &Path) -> Result<ExportStats> {
    let file = File::create(temp_path)?;
    let mut writer = BufWriter::new(file);
    if let Err(e) = io::copy(&mut stream, &mut writer) {
        // A worker failure surfaces here as a truncated read; report its cause.
        return Err(match stream.finish() {
            Err(cause) if !matches!(cause, ExchangeError::Cancelled) => cause.into(),
            _ => e.into(),
        });
    }
    let stats = stream.finish()?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(stats)
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    output.with_file_name(name)
}
