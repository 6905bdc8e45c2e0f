//! Preview command: show which archive entities already exist locally.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::error::Result;
use crate::exchange::{preview, ImportPreview};

use super::{open_storage, require_archive};

/// Execute the preview command.
///
/// # Errors
///
/// Returns an error if the archive is missing or structurally invalid.
pub fn execute(file: &Path, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    require_archive(file)?;
    let storage = open_storage(db_path)?;

    let report = preview(&storage, BufReader::new(File::open(file)?))?;

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        print_preview(&report);
    }
    Ok(())
}

fn marker(exists: bool) -> colored::ColoredString {
    if exists {
        "exists".yellow()
    } else {
        "new".green()
    }
}

fn print_preview(report: &ImportPreview) {
    println!(
        "Archive v{} exported {}{}",
        report.version,
        report.exported_at,
        if report.hashed_manifest {
            ""
        } else {
            " (no hashes: export was interrupted)"
        }
    );
    println!("  Media entries: {}", report.media_entries);

    if !report.categories.is_empty() {
        println!();
        println!("{}", "Categories".cyan().bold());
        for category in &report.categories {
            println!(
                "  [{}] {} ({})",
                marker(category.exists),
                category.name.bold(),
                category.display_name
            );
        }
    }

    if !report.projects.is_empty() {
        println!();
        println!("{}", "Projects".cyan().bold());
        for project in &report.projects {
            let mut line = format!(
                "  [{}] {} ({}) {} artifact(s)",
                marker(project.exists),
                project.name.bold(),
                project.display_name,
                project.artifacts
            );
            if project.media_artifacts < project.artifacts {
                line.push_str(&format!(
                    ", {} with missing media",
                    project.artifacts - project.media_artifacts
                ));
            }
            if project.duplicate {
                line.push_str(&format!(" {}", "(repeated, ignored)".dimmed()));
            }
            println!("{line}");
        }
    }

    if !report.settings.is_empty() {
        println!();
        println!("{}", "Site settings".cyan().bold());
        for key in &report.settings {
            println!("  {key}");
        }
    }
}
