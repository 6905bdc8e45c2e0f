//! Import command: reconcile an archive into the store.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;

use colored::Colorize;

use crate::cli::ImportArgs;
use crate::config::{default_actor, load_exchange_config};
use crate::error::{Error, Result};
use crate::exchange::{ConflictPolicy, ImportSummary, Importer};
use crate::validate::{normalize_resolution, parse_override};

use super::{open_blobs, open_storage, require_archive};

/// Execute the import command.
///
/// # Errors
///
/// Returns an error for bad flags, a missing or structurally invalid
/// archive, or an unopenable store. Entity-level problems are reported as
/// warnings in the summary instead.
pub fn execute(
    args: &ImportArgs,
    db_path: Option<&PathBuf>,
    blob_dir: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let policy = build_policy(args)?;
    require_archive(&args.file)?;

    let mut storage = open_storage(db_path)?;
    let blobs = open_blobs(blob_dir)?;
    let config = load_exchange_config()?;
    let actor = actor.map_or_else(default_actor, str::to_string);

    let source = BufReader::new(File::open(&args.file)?);
    let summary = Importer::new(&mut storage, &blobs, &config, &actor).import(source, &policy)?;

    if json {
        let output = serde_json::json!({
            "success": true,
            "path": args.file.display().to_string(),
            "summary": summary,
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

/// Assemble the policy: `--policy` file first, then `--default`, then overrides.
fn build_policy(args: &ImportArgs) -> Result<ConflictPolicy> {
    let mut policy = match &args.policy {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            serde_json::from_str(&content).map_err(|e| {
                Error::InvalidArgument(format!("invalid policy file {}: {e}", path.display()))
            })?
        }
        None => ConflictPolicy::default(),
    };

    if let Some(default) = &args.default_resolution {
        policy.default_resolution = normalize_resolution(default)?;
    }
    for raw in &args.projects {
        let (name, resolution) = parse_override(raw)?;
        policy.per_project.insert(name, resolution);
    }
    for raw in &args.categories {
        let (name, resolution) = parse_override(raw)?;
        policy.per_category.insert(name, resolution);
    }

    Ok(policy)
}

fn print_summary(summary: &ImportSummary) {
    println!("{}", "Import complete".green().bold());
    println!();
    println!(
        "  Categories: {} created, {} updated, {} skipped",
        summary.categories_created, summary.categories_updated, summary.categories_skipped
    );
    println!(
        "  Projects:   {} created, {} merged, {} clobbered, {} skipped",
        summary.projects_created,
        summary.projects_merged,
        summary.projects_clobbered,
        summary.projects_skipped
    );
    println!(
        "  Artifacts:  {} created, {} already present",
        summary.artifacts_created, summary.artifacts_skipped
    );
    println!("  Media:      {} uploaded", summary.images_uploaded);
    if summary.settings_replaced > 0 {
        println!("  Settings:   {} replaced", summary.settings_replaced);
    }

    if !summary.warnings.is_empty() {
        println!();
        println!("{}", format!("Warnings ({})", summary.warnings.len()).yellow().bold());
        for warning in &summary.warnings {
            println!("  {} {warning}", "!".yellow());
        }
    }
}
