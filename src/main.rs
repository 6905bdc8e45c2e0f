//! Folio CLI entry point.

use clap::Parser;
use folio::cli::commands;
use folio::cli::{Cli, Commands};
use folio::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    // Run the command and handle errors
    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let db = cli.db.as_ref();
    let blobs = cli.blobs.as_ref();

    match &cli.command {
        Commands::Init { force } => commands::init::execute(db, blobs, *force, json),
        Commands::Version => commands::version::execute(json),

        // Exchange
        Commands::Export(args) => commands::export::execute(args, db, blobs, json),
        Commands::Import(args) => {
            commands::import::execute(args, db, blobs, cli.actor.as_deref(), json)
        }
        Commands::Preview { file } => commands::preview::execute(file, db, json),
        Commands::Gc { dry_run } => commands::gc::execute(*dry_run, db, blobs, json),

        // Shell completions
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
