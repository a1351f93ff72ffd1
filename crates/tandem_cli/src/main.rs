//! Tandem CLI
//!
//! Diagnostic tools for Tandem.
//!
//! # Commands
//!
//! - `decide` - Run one reconciliation pass over described sources
//! - `inspect` - List the rows of a preferences file cache
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use commands::Format;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tandem command-line diagnostics.
#[derive(Parser)]
#[command(name = "tandem")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reconciliation pass over preferences rows
    Decide {
        /// Local source: unknown, loading, none, <n> or loading:<n>
        #[arg(short, long)]
        local: String,

        /// Remote source: unknown, loading, none, <n> or loading:<n>
        #[arg(short, long)]
        remote: String,

        /// Evaluate with sync disabled
        #[arg(long)]
        sync_disabled: bool,

        /// Owner of the described rows
        #[arg(short, long, default_value = "cli-user")]
        owner: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: Format,
    },

    /// List the rows of a preferences file cache
    Inspect {
        /// Path to the cache directory
        #[arg(short, long)]
        path: PathBuf,

        /// Only show this owner
        #[arg(short, long)]
        owner: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: Format,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Decide {
            local,
            remote,
            sync_disabled,
            owner,
            format,
        } => {
            commands::decide::run(&local, &remote, !sync_disabled, &owner, format)?;
        }
        Commands::Inspect { path, owner, format } => {
            commands::inspect::run(&path, owner.as_deref(), format)?;
        }
        Commands::Version => {
            println!("Tandem CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Entity: {}", tandem_prefs::ENTITY);
        }
    }

    Ok(())
}
