//! EntiGraph CLI
//!
//! Command-line tools for EntiGraph journal files.
//!
//! # Commands
//!
//! - `inspect` - Display batch and record counts per entity
//! - `verify` - Verify frame integrity and batch decoding
//! - `dump` - Print commit batches for debugging
//! - `compact` - Fold the journal into a single batch

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// EntiGraph command-line journal tools.
#[derive(Parser)]
#[command(name = "entigraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for commands that print structured data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Display batch and record counts per entity
    Inspect {
        /// Path to the journal file
        journal: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Verify journal integrity
    Verify {
        /// Path to the journal file
        journal: PathBuf,
    },

    /// Dump commit batches for debugging
    Dump {
        /// Path to the journal file
        journal: PathBuf,

        /// Maximum number of batches to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Compact the journal into a single batch
    Compact {
        /// Path to the journal file
        journal: PathBuf,

        /// Dry run - show what would be done
        #[arg(short, long)]
        dry_run: bool,
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
        Commands::Inspect { journal, format } => {
            commands::inspect::run(&journal, format)?;
        }
        Commands::Verify { journal } => {
            commands::verify::run(&journal)?;
        }
        Commands::Dump {
            journal,
            limit,
            format,
        } => {
            commands::dump::run(&journal, limit, format)?;
        }
        Commands::Compact { journal, dry_run } => {
            commands::compact::run(&journal, dry_run)?;
        }
        Commands::Version => {
            println!("EntiGraph CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("EntiGraph Core v{}", entigraph_core::VERSION);
        }
    }

    Ok(())
}
