//! Plugstore CLI
//!
//! Command-line tools for inspecting and maintaining a plugstore database
//! directory.
//!
//! # Commands
//!
//! - `partitions` - List partitions and their entry counts
//! - `list` - Print the entries of a partition
//! - `get` - Print one entry
//! - `delete` - Delete one entry
//! - `pk` - Print the key derived from a tag
//! - `verify` - Check the directory layout and entry contents

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Plugstore command-line database tools.
#[derive(Parser)]
#[command(name = "plugstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human readable text
    Text,
    /// JSON
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List partitions and their entry counts
    Partitions {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Print the entries of a partition
    List {
        /// Partition name
        partition: String,

        /// Ordering, e.g. "ORDER BY Name DESC"
        #[arg(short, long, default_value = "")]
        query: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Print one entry
    Get {
        /// Partition name
        partition: String,

        /// Key in base64 or hex
        key: String,
    },

    /// Delete one entry
    Delete {
        /// Partition name
        partition: String,

        /// Key in base64 or hex
        key: String,
    },

    /// Print the key derived from a tag
    Pk {
        /// Tag of at most 16 bytes, e.g. "admin"
        tag: String,
    },

    /// Check the directory layout and entry contents
    Verify {
        /// Remove staged writes left behind by interrupted puts
        #[arg(long)]
        clean_tmp: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Partitions { format } => {
            let path = cli.path.ok_or("Database path required for partitions")?;
            commands::partitions::run(&path, format)?;
        }
        Commands::List {
            partition,
            query,
            format,
        } => {
            let path = cli.path.ok_or("Database path required for list")?;
            commands::list::run(&path, &partition, &query, format)?;
        }
        Commands::Get { partition, key } => {
            let path = cli.path.ok_or("Database path required for get")?;
            commands::entry::get(&path, &partition, &key)?;
        }
        Commands::Delete { partition, key } => {
            let path = cli.path.ok_or("Database path required for delete")?;
            commands::entry::delete(&path, &partition, &key)?;
        }
        Commands::Pk { tag } => {
            commands::pk::run(&tag)?;
        }
        Commands::Verify { clean_tmp } => {
            let path = cli.path.ok_or("Database path required for verify")?;
            commands::verify::run(&path, clean_tmp)?;
        }
        Commands::Version => {
            println!("plugstore CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("plugstore_db v{}", plugstore_db::VERSION);
        }
    }

    Ok(())
}
