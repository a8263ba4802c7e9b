//! tilemosaic CLI - Command-line interface
//!
//! This binary provides a command-line interface to the tilemosaic library.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;

#[derive(Parser)]
#[command(name = "tilemosaic")]
#[command(version, about = "Fetch, cache and composite tiled map imagery", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a world extent into a PNG composite
    Fetch(FetchArgs),

    /// Manage the disk tile cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Fetch(args) => commands::fetch::run(args).await,
        Commands::Cache { action } => commands::cache::run(action),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
