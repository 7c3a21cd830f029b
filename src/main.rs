//! # pagesum CLI
//!
//! The `pagesum` binary runs the summarization service and its supporting
//! commands.
//!
//! ## Usage
//!
//! ```bash
//! pagesum --config ./config/pagesum.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pagesum init` | Create the SQLite database and run schema migrations |
//! | `pagesum serve` | Start the HTTP server and the background worker |
//! | `pagesum stats` | Print record counts by status |

mod config;
mod crud;
mod db;
mod extract;
mod migrate;
mod models;
mod server;
mod stats;
mod summarizer;
mod worker;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// pagesum — a URL summarization service with asynchronous background
/// processing.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/pagesum.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "pagesum",
    about = "pagesum — a URL summarization service",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pagesum.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the summaries table. This
    /// command is idempotent — running it multiple times is safe.
    Init,

    /// Start the HTTP server and the background summarization worker.
    ///
    /// Binds to the address configured in `[server].bind`. On ctrl-c the
    /// server stops accepting requests and the worker drains any queued
    /// jobs before the process exits.
    Serve,

    /// Print record counts by status.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            let pool = db::connect(&cfg).await?;
            let provider = summarizer::create_summarizer(&cfg.summarizer)?;
            let (queue, worker) = worker::spawn(pool.clone(), provider, &cfg.worker);

            server::run_server(&cfg, pool.clone(), queue).await?;

            // Server has shut down and released its queue handle; wait for
            // the worker to finish whatever is still in flight.
            worker.drained().await;
            pool.close().await;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
