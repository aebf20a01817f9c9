//! # Docsense CLI (`docsense`)
//!
//! The `docsense` binary is the primary interface for the suggestion
//! engine. It provides commands for database initialization, corpus import,
//! one-shot event analysis, statistics, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! docsense --config ./config/docsense.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docsense init` | Create the SQLite database and run schema migrations |
//! | `docsense load <file>` | Import a JSON documentation corpus |
//! | `docsense analyze <file>` | Analyze one context event and print suggestions |
//! | `docsense stats` | Print a database overview |
//! | `docsense serve` | Start the HTTP + SSE server |

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use docsense::config;
use docsense::corpus;
use docsense::db;
use docsense::migrate;
use docsense::models::ContextEvent;
use docsense::oracle::FtsOracle;
use docsense::rank::Ranker;
use docsense::server;
use docsense::stats;

/// Docsense CLI — a context-aware documentation suggestion engine.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docsense.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docsense",
    about = "Docsense — a context-aware documentation suggestion engine for operations teams",
    version,
    long_about = "Docsense ingests context events from monitored subjects, distills them into \
    weighted keyword vectors, and ranks a documentation corpus against them to surface the \
    runbooks an operator most likely needs right now."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docsense.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (documentation, activities, suggestions, feedback_log, FTS indexes).
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// Import a documentation corpus from a JSON file.
    ///
    /// The file must contain a JSON array of entries with `id`, `title`,
    /// `content`, and optional `tags`, `keywords`, `category`, `priority`,
    /// and `source`. Existing entries with the same id are updated.
    Load {
        /// Path to the corpus JSON file.
        file: PathBuf,
    },

    /// Analyze a single context event and print the ranked suggestions.
    ///
    /// Reads one context event as JSON from the given file and prints the
    /// extracted keywords, context vector, and suggestions as JSON.
    Analyze {
        /// Path to the event JSON file.
        file: PathBuf,

        /// Include suggestions below the configured relevance threshold.
        #[arg(long)]
        all: bool,
    },

    /// Print database statistics.
    Stats,

    /// Start the HTTP + SSE server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// context-submission, suggestion, and event-stream endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docsense=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Load { file } => {
            let pool = db::connect(&cfg).await?;
            let summary = corpus::load_corpus(&pool, &file).await?;
            println!(
                "Imported corpus: {} inserted, {} updated.",
                summary.inserted, summary.updated
            );
            pool.close().await;
        }
        Commands::Analyze { file, all } => {
            let content = std::fs::read_to_string(&file)?;
            let event: ContextEvent = serde_json::from_str(&content)?;

            let pool = db::connect(&cfg).await?;
            let ranker = Ranker::new(Arc::new(FtsOracle::new(pool.clone())), &cfg.engine);
            let analysis = if all {
                ranker.analyze_unfiltered(&event).await
            } else {
                ranker.analyze(&event).await
            };
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            pool.close().await;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
