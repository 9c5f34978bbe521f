//! # ragchat CLI
//!
//! ## Usage
//!
//! ```bash
//! ragchat --config ./config/ragchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragchat init` | Create the documents table and similarity index |
//! | `ragchat ingest [--clear] [--file PATH]` | Load the built-in corpus or a JSON corpus file |
//! | `ragchat add "<content>" [--meta k=v]` | Embed and store one document |
//! | `ragchat ask "<query>"` | Answer a question from the knowledge base |
//! | `ragchat clear` | Delete every document |
//! | `ragchat status` | Show database, models and credential presence |
//! | `ragchat serve` | Start the HTTP API |
//!
//! Log verbosity follows `RUST_LOG` (default `info`); logs go to stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ragchat::{chat, config, ingest, migrate, server, stats};
use ragchat_core::models::Metadata;

/// ragchat: answer questions from your own documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Credentials come from `HUGGINGFACE_API_TOKEN` and `GEMINI_API_KEY`.
#[derive(Parser)]
#[command(
    name = "ragchat",
    about = "A retrieval-augmented chat backend over your own documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/ragchat.toml`. A missing file means defaults.
    #[arg(long, global = true, default_value = "./config/ragchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Load documents into the knowledge base.
    ///
    /// Without `--file`, loads the built-in Navyakosh fertilizer corpus.
    Ingest {
        /// Delete existing documents (and reset ids) before loading.
        #[arg(long)]
        clear: bool,

        /// JSON corpus file: `[{"content": "...", "metadata": {...}}]`.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Add a single document.
    Add {
        /// Document text.
        content: String,

        /// Metadata entry as `key=value` (repeatable).
        #[arg(long = "meta", value_parser = parse_key_val)]
        meta: Vec<(String, String)>,
    },

    /// Ask a question.
    Ask {
        /// The question text.
        query: String,
    },

    /// Delete every document.
    Clear,

    /// Show configuration and knowledge base status.
    Status,

    /// Start the HTTP API on `server.bind`.
    Serve,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid key=value: no '=' in '{}'", s))?;
    if key.trim().is_empty() {
        return Err(format!("invalid key=value: empty key in '{}'", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { clear, file } => {
            ingest::run_ingest(&cfg, clear, file.as_deref()).await?;
        }
        Commands::Add { content, meta } => {
            let metadata: Metadata = meta
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect();
            ingest::run_add(&cfg, &content, metadata).await?;
        }
        Commands::Ask { query } => {
            chat::run_ask(&cfg, &query).await?;
        }
        Commands::Clear => {
            ingest::run_clear(&cfg).await?;
        }
        Commands::Status => {
            stats::run_status(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
