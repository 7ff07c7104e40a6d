//! bridge — chatbridge client CLI.
//!
//! Starts messaging platform sessions on a bridge server, saves the QR code
//! used to link them, and reads recent conversations once connected.

mod client;
mod commands;
mod config;

use clap::{Parser, Subcommand};
use client::ApiClient;
use std::path::PathBuf;
use std::time::Duration;
use tracing::error;

/// bridge — chatbridge client
#[derive(Parser)]
#[command(name = "bridge", version, about = "Client for the chatbridge session server")]
struct Cli {
    /// Server base URL (overrides config)
    #[arg(short, long, global = true)]
    server: Option<String>,

    /// Config file path
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a session for a platform (whatsapp, telegram)
    Start {
        platform: String,
    },

    /// List sessions
    List,

    /// Show a session's login status
    Status {
        id: String,
        /// Keep polling up to this many seconds until connected
        #[arg(long)]
        wait: Option<u64>,
    },

    /// Save the session's QR code as a PNG
    Credential {
        id: String,
        /// Output file
        #[arg(short, long, default_value = "qr.png")]
        out: PathBuf,
    },

    /// Show recent conversations of a connected session
    Items {
        id: String,
        /// Only conversations containing this text
        #[arg(short, long)]
        filter: Option<String>,
        /// Maximum number of conversations
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Close a session
    Close {
        id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing.
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("bridge=debug,bridge_cli=debug,bridge_core=debug")
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("bridge=warn,bridge_cli=warn")
            .with_target(false)
            .init();
    }

    let config_path = cli.config.clone().map(PathBuf::from).unwrap_or_else(|| {
        let home = dirs::home_dir().unwrap_or_default();
        home.join(".chatbridge").join("cli.toml")
    });
    let cfg = config::Config::load(&config_path).unwrap_or_default();
    let server = cli.server.clone().unwrap_or(cfg.default.server);

    let result = match ApiClient::new(&server, Duration::from_secs(cfg.default.request_timeout)) {
        Ok(client) => run(&client, cli.command).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("bridge: {e:#}");
        std::process::exit(1);
    }
}

async fn run(client: &ApiClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Start { platform } => commands::sessions::run_start(client, &platform).await,
        Command::List => commands::sessions::run_list(client).await,
        Command::Status { id, wait } => commands::sessions::run_status(client, &id, wait).await,
        Command::Credential { id, out } => {
            commands::sessions::run_credential(client, &id, &out).await
        }
        Command::Items { id, filter, limit } => {
            commands::sessions::run_items(client, &id, filter.as_deref(), limit).await
        }
        Command::Close { id } => commands::sessions::run_close(client, &id).await,
    }
}
