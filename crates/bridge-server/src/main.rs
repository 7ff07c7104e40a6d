//! bridge-server: chatbridge session server.
//!
//! Drives headless browser sessions that link messaging platforms
//! (WhatsApp, Telegram) by QR code, and exposes them over a small HTTP API.

mod api;
mod config;
mod driver;
mod server;
mod session;

use clap::Parser;
use config::{CliOverrides, ServerConfig};
use server::BridgeServer;
use std::path::PathBuf;
use tracing::{error, info};

/// bridge-server — chatbridge session server
#[derive(Parser, Debug)]
#[command(name = "bridge-server", version, about = "Headless browser session server for chatbridge")]
struct Cli {
    /// Listen address
    #[arg(long)]
    bind: Option<String>,

    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Config file path
    #[arg(long, default_value = "~/.chatbridge/config.toml")]
    config: String,

    /// WebDriver endpoint (chromedriver, geckodriver, Selenium)
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,

    /// Maximum concurrent sessions
    #[arg(long)]
    max_sessions: Option<usize>,

    /// Seconds of inactivity before a session is reaped
    #[arg(long)]
    idle_timeout: Option<u64>,

    /// Seconds between reaper sweeps
    #[arg(long)]
    reap_interval: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    use tracing_subscriber::EnvFilter;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting bridge-server");

    let overrides = CliOverrides {
        bind: cli.bind.clone(),
        port: cli.port,
        max_sessions: cli.max_sessions,
        idle_timeout: cli.idle_timeout,
        reap_interval: cli.reap_interval,
        webdriver_url: cli.webdriver_url.clone(),
        headed: cli.headed,
    };

    let config_path = PathBuf::from(&cli.config);
    let server_config = match ServerConfig::load(Some(&config_path), &overrides) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let bridge = match BridgeServer::new(server_config) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to create server");
            std::process::exit(1);
        }
    };

    if let Err(e) = bridge.run(shutdown_signal()).await {
        error!(error = %e, "server error");
        std::process::exit(1);
    }

    info!("bridge-server stopped");
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                ctrl_c.await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    info!("received shutdown signal");
}
