//! Superfit CLI - a terminal client for the Superfit academy portal.
//!
//! Logs in, keeps the session credential, and sends authenticated requests
//! to the portal API.

mod commands;

use std::io;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use superfit_core::Config;

#[derive(Parser)]
#[command(name = "superfit", version, about = "Superfit academy portal client")]
struct Cli {
    /// Server base URL (overrides config and SUPERFIT_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the session credential
    Login {
        /// Account email (defaults to the last one used)
        #[arg(long)]
        email: Option<String>,
    },
    /// Drop the stored credential and end the server session
    Logout,
    /// Show the role and claims of the stored credential
    Whoami,
    /// Send an authenticated request and print the response body
    Request {
        /// HTTP method, e.g. GET or POST
        method: String,
        /// Path on the server, e.g. /api/alunos
        path: String,
        /// JSON request body
        #[arg(long)]
        data: Option<String>,
    },
}

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes buffered log lines when dropped.
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();

    guard
}

fn load_config(base_url: Option<String>) -> Config {
    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    config.apply_env();
    if let Some(url) = base_url {
        config.base_url = url;
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing();

    let config = load_config(cli.base_url);
    info!(base_url = %config.base_url, "Superfit CLI starting");

    match cli.command {
        Command::Login { email } => commands::login(config, email).await,
        Command::Logout => commands::logout(&config).await,
        Command::Whoami => commands::whoami(&config),
        Command::Request { method, path, data } => {
            commands::request(&config, &method, &path, data.as_deref()).await
        }
    }
}
