//! parley command-line driver.
//!
//! # Usage
//!
//! ```bash
//! # Against a local backend
//! parley --api-url http://localhost:8080/api \
//!     --socket-url ws://localhost:8080/socket --token $TOKEN
//!
//! # Verbose engine logs on stderr
//! RUST_LOG=parley_core=debug,parley_app=debug parley --token $TOKEN
//! ```

use std::time::Duration;

use clap::Parser;
use parley_cli::{ClientConfig, Runtime};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Headless parley client
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Line-oriented driver for the parley chat engine")]
#[command(version)]
struct Args {
    /// REST API base URL
    #[arg(long, default_value = "http://localhost:8080/api")]
    api_url: String,

    /// Socket endpoint URL
    #[arg(long, default_value = "ws://localhost:8080/socket")]
    socket_url: String,

    /// Bearer token for REST requests and the socket handshake
    #[arg(long)]
    token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Debounce window for session list fetches, in milliseconds
    #[arg(long, default_value = "1000")]
    debounce_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Stdout carries the session transcript.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if args.token.is_none() {
        tracing::warn!("No token provided - requests will be unauthenticated");
    }

    let config = ClientConfig {
        api_url: args.api_url,
        socket_url: args.socket_url,
        token: args.token,
        debounce: Duration::from_millis(args.debounce_ms),
    };

    tracing::info!(api = %config.api_url, socket = %config.socket_url, "parley starting");
    Runtime::new(config).run().await?;

    Ok(())
}
