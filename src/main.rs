//! Request shield server.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ CORS ──▶ rate limit ──▶ auth gate ──▶ handler
//!                      │           │              │
//!                      ▼           ▼              ▼
//!                  204 / 403      429      401 / 403 / 404 / 500
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use request_shield::config::{read_config, validate_config, ConfigError, ShieldConfig};
use request_shield::lifecycle::signals::wait_for_shutdown_signal;
use request_shield::observability::{logging, metrics};
use request_shield::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "request-shield")]
#[command(about = "CORS, rate limiting and authorization in front of clinic services", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "SHIELD_CONFIG")]
    config: Option<PathBuf>,

    /// Session-token secret, overriding `auth.session_secret`
    #[arg(long, env = "SHIELD_SESSION_SECRET", hide_env_values = true)]
    session_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = Args::parse();

    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => ShieldConfig::default(),
    };
    if let Some(secret) = args.session_secret.take() {
        config.auth.session_secret = secret;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        "request-shield starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();

    let serve = tokio::spawn(server.run(listener, server_shutdown));

    wait_for_shutdown_signal().await;
    shutdown.trigger();

    serve.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}
