//! MissingBrick API server - Main entry point
//!
//! Loads configuration, opens the database, wires the Rebrickable client and
//! serves the REST API until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mbrick_api::db::Stores;
use mbrick_api::services::RebrickableClient;
use mbrick_api::{build_router, AppState};
use mbrick_common::config::{load_toml_config, ConfigOverrides, ServiceConfig};
use mbrick_common::db::init_database;

/// Command-line arguments for mbrick-api
#[derive(Parser, Debug)]
#[command(name = "mbrick-api")]
#[command(about = "MissingBrick REST API: track missing LEGO parts")]
#[command(version)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database file (a sqlite:// prefix is accepted)
    #[arg(short, long, env = "DATABASE_URL")]
    database: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Rebrickable API key
    #[arg(long, env = "REBRICKABLE_API_KEY", hide_env_values = true)]
    rebrickable_api_key: Option<String>,

    /// Rebrickable API base URL
    #[arg(long, env = "REBRICKABLE_BASE_URL")]
    rebrickable_base_url: Option<String>,

    /// Catalog request timeout in seconds
    #[arg(long)]
    request_timeout_secs: Option<u64>,

    /// Log level when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,
}

impl From<Args> for ConfigOverrides {
    fn from(args: Args) -> Self {
        ConfigOverrides {
            database: args.database,
            port: args.port,
            rebrickable_api_key: args.rebrickable_api_key,
            rebrickable_base_url: args.rebrickable_base_url,
            request_timeout_secs: args.request_timeout_secs,
            log_level: args.log_level,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let file = load_toml_config(args.config.as_deref()).context("Failed to load config file")?;
    let config = ServiceConfig::resolve(args.into(), file).context("Invalid configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("mbrick_api={level},mbrick_common={level},tower_http=info", level = config.log_level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        "Starting MissingBrick API"
    );
    info!(database = %config.database_path.display(), "Database path");
    info!(
        base_url = %config.rebrickable_base_url,
        api_key = %config.redacted_api_key(),
        timeout_secs = config.request_timeout.as_secs(),
        "Rebrickable client configured"
    );

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let catalog = RebrickableClient::new(
        &config.rebrickable_base_url,
        &config.rebrickable_api_key,
        config.request_timeout,
    )
    .context("Failed to create Rebrickable client")?;

    let state = AppState::new(Stores::sqlite(pool.clone()), Arc::new(catalog));
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
