//! ietl-extract - Interview Extraction service
//!
//! Turns interview transcripts into user stories and derived requirements.
//! Serves the job API over HTTP with job events on `/events` (SSE).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ietl_common::config::{RootFolderInitializer, StorageBackend};
use ietl_common::events::EventBus;
use ietl_extract::db::{init_database_pool, InMemoryJobStore, JobStore, SqliteJobStore};
use ietl_extract::{AppState, JobManager};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for ietl-extract
#[derive(Parser, Debug)]
#[command(name = "ietl-extract")]
#[command(about = "Interview transcript extraction service")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<String>,

    /// Path to config.toml (default: platform config locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides [server] port)
    #[arg(short, long, env = "IETL_PORT")]
    port: Option<u16>,

    /// Keep jobs in memory instead of SQLite
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = ietl_common::config::load_toml_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ietl-extract (Interview Extraction) service");
    info!(
        "Version: {} (build {}, {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let store: Arc<dyn JobStore> =
        if args.memory || toml_config.storage.backend == StorageBackend::Memory {
            warn!("Using in-memory job store, jobs are lost on restart");
            Arc::new(InMemoryJobStore::new())
        } else {
            let root_folder =
                ietl_common::config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
            let initializer = RootFolderInitializer::new(root_folder);
            initializer
                .ensure_directory_exists()
                .context("Failed to initialize root folder")?;

            let db_path = initializer.database_path();
            info!("Database: {}", db_path.display());
            let pool = init_database_pool(&db_path)
                .await
                .context("Failed to open database")?;
            info!("Database connection established");
            Arc::new(SqliteJobStore::new(pool, toml_config.storage.max_lock_wait_ms))
        };

    let api_key = ietl_extract::config::resolve_ai_api_key(&toml_config);
    let engine = ietl_extract::config::build_extraction_engine(&toml_config.ai, api_key);

    let event_bus = EventBus::new(100);
    let manager = JobManager::new(store, engine, event_bus)
        .with_max_workers(toml_config.processing.max_workers);
    info!(max_workers = manager.max_workers(), "Job manager initialized");

    let app = ietl_extract::build_router(AppState::new(manager)).layer(TraceLayer::new_for_http());

    let host: std::net::IpAddr = toml_config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid [server] host: {}", toml_config.server.host))?;
    let port = args.port.unwrap_or(toml_config.server.port);
    let addr = SocketAddr::new(host, port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
