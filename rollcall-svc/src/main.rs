//! rollcall-svc - Classroom attendance service
//!
//! Serves the class, enrollment and attendance API over HTTP, with SSE
//! roster streams. Default port 5730.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollcall_common::config::{default_config_path, load_or_default, resolve_root_folder, CONFIG_PATH_ENV};
use rollcall_common::events::EventBus;
use rollcall_svc::config::{CliOverrides, ServiceConfig};
use rollcall_svc::delegate::GenAiClient;
use rollcall_svc::store::SqliteRosterStore;
use rollcall_svc::AppState;

/// Command-line arguments for rollcall-svc
#[derive(Parser, Debug)]
#[command(name = "rollcall-svc")]
#[command(about = "Classroom attendance service")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "ROLLCALL_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "ROLLCALL_PORT")]
    port: Option<u16>,

    /// Log filter when RUST_LOG is unset (e.g. "info", "rollcall_svc=debug")
    #[arg(long, env = "ROLLCALL_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let toml_config = load_or_default(config_path.as_deref())
        .with_context(|| format!("Failed to load config {:?}", config_path))?;

    // Initialize tracing; RUST_LOG wins over configured level
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| toml_config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting rollcall-svc (Classroom Attendance) v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    info!("Root folder: {}", root_folder.display());

    let cli = CliOverrides {
        host: args.host,
        port: args.port,
        log_level: args.log_level,
    };
    let config = ServiceConfig::resolve(&cli, &toml_config, &root_folder)
        .context("Invalid configuration")?;
    tracing::debug!(?config, "Resolved configuration");

    info!("Database: {}", config.database_path.display());
    let db_pool = rollcall_svc::db::init_database_pool(&config.database_path)
        .await
        .context("Failed to open database")?;
    info!("Database connection established");

    let event_bus = EventBus::new(config.event_capacity);
    let store = Arc::new(SqliteRosterStore::new(db_pool, event_bus, config.max_lock_wait_ms));

    let delegate = Arc::new(
        GenAiClient::new(
            config.delegate_base_url.clone(),
            config.delegate_model.clone(),
            config.api_key.clone(),
            config.delegate_timeout,
        )
        .context("Failed to build generative-AI client")?,
    );
    if !delegate.has_api_key() {
        warn!("Running without an API key; photo recognition and summaries will fail");
    }
    info!(model = delegate.model(), "Generative-AI delegate configured");

    let state = AppState::new(store, delegate, config.date_policy, config.delegate_timeout);
    let app = rollcall_svc::build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
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
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install terminate handler: {}", e);
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
