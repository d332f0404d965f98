//! svs-hook - SMS serial validation service
//!
//! Loads configuration, opens the SQLite store, publishes the persisted range
//! table and serves the webhook and admin API until SIGINT/SIGTERM.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use svs_common::config::ServiceConfig;
use svs_common::db::{init_database, SqliteStore};
use svs_common::{RangeTable, SerialStore, SnapshotCell};
use svs_hook::cli::Args;
use svs_hook::{build_router, notifier, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "svs_hook=info,svs_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting svs-hook v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let mut config =
        ServiceConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    if config.callback_token.is_empty() {
        warn!("No callback token configured, webhook route is disabled");
    }
    if config.admin_token.is_empty() {
        warn!("No admin token configured, admin routes are unauthenticated");
    }

    info!("Database path: {}", config.database_path.display());
    let pool = init_database(&config.database_path)
        .await
        .context("Failed to open database")?;
    let store = Arc::new(SqliteStore::new(pool, config.database_max_lock_wait_ms));

    let table = store
        .load_table(config.identifier_width)
        .await
        .context("Failed to load persisted range table")?
        .unwrap_or_else(RangeTable::empty);
    info!(
        version = table.version(),
        ranges = table.range_count(),
        invalids = table.invalid_count(),
        "Initial snapshot loaded"
    );
    let snapshot = SnapshotCell::new(table);

    let notifier = notifier::from_config(&config.notifier).context("Failed to set up notifier")?;
    let state = AppState::new(&config, snapshot, store, notifier)
        .context("Failed to build application state")?;

    if let Some(path) = &args.import {
        let result = state
            .pipeline
            .import_file(path)
            .await
            .with_context(|| format!("Failed to import {}", path.display()))?;
        info!(
            published = result.published,
            ranges = result.range_count,
            invalids = result.invalid_count,
            issues = result.errors.len(),
            "Startup import finished"
        );
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("svs-hook listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

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
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
