//! resale-classifier - Category Classification Microservice
//!
//! Assigns marketplace categories to scraped products, learns from its own
//! output and from manual corrections, refines confidence with
//! profitability data and quotes marketplace fees.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use resale_classifier::config::{CliOverrides, ServiceConfig, MODULE_NAME};
use resale_classifier::services::{FeeResolver, RemoteFeeClient};
use resale_classifier::AppState;
use resale_common::config::{RootFolderInitializer, RootFolderResolver};
use resale_common::events::EventBus;

/// Command-line arguments for resale-classifier
#[derive(Parser, Debug)]
#[command(name = "resale-classifier")]
#[command(about = "Category classification microservice for the resale back-office")]
#[command(version)]
struct Args {
    /// Root folder holding resale.db
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Listen address (default 127.0.0.1:5740)
    #[arg(short, long, env = "RESALE_CLASSIFIER_BIND")]
    bind: Option<String>,

    /// Catalog TOML replacing the embedded default
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Base URL of a remote fee schedule service
    #[arg(long)]
    fee_service_url: Option<String>,

    /// tracing filter directive, overrides the config file
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = RootFolderResolver::new(MODULE_NAME).with_cli_override(args.root_folder.clone());
    let toml_config = resolver.load_toml();

    // RUST_LOG wins, then --log-level, then the config file
    let default_filter = args
        .log_level
        .clone()
        .unwrap_or_else(|| toml_config.logging.level.clone());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resale-classifier (Category Classification) microservice");
    info!(
        "Version: {} ({}, {} build, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );

    let config = ServiceConfig::resolve(
        &CliOverrides {
            bind_address: args.bind,
            catalog_path: args.catalog,
            fee_service_url: args.fee_service_url,
        },
        &toml_config,
    )
    .context("Invalid configuration")?;

    // Step 1: Resolve root folder and make sure it exists
    let initializer = RootFolderInitializer::new(resolver.resolve());
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    // Step 2: Open or create database
    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = resale_classifier::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;
    info!("Database connection established");

    let stale = resale_classifier::db::batch_jobs::cleanup_stale_jobs(&db_pool).await?;
    if stale > 0 {
        warn!("Marked {} batch job(s) left over from a previous run as cancelled", stale);
    }

    // Step 3: Catalog and fee resolution
    let catalog = config.load_catalog().context("Failed to load catalog")?;
    info!(
        categories = catalog.keywords.len(),
        bootstrap_rows = catalog.bootstrap.len(),
        fee_rows = catalog.fees.len(),
        "Catalog loaded"
    );

    let mut fee_resolver = FeeResolver::new(catalog.clone(), config.payment);
    if let Some(url) = &config.fee_service_url {
        let client = RemoteFeeClient::new(url.clone()).context("Failed to build fee client")?;
        info!("Remote fee service: {}", client.base_url());
        fee_resolver = fee_resolver.with_remote(client);
    }

    let event_bus = EventBus::new(100);
    info!("Event bus initialized");

    let state = AppState::new(db_pool, event_bus, catalog, fee_resolver);
    let app = resale_classifier::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

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
