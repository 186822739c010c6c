//! vdp-vc (Vocabulary Catalog) - HTTP service entry point
//!
//! Serves the vocabulary book catalog and records learner progress into the
//! shared cache store. The vdp-ps batch later reconciles that progress into
//! the durable database.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use vdp_common::cache::SqliteCacheStore;
use vdp_common::config::{PathOverrides, PlatformPaths, TomlConfig, DEFAULT_PORT};
use vdp_common::db::{init_database, SqliteProgressStore};
use vdp_vc::vocab::Catalog;
use vdp_vc::{build_router, AppState};

/// Command-line arguments for vdp-vc
#[derive(Parser, Debug)]
#[command(name = "vdp-vc")]
#[command(about = "Vocabulary catalog service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "VDP_VC_PORT")]
    port: Option<u16>,

    /// Root folder for data files (overrides VDP_ROOT_FOLDER and config)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Directory holding one subdirectory per vocabulary book
    #[arg(long, env = "VDP_VOCAB_ROOT")]
    vocab_root: Option<PathBuf>,

    /// Durable progress database
    #[arg(long, env = "VDP_DURABLE_DB")]
    durable_db: Option<PathBuf>,

    /// Shared cache store database
    #[arg(long, env = "VDP_CACHE_DB")]
    cache_db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = TomlConfig::load_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.as_str().into()),
        )
        .init();

    // Build identification goes out before any store is touched
    info!(
        "Starting VDP Vocabulary Catalog (vdp-vc) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("VDP_GIT_HASH"),
        env!("VDP_BUILD_TIMESTAMP"),
        env!("VDP_BUILD_PROFILE")
    );

    let overrides = PathOverrides {
        root_folder: args.root_folder,
        vocab_root: args.vocab_root,
        durable_db: args.durable_db,
        cache_db: args.cache_db,
    };
    let paths = PlatformPaths::resolve(&overrides, &toml_config);
    paths
        .ensure_root_exists()
        .context("Failed to create root folder")?;
    info!("Root folder: {}", paths.root_folder.display());
    info!("Vocabulary root: {}", paths.vocab_root.display());

    let cache = SqliteCacheStore::open(&paths.cache_db)
        .await
        .with_context(|| format!("Failed to open cache store {}", paths.cache_db.display()))?;
    info!("Cache store: {}", paths.cache_db.display());

    let pool = init_database(&paths.durable_db)
        .await
        .with_context(|| format!("Failed to open database {}", paths.durable_db.display()))?;
    info!("Durable store: {}", paths.durable_db.display());

    let catalog = Arc::new(Catalog::new(&paths.vocab_root));
    {
        let catalog = Arc::clone(&catalog);
        tokio::spawn(async move {
            if let Err(e) = catalog.snapshot().await {
                error!("Initial catalog load failed: {}", e);
            }
        });
    }

    let state = AppState::new(
        catalog,
        Arc::new(cache),
        Arc::new(SqliteProgressStore::new(pool)),
    );
    let app = build_router(state);

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("vdp-vc listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
