//! vdp-ps (Progress Syncer) - reconciliation batch entry point
//!
//! Exit codes:
//! - 0: dirty set fully drained
//! - 2: some users left dirty (retried on the next run)
//! - 1: fatal error (configuration, unreachable store)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vdp_common::cache::SqliteCacheStore;
use vdp_common::config::{PathOverrides, PlatformPaths, TomlConfig};
use vdp_common::db::{init_database, SqliteProgressStore};
use vdp_common::time::millis_to_duration;
use vdp_ps::{SyncReport, Syncer};

/// Command-line arguments for vdp-ps; all optional
#[derive(Parser, Debug)]
#[command(name = "vdp-ps")]
#[command(about = "Reconcile cached learner progress into the durable store")]
#[command(version)]
struct Args {
    /// Root folder for data files (overrides VDP_ROOT_FOLDER and config)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Durable progress database
    #[arg(long, env = "VDP_DURABLE_DB")]
    durable_db: Option<PathBuf>,

    /// Shared cache store database
    #[arg(long, env = "VDP_CACHE_DB")]
    cache_db: Option<PathBuf>,

    /// Per-user time budget in milliseconds
    #[arg(long, env = "VDP_SYNC_USER_TIMEOUT_MS")]
    user_timeout_ms: Option<u64>,
}

const EXIT_PARTIAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let toml_config = TomlConfig::load_or_default();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!(
        "Starting VDP Progress Syncer (vdp-ps) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("VDP_GIT_HASH"),
        env!("VDP_BUILD_TIMESTAMP"),
        env!("VDP_BUILD_PROFILE")
    );

    match run(args, toml_config).await {
        Ok(report) if report.is_drained() => ExitCode::SUCCESS,
        Ok(report) => {
            warn!("{} users left dirty", report.users_left_dirty);
            ExitCode::from(EXIT_PARTIAL)
        }
        Err(err) => {
            error!(error = %err, "sync failed");
            for cause in err.chain().skip(1) {
                error!(cause = %cause, "caused by");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, toml_config: TomlConfig) -> Result<SyncReport> {
    let overrides = PathOverrides {
        root_folder: args.root_folder,
        durable_db: args.durable_db,
        cache_db: args.cache_db,
        ..Default::default()
    };
    let paths = PlatformPaths::resolve(&overrides, &toml_config);
    paths
        .ensure_root_exists()
        .context("Failed to create root folder")?;

    let cache = SqliteCacheStore::open(&paths.cache_db)
        .await
        .with_context(|| format!("Failed to open cache store {}", paths.cache_db.display()))?;
    let pool = init_database(&paths.durable_db)
        .await
        .with_context(|| format!("Failed to open database {}", paths.durable_db.display()))?;
    info!(
        "Cache store: {}, durable store: {}",
        paths.cache_db.display(),
        paths.durable_db.display()
    );

    let timeout_ms = args
        .user_timeout_ms
        .unwrap_or(toml_config.sync.user_timeout_ms);
    let syncer = Syncer::new(
        Arc::new(cache),
        Arc::new(SqliteProgressStore::new(pool)),
        millis_to_duration(timeout_ms),
    );

    syncer.run().await.context("Failed to read dirty users")
}
