//! Database initialization
//!
//! Opens (creating when missing) the SQLite files used by the platform and
//! creates the durable schema. Table creation is idempotent and safe to run
//! on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Current durable schema version
pub const SCHEMA_VERSION: i64 = 1;

/// Open a SQLite pool with WAL journaling and a busy timeout
pub async fn open_pool(db_path: &Path, max_connections: u32) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL allows concurrent readers with one writer; the cache file is
    // shared between the catalog service and the syncer. Both settings are
    // applied to every pooled connection.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    Ok(pool)
}

/// Initialize the durable database and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let pool = open_pool(db_path, 10).await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Create every durable table (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_word_progress_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the word_progress table
///
/// One row per (user, book, word). `updated_at` is epoch milliseconds of the
/// learner's action as recorded by the cache, not of the sync run.
async fn create_word_progress_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS word_progress (
            user_id INTEGER NOT NULL,
            book_id TEXT NOT NULL,
            word_id TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('known', 'fuzzy', 'unknown')),
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (user_id, book_id, word_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_word_progress_user_book ON word_progress(user_id, book_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
