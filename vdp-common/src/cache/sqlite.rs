//! SQLite-backed cache store
//!
//! Hashes, sets and strings live in three tables of a dedicated database
//! file. WAL mode lets the catalog service and the syncer share the file;
//! every batch is a single transaction.

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::{CacheBatch, CacheOp, CacheStore, HashGuard};
use crate::db::open_pool;
use crate::{Error, Result};

fn cache_err(e: sqlx::Error) -> Error {
    Error::Cache(e.to_string())
}

/// Cache store on a shared SQLite file
#[derive(Debug, Clone)]
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl SqliteCacheStore {
    /// Open (creating if needed) the cache database at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = open_pool(path, 10).await.map_err(|e| match e {
            Error::Database(e) => cache_err(e),
            other => other,
        })?;
        let store = Self::from_pool(pool).await?;
        info!("Cache store ready: {}", path.display());
        Ok(store)
    }

    /// Wrap an existing pool, creating the cache tables
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        create_cache_tables(&pool).await.map_err(cache_err)?;
        Ok(Self { pool })
    }

    async fn read_hash(
        conn: &mut SqliteConnection,
        key: &str,
    ) -> std::result::Result<HashMap<String, String>, sqlx::Error> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT field, value FROM cache_hash WHERE key = ?")
                .bind(key)
                .fetch_all(&mut *conn)
                .await?;
        Ok(rows.into_iter().collect())
    }

    async fn execute_op(
        conn: &mut SqliteConnection,
        op: &CacheOp,
    ) -> std::result::Result<(), sqlx::Error> {
        match op {
            CacheOp::HSet { key, field, value } => {
                sqlx::query(
                    r#"
                    INSERT INTO cache_hash (key, field, value) VALUES (?, ?, ?)
                    ON CONFLICT(key, field) DO UPDATE SET value = excluded.value
                    "#,
                )
                .bind(key)
                .bind(field)
                .bind(value)
                .execute(&mut *conn)
                .await?;
            }
            CacheOp::SAdd { key, member } => {
                sqlx::query("INSERT OR IGNORE INTO cache_set (key, member) VALUES (?, ?)")
                    .bind(key)
                    .bind(member)
                    .execute(&mut *conn)
                    .await?;
            }
            CacheOp::SRem { key, member } => {
                sqlx::query("DELETE FROM cache_set WHERE key = ? AND member = ?")
                    .bind(key)
                    .bind(member)
                    .execute(&mut *conn)
                    .await?;
            }
            CacheOp::Set { key, value } => {
                sqlx::query(
                    r#"
                    INSERT INTO cache_string (key, value) VALUES (?, ?)
                    ON CONFLICT(key) DO UPDATE SET value = excluded.value
                    "#,
                )
                .bind(key)
                .bind(value)
                .execute(&mut *conn)
                .await?;
            }
        }
        Ok(())
    }

    async fn guards_unchanged(
        conn: &mut SqliteConnection,
        guards: &[HashGuard<'_>],
    ) -> std::result::Result<bool, sqlx::Error> {
        for (key, expected) in guards {
            if &Self::read_hash(&mut *conn, key).await? != *expected {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn apply(&self, batch: CacheBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(cache_err)?;
        for op in batch.ops() {
            Self::execute_op(&mut *tx, op).await.map_err(cache_err)?;
        }
        // Dropping `tx` on an early return rolls the whole batch back
        tx.commit().await.map_err(cache_err)?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.pool.acquire().await.map_err(cache_err)?;
        Self::read_hash(&mut *conn, key).await.map_err(cache_err)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT member FROM cache_set WHERE key = ? ORDER BY member")
            .bind(key)
            .fetch_all(&self.pool)
            .await
            .map_err(cache_err)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM cache_string WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(cache_err)
    }

    async fn srem_if_hashes_unchanged(
        &self,
        set_key: &str,
        member: &str,
        guards: &[HashGuard<'_>],
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(cache_err)?;

        // The delete runs first so the write lock is held before the guards
        // are read; a cancelled or failed call rolls back when `tx` drops
        let op = CacheOp::SRem {
            key: set_key.to_string(),
            member: member.to_string(),
        };
        Self::execute_op(&mut *tx, &op).await.map_err(cache_err)?;

        if !Self::guards_unchanged(&mut *tx, guards).await.map_err(cache_err)? {
            tx.rollback().await.map_err(cache_err)?;
            return Ok(false);
        }
        tx.commit().await.map_err(cache_err)?;
        Ok(true)
    }
}

async fn create_cache_tables(pool: &SqlitePool) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cache_hash (
            key TEXT NOT NULL,
            field TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (key, field)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cache_set (
            key TEXT NOT NULL,
            member TEXT NOT NULL,
            PRIMARY KEY (key, member)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cache_string (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
