//! Durable progress records

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::progress::{ProgressRecord, Status};
use crate::time::millis_to_datetime;
use crate::{Error, Result};

/// Durable progress storage
///
/// The syncer is the only writer; presentation code reads it back through
/// the read merge.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Look up one record by its composite key
    async fn find(&self, user_id: i64, book_id: &str, word_id: &str) -> Result<Option<ProgressRecord>>;

    /// Insert the record, or overwrite status and timestamp of the existing row
    async fn upsert(&self, record: &ProgressRecord) -> Result<()>;

    /// All records of one learner for one book
    async fn list_for_book(&self, user_id: i64, book_id: &str) -> Result<Vec<ProgressRecord>>;
}

/// [`ProgressStore`] on the `word_progress` table
#[derive(Debug, Clone)]
pub struct SqliteProgressStore {
    pool: SqlitePool,
}

type ProgressRow = (i64, String, String, String, i64);

fn row_to_record((user_id, book_id, word_id, status, updated_at): ProgressRow) -> Result<ProgressRecord> {
    let status: Status = status
        .parse()
        .map_err(|_| Error::Internal(format!("Corrupt status '{}' for {}:{}", status, book_id, word_id)))?;
    Ok(ProgressRecord {
        user_id,
        book_id,
        word_id,
        status,
        updated_at: millis_to_datetime(updated_at),
    })
}

impl SqliteProgressStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Row count, used by diagnostics and tests
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM word_progress")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    async fn find(&self, user_id: i64, book_id: &str, word_id: &str) -> Result<Option<ProgressRecord>> {
        let row: Option<ProgressRow> = sqlx::query_as(
            r#"
            SELECT user_id, book_id, word_id, status, updated_at
            FROM word_progress
            WHERE user_id = ? AND book_id = ? AND word_id = ?
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(word_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_record).transpose()
    }

    async fn upsert(&self, record: &ProgressRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO word_progress (user_id, book_id, word_id, status, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, book_id, word_id) DO UPDATE SET
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.user_id)
        .bind(&record.book_id)
        .bind(&record.word_id)
        .bind(record.status.as_str())
        .bind(record.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_book(&self, user_id: i64, book_id: &str) -> Result<Vec<ProgressRecord>> {
        let rows: Vec<ProgressRow> = sqlx::query_as(
            r#"
            SELECT user_id, book_id, word_id, status, updated_at
            FROM word_progress
            WHERE user_id = ? AND book_id = ?
            ORDER BY word_id
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_record).collect()
    }
}
