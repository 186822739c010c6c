//! Progress cache writer
//!
//! A status update is three cache effects: the status hash field, the
//! parallel timestamp hash field, and dirty-set membership. They are sent as
//! one [`CacheBatch`] so no reader ever sees one without the others.
//!
//! Stamps from one writer (and its clones) strictly increase, so a later
//! write is always newer than an earlier one even within a millisecond.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

use super::{keys, ProgressField, Status};
use crate::cache::{CacheBatch, CacheStore};
use crate::time::now_millis;
use crate::{Error, Result};

/// Records learner status updates in the cache store
#[derive(Clone)]
pub struct ProgressWriter {
    cache: Arc<dyn CacheStore>,
    last_stamp: Arc<AtomicI64>,
}

impl ProgressWriter {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self {
            cache,
            last_stamp: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Current time, bumped past the previous stamp when the clock has not
    /// advanced
    fn next_stamp(&self) -> i64 {
        let now = now_millis();
        let previous = self
            .last_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }

    /// Record `status` for one word, stamped with the current time
    ///
    /// Returns the epoch-millisecond timestamp written. On error nothing was
    /// recorded and the caller should retry.
    pub async fn record_status(
        &self,
        user_id: i64,
        book_id: &str,
        word_id: &str,
        status: Status,
    ) -> Result<i64> {
        self.record_status_at(user_id, book_id, word_id, status, self.next_stamp())
            .await
    }

    /// Record `status` with an explicit timestamp
    pub async fn record_status_at(
        &self,
        user_id: i64,
        book_id: &str,
        word_id: &str,
        status: Status,
        timestamp_ms: i64,
    ) -> Result<i64> {
        let field = validated_field(book_id, word_id)?;
        let field_key = field.to_field();

        let batch = CacheBatch::new()
            .hset(keys::status_hash(user_id), field_key.clone(), status.as_str())
            .hset(keys::timestamp_hash(user_id), field_key, timestamp_ms.to_string())
            .sadd(keys::DIRTY_USERS, user_id.to_string());

        if let Err(e) = self.cache.apply(batch).await {
            error!(user_id, field = %field, "Progress write failed: {}", e);
            return Err(e);
        }

        debug!(user_id, field = %field, status = %status, "Recorded progress");
        Ok(timestamp_ms)
    }
}

fn validated_field(book_id: &str, word_id: &str) -> Result<ProgressField> {
    if book_id.is_empty() || word_id.is_empty() {
        return Err(Error::InvalidInput("bookId and wordId are required".to_string()));
    }
    // The field key splits at the first ':', so it cannot appear in a book id
    if book_id.contains(':') {
        return Err(Error::InvalidInput(format!("Invalid book id: {}", book_id)));
    }
    Ok(ProgressField::new(book_id, word_id))
}
