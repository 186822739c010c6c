//! Cache-to-durable reconciliation
//!
//! For each dirty user the syncer snapshots the timestamp hash, then the
//! status hash, and writes every field whose cache timestamp is strictly
//! newer than the durable row. The user leaves the dirty set only when every
//! field was settled and both hashes still equal their snapshots; the check
//! and the removal are one atomic cache operation, so a write that lands
//! mid-sync keeps the user dirty even when it reuses the same millisecond.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use vdp_common::cache::{CacheBatch, CacheStore};
use vdp_common::db::ProgressStore;
use vdp_common::progress::keys;
use vdp_common::time::{millis_to_datetime, now_millis, parse_millis};
use vdp_common::{Error, ProgressField, ProgressRecord, Result, Status};

use crate::report::SyncReport;

/// What happened to one cache field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldOutcome {
    Applied,
    Stale,
    Discarded,
    Failed,
}

/// Drains the dirty set into the durable store
pub struct Syncer {
    cache: Arc<dyn CacheStore>,
    durable: Arc<dyn ProgressStore>,
    user_timeout: Duration,
}

impl Syncer {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        durable: Arc<dyn ProgressStore>,
        user_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            durable,
            user_timeout,
        }
    }

    /// One full pass over the dirty set
    ///
    /// Only an unreadable dirty set is an error; per-user and per-field
    /// problems are counted in the report.
    pub async fn run(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let members = self.cache.smembers(keys::DIRTY_USERS).await?;
        info!("Sync started: {} dirty users", members.len());

        for member in members {
            let Ok(user_id) = member.trim().parse::<i64>() else {
                warn!(member = %member, "Removing non-numeric dirty user entry");
                report.invalid_members += 1;
                if let Err(e) = self
                    .cache
                    .apply(CacheBatch::new().srem(keys::DIRTY_USERS, member.clone()))
                    .await
                {
                    error!(member = %member, "Failed to remove dirty entry: {}", e);
                }
                continue;
            };

            report.users_seen += 1;
            match self.sync_user_bounded(user_id, &mut report).await {
                Ok(true) => {
                    debug!(user_id, "User drained");
                    report.users_drained += 1;
                }
                Ok(false) => {
                    debug!(user_id, "User stays dirty");
                    report.users_left_dirty += 1;
                }
                Err(e @ Error::Timeout(_)) => {
                    warn!(user_id, "{}", e);
                    report.users_left_dirty += 1;
                }
                Err(e) => {
                    error!(user_id, "User sync failed: {}", e);
                    report.users_left_dirty += 1;
                }
            }
        }

        info!("Sync finished: {}", report);
        Ok(report)
    }

    async fn sync_user_bounded(&self, user_id: i64, report: &mut SyncReport) -> Result<bool> {
        tokio::time::timeout(self.user_timeout, self.sync_user(user_id, report))
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "User {} not finished within {} ms",
                    user_id,
                    self.user_timeout.as_millis()
                ))
            })?
    }

    /// Reconcile one user; `Ok(true)` when removed from the dirty set
    async fn sync_user(&self, user_id: i64, report: &mut SyncReport) -> Result<bool> {
        let ts_key = keys::timestamp_hash(user_id);
        let status_key = keys::status_hash(user_id);
        // Timestamps before statuses: a status newer than its snapshot
        // timestamp is still caught by the compare-and-remove below
        let stamps = self.cache.hgetall(&ts_key).await?;
        let statuses = self.cache.hgetall(&status_key).await?;
        let sync_time = now_millis();

        let mut fields: Vec<(&String, &String)> = statuses.iter().collect();
        fields.sort();

        let mut complete = true;
        for (field, value) in fields {
            let outcome = self
                .sync_field(user_id, field, value, &stamps, sync_time)
                .await;
            match outcome {
                FieldOutcome::Applied => report.fields_applied += 1,
                FieldOutcome::Stale => report.fields_stale += 1,
                FieldOutcome::Discarded => report.fields_discarded += 1,
                FieldOutcome::Failed => {
                    report.fields_failed += 1;
                    complete = false;
                }
            }
        }

        if !complete {
            return Ok(false);
        }

        let guards = [(ts_key.as_str(), &stamps), (status_key.as_str(), &statuses)];
        let removed = self
            .cache
            .srem_if_hashes_unchanged(keys::DIRTY_USERS, &user_id.to_string(), &guards)
            .await?;
        if !removed {
            debug!(user_id, "Progress changed during sync");
        }
        Ok(removed)
    }

    async fn sync_field(
        &self,
        user_id: i64,
        field: &str,
        value: &str,
        stamps: &HashMap<String, String>,
        sync_time: i64,
    ) -> FieldOutcome {
        let Some(key) = ProgressField::parse(field) else {
            warn!(user_id, field, "Discarding malformed progress field");
            return FieldOutcome::Discarded;
        };
        let Ok(status) = value.parse::<Status>() else {
            warn!(user_id, field, value, "Discarding unrecognized status");
            return FieldOutcome::Discarded;
        };

        let cache_ms = match stamps.get(field).and_then(|s| parse_millis(s)) {
            Some(ms) => ms,
            None => {
                debug!(user_id, field, "Missing timestamp, stamping with sync time");
                sync_time
            }
        };

        let existing = match self.durable.find(user_id, &key.book_id, &key.word_id).await {
            Ok(existing) => existing,
            Err(e) => {
                error!(user_id, field, "Durable lookup failed: {}", e);
                return FieldOutcome::Failed;
            }
        };
        if let Some(existing) = existing {
            if existing.updated_at.timestamp_millis() >= cache_ms {
                return FieldOutcome::Stale;
            }
        }

        let record = ProgressRecord {
            user_id,
            book_id: key.book_id,
            word_id: key.word_id,
            status,
            updated_at: millis_to_datetime(cache_ms),
        };
        match self.durable.upsert(&record).await {
            Ok(()) => FieldOutcome::Applied,
            Err(e) => {
                error!(user_id, field, "Durable upsert failed: {}", e);
                FieldOutcome::Failed
            }
        }
    }
}
