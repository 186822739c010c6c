//! Cache-over-durable read merge

use std::collections::HashMap;
use tracing::warn;

use super::{keys, ProgressField, Status};
use crate::cache::CacheStore;
use crate::db::ProgressStore;
use crate::Result;

/// Current status of every word a learner has marked in one book
///
/// Starts from the durable records and overlays every cache-resident status
/// for the book unconditionally: the cache only ever flows into the durable
/// store, so whatever it holds is at least as new.
pub async fn merged_statuses(
    durable: &dyn ProgressStore,
    cache: &dyn CacheStore,
    user_id: i64,
    book_id: &str,
) -> Result<HashMap<String, Status>> {
    let mut statuses: HashMap<String, Status> = durable
        .list_for_book(user_id, book_id)
        .await?
        .into_iter()
        .map(|record| (record.word_id, record.status))
        .collect();

    for (field, value) in cache.hgetall(&keys::status_hash(user_id)).await? {
        let Some(field) = ProgressField::parse(&field) else {
            continue;
        };
        if field.book_id != book_id {
            continue;
        }
        match value.parse::<Status>() {
            Ok(status) => {
                statuses.insert(field.word_id, status);
            }
            Err(_) => warn!(user_id, field = %field, "Ignoring unrecognized cached status '{}'", value),
        }
    }

    Ok(statuses)
}
