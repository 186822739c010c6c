//! Low-latency shared cache store
//!
//! Learner progress is written here on the request path and drained into
//! the durable store by the syncer. The store exposes the small subset of
//! hash/set/string operations the platform needs, plus an atomic
//! [`CacheBatch`] so multi-key writes are never observed half-applied.
//!
//! Backends:
//! - [`MemoryCacheStore`]: single process, used by tests and embedded setups
//! - [`SqliteCacheStore`]: a shared SQLite file the catalog service and the
//!   syncer process open concurrently

use async_trait::async_trait;
use std::collections::HashMap;

use crate::Result;

mod memory;
mod sqlite;

pub use memory::MemoryCacheStore;
pub use sqlite::SqliteCacheStore;

/// One write inside a [`CacheBatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    /// Set `field` of hash `key`
    HSet {
        key: String,
        field: String,
        value: String,
    },
    /// Add `member` to set `key`
    SAdd { key: String, member: String },
    /// Remove `member` from set `key`
    SRem { key: String, member: String },
    /// Set string `key`
    Set { key: String, value: String },
}

/// Ordered writes applied all-or-nothing
#[derive(Debug, Clone, Default)]
pub struct CacheBatch {
    ops: Vec<CacheOp>,
}

impl CacheBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hset(mut self, key: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(CacheOp::HSet {
            key: key.into(),
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn sadd(mut self, key: impl Into<String>, member: impl Into<String>) -> Self {
        self.ops.push(CacheOp::SAdd {
            key: key.into(),
            member: member.into(),
        });
        self
    }

    pub fn srem(mut self, key: impl Into<String>, member: impl Into<String>) -> Self {
        self.ops.push(CacheOp::SRem {
            key: key.into(),
            member: member.into(),
        });
        self
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(CacheOp::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn ops(&self) -> &[CacheOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Cache store operations
///
/// Implementations must make [`CacheStore::apply`] and
/// [`CacheStore::srem_if_hashes_unchanged`] atomic with respect to every other
/// operation on the same store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Apply every op in `batch`, or none of them
    async fn apply(&self, batch: CacheBatch) -> Result<()>;

    /// All fields of hash `key` (empty when the hash does not exist)
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>>;

    /// All members of set `key`
    async fn smembers(&self, key: &str) -> Result<Vec<String>>;

    /// String value at `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove `member` from `set_key` only if every guarded hash still holds
    /// exactly its expected contents
    ///
    /// Returns whether the member was removed. Used to drop a user from the
    /// dirty set without losing a write that landed after the snapshot.
    async fn srem_if_hashes_unchanged(
        &self,
        set_key: &str,
        member: &str,
        guards: &[HashGuard<'_>],
    ) -> Result<bool>;
}

/// Hash key paired with the contents it must still hold
pub type HashGuard<'a> = (&'a str, &'a HashMap<String, String>);
