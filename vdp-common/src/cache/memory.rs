//! In-process cache store

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

use super::{CacheBatch, CacheOp, CacheStore, HashGuard};
use crate::Result;

#[derive(Debug, Default)]
struct MemoryState {
    hashes: HashMap<String, HashMap<String, String>>,
    sets: HashMap<String, HashSet<String>>,
    strings: HashMap<String, String>,
}

impl MemoryState {
    fn apply_op(&mut self, op: CacheOp) {
        match op {
            CacheOp::HSet { key, field, value } => {
                self.hashes.entry(key).or_default().insert(field, value);
            }
            CacheOp::SAdd { key, member } => {
                self.sets.entry(key).or_default().insert(member);
            }
            CacheOp::SRem { key, member } => {
                if let Some(set) = self.sets.get_mut(&key) {
                    set.remove(&member);
                    if set.is_empty() {
                        self.sets.remove(&key);
                    }
                }
            }
            CacheOp::Set { key, value } => {
                self.strings.insert(key, value);
            }
        }
    }
}

/// Cache store held in process memory
///
/// Every operation runs under one mutex, so a batch is trivially atomic.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    state: Mutex<MemoryState>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn apply(&self, batch: CacheBatch) -> Result<()> {
        let mut state = self.state.lock().await;
        for op in batch.ops {
            state.apply_op(op);
        }
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        let state = self.state.lock().await;
        Ok(state.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        let mut members: Vec<String> = state
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        Ok(members)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let state = self.state.lock().await;
        Ok(state.strings.get(key).cloned())
    }

    async fn srem_if_hashes_unchanged(
        &self,
        set_key: &str,
        member: &str,
        guards: &[HashGuard<'_>],
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        let empty = HashMap::new();
        let unchanged = guards
            .iter()
            .all(|(key, expected)| state.hashes.get(*key).unwrap_or(&empty) == *expected);
        if !unchanged {
            return Ok(false);
        }
        state.apply_op(CacheOp::SRem {
            key: set_key.to_string(),
            member: member.to_string(),
        });
        Ok(true)
    }
}
