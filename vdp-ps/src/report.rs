//! Sync run counters

use std::fmt;

/// Outcome of one sync run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Dirty-set members that parsed as user ids
    pub users_seen: usize,
    /// Users removed from the dirty set
    pub users_drained: usize,
    /// Users that stay dirty for the next run
    pub users_left_dirty: usize,
    /// Non-integer dirty-set members removed
    pub invalid_members: usize,
    pub fields_applied: usize,
    /// Fields whose durable record was as new or newer
    pub fields_stale: usize,
    /// Uninterpretable fields, dropped
    pub fields_discarded: usize,
    pub fields_failed: usize,
}

impl SyncReport {
    /// True when no user was left dirty
    pub fn is_drained(&self) -> bool {
        self.users_left_dirty == 0
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "users: {} seen, {} drained, {} left dirty, {} invalid; fields: {} applied, {} stale, {} discarded, {} failed",
            self.users_seen,
            self.users_drained,
            self.users_left_dirty,
            self.invalid_members,
            self.fields_applied,
            self.fields_stale,
            self.fields_discarded,
            self.fields_failed
        )
    }
}
