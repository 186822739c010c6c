//! Cache key layout for learner progress and sessions

/// Set of user ids with unreconciled cache state
pub const DIRTY_USERS: &str = "dirty_users";

/// Per-user hash: `bookId:wordId` -> status
pub fn status_hash(user_id: i64) -> String {
    format!("user_progress:{}", user_id)
}

/// Per-user hash: `bookId:wordId` -> epoch-millisecond string
pub fn timestamp_hash(user_id: i64) -> String {
    format!("user_progress_ts:{}", user_id)
}

/// Session id -> user id, written by the login service
pub fn session(session_id: &str) -> String {
    format!("session:{}", session_id)
}
