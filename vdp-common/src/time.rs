//! Timestamp utilities
//!
//! The cache store keeps timestamps as epoch-millisecond strings and the
//! durable store as epoch-millisecond integers; these helpers convert between
//! those and `chrono` values.

use chrono::{DateTime, TimeZone, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    now().timestamp_millis()
}

/// Convert epoch milliseconds to a UTC timestamp
///
/// Out-of-range values clamp to the Unix epoch.
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_default()
}

/// Parse an epoch-millisecond string as written to the cache store
pub fn parse_millis(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok().filter(|ms| *ms > 0)
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[tokio::test]
    async fn test_now_millis_advances() {
        let t1 = now_millis();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let t2 = now_millis();
        assert!(t2 > t1);
    }

    #[test]
    fn test_millis_round_trip_through_datetime() {
        let dt = millis_to_datetime(1_700_000_000_123);
        assert_eq!(dt.timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn test_parse_millis() {
        assert_eq!(parse_millis("300"), Some(300));
        assert_eq!(parse_millis(" 1700000000000 "), Some(1_700_000_000_000));
        assert_eq!(parse_millis("0"), None);
        assert_eq!(parse_millis("soon"), None);
        assert_eq!(parse_millis(""), None);
    }

    #[test]
    fn test_millis_to_duration() {
        assert_eq!(millis_to_duration(1000), Duration::from_secs(1));
        assert_eq!(millis_to_duration(0).as_millis(), 0);
    }
}
