//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as Unix epoch seconds
pub fn unix_seconds() -> i64 {
    Utc::now().timestamp()
}

/// Whether an epoch-seconds deadline has passed, treating anything within
/// `skew_secs` of expiry as already expired.
pub fn is_expired(expires_at: i64, skew_secs: i64) -> bool {
    unix_seconds() + skew_secs >= expires_at
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
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[test]
    fn test_unix_seconds_matches_now() {
        let a = unix_seconds();
        let b = now().timestamp();
        assert!((b - a).abs() <= 1);
    }

    #[test]
    fn test_is_expired_past_deadline() {
        assert!(is_expired(unix_seconds() - 10, 0));
    }

    #[test]
    fn test_is_expired_future_deadline() {
        assert!(!is_expired(unix_seconds() + 3600, 60));
    }

    #[test]
    fn test_is_expired_within_skew() {
        // 30s left but a 60s skew treats it as expired
        assert!(is_expired(unix_seconds() + 30, 60));
    }

    #[test]
    fn test_millis_to_duration() {
        assert_eq!(millis_to_duration(1000), Duration::from_secs(1));
        assert_eq!(millis_to_duration(0).as_millis(), 0);
    }
}
