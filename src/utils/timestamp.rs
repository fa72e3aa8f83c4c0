//! Wall-clock helpers for key expiry
//!
//! Expiry timestamps are absolute unix-millis throughout the server; this is
//! the single place that reads the clock.

use chrono::Utc;

/// Current wall-clock time as unix milliseconds.
pub fn now_unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_past_2020() {
        // 2020-01-01T00:00:00Z in unix-millis
        assert!(now_unix_millis() > 1_577_836_800_000);
    }
}
