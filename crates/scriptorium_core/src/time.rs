//! Time types for SCRIPTORIUM.
//!
//! Timestamps are metadata on artifacts and log records. Execution pacing
//! uses the runtime's monotonic clock, never these values.

use serde::{Deserialize, Serialize};

/// Wall clock timestamp - for record metadata only, not for execution logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds since the Unix epoch
    pub seconds: u64,
    /// Nanosecond remainder
    pub nanos: u32,
}

impl Timestamp {
    /// Maximum nanoseconds per second
    pub const NANOS_PER_SEC: u32 = 1_000_000_000;

    /// Create a new timestamp
    #[must_use]
    pub const fn new(seconds: u64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    /// Get current timestamp
    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards");
        Self {
            seconds: duration.as_secs(),
            nanos: duration.subsec_nanos(),
        }
    }

    /// Convert to milliseconds
    #[must_use]
    pub const fn as_millis(&self) -> u128 {
        self.seconds as u128 * 1_000 + self.nanos as u128 / 1_000_000
    }

    /// Get duration since another timestamp (saturating at zero)
    #[must_use]
    pub fn duration_since(&self, earlier: &Timestamp) -> std::time::Duration {
        let mut seconds = self.seconds.saturating_sub(earlier.seconds);
        let mut nanos = i64::from(self.nanos) - i64::from(earlier.nanos);

        if nanos < 0 {
            if seconds == 0 {
                return std::time::Duration::ZERO;
            }
            seconds -= 1;
            nanos += i64::from(Self::NANOS_PER_SEC);
        }

        std::time::Duration::new(seconds, nanos as u32)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_new() {
        let ts = Timestamp::new(100, 500_000_000);
        assert_eq!(ts.seconds, 100);
        assert_eq!(ts.nanos, 500_000_000);
    }

    #[test]
    fn test_timestamp_now_nonzero() {
        let ts = Timestamp::now();
        assert!(ts.seconds > 0);
    }

    #[test]
    fn test_timestamp_as_millis() {
        let ts = Timestamp::new(2, 500_000_000);
        assert_eq!(ts.as_millis(), 2_500);
    }

    #[test]
    fn test_timestamp_duration_since() {
        let earlier = Timestamp::new(10, 750_000_000);
        let later = Timestamp::new(12, 250_000_000);
        let d = later.duration_since(&earlier);
        assert_eq!(d, std::time::Duration::new(1, 500_000_000));
    }

    #[test]
    fn test_timestamp_duration_since_saturates() {
        let earlier = Timestamp::new(10, 0);
        let later = Timestamp::new(12, 0);
        assert_eq!(earlier.duration_since(&later), std::time::Duration::ZERO);
    }

    #[test]
    fn test_timestamp_ordering() {
        let a = Timestamp::new(1, 999_999_999);
        let b = Timestamp::new(2, 0);
        assert!(a < b);
    }
}
