// ABOUTME: Utilities for working with times and timestamps.
// ABOUTME: Provides RFC3339 formatting, read-time UTC normalization, and monotonic timers.
use ::time::format_description::well_known::Rfc3339;
use ::time::macros::format_description;
use ::time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};
use std::time::{Duration, Instant, SystemTime};

use crate::error::Error;

/// Get the current system time (note: not necessarily UTC)
///
/// # Examples
///
/// ```
/// use tc_core::utc_now;
/// let now = utc_now();
/// assert!(now.duration_since(std::time::UNIX_EPOCH).is_ok());
/// ```
pub fn utc_now() -> SystemTime {
    SystemTime::now()
}

/// Convert a SystemTime to an RFC3339 timestamp string
///
/// # Examples
///
/// ```
/// use tc_core::to_rfc3339;
/// use std::time::{SystemTime, UNIX_EPOCH, Duration};
///
/// let time = UNIX_EPOCH + Duration::from_secs(1_609_459_200); // 2021-01-01
/// let timestamp = to_rfc3339(time);
/// assert_eq!(timestamp, "2021-01-01T00:00:00Z");
/// ```
pub fn to_rfc3339(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Get current time as an RFC3339 formatted string
///
/// # Examples
///
/// ```
/// use tc_core::time::now_iso8601;
/// let timestamp = now_iso8601();
/// assert!(!timestamp.is_empty());
/// ```
pub fn now_iso8601() -> String {
    to_rfc3339(utc_now())
}

/// Storage adapter for the read path: rows inserted by hand or by an older schema version may
/// carry a naive ("no offset") timestamp instead of an RFC3339-with-offset one. This parses
/// either shape and always returns a value pinned to UTC, so callers never have to special-case
/// which kind of string ended up in the column.
///
/// # Examples
///
/// ```
/// use tc_core::time::parse_to_utc;
///
/// let aware = parse_to_utc("2024-01-01T00:00:00+02:00").unwrap();
/// let naive = parse_to_utc("2024-01-01 00:00:00").unwrap();
/// assert_ne!(aware, naive); // the +02:00 offset was normalized away from the aware one
/// ```
pub fn parse_to_utc(input: &str) -> crate::Result<OffsetDateTime> {
    if let Ok(aware) = OffsetDateTime::parse(input, &Rfc3339) {
        return Ok(aware.to_offset(UtcOffset::UTC));
    }

    let naive_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let naive = PrimitiveDateTime::parse(input.trim(), &naive_format)
        .map_err(|e| Error::Validation(format!("unparsable timestamp '{input}': {e}")))?;
    Ok(naive.assume_utc())
}

/// Seconds elapsed between a stored timestamp and now. Negative when `input` names a time still
/// in the future. Built on [`parse_to_utc`] so naive and non-UTC inputs are handled the same way.
pub fn seconds_since(input: &str) -> crate::Result<i64> {
    let then = parse_to_utc(input)?;
    Ok((OffsetDateTime::now_utc() - then).whole_seconds())
}

/// Create a monotonic duration measurer
///
/// # Examples
///
/// ```
/// use tc_core::MonotonicTimer;
/// use std::thread;
/// use std::time::Duration;
///
/// let timer = MonotonicTimer::new();
/// thread::sleep(Duration::from_millis(1));
/// let elapsed = timer.elapsed();
/// assert!(elapsed >= Duration::from_millis(1));
/// ```
pub struct MonotonicTimer {
    start: Instant,
}

impl MonotonicTimer {
    /// Create a new timer starting now
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time since creation
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Reset the timer to now
    pub fn reset(&mut self) {
        self.start = Instant::now();
    }
}

impl Default for MonotonicTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::UNIX_EPOCH;

    #[test]
    fn test_utc_now() {
        let now = utc_now();
        let duration_since_epoch = now.duration_since(UNIX_EPOCH).unwrap();
        // Should be a reasonable time (after 2020)
        assert!(duration_since_epoch.as_secs() > 1_577_836_800); // 2020-01-01
    }

    #[test]
    fn test_to_rfc3339() {
        let time = UNIX_EPOCH + Duration::from_secs(1_609_459_200); // 2021-01-01
        let timestamp = to_rfc3339(time);
        assert_eq!(timestamp, "2021-01-01T00:00:00Z");
    }

    #[test]
    fn test_monotonic_timer() {
        let timer = MonotonicTimer::new();
        thread::sleep(Duration::from_millis(1));
        let elapsed = timer.elapsed();
        // Timer should show some elapsed time, but be reasonable
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn parse_to_utc_normalizes_non_utc_offset() {
        let parsed = parse_to_utc("2024-01-01T02:00:00+02:00").unwrap();
        assert_eq!(parsed, OffsetDateTime::parse("2024-01-01T00:00:00Z", &Rfc3339).unwrap());
        assert_eq!(parsed.offset(), UtcOffset::UTC);
    }

    #[test]
    fn parse_to_utc_treats_naive_timestamp_as_utc() {
        let parsed = parse_to_utc("2024-01-01 00:00:00").unwrap();
        assert_eq!(parsed, OffsetDateTime::parse("2024-01-01T00:00:00Z", &Rfc3339).unwrap());
    }

    #[test]
    fn parse_to_utc_rejects_garbage() {
        assert!(parse_to_utc("not a timestamp").is_err());
    }

    #[test]
    fn seconds_since_is_positive_for_the_past_and_negative_for_the_future() {
        let past = to_rfc3339(UNIX_EPOCH + Duration::from_secs(1_609_459_200));
        assert!(seconds_since(&past).unwrap() > 0);

        let far_future = "2999-01-01T00:00:00Z";
        assert!(seconds_since(far_future).unwrap() < 0);
    }

    #[test]
    fn test_monotonic_timer_reset() {
        let mut timer = MonotonicTimer::new();
        thread::sleep(Duration::from_millis(1));
        let first_elapsed = timer.elapsed();
        timer.reset();
        let second_elapsed = timer.elapsed();
        // After reset, elapsed time should be less than before
        assert!(second_elapsed < first_elapsed);
    }
}
