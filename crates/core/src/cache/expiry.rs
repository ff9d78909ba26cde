//! Expiration arithmetic shared by every read and write path.
//!
//! The backend never filters expired items, so the adapter decides liveness
//! itself. All of those decisions go through [`is_expired`].

use std::time::Duration;

use chrono::{DateTime, Months, Utc};

/// How far in the future `forever` items expire.
pub const FOREVER_YEARS: u32 = 5;

/// Computes the absolute expiration (epoch seconds) for an item written at `now`.
///
/// A TTL shorter than one second yields `now`: the item is stored but is
/// already expired when read back.
pub fn expiration_for(now: DateTime<Utc>, ttl: Duration) -> i64 {
    let seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    if seconds > 0 {
        now.timestamp().saturating_add(seconds)
    } else {
        now.timestamp()
    }
}

/// Expiration used for `forever`: now plus [`FOREVER_YEARS`] calendar years.
pub fn forever_expiration(now: DateTime<Utc>) -> i64 {
    now.checked_add_months(Months::new(FOREVER_YEARS * 12))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
        .timestamp()
}

/// Returns true if an item with the given expiration is logically absent at `now`.
///
/// An item without an expiration was not written by this adapter and is
/// treated as absent.
pub fn is_expired(expires_at: Option<i64>, now: i64) -> bool {
    match expires_at {
        Some(expires_at) => now >= expires_at,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_expiration_adds_ttl_seconds() {
        let now = fixed_now();
        assert_eq!(
            expiration_for(now, Duration::from_secs(600)),
            now.timestamp() + 600
        );
    }

    #[test]
    fn test_zero_ttl_expires_now() {
        let now = fixed_now();
        assert_eq!(expiration_for(now, Duration::ZERO), now.timestamp());
    }

    #[test]
    fn test_sub_second_ttl_expires_now() {
        let now = fixed_now();
        assert_eq!(
            expiration_for(now, Duration::from_millis(900)),
            now.timestamp()
        );
    }

    #[test]
    fn test_forever_is_five_calendar_years() {
        let now = fixed_now();
        let expected = Utc.with_ymd_and_hms(2029, 6, 15, 10, 30, 0).unwrap();
        assert_eq!(forever_expiration(now), expected.timestamp());
    }

    #[test]
    fn test_expired_at_boundary() {
        assert!(is_expired(Some(100), 100));
        assert!(is_expired(Some(100), 101));
        assert!(!is_expired(Some(100), 99));
    }

    #[test]
    fn test_missing_expiration_is_expired() {
        assert!(is_expired(None, 0));
    }
}
