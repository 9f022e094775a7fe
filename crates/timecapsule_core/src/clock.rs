//! Wall-clock access for time-gated decisions.
//!
//! # Responsibility
//! - Provide the single epoch-millisecond clock read used by services
//!   and the scheduler.
//!
//! # Invariants
//! - Callers read the clock once per decision and pass the value down,
//!   so every time-sensitive entry point stays testable via an
//!   explicit `_at(now_ms)` form.

use std::time::{SystemTime, UNIX_EPOCH};

/// Default creation offset when no reveal time is given: one year.
pub const ONE_YEAR_MS: i64 = 365 * 24 * 60 * 60 * 1000;

/// Current wall-clock time in epoch milliseconds.
///
/// A clock before the Unix epoch clamps to 0 rather than panicking.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{now_epoch_ms, ONE_YEAR_MS};

    #[test]
    fn now_is_positive_and_monotonic_enough() {
        let first = now_epoch_ms();
        let second = now_epoch_ms();
        assert!(first > 0);
        assert!(second >= first);
    }

    #[test]
    fn one_year_matches_365_days() {
        assert_eq!(ONE_YEAR_MS, 31_536_000_000);
    }
}
