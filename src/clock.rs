//! Time source
//!
//! Window and month boundaries are computed from a [`Clock`] so they can be
//! driven deterministically in tests.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;

/// Wall-clock time source
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System UTC clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Last instant (23:59:59 on the last day) of the month containing `now`, UTC
pub fn end_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = (now.year(), now.month());
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };

    match first_of_next.and_then(|d| d.and_hms_opt(0, 0, 0)) {
        Some(midnight) => Utc.from_utc_datetime(&midnight) - Duration::seconds(1),
        // Only reachable at the end of chrono's representable range
        None => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_end_of_month() {
        assert_eq!(end_of_month(utc(2026, 1, 15, 8, 0, 0)), utc(2026, 1, 31, 23, 59, 59));
        assert_eq!(end_of_month(utc(2026, 2, 1, 0, 0, 0)), utc(2026, 2, 28, 23, 59, 59));
        assert_eq!(end_of_month(utc(2028, 2, 10, 0, 0, 0)), utc(2028, 2, 29, 23, 59, 59));
        assert_eq!(end_of_month(utc(2026, 12, 31, 23, 59, 59)), utc(2026, 12, 31, 23, 59, 59));
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(utc(2026, 3, 1, 12, 0, 0));
        clock.advance(Duration::milliseconds(1500));
        assert_eq!(clock.now(), utc(2026, 3, 1, 12, 0, 1) + Duration::milliseconds(500));

        clock.set(utc(2026, 4, 1, 0, 0, 0));
        assert_eq!(clock.now(), utc(2026, 4, 1, 0, 0, 0));
    }
}
