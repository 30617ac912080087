//! Wall-clock access and local-day boundary math.
//!
//! # Responsibility
//! - Provide the current time behind a `Clock` seam.
//! - Map epoch milliseconds to local dates and local midnights for an IANA
//!   time zone.
//!
//! # Invariants
//! - "Start of today" is the first instant of the local calendar day, even
//!   when a DST transition skips local midnight.
//! - Helpers never panic on out-of-range timestamps.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

const MIDNIGHT_SEARCH_STEP_MINUTES: i64 = 15;
const MIDNIGHT_SEARCH_LIMIT_MINUTES: i64 = 180;

/// Source of the current time.
pub trait Clock {
    /// Current time as Unix epoch milliseconds.
    fn now_ms(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

/// Local calendar date of `epoch_ms` in `tz`.
pub fn local_date(tz: Tz, epoch_ms: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .unwrap_or_default()
        .with_timezone(&tz)
        .date_naive()
}

/// Epoch milliseconds of the start of the local day containing `epoch_ms`.
pub fn start_of_local_day_ms(tz: Tz, epoch_ms: i64) -> i64 {
    local_midnight_ms(tz, local_date(tz, epoch_ms))
}

/// Milliseconds from `now_ms` until the next local midnight in `tz`.
///
/// Always positive: exactly at midnight the answer is the following one.
pub fn ms_until_next_local_midnight(tz: Tz, now_ms: i64) -> i64 {
    let today = local_date(tz, now_ms);
    let tomorrow = today.succ_opt().unwrap_or(today);
    (local_midnight_ms(tz, tomorrow) - now_ms).max(1)
}

fn local_midnight_ms(tz: Tz, date: NaiveDate) -> i64 {
    let midnight = NaiveDateTime::new(date, NaiveTime::MIN);
    let mut offset = 0;
    while offset <= MIDNIGHT_SEARCH_LIMIT_MINUTES {
        let candidate = midnight + Duration::minutes(offset);
        if let Some(instant) = tz.from_local_datetime(&candidate).earliest() {
            return instant.timestamp_millis();
        }
        offset += MIDNIGHT_SEARCH_STEP_MINUTES;
    }
    midnight.and_utc().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::{local_date, ms_until_next_local_midnight, start_of_local_day_ms};
    use chrono::{NaiveDate, TimeZone, Utc};
    use chrono_tz::Tz;

    fn utc_ms(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn local_date_follows_zone_offset() {
        let tz: Tz = "Asia/Tokyo".parse().unwrap();
        // 2026-10-18 20:00 UTC is 2026-10-19 05:00 in Tokyo.
        let now = utc_ms(2026, 10, 18, 20, 0);
        assert_eq!(
            local_date(tz, now),
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
        );
    }

    #[test]
    fn start_of_day_uses_local_midnight() {
        let tz: Tz = "America/New_York".parse().unwrap();
        let now = utc_ms(2026, 10, 19, 15, 30);
        // New York is UTC-4 in October.
        assert_eq!(start_of_local_day_ms(tz, now), utc_ms(2026, 10, 19, 4, 0));
    }

    #[test]
    fn ms_until_midnight_counts_to_next_local_day() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        // 21:00 UTC is 23:00 in Berlin (UTC+2 before the October switch).
        let now = utc_ms(2026, 10, 19, 21, 0);
        assert_eq!(ms_until_next_local_midnight(tz, now), 60 * 60 * 1000);
    }

    #[test]
    fn exactly_midnight_waits_a_full_day() {
        let tz: Tz = "UTC".parse().unwrap();
        let now = utc_ms(2026, 10, 19, 0, 0);
        assert_eq!(ms_until_next_local_midnight(tz, now), 24 * 60 * 60 * 1000);
    }

    #[test]
    fn skipped_midnight_starts_at_first_valid_instant() {
        // Santiago moved clocks from 00:00 to 01:00 on 2022-09-11.
        let tz: Tz = "America/Santiago".parse().unwrap();
        let now = utc_ms(2022, 9, 11, 12, 0);
        let start = start_of_local_day_ms(tz, now);
        assert_eq!(start, utc_ms(2022, 9, 11, 4, 0));
    }
}
