//! Office-hours calendar
//!
//! Answers "is it office hours": Monday through Friday, 09:00–17:00
//! US-Eastern. The Eastern offset is derived from the US daylight-saving
//! rule (second Sunday of March through first Sunday of November); when the
//! rule cannot be evaluated for a date the check falls back to an
//! approximate UTC window of 14:00–22:00.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc, Weekday};

/// Office-hours window in local Eastern time
const OFFICE_OPEN: (u32, u32) = (9, 0);
const OFFICE_CLOSE: (u32, u32) = (17, 0);

/// Approximate UTC fallback window when the Eastern offset is unavailable
const FALLBACK_OPEN_UTC: (u32, u32) = (14, 0);
const FALLBACK_CLOSE_UTC: (u32, u32) = (22, 0);

/// Office-hours and US-Eastern clock arithmetic
///
/// ```
/// use chatdesk_engine::routing::BusinessHours;
/// use chrono::{TimeZone, Utc};
///
/// // Wednesday 2025-06-04 15:00 UTC is 11:00 EDT: office hours.
/// let noonish = Utc.with_ymd_and_hms(2025, 6, 4, 15, 0, 0).unwrap();
/// assert!(BusinessHours::is_office_hours(noonish));
///
/// // Saturday is never office hours, whatever the clock says.
/// let saturday = Utc.with_ymd_and_hms(2025, 6, 7, 15, 0, 0).unwrap();
/// assert!(!BusinessHours::is_office_hours(saturday));
/// ```
pub struct BusinessHours;

impl BusinessHours {
    /// Whether the instant falls on Mon–Fri 09:00–17:00 US-Eastern
    pub fn is_office_hours(now: DateTime<Utc>) -> bool {
        match Self::eastern_offset(now) {
            Some(offset) => {
                let eastern = now.with_timezone(&offset);
                Self::is_business_day(eastern.weekday())
                    && within(eastern.time(), OFFICE_OPEN, OFFICE_CLOSE)
            }
            None => {
                Self::is_business_day(now.weekday())
                    && within(now.time(), FALLBACK_OPEN_UTC, FALLBACK_CLOSE_UTC)
            }
        }
    }

    /// Whether the weekday is a business day; ignores clock time
    pub fn is_business_day(weekday: Weekday) -> bool {
        !matches!(weekday, Weekday::Sat | Weekday::Sun)
    }

    /// US-Eastern UTC offset at the given instant: −4h during daylight
    /// saving, −5h otherwise
    ///
    /// Daylight saving runs from 07:00 UTC on the second Sunday of March
    /// (02:00 EST) to 06:00 UTC on the first Sunday of November (02:00
    /// EDT). Returns `None` only if the rule cannot be evaluated for the
    /// year, in which case callers use the UTC fallback window.
    pub fn eastern_offset(now: DateTime<Utc>) -> Option<FixedOffset> {
        let year = now.year();
        let dst_start = NaiveDate::from_weekday_of_month_opt(year, 3, Weekday::Sun, 2)?
            .and_hms_opt(7, 0, 0)?
            .and_utc();
        let dst_end = NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Sun, 1)?
            .and_hms_opt(6, 0, 0)?
            .and_utc();

        let hours = if now >= dst_start && now < dst_end { -4 } else { -5 };
        FixedOffset::east_opt(hours * 3600)
    }

    /// Minute of day on the US-Eastern clock, falling back to UTC
    ///
    /// Used to evaluate Eastern-anchored shift windows against the same
    /// clock the office-hours check uses.
    pub fn eastern_minute_of_day(now: DateTime<Utc>) -> u32 {
        let local = match Self::eastern_offset(now) {
            Some(offset) => now.with_timezone(&offset).time(),
            None => now.time(),
        };
        local.hour() * 60 + local.minute()
    }
}

fn within(time: NaiveTime, open: (u32, u32), close: (u32, u32)) -> bool {
    let minute = time.hour() * 60 + time.minute();
    minute >= open.0 * 60 + open.1 && minute < close.0 * 60 + close.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn summer_offset_is_edt() {
        let july = Utc.with_ymd_and_hms(2025, 7, 15, 12, 0, 0).unwrap();
        let offset = BusinessHours::eastern_offset(july).unwrap();
        assert_eq!(offset.local_minus_utc(), -4 * 3600);
    }

    #[test]
    fn winter_offset_is_est() {
        let january = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let offset = BusinessHours::eastern_offset(january).unwrap();
        assert_eq!(offset.local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn dst_boundaries_2025() {
        // 2025: DST starts March 9, ends November 2.
        let before = Utc.with_ymd_and_hms(2025, 3, 9, 6, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 3, 9, 7, 0, 0).unwrap();
        assert_eq!(BusinessHours::eastern_offset(before).unwrap().local_minus_utc(), -5 * 3600);
        assert_eq!(BusinessHours::eastern_offset(after).unwrap().local_minus_utc(), -4 * 3600);

        let still_dst = Utc.with_ymd_and_hms(2025, 11, 2, 5, 59, 0).unwrap();
        let ended = Utc.with_ymd_and_hms(2025, 11, 2, 6, 0, 0).unwrap();
        assert_eq!(BusinessHours::eastern_offset(still_dst).unwrap().local_minus_utc(), -4 * 3600);
        assert_eq!(BusinessHours::eastern_offset(ended).unwrap().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn office_hours_edges() {
        // Monday 2025-06-02; EDT (UTC-4), so 09:00 local is 13:00 UTC.
        let just_open = Utc.with_ymd_and_hms(2025, 6, 2, 13, 0, 0).unwrap();
        let just_before = Utc.with_ymd_and_hms(2025, 6, 2, 12, 59, 0).unwrap();
        let just_close = Utc.with_ymd_and_hms(2025, 6, 2, 21, 0, 0).unwrap();
        assert!(BusinessHours::is_office_hours(just_open));
        assert!(!BusinessHours::is_office_hours(just_before));
        assert!(!BusinessHours::is_office_hours(just_close));
    }

    #[test]
    fn weekend_is_closed() {
        let sunday = Utc.with_ymd_and_hms(2025, 6, 1, 15, 0, 0).unwrap();
        assert!(!BusinessHours::is_office_hours(sunday));
        assert!(!BusinessHours::is_business_day(Weekday::Sat));
        assert!(BusinessHours::is_business_day(Weekday::Fri));
    }

    #[test]
    fn eastern_minute_of_day_tracks_offset() {
        // 15:30 UTC in June is 11:30 EDT.
        let june = Utc.with_ymd_and_hms(2025, 6, 4, 15, 30, 0).unwrap();
        assert_eq!(BusinessHours::eastern_minute_of_day(june), 11 * 60 + 30);
    }
}
