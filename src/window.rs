//! Splits a date range into calendar-month search windows.
//!
//! The full-archive endpoint caps how much a single query returns, so a busy
//! account's history is walked one month at a time. Month boundaries are
//! computed in a fixed local timezone and then held as UTC instants.

use std::fmt;

use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::SAFETY_MARGIN_HOURS;

/// Wire format for `start_time`/`end_time`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A closed interval `[start, end]` with millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn start_param(&self) -> String {
        self.start.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format(TIMESTAMP_FORMAT).to_string()
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start_param(), self.end_param())
    }
}

/// Plan the month-sized windows covering `start..=end` (whole days in `tz`).
///
/// The first window opens at local midnight of `start`, each following one at
/// local midnight of the 1st of its month. Every window but the last closes
/// 1ms before the next opens. The last closes at the end of `end`, or at
/// `now` minus the safety margin if that comes first.
///
/// Returns no windows when the range is empty after clamping.
pub fn plan_windows(start: NaiveDate, end: NaiveDate, now: DateTime<Utc>, tz: Tz) -> Vec<Window> {
    let one_ms = Duration::milliseconds(1);

    let range_start = local_midnight(&tz, start);
    let end_of_range = match end.checked_add_days(Days::new(1)) {
        Some(next_day) => local_midnight(&tz, next_day) - one_ms,
        None => local_midnight(&tz, end),
    };
    let range_end = end_of_range.min(now - Duration::hours(SAFETY_MARGIN_HOURS));

    if range_start >= range_end {
        return Vec::new();
    }

    let mut windows = Vec::new();
    let mut window_start = range_start;
    let mut month = first_of_month(start);

    loop {
        let next_start = month
            .checked_add_months(Months::new(1))
            .map(|next_month| (next_month, local_midnight(&tz, next_month)));

        match next_start {
            Some((next_month, next_start)) if next_start < range_end => {
                windows.push(Window {
                    start: window_start,
                    end: next_start - one_ms,
                });
                window_start = next_start;
                month = next_month;
            }
            _ => {
                windows.push(Window {
                    start: window_start,
                    end: range_end,
                });
                break;
            }
        }
    }

    windows
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Midnight at the start of `date` in `tz`, as a UTC instant.
///
/// Where a DST jump skips midnight, the day starts at the first local time
/// that exists, probed in 15 minute steps.
fn local_midnight(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);

    (0..=96)
        .map(|quarter| naive + Duration::minutes(15 * quarter))
        .find_map(|candidate| tz.from_local_datetime(&candidate).earliest())
        .map_or_else(
            || tz.from_utc_datetime(&naive).with_timezone(&Utc),
            |local| local.with_timezone(&Utc),
        )
}
