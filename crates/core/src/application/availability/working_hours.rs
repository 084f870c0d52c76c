// Working hours expansion: weekly local-time rows -> concrete UTC ranges

use super::interval;
use crate::domain::{TimeRange, WorkingHours, DAY_MS, MINUTE_MS};

/// 1970-01-01 was a Thursday (weekday 3 with Monday = 0)
const EPOCH_WEEKDAY: i64 = 3;

pub const DEFAULT_START_MINUTE: u32 = 9 * 60;
pub const DEFAULT_END_MINUTE: u32 = 17 * 60;

/// Monday to Friday, 09:00-17:00 in the user's own offset
pub fn default_hours(tenant_id: &str, user_id: &str, utc_offset_minutes: i32) -> Vec<WorkingHours> {
    (0u8..5)
        .map(|weekday| WorkingHours {
            tenant_id: tenant_id.to_string(),
            user_id: user_id.to_string(),
            weekday,
            start_minute: DEFAULT_START_MINUTE,
            end_minute: DEFAULT_END_MINUTE,
            utc_offset_minutes,
        })
        .collect()
}

/// Local calendar day (days since epoch) of an instant at the given offset
pub fn local_day(instant: i64, utc_offset_minutes: i32) -> i64 {
    (instant + utc_offset_minutes as i64 * MINUTE_MS).div_euclid(DAY_MS)
}

/// Weekday of a local day, 0 = Monday
pub fn weekday_of(day: i64) -> u8 {
    (day + EPOCH_WEEKDAY).rem_euclid(7) as u8
}

/// Concrete working ranges inside `window`
pub fn expand(hours: &[WorkingHours], window: TimeRange) -> Vec<TimeRange> {
    if window.is_empty() {
        return Vec::new();
    }

    let mut ranges = Vec::new();
    for row in hours {
        let offset_ms = row.utc_offset_minutes as i64 * MINUTE_MS;
        let first_day = local_day(window.start, row.utc_offset_minutes);
        let last_day = local_day(window.end - 1, row.utc_offset_minutes);

        for day in first_day..=last_day {
            if weekday_of(day) != row.weekday {
                continue;
            }
            let midnight_utc = day * DAY_MS - offset_ms;
            ranges.push(TimeRange::from_bounds(
                midnight_utc + row.start_minute as i64 * MINUTE_MS,
                midnight_utc + row.end_minute as i64 * MINUTE_MS,
            ));
        }
    }

    interval::clip(&ranges, window)
}
