//! Local-time helpers for the persona's timezone.

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc};
use std::collections::BTreeMap;

/// Convert a UTC instant into the persona's local time.
pub fn local_time(now: DateTime<Utc>, utc_offset_minutes: i32) -> DateTime<FixedOffset> {
    // Out-of-range offsets fall back to UTC.
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60).unwrap_or(Utc.fix());
    now.with_timezone(&offset)
}

/// Midnight through 05:59 local.
pub fn is_late_night(local: &DateTime<FixedOffset>) -> bool {
    local.hour() < 6
}

/// Coarse part of the day, used in the prompt's time context.
pub fn hour_bucket(local: &DateTime<FixedOffset>) -> &'static str {
    match local.hour() {
        0..=5 => "late night",
        6..=7 => "early morning",
        8..=11 => "morning",
        12..=16 => "afternoon",
        17..=20 => "evening",
        _ => "night",
    }
}

/// Label of a configured special day (`MM-DD` keys) falling on this date.
pub fn special_day<'a>(
    local: &DateTime<FixedOffset>,
    days: &'a BTreeMap<String, String>,
) -> Option<&'a str> {
    let key = format!("{:02}-{:02}", local.month(), local.day());
    days.get(&key).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 14, h, m, 0).unwrap()
    }

    #[test]
    fn test_local_time_offset() {
        // 18:00 UTC is 23:30 IST.
        let local = local_time(utc(18, 0), 330);
        assert_eq!(local.hour(), 23);
        assert_eq!(local.minute(), 30);
        assert!(!is_late_night(&local));
        assert_eq!(hour_bucket(&local), "night");
    }

    #[test]
    fn test_late_night_window() {
        assert!(is_late_night(&local_time(utc(0, 0), 0)));
        assert!(is_late_night(&local_time(utc(5, 30), 0)));
        assert!(!is_late_night(&local_time(utc(6, 0), 0)));
        assert!(!is_late_night(&local_time(utc(23, 30), 0)));
        // 00:15 UTC is 05:45 IST.
        assert!(is_late_night(&local_time(utc(0, 15), 330)));
    }

    #[test]
    fn test_hour_buckets() {
        assert_eq!(hour_bucket(&local_time(utc(4, 0), 0)), "late night");
        assert_eq!(hour_bucket(&local_time(utc(5, 30), 0)), "late night");
        assert_eq!(hour_bucket(&local_time(utc(6, 30), 0)), "early morning");
        assert_eq!(hour_bucket(&local_time(utc(23, 0), 0)), "night");
        assert_eq!(hour_bucket(&local_time(utc(9, 0), 0)), "morning");
        assert_eq!(hour_bucket(&local_time(utc(13, 0), 0)), "afternoon");
        assert_eq!(hour_bucket(&local_time(utc(18, 0), 0)), "evening");
        assert!(!is_late_night(&local_time(utc(22, 59), 0)));
    }

    #[test]
    fn test_special_day() {
        let mut days = BTreeMap::new();
        days.insert("08-15".to_string(), "Independence Day".to_string());
        // 20:00 UTC on the 14th is already the 15th in IST.
        let local = local_time(utc(20, 0), 330);
        assert_eq!(special_day(&local, &days), Some("Independence Day"));
        assert_eq!(special_day(&local_time(utc(10, 0), 330), &days), None);
    }
}
