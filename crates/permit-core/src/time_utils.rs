use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};

const SECONDS_PER_DAY: i64 = 86_400;

/// Naive datetime layouts accepted in input files, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse a date or datetime cell into a naive local datetime.
///
/// Accepts plain dates (interpreted as midnight), naive datetimes with a
/// space or `T` separator and RFC 3339 strings. Offsets are dropped after
/// the conversion to the wall-clock time they carry, so that all values
/// compare on the same naive timeline.
///
/// Returns `None` for unrecognised input; callers decide whether that is
/// fatal.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    // Replace trailing 'Z' with '+00:00'.
    let normalised = match s.strip_suffix('Z') {
        Some(stripped) => format!("{}+00:00", stripped),
        None => s.to_string(),
    };
    DateTime::parse_from_rfc3339(&normalised)
        .ok()
        .map(|dt| dt.naive_local())
}

// ── Day arithmetic ────────────────────────────────────────────────────────────

/// Whole days in `delta`, floored toward negative infinity.
///
/// A negative span of 90 minutes counts as -1 day, not 0.
pub fn floor_days(delta: TimeDelta) -> i64 {
    delta.num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Truncate a datetime to midnight of the same calendar day.
pub fn normalize(dt: NaiveDateTime) -> NaiveDate {
    dt.date()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_parse_plain_date_is_midnight() {
        assert_eq!(parse_datetime("2016-03-01"), Some(dt(2016, 3, 1, 0, 0, 0)));
    }

    #[test]
    fn test_parse_space_separated_datetime() {
        assert_eq!(
            parse_datetime("2016-03-01 14:05:09"),
            Some(dt(2016, 3, 1, 14, 5, 9))
        );
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let parsed = parse_datetime("2016-03-01T14:05:09.250").unwrap();
        assert_eq!(parsed.and_utc().timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_rfc3339_keeps_wall_clock() {
        assert_eq!(
            parse_datetime("2016-03-01T14:05:09+02:00"),
            Some(dt(2016, 3, 1, 14, 5, 9))
        );
        assert_eq!(
            parse_datetime("2016-03-01T14:05:09Z"),
            Some(dt(2016, 3, 1, 14, 5, 9))
        );
    }

    #[test]
    fn test_parse_rejects_garbage_and_empty() {
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("   "), None);
        assert_eq!(parse_datetime("01/03/2016"), None);
        assert_eq!(parse_datetime("not a date"), None);
    }

    #[test]
    fn test_floor_days_positive() {
        assert_eq!(floor_days(TimeDelta::hours(47)), 1);
        assert_eq!(floor_days(TimeDelta::days(34)), 34);
    }

    #[test]
    fn test_floor_days_negative_rounds_down() {
        assert_eq!(floor_days(TimeDelta::minutes(-90)), -1);
        assert_eq!(floor_days(TimeDelta::days(-2)), -2);
    }

    #[test]
    fn test_normalize_drops_time_of_day() {
        assert_eq!(
            normalize(dt(2016, 3, 1, 23, 59, 59)),
            NaiveDate::from_ymd_opt(2016, 3, 1).unwrap()
        );
    }
}
