//! Date and timestamp parsing shared by the subscription and rating rules.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::input::DataTable;

/// Date-only layouts, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Date-time layouts, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse a calendar date or date-time cell.
///
/// Returns `None` for null-like cells and anything no layout accepts.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if DataTable::is_null_value(trimmed) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Parse a timestamp cell: a compact `YYYYMMDD` date, integer epoch
/// seconds, or any date layout.
///
/// Eight-digit integers that form a valid calendar date are read as dates.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.len() == 8 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y%m%d") {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    if let Ok(secs) = trimmed.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc());
    }
    parse_datetime(trimmed)
}

/// Render a parsed date back to text, dropping a midnight time component.
pub fn format_datetime(value: NaiveDateTime) -> String {
    if value.time() == NaiveTime::MIN {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_time(NaiveTime::MIN);
        assert_eq!(parse_datetime("2024-01-15"), Some(expected));
        assert_eq!(parse_datetime("2024/01/15"), Some(expected));
        assert_eq!(parse_datetime("01/15/2024"), Some(expected));
        assert_eq!(parse_datetime(" 2024-01-15 "), Some(expected));
    }

    #[test]
    fn test_parse_datetime_with_time() {
        let dt = parse_datetime("2024-01-15 13:45:00").unwrap();
        assert_eq!(format_datetime(dt), "2024-01-15 13:45:00");
        assert!(parse_datetime("2024-01-15T13:45:00Z").is_some());
    }

    #[test]
    fn test_unparseable_dates() {
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("NA"), None);
        assert_eq!(parse_datetime("not a date"), None);
        assert_eq!(parse_datetime("2024-13-45"), None);
    }

    #[test]
    fn test_epoch_timestamps() {
        let one = parse_timestamp("1").unwrap();
        let two = parse_timestamp("2").unwrap();
        assert!(one < two);
        assert!(parse_timestamp("2024-03-01 10:00:00").is_some());
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_format_midnight_as_date() {
        let dt = parse_datetime("2024-02-05").unwrap();
        assert_eq!(format_datetime(dt), "2024-02-05");
    }

    #[test]
    fn test_compact_dates_are_not_epoch_seconds() {
        let compact = parse_timestamp("20240101").unwrap();
        assert_eq!(format_datetime(compact), "2024-01-01");
        assert!(compact > parse_timestamp("2023-06-01").unwrap());

        // Not a calendar date, so it stays epoch seconds
        assert_eq!(
            parse_timestamp("99999999"),
            DateTime::from_timestamp(99_999_999, 0).map(|dt| dt.naive_utc())
        );
    }
}
