//! Date and kickoff-time parsing shared by the matchers and the store.
//!
//! Sources report kickoffs as RFC 3339 timestamps, naive datetimes, or bare
//! dates. Matching only needs the calendar date; window queries need an instant.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Calendar date of a timestamp, taken as written (time of day and zone are
/// trimmed, not converted).
pub fn normalize_date(value: &str) -> Option<NaiveDate> {
    let head = value.trim().get(..10)?;
    NaiveDate::parse_from_str(head, DATE_FORMAT).ok()
}

/// `YYYY-MM-DD` form of [`normalize_date`].
pub fn date_string(value: &str) -> Option<String> {
    normalize_date(value).map(|d| d.format(DATE_FORMAT).to_string())
}

/// Parse a kickoff time into an instant. Naive values are read as UTC and bare
/// dates as UTC midnight.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    if value.len() == 10 {
        let date = NaiveDate::parse_from_str(value, DATE_FORMAT).ok()?;
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    None
}

/// True if `token` is exactly a `YYYY-MM-DD` date.
pub fn is_date_token(token: &str) -> bool {
    token.len() == 10 && NaiveDate::parse_from_str(token, DATE_FORMAT).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_normalize_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 15);
        assert_eq!(normalize_date("2025-01-15"), expected);
        assert_eq!(normalize_date("2025-01-15T15:00:00Z"), expected);
        assert_eq!(normalize_date("2025-01-15T23:30:00+05:00"), expected);
        assert_eq!(normalize_date(" 2025-01-15 18:00 "), expected);
    }

    #[test]
    fn test_normalize_date_rejects_garbage() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("tomorrow"), None);
        assert_eq!(normalize_date("2025-13-45"), None);
        assert_eq!(normalize_date("15/01/2025"), None);
    }

    #[test]
    fn test_date_string() {
        assert_eq!(date_string("2025-11-30T14:00:00Z").as_deref(), Some("2025-11-30"));
        assert_eq!(date_string("nope"), None);
    }

    #[test]
    fn test_parse_timestamp() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 15, 15, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-01-15T15:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-15T16:00:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-15T15:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-15 15:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-01-15"),
            Some(Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("soon"), None);
    }

    #[test]
    fn test_is_date_token() {
        assert!(is_date_token("2025-11-30"));
        assert!(!is_date_token("Sampdoria"));
        assert!(!is_date_token("2025-11-3"));
    }
}
