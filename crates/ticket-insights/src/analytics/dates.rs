//! Defensive parsing of textual ticket dates and minute counts.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

static BR_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("dd/mm/yyyy regex is valid")
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Generic machine formats: RFC 3339 / ISO 8601 and year-first dates.
///
/// Slash dates with the day or month first are not accepted here; they are
/// ambiguous and handled by [`parse_br_date`].
pub fn parse_generic_date(value: &str) -> Option<NaiveDateTime> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }
    // Offset-bearing timestamps land on the local clock, like period windows
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Strict `dd/mm/yyyy` (one or two digit day and month), at midnight.
pub fn parse_br_date(value: &str) -> Option<NaiveDateTime> {
    let caps = BR_DATE_RE.captures(value.trim())?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)
}

/// Two-stage ticket date parse: generic formats first, then `dd/mm/yyyy`.
pub fn parse_ticket_date(value: &str) -> Option<NaiveDateTime> {
    parse_generic_date(value).or_else(|| parse_br_date(value))
}

/// Parse a minute count that may use a comma decimal separator.
pub fn parse_minutes(value: &str) -> Option<f64> {
    let normalized = value.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_generic_formats() {
        assert_eq!(parse_generic_date("2024-03-05"), Some(ymd(2024, 3, 5)));
        assert_eq!(
            parse_generic_date("2024-03-05 14:30:00"),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(14, 30, 0)
        );
        assert!(parse_generic_date("2024-03-05T10:00:00Z").is_some());
        assert_eq!(parse_generic_date("05/03/2024"), None);
    }

    #[test]
    fn test_offset_timestamps_use_local_clock() {
        let parsed = parse_generic_date("2024-03-05T23:30:00-03:00").unwrap();
        let expected = DateTime::parse_from_rfc3339("2024-03-06T02:30:00Z")
            .unwrap()
            .with_timezone(&Local)
            .naive_local();
        assert_eq!(parsed, expected);
        assert_eq!(
            parse_generic_date("2024-03-05T10:00:00Z"),
            parse_ticket_date("2024-03-05T07:00:00-03:00")
        );
    }

    #[test]
    fn test_br_dates() {
        assert_eq!(parse_br_date("5/3/2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_br_date("31/02/2024"), None);
        assert_eq!(parse_br_date("2024-03-05"), None);
    }

    #[test]
    fn test_ticket_date_two_stages() {
        assert_eq!(parse_ticket_date("25/12/2023"), Some(ymd(2023, 12, 25)));
        assert_eq!(parse_ticket_date("2023-12-25"), Some(ymd(2023, 12, 25)));
        assert_eq!(parse_ticket_date("ontem"), None);
        assert_eq!(parse_ticket_date(""), None);
    }

    #[test]
    fn test_minutes() {
        assert_eq!(parse_minutes("12,5"), Some(12.5));
        assert_eq!(parse_minutes(" 30 "), Some(30.0));
        assert_eq!(parse_minutes("n/a"), None);
        assert_eq!(parse_minutes(""), None);
    }
}
