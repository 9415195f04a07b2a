//! Loose date interpretation for expiry phrases found in emails

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

/// Whole-string date layouts tried in order
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%A, %B %d, %Y",
    "%a, %b %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// "<Month> <day>[,] <year>" anywhere in the text
static MONTH_DAY_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z]+)\s+(\d+),?\s+(\d{4})").unwrap());

/// Parse a loosely formatted date; `None` when nothing recognisable is found
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    parse_calendar_date(text).or_else(|| parse_month_day_year(text))
}

/// Generic parsing of the whole string as a date or timestamp
fn parse_calendar_date(text: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.date_naive());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Rebuild "<Month> <day>, <year>" from the captured groups and parse that
fn parse_month_day_year(text: &str) -> Option<NaiveDate> {
    let caps = MONTH_DAY_YEAR.captures(text)?;
    let rebuilt = format!("{} {}, {}", &caps[1], &caps[2], &caps[3]);
    NaiveDate::parse_from_str(&rebuilt, "%B %d, %Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_name_dates() {
        assert_eq!(parse_date("Jun 6, 2025"), Some(ymd(2025, 6, 6)));
        assert_eq!(parse_date("June 15, 2025"), Some(ymd(2025, 6, 15)));
        assert_eq!(parse_date("December 1 2024"), Some(ymd(2024, 12, 1)));
    }

    #[test]
    fn test_numeric_and_timestamp_dates() {
        assert_eq!(parse_date("2025-06-15"), Some(ymd(2025, 6, 15)));
        assert_eq!(parse_date("06/15/2025"), Some(ymd(2025, 6, 15)));
        assert_eq!(parse_date("2025-06-15T23:59:59Z"), Some(ymd(2025, 6, 15)));
        assert_eq!(parse_date("Sun, 15 Jun 2025 10:00:00 +0000"), Some(ymd(2025, 6, 15)));
    }

    #[test]
    fn test_embedded_month_day_year() {
        assert_eq!(parse_date("offer ends Jun 6, 2025 at midnight"), Some(ymd(2025, 6, 6)));
    }

    #[test]
    fn test_unparsable() {
        assert_eq!(parse_date("garbage"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("Foo 12, 2025"), None);
        assert_eq!(parse_date("February 30, 2025"), None);
    }

    #[test]
    fn test_missing_year_is_not_guessed() {
        assert_eq!(parse_date("June 15"), None);
    }
}
