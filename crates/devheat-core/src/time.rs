//! Calendar date types for activity data.
//!
//! This module provides [`CalendarDate`] parsing, conversion of Unix epoch
//! timestamps to UTC calendar dates, and [`DateRange`] for the inclusive
//! window a heatmap covers.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A day on the calendar, without time of day or timezone.
pub type CalendarDate = NaiveDate;

/// Number of days covered by the default heatmap window.
pub const DEFAULT_WINDOW_DAYS: i64 = 365;

/// Format used for calendar dates on the wire.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Error returned when a date parameter cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date {input:?}, expected YYYY-MM-DD")]
pub struct DateParseError {
    input: String,
}

impl DateParseError {
    /// Returns the input that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Parses a calendar date.
///
/// Accepts `YYYY-MM-DD`. A full RFC 3339 timestamp is also accepted and
/// truncated to its UTC date.
pub fn parse_calendar_date(input: &str) -> Result<CalendarDate, DateParseError> {
    let trimmed = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| DateParseError {
            input: input.to_string(),
        })
}

/// Converts Unix epoch seconds to the UTC calendar date containing it.
///
/// Returns `None` for timestamps outside chrono's representable range.
pub fn date_from_epoch_seconds(seconds: i64) -> Option<CalendarDate> {
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.date_naive())
}

/// Returns the current UTC calendar date.
pub fn today_utc() -> CalendarDate {
    Utc::now().date_naive()
}

/// An inclusive range of calendar dates `[from, to]`.
///
/// A range with `from > to` is valid and simply contains no dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range (inclusive).
    pub from: CalendarDate,
    /// Last day of the range (inclusive).
    pub to: CalendarDate,
}

impl DateRange {
    /// Creates a new date range.
    pub fn new(from: CalendarDate, to: CalendarDate) -> Self {
        Self { from, to }
    }

    /// The default window: the [`DEFAULT_WINDOW_DAYS`] days before `today`, through `today`.
    pub fn trailing_year(today: CalendarDate) -> Self {
        Self {
            from: today - Duration::days(DEFAULT_WINDOW_DAYS),
            to: today,
        }
    }

    /// Resolves optional `from`/`to` parameters against `today`.
    ///
    /// Each bound defaults independently to the trailing-year window.
    pub fn resolve(
        from: Option<&str>,
        to: Option<&str>,
        today: CalendarDate,
    ) -> Result<Self, DateParseError> {
        let default = Self::trailing_year(today);
        let from = from.map(parse_calendar_date).transpose()?;
        let to = to.map(parse_calendar_date).transpose()?;

        Ok(Self {
            from: from.unwrap_or(default.from),
            to: to.unwrap_or(default.to),
        })
    }

    /// Checks if a date falls within the range, both ends inclusive.
    pub fn contains(&self, date: CalendarDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// Returns true if the range contains no dates.
    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }

    /// Returns the number of days in the range.
    pub fn num_days(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            (self.to - self.from).num_days() as u64 + 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod parsing {
        use super::*;

        #[test]
        fn plain_date() {
            assert_eq!(parse_calendar_date("2024-01-15"), Ok(date(2024, 1, 15)));
            assert_eq!(parse_calendar_date(" 2024-01-15 "), Ok(date(2024, 1, 15)));
        }

        #[test]
        fn rfc3339_truncates_to_utc_date() {
            assert_eq!(
                parse_calendar_date("2024-01-15T23:30:00-02:00"),
                Ok(date(2024, 1, 16))
            );
            assert_eq!(
                parse_calendar_date("2024-01-15T08:00:00Z"),
                Ok(date(2024, 1, 15))
            );
        }

        #[test]
        fn rejects_garbage() {
            let err = parse_calendar_date("yesterday").unwrap_err();
            assert_eq!(err.input(), "yesterday");
            assert!(parse_calendar_date("2024-13-01").is_err());
            assert!(parse_calendar_date("2024-02-30").is_err());
            assert!(parse_calendar_date("").is_err());
        }

        #[test]
        fn error_message() {
            let err = parse_calendar_date("01/15/2024").unwrap_err();
            insta::assert_snapshot!(err.to_string(), @r#"invalid date "01/15/2024", expected YYYY-MM-DD"#);
        }
    }

    mod epoch {
        use super::*;

        #[test]
        fn midnight_utc() {
            // 2023-11-14T22:13:20Z
            assert_eq!(date_from_epoch_seconds(1_700_000_000), Some(date(2023, 11, 14)));
            assert_eq!(date_from_epoch_seconds(1_704_067_200), Some(date(2024, 1, 1)));
            assert_eq!(date_from_epoch_seconds(1_704_153_599), Some(date(2024, 1, 1)));
        }

        #[test]
        fn epoch_zero() {
            assert_eq!(date_from_epoch_seconds(0), Some(date(1970, 1, 1)));
        }

        #[test]
        fn out_of_range() {
            assert_eq!(date_from_epoch_seconds(i64::MAX), None);
        }
    }

    mod date_range {
        use super::*;

        #[test]
        fn trailing_year() {
            let range = DateRange::trailing_year(date(2024, 6, 1));
            assert_eq!(range.from, date(2023, 6, 2));
            assert_eq!(range.to, date(2024, 6, 1));
            assert_eq!(range.num_days(), 366);
        }

        #[test]
        fn contains_is_inclusive() {
            let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31));
            assert!(range.contains(date(2024, 1, 1)));
            assert!(range.contains(date(2024, 1, 15)));
            assert!(range.contains(date(2024, 1, 31)));
            assert!(!range.contains(date(2023, 12, 31)));
            assert!(!range.contains(date(2024, 2, 1)));
        }

        #[test]
        fn single_day() {
            let range = DateRange::new(date(2024, 1, 15), date(2024, 1, 15));
            assert!(!range.is_empty());
            assert_eq!(range.num_days(), 1);
            assert!(range.contains(date(2024, 1, 15)));
        }

        #[test]
        fn inverted_range_is_empty() {
            let range = DateRange::new(date(2024, 2, 1), date(2024, 1, 1));
            assert!(range.is_empty());
            assert_eq!(range.num_days(), 0);
            assert!(!range.contains(date(2024, 1, 15)));
        }

        #[test]
        fn resolve_defaults() {
            let today = date(2024, 6, 1);
            let range = DateRange::resolve(None, None, today).unwrap();
            assert_eq!(range, DateRange::trailing_year(today));

            let range = DateRange::resolve(Some("2024-01-01"), None, today).unwrap();
            assert_eq!(range.from, date(2024, 1, 1));
            assert_eq!(range.to, today);

            let range = DateRange::resolve(None, Some("2024-03-01"), today).unwrap();
            assert_eq!(range.from, date(2023, 6, 2));
            assert_eq!(range.to, date(2024, 3, 1));
        }

        #[test]
        fn resolve_rejects_bad_bound() {
            let today = date(2024, 6, 1);
            assert!(DateRange::resolve(Some("nope"), None, today).is_err());
            assert!(DateRange::resolve(None, Some("2024-02-31"), today).is_err());
        }
    }
}
