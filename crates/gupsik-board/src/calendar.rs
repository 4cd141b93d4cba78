//! Selectable dates.

use crate::error::{Error, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Wire format of dates in API paths and storage keys.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Days offered before and after today.
const WINDOW_DAYS: i64 = 3;

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|_| Error::InvalidDate {
        input: input.to_string(),
    })
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// School days from three days before to three days after `today`.
///
/// Saturdays and Sundays are skipped; there is no lunch to review.
pub fn selectable_dates(today: NaiveDate) -> Vec<NaiveDate> {
    (-WINDOW_DAYS..=WINDOW_DAYS)
        .map(|offset| today + Duration::days(offset))
        .filter(|date| !matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}
