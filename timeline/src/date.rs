//! Date normalization
//!
//! Series arrive with dates in whatever shape the upstream spreadsheet or
//! CSV produced: spreadsheet serial numbers, `DD/MM/YYYY` strings,
//! `YYYY-MM-DD` strings or native dates. Every supported encoding of the
//! same calendar day normalizes to the same [`CanonicalTimestamp`].

use crate::{Result, TimelineError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound (exclusive) of numbers treated as spreadsheet serials
pub const SERIAL_MIN: f64 = 40_000.0;
/// Upper bound (exclusive) of numbers treated as spreadsheet serials
pub const SERIAL_MAX: f64 = 50_000.0;

/// Formats tried when a string matches none of the dedicated shapes
const GENERIC_FORMATS: [&str; 5] = ["%d.%m.%Y", "%Y%m%d", "%Y/%m/%d", "%d %b %Y", "%b %d, %Y"];

/// A date value as found in an input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDateValue {
    /// Spreadsheet day serial (days since 1899-12-30)
    Serial(f64),
    /// Textual date in any supported layout
    Text(String),
    /// Already a calendar date
    Native(NaiveDate),
}

impl From<f64> for RawDateValue {
    fn from(value: f64) -> Self {
        RawDateValue::Serial(value)
    }
}

impl From<i64> for RawDateValue {
    fn from(value: i64) -> Self {
        RawDateValue::Serial(value as f64)
    }
}

impl From<&str> for RawDateValue {
    fn from(value: &str) -> Self {
        RawDateValue::Text(value.to_string())
    }
}

impl From<String> for RawDateValue {
    fn from(value: String) -> Self {
        RawDateValue::Text(value)
    }
}

impl From<NaiveDate> for RawDateValue {
    fn from(value: NaiveDate) -> Self {
        RawDateValue::Native(value)
    }
}

impl From<NaiveDateTime> for RawDateValue {
    fn from(value: NaiveDateTime) -> Self {
        RawDateValue::Native(value.date())
    }
}

impl From<DateTime<Utc>> for RawDateValue {
    fn from(value: DateTime<Utc>) -> Self {
        RawDateValue::Native(value.date_naive())
    }
}

impl fmt::Display for RawDateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawDateValue::Serial(serial) => write!(f, "{}", serial),
            RawDateValue::Text(text) => write!(f, "{}", text),
            RawDateValue::Native(date) => write!(f, "{}", date),
        }
    }
}

/// A calendar day on the canonical timeline (midnight UTC)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CanonicalTimestamp {
    epoch_millis: i64,
    iso_label: String,
    #[serde(skip)]
    date: NaiveDate,
}

impl CanonicalTimestamp {
    /// Create the canonical timestamp of a calendar day
    pub fn from_date(date: NaiveDate) -> Self {
        let epoch_millis = date.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
        Self {
            epoch_millis,
            iso_label: date.format("%Y-%m-%d").to_string(),
            date,
        }
    }

    /// ISO-8601 day label (`YYYY-MM-DD`)
    pub fn iso_label(&self) -> &str {
        &self.iso_label
    }

    /// Milliseconds since the Unix epoch at midnight UTC
    pub fn epoch_millis(&self) -> i64 {
        self.epoch_millis
    }

    /// The calendar day
    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Normalize one raw date value into the canonical timeline
///
/// Numbers in the open range (40000, 50000) are spreadsheet serials; any
/// other number is rejected. Strings containing `/` are read day-first,
/// strings containing `-` year-first, and anything else goes through a
/// list of generic layouts before failing with
/// [`TimelineError::UnparseableDate`].
pub fn normalize(raw: &RawDateValue) -> Result<CanonicalTimestamp> {
    let date = match raw {
        RawDateValue::Serial(serial) => {
            if serial.is_finite() && *serial > SERIAL_MIN && *serial < SERIAL_MAX {
                from_spreadsheet_serial(*serial)
            } else {
                None
            }
        }
        RawDateValue::Text(text) => parse_text(text),
        RawDateValue::Native(date) => Some(*date),
    };

    date.map(CanonicalTimestamp::from_date)
        .ok_or_else(|| TimelineError::unparseable(raw))
}

/// Convert a spreadsheet serial into a calendar day
///
/// Spreadsheets count 1900-02-29 as a real day, so serials past 60 are
/// counted from 1899-12-30 while earlier ones are counted from 1899-12-31.
/// Fractions (time of day) are dropped.
pub fn from_spreadsheet_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let days = serial.floor() as i64;
    let epoch = if days > 60 {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    };
    epoch.checked_add_signed(chrono::Duration::days(days))
}

fn parse_text(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let dedicated = if trimmed.contains('/') {
        parse_day_first(trimmed)
    } else if trimmed.contains('-') {
        parse_year_first(trimmed)
    } else {
        None
    };

    dedicated.or_else(|| parse_generic(trimmed))
}

/// `DD/MM/YYYY`, optionally followed by a time component
fn parse_day_first(text: &str) -> Option<NaiveDate> {
    let day_part = text.split_whitespace().next()?;
    let mut parts = day_part.split('/');
    let day = parts.next()?.trim().parse::<u32>().ok()?;
    let month = parts.next()?.trim().parse::<u32>().ok()?;
    let year = parts.next()?.trim().parse::<i32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `YYYY-MM-DD` or `YYYY-MM`, optionally followed by a time component
fn parse_year_first(text: &str) -> Option<NaiveDate> {
    let day_part = text.split(|c: char| c == 'T' || c.is_whitespace()).next()?;
    let parts: Vec<&str> = day_part.split('-').collect();
    match parts.as_slice() {
        [year, month, day] => NaiveDate::from_ymd_opt(
            year.parse().ok()?,
            month.parse().ok()?,
            day.parse().ok()?,
        ),
        [year, month] => NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1),
        _ => None,
    }
}

fn parse_generic(text: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.date_naive());
    }
    // Numeric cells that arrived as text
    if let Ok(serial) = text.parse::<f64>() {
        if serial > SERIAL_MIN && serial < SERIAL_MAX {
            return from_spreadsheet_serial(serial);
        }
    }
    GENERIC_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_serial_conversion() {
        assert_eq!(from_spreadsheet_serial(45366.0), Some(day(2024, 3, 15)));
        assert_eq!(from_spreadsheet_serial(45292.75), Some(day(2024, 1, 1)));
        // Day 61 is the first real day after the phantom 1900-02-29
        assert_eq!(from_spreadsheet_serial(61.0), Some(day(1900, 3, 1)));
        assert_eq!(from_spreadsheet_serial(1.0), Some(day(1900, 1, 1)));
        assert_eq!(from_spreadsheet_serial(0.0), None);
    }

    #[test]
    fn test_serial_outside_plausible_range_is_rejected() {
        assert!(normalize(&RawDateValue::Serial(39_999.0)).is_err());
        assert!(normalize(&RawDateValue::Serial(50_000.0)).is_err());
        assert!(normalize(&RawDateValue::Serial(f64::NAN)).is_err());
    }

    #[test]
    fn test_day_first_and_year_first() {
        assert_eq!(parse_text("05/01/2024"), Some(day(2024, 1, 5)));
        assert_eq!(parse_text("2024-01-05"), Some(day(2024, 1, 5)));
        assert_eq!(parse_text("2024-01-05T13:45:00"), Some(day(2024, 1, 5)));
        assert_eq!(parse_text("2024-12"), Some(day(2024, 12, 1)));
        assert_eq!(parse_text("31/02/2024"), None);
    }

    #[test]
    fn test_generic_layouts() {
        assert_eq!(parse_text("15.03.2024"), Some(day(2024, 3, 15)));
        assert_eq!(parse_text("20240315"), Some(day(2024, 3, 15)));
        assert_eq!(parse_text("45366"), Some(day(2024, 3, 15)));
        assert_eq!(parse_text("Fri, 15 Mar 2024 10:00:00 -0300"), Some(day(2024, 3, 15)));
        assert_eq!(parse_text("not a date"), None);
        assert_eq!(parse_text("   "), None);
    }

    #[test]
    fn test_canonical_timestamp_is_midnight_utc() {
        let ts = CanonicalTimestamp::from_date(day(1970, 1, 2));
        assert_eq!(ts.epoch_millis(), 86_400_000);
        assert_eq!(ts.iso_label(), "1970-01-02");
    }
}
