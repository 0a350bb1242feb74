//! Time-of-day normalization and zoned timestamp construction.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Offset as _, TimeDelta, TimeZone as _};
use chrono_tz::Tz;

use crate::ParsingError;
use crate::numeric::to_int;

/// Date layouts found in delimited exports, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

/// Time layouts found in delimited exports, tried in order.
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// Pads an `H:MM` style time of day to `HH:MM`.
///
/// Strings of five or more bytes pass through unchanged. Shorter strings are
/// split on `:` and both parts are re-rendered with two digits; a missing or
/// non-numeric part becomes `00`.
///
/// ```
/// assert_eq!(carelink_parsing::normalize_time("9:5"), "09:05");
/// assert_eq!(carelink_parsing::normalize_time("23:45"), "23:45");
/// ```
#[must_use]
pub fn normalize_time(time: &str) -> String {
    if time.len() >= 5 {
        return time.to_owned();
    }

    let mut parts = time.split(':');
    let hours = parts.next().map_or(0, to_int);
    let minutes = parts.next().map_or(0, to_int);

    format!("{hours:02}:{minutes:02}")
}

/// Resolves an IANA time zone identifier such as `Europe/Vienna`.
///
/// # Errors
///
/// Returns [`ParsingError::UnknownTimezone`] if the identifier is unknown.
pub fn resolve_timezone(name: &str) -> Result<Tz, ParsingError> {
    name.parse::<Tz>()
        .map_err(|_| ParsingError::UnknownTimezone(name.to_owned()))
}

/// Attaches `tz` to a wall-clock time.
///
/// Ambiguous times (repeated by a backward transition) resolve to the
/// earliest instant. Times skipped by a forward transition are read with
/// the offset in force before the transition, which moves them forward by
/// the size of the gap.
#[must_use]
pub fn localize(naive: NaiveDateTime, tz: Tz) -> DateTime<Tz> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt;
    }

    let before = tz
        .offset_from_utc_datetime(&(naive - TimeDelta::days(1)))
        .fix();
    let utc = naive - TimeDelta::seconds(i64::from(before.local_minus_utc()));

    log::debug!("{naive} does not exist in {tz}, shifting to {utc} UTC");

    tz.from_utc_datetime(&utc)
}

/// Parses a calendar date in any of the export date layouts.
///
/// # Errors
///
/// Returns [`ParsingError::InvalidDate`] if no layout matches.
pub fn parse_date(s: &str) -> Result<NaiveDate, ParsingError> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .ok_or_else(|| ParsingError::InvalidDate(s.to_owned()))
}

/// Parses a time of day with or without seconds.
///
/// # Errors
///
/// Returns [`ParsingError::InvalidTime`] if no layout matches.
pub fn parse_time(s: &str) -> Result<NaiveTime, ParsingError> {
    let s = s.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(s, format).ok())
        .ok_or_else(|| ParsingError::InvalidTime(s.to_owned()))
}

/// Parses `value` with a `chrono` format string and localizes it to `tz`.
///
/// # Errors
///
/// Returns [`ParsingError::InvalidTimestamp`] if `value` does not match
/// `format`.
pub fn parse_local_datetime(value: &str, format: &str, tz: Tz) -> Result<DateTime<Tz>, ParsingError> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), format).map_err(|_| {
        ParsingError::InvalidTimestamp {
            value: value.to_owned(),
            format: format.to_owned(),
        }
    })?;

    Ok(localize(naive, tz))
}
