#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared parsing primitives for CareLink exports.
//!
//! Both the delimited event log and the rendered therapy profile encode
//! numbers with a comma as the decimal separator, times of day without
//! zero-padding, and local wall-clock timestamps that only become instants
//! once a configured IANA time zone is applied. The helpers in this crate
//! implement those conversions once so both parsers agree on them.

pub mod clock;
pub mod numeric;

pub use chrono_tz::Tz;
pub use clock::{
    localize, normalize_time, parse_date, parse_local_datetime, parse_time, resolve_timezone,
};
pub use numeric::{is_numeric, to_float, to_int};

/// Errors produced while parsing dates, times and time zones.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParsingError {
    /// The configured time zone is not a known IANA identifier.
    #[error("Unknown time zone: {0}")]
    UnknownTimezone(String),

    /// A date did not match any supported layout.
    #[error("Invalid date: {0:?}")]
    InvalidDate(String),

    /// A time of day did not match any supported layout.
    #[error("Invalid time: {0:?}")]
    InvalidTime(String),

    /// A combined date and time did not match the expected format.
    #[error("Invalid timestamp {value:?} (expected format {format:?})")]
    InvalidTimestamp {
        /// The text that failed to parse.
        value: String,
        /// The `chrono` format string it was parsed against.
        format: String,
    },
}
