#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the CareLink delimited event export.
//!
//! An export is a sequence of sections (pump events, sensor readings,
//! aggregated auto-insulin data), each with its own header row. Every data
//! row becomes one [`ExportRecord`] carrying its section, its timestamp and
//! its remaining columns as typed [`FieldValue`]s.

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Columns holding decimal numbers (written with a comma separator).
pub const FLOAT_FIELDS: &[&str] = &[
    "Basal Rate (U/h)",
    "Bolus Volume Selected (U)",
    "Bolus Volume Delivered (U)",
    "ISIG Value",
    "Final Bolus Estimate",
    "BWZ Unabsorbed Insulin Total (U)",
    "BWZ Estimate (U)",
    "BWZ Carb Ratio (U/Ex)",
    "BWZ Carb Input (exchanges)",
    "BWZ Carb Input (grams)",
    "BWZ Carb Ratio (g/U)",
    "BWZ Correction Estimate (U)",
    "BWZ Food Estimate (U)",
    "BWZ Active Insulin (U)",
    "Prime Volume Delivered (U)",
];

/// Columns holding whole numbers.
pub const INTEGER_FIELDS: &[&str] = &[
    "Bolus Number",
    "Sensor Glucose (mg/dL)",
    "BG Reading (mg/dL)",
    "BWZ Target High BG (mg/dL)",
    "BWZ Target Low BG (mg/dL)",
    "BWZ Insulin Sensitivity (mg/dL/U)",
    "BWZ BG/SG Input (mg/dL)",
];

/// Column carrying the row's calendar date.
pub const DATE_FIELD: &str = "Date";
/// Column carrying the row's time of day.
pub const TIME_FIELD: &str = "Time";
/// Column carrying the device's running row number.
pub const INDEX_FIELD: &str = "Index";

/// The kind of data a section of the export holds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SectionType {
    /// Pump events (basal, bolus, prime, alarms).
    Pump,
    /// Continuous glucose sensor readings.
    Sensor,
    /// Aggregated auto-insulin (closed loop) data.
    Auto,
}

impl SectionType {
    /// Classifies a section divider line by the marker it contains.
    ///
    /// Auto-insulin dividers are checked first since they may also mention
    /// the pump.
    #[must_use]
    pub fn from_divider(line: &str) -> Option<Self> {
        if line.contains("Aggregated Auto Insulin Data") {
            Some(Self::Auto)
        } else if line.contains("Pump;") {
            Some(Self::Pump)
        } else if line.contains("Sensor;") {
            Some(Self::Sensor)
        } else {
            None
        }
    }
}

/// How the values of a column are typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Comma-decimal number.
    Float,
    /// Base-10 integer.
    Integer,
    /// Kept verbatim.
    Text,
}

impl FieldKind {
    /// Looks up the kind of the column named `name`.
    #[must_use]
    pub fn of(name: &str) -> Self {
        if FLOAT_FIELDS.contains(&name) {
            Self::Float
        } else if INTEGER_FIELDS.contains(&name) {
            Self::Integer
        } else {
            Self::Text
        }
    }
}

/// A single typed column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Free text.
    Text(String),
    /// A decimal number.
    Float(f64),
    /// A whole number.
    Integer(i64),
}

/// One normalized data row of the export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    /// Section the row was read from.
    pub section: SectionType,
    /// The row's `Date` and `Time` combined in the configured time zone.
    pub datetime: DateTime<Tz>,
    /// Remaining non-empty columns, without `Date`, `Time` and `Index`.
    pub fields: BTreeMap<String, FieldValue>,
}

impl ExportRecord {
    /// Returns the value of column `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn classifies_dividers() {
        assert_eq!(
            SectionType::from_divider("-------;Pump;MiniMed 780G;NG1234"),
            Some(SectionType::Pump)
        );
        assert_eq!(
            SectionType::from_divider("-------;Sensor;Guardian 4"),
            Some(SectionType::Sensor)
        );
        assert_eq!(
            SectionType::from_divider("-------;Aggregated Auto Insulin Data;Pump;x"),
            Some(SectionType::Auto)
        );
        assert_eq!(SectionType::from_divider("-------;Meter;x"), None);
    }

    #[test]
    fn section_names_are_lowercase() {
        assert_eq!(SectionType::Auto.to_string(), "auto");
        assert_eq!(SectionType::from_str("sensor").unwrap(), SectionType::Sensor);
        assert_eq!(serde_json::to_string(&SectionType::Pump).unwrap(), "\"pump\"");
    }

    #[test]
    fn looks_up_field_kinds() {
        assert_eq!(FieldKind::of("Bolus Volume Delivered (U)"), FieldKind::Float);
        assert_eq!(FieldKind::of("Sensor Glucose (mg/dL)"), FieldKind::Integer);
        assert_eq!(FieldKind::of("Alarm"), FieldKind::Text);
    }

    #[test]
    fn serializes_record_flat() {
        let record = ExportRecord {
            section: SectionType::Sensor,
            datetime: Tz::Europe__Vienna
                .with_ymd_and_hms(2024, 1, 1, 8, 30, 0)
                .unwrap(),
            fields: BTreeMap::from([
                ("ISIG Value".to_owned(), FieldValue::Float(21.5)),
                ("Sensor Glucose (mg/dL)".to_owned(), FieldValue::Integer(112)),
                ("Event Marker".to_owned(), FieldValue::Text("Exercise".to_owned())),
            ]),
        };

        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["section"], "sensor");
        assert_eq!(json["datetime"], "2024-01-01T08:30:00+01:00");
        assert_eq!(json["fields"]["ISIG Value"], 21.5);
        assert_eq!(json["fields"]["Sensor Glucose (mg/dL)"], 112);
        assert_eq!(json["fields"]["Event Marker"], "Exercise");
    }
}
