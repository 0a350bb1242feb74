#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Therapy profile types shared by the profile extractor and its callers.
//!
//! A rendered therapy profile is consumed as a flat sequence of text
//! [`Fragment`]s per [`Page`]. Each schedule in the profile is identified by
//! a [`ProfileField`] whose table geometry is described declaratively by a
//! [`TableShape`], and the extracted values end up in a [`ProfileResult`].

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Placeholder token rendered for a blank table cell.
pub const EMPTY_PLACEHOLDER: &str = "<>";

/// Placeholder token rendered for a cell without a value.
pub const DASH_PLACEHOLDER: &str = "--";

/// Returns `true` if `text` is one of the two reserved placeholder tokens.
#[must_use]
pub fn is_placeholder(text: &str) -> bool {
    text == EMPTY_PLACEHOLDER || text == DASH_PLACEHOLDER
}

/// A semantic field of the therapy profile that can be located by anchor.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProfileField {
    /// Basal insulin rate schedule(s), one per printed block.
    BasalRates,
    /// Insulin sensitivity (correction factor) schedule.
    CorrectionFactor,
    /// Target blood sugar range schedule.
    TargetBloodSugar,
    /// Carbohydrate ratio schedule.
    CarbRatioFactor,
    /// Active insulin time.
    InsulinActionInMinutes,
    /// Document creation timestamp.
    CreatedAt,
}

impl ProfileField {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::BasalRates,
            Self::CorrectionFactor,
            Self::TargetBloodSugar,
            Self::CarbRatioFactor,
            Self::InsulinActionInMinutes,
            Self::CreatedAt,
        ]
    }

    /// Returns the fixed table geometry of this field relative to its anchor.
    #[must_use]
    pub const fn shape(self) -> TableShape {
        match self {
            Self::BasalRates => TableShape::new(-2, 29, 3),
            Self::CorrectionFactor | Self::CarbRatioFactor => TableShape::new(-2, 8, 3),
            Self::TargetBloodSugar => TableShape::new(-1, 8, 4),
            Self::InsulinActionInMinutes => TableShape::new(0, 1, 2),
            Self::CreatedAt => TableShape::new(0, 1, 1),
        }
    }

    /// Returns how placeholder rows are treated while reading this field.
    #[must_use]
    pub const fn row_policy(self) -> RowPolicy {
        match self {
            Self::BasalRates => RowPolicy::SkipAndContinue,
            Self::CorrectionFactor
            | Self::TargetBloodSugar
            | Self::CarbRatioFactor
            | Self::InsulinActionInMinutes
            | Self::CreatedAt => RowPolicy::StopAtFirst,
        }
    }
}

/// What to do when a schedule table contains a row made of placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowPolicy {
    /// Skip the row and keep reading (basal blocks contain interior gaps).
    SkipAndContinue,
    /// The row terminates the schedule.
    StopAtFirst,
}

/// Fixed geometry of a rendered table relative to the anchor that labels it.
///
/// The renderer emits table cells back to front, so cell `(r, c)` lives at
/// fragment ordinal `anchor + offset_from_anchor - r * columns - c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableShape {
    /// Signed distance from the anchor ordinal to the table's first cell.
    pub offset_from_anchor: isize,
    /// Number of rows to read.
    pub rows: usize,
    /// Number of cells per row.
    pub columns: usize,
}

impl TableShape {
    /// Creates a new shape descriptor.
    #[must_use]
    pub const fn new(offset_from_anchor: isize, rows: usize, columns: usize) -> Self {
        Self {
            offset_from_anchor,
            rows,
            columns,
        }
    }

    /// Returns the ordinal of the first cell for a table anchored at
    /// `anchor`, or `None` if it would precede the start of the page.
    #[must_use]
    pub const fn start(self, anchor: usize) -> Option<usize> {
        anchor.checked_add_signed(self.offset_from_anchor)
    }

    /// Returns how many ordinals the table reaches back from its first cell.
    #[must_use]
    pub const fn span(self) -> usize {
        if self.rows == 0 || self.columns == 0 {
            return 0;
        }
        (self.rows - 1) * self.columns + (self.columns - 1)
    }
}

/// One text fragment in rendering order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Zero-based position of this fragment on its page.
    pub ordinal: usize,
    /// The fragment's text, exactly as rendered.
    pub text: String,
}

/// One rendered page: its full text plus its positioned fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// The page's full rendered text, used for header detection.
    pub text: String,
    /// Fragments in rendering order with contiguous ordinals from 0.
    pub fragments: Vec<Fragment>,
}

impl Page {
    /// Builds a page from fragment texts, numbering them from 0.
    #[must_use]
    pub fn new<I, S>(text: impl Into<String>, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text: text.into(),
            fragments: fragments
                .into_iter()
                .enumerate()
                .map(|(ordinal, text)| Fragment {
                    ordinal,
                    text: text.into(),
                })
                .collect(),
        }
    }

    /// Builds a page whose full text is the fragments joined by newlines.
    #[must_use]
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut page = Self::new(String::new(), fragments);
        page.text = page
            .fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        page
    }

    /// Returns the fragment texts in ordinal order.
    #[must_use]
    pub fn contents(&self) -> Vec<&str> {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }
}

/// A rectangular table reconstructed from the fragment sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// Wraps already-sliced rows.
    #[must_use]
    pub const fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Returns the rows of this grid.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the grid has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl IntoIterator for Grid {
    type Item = Vec<String>;
    type IntoIter = std::vec::IntoIter<Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// A time-of-day (`HH:MM`) keyed schedule of single values.
pub type Schedule = BTreeMap<String, f64>;

/// A time-of-day (`HH:MM`) keyed schedule of value pairs.
pub type RangeSchedule = BTreeMap<String, (f64, f64)>;

/// Everything extracted from one therapy profile document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileResult {
    /// When the document was created, if the date anchor was found.
    pub created_at: Option<DateTime<Tz>>,
    /// Basal schedules keyed by anchor occurrence, last printed block first.
    pub basal_rates: BTreeMap<usize, Schedule>,
    /// Correction factor schedule.
    pub correction_factor: Schedule,
    /// Target blood sugar range schedule.
    pub target_blood_sugar: RangeSchedule,
    /// Carbohydrate ratio schedule.
    pub carb_ratio_factor: Schedule,
    /// Active insulin time in minutes, if the anchor was found.
    pub insulin_action_in_minutes: Option<i64>,
}

impl ProfileResult {
    /// Returns `true` if nothing at all was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created_at.is_none()
            && self.basal_rates.is_empty()
            && self.correction_factor.is_empty()
            && self.target_blood_sugar.is_empty()
            && self.carb_ratio_factor.is_empty()
            && self.insulin_action_in_minutes.is_none()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn field_names_round_trip_through_strum() {
        for field in ProfileField::all() {
            assert_eq!(ProfileField::from_str(field.as_ref()).unwrap(), *field);
        }
        assert_eq!(ProfileField::BasalRates.to_string(), "basal_rates");
    }

    #[test]
    fn shape_start_rejects_negative_offsets() {
        let shape = ProfileField::BasalRates.shape();
        assert_eq!(shape.start(5), Some(3));
        assert_eq!(shape.start(1), None);
        assert_eq!(ProfileField::CreatedAt.shape().start(0), Some(0));
    }

    #[test]
    fn shape_span_covers_all_cells() {
        assert_eq!(TableShape::new(0, 29, 3).span(), 86);
        assert_eq!(TableShape::new(0, 8, 4).span(), 31);
        assert_eq!(TableShape::new(0, 1, 1).span(), 0);
    }

    #[test]
    fn only_basal_rates_skip_placeholder_rows() {
        for field in ProfileField::all() {
            let expected = if *field == ProfileField::BasalRates {
                RowPolicy::SkipAndContinue
            } else {
                RowPolicy::StopAtFirst
            };
            assert_eq!(field.row_policy(), expected);
        }
    }

    #[test]
    fn pages_number_fragments_from_zero() {
        let page = Page::from_fragments(["a", "b", "c"]);
        let ordinals: Vec<usize> = page.fragments.iter().map(|f| f.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        assert_eq!(page.text, "a\nb\nc");
        assert_eq!(page.contents(), vec!["a", "b", "c"]);
    }

    #[test]
    fn default_result_is_empty() {
        assert!(ProfileResult::default().is_empty());
        let json = serde_json::to_value(ProfileResult::default()).unwrap();
        assert_eq!(json["created_at"], serde_json::Value::Null);
        assert_eq!(json["insulin_action_in_minutes"], serde_json::Value::Null);
    }
}
