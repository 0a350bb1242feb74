//! Per-field schedule extraction from sliced grids.
//!
//! All schedule tables share one row loop, [`read_rows`]; they differ only
//! in their [`RowPolicy`] for placeholder rows and in how an accepted row is
//! turned into a value.

use carelink_parsing::{normalize_time, parse_local_datetime, to_float, to_int, Tz};
use carelink_profile_models::{
    DASH_PLACEHOLDER, EMPTY_PLACEHOLDER, Grid, ProfileField, RangeSchedule, RowPolicy, Schedule,
    is_placeholder,
};
use chrono::DateTime;

use crate::locale::DocumentDateFormat;

/// Row patterns left behind at basal block boundaries.
const BASAL_BOUNDARY_ROWS: &[&[&str]] = &[
    &[DASH_PLACEHOLDER, DASH_PLACEHOLDER, EMPTY_PLACEHOLDER],
    &[DASH_PLACEHOLDER, EMPTY_PLACEHOLDER, EMPTY_PLACEHOLDER],
];

fn cell(row: &[String], column: usize) -> &str {
    row.get(column).map_or("", String::as_str)
}

fn is_placeholder_row(row: &[String]) -> bool {
    !row.is_empty() && row.iter().all(|c| is_placeholder(c))
}

/// Feeds every non-placeholder row of `grid` to `accept`.
///
/// A row made only of placeholder tokens is skipped or ends the read,
/// depending on `policy`.
pub fn read_rows(grid: Grid, policy: RowPolicy, mut accept: impl FnMut(&[String])) {
    for row in grid {
        if is_placeholder_row(&row) {
            match policy {
                RowPolicy::SkipAndContinue => continue,
                RowPolicy::StopAtFirst => break,
            }
        }
        accept(row.as_slice());
    }
}

/// Reads one basal block.
///
/// Interior placeholder rows and block boundary artifacts are skipped; any
/// other row is kept only if its rate starts with a digit.
#[must_use]
pub fn basal_rates(grid: Grid) -> Schedule {
    let mut schedule = Schedule::new();

    read_rows(grid, ProfileField::BasalRates.row_policy(), |row| {
        if BASAL_BOUNDARY_ROWS.iter().any(|pattern| *pattern == row) {
            return;
        }
        let rate = cell(row, 1);
        if !rate.starts_with(|c: char| c.is_ascii_digit()) {
            log::debug!("Skipping basal row without a rate: {row:?}");
            return;
        }
        schedule.insert(normalize_time(cell(row, 0)), to_float(rate));
    });

    schedule
}

/// Reads a time → value schedule (correction factor, carb ratio).
#[must_use]
pub fn value_schedule(grid: Grid, field: ProfileField) -> Schedule {
    let mut schedule = Schedule::new();

    read_rows(grid, field.row_policy(), |row| {
        schedule.insert(normalize_time(cell(row, 0)), to_float(cell(row, 1)));
    });

    schedule
}

/// Reads the target blood sugar range schedule. Blank separator rows are
/// skipped.
#[must_use]
pub fn target_blood_sugar(grid: Grid) -> RangeSchedule {
    let mut schedule = RangeSchedule::new();

    read_rows(
        grid,
        ProfileField::TargetBloodSugar.row_policy(),
        |row| {
            if row.iter().all(|c| c.trim().is_empty()) {
                return;
            }
            schedule.insert(
                normalize_time(cell(row, 0)),
                (to_float(cell(row, 1)), to_float(cell(row, 2))),
            );
        },
    );

    schedule
}

/// Converts an active insulin time cell to minutes.
///
/// The cell holds either `H:MM` or a bare minute count. A separator in
/// leading position is not treated as one, so `":30"` reads as a bare
/// count (and yields `0`).
#[must_use]
pub fn action_minutes(text: &str) -> i64 {
    match text.find(':') {
        Some(separator) if separator > 0 => {
            let hours = to_int(&text[..separator]);
            let minutes = to_int(&text[separator + 1..]);
            minutes.saturating_add(hours.saturating_mul(60))
        }
        _ => to_int(text),
    }
}

/// Reads the active insulin time from its 1x2 grid.
#[must_use]
pub fn insulin_action_in_minutes(grid: &Grid) -> Option<i64> {
    grid.rows().first().map(|row| action_minutes(cell(row, 1)))
}

/// Reads the document date from its 1x1 grid.
///
/// The fixed-length label is dropped before parsing. A value that does not
/// match the configured format is logged and treated as absent.
#[must_use]
pub fn document_date(grid: &Grid, format: &DocumentDateFormat, tz: Tz) -> Option<DateTime<Tz>> {
    let text = cell(grid.rows().first()?, 0);
    let value: String = text.chars().skip(format.label_chars).collect();

    match parse_local_datetime(&value, &format.format, tz) {
        Ok(dt) => Some(dt),
        Err(e) => {
            log::warn!("Ignoring unreadable document date {text:?}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        Grid::new(
            rows.iter()
                .map(|r| r.iter().map(|c| (*c).to_owned()).collect())
                .collect(),
        )
    }

    #[test]
    fn correction_factor_stops_at_placeholder_row() {
        let g = grid(&[
            &["08:00", "2,5", "x"],
            &["<>", "<>", "<>"],
            &["09:00", "3,0", "x"],
        ]);

        let schedule = value_schedule(g, ProfileField::CorrectionFactor);

        assert_eq!(schedule, Schedule::from([("08:00".to_owned(), 2.5)]));
    }

    #[test]
    fn basal_rates_skip_placeholder_row_and_continue() {
        let g = grid(&[
            &["08:00", "2,5", "x"],
            &["<>", "<>", "<>"],
            &["09:00", "3,0", "x"],
        ]);

        let schedule = basal_rates(g);

        assert_eq!(
            schedule,
            Schedule::from([("08:00".to_owned(), 2.5), ("09:00".to_owned(), 3.0)])
        );
    }

    #[test]
    fn basal_rates_skip_boundary_artifacts() {
        let g = grid(&[
            &["0:00", "0,850", "x"],
            &["--", "--", "<>"],
            &["--", "<>", "<>"],
            &["6:30", "1,100", "x"],
        ]);

        let schedule = basal_rates(g);

        assert_eq!(
            schedule,
            Schedule::from([("00:00".to_owned(), 0.85), ("06:30".to_owned(), 1.1)])
        );
    }

    #[test]
    fn basal_rates_require_numeric_rate() {
        let g = grid(&[
            &["Basal 1", "Gesamt", "x"],
            &["12:00", ",5", "x"],
            &["13:00", "0,5", "x"],
        ]);

        assert_eq!(
            basal_rates(g),
            Schedule::from([("13:00".to_owned(), 0.5)])
        );
    }

    #[test]
    fn carb_ratio_pads_times() {
        let g = grid(&[
            &["0:00", "10,0", "x"],
            &["11:30", "12,5", "x"],
            &["<>", "<>", "<>"],
        ]);

        assert_eq!(
            value_schedule(g, ProfileField::CarbRatioFactor),
            Schedule::from([("00:00".to_owned(), 10.0), ("11:30".to_owned(), 12.5)])
        );
    }

    #[test]
    fn target_skips_blank_rows_and_stops_at_placeholders() {
        let g = grid(&[
            &["0:00", "100", "120", "x"],
            &["", " ", "", ""],
            &["7:00", "90", "110", "x"],
            &["<>", "<>", "<>", "<>"],
            &["9:00", "80", "100", "x"],
        ]);

        assert_eq!(
            target_blood_sugar(g),
            RangeSchedule::from([
                ("00:00".to_owned(), (100.0, 120.0)),
                ("07:00".to_owned(), (90.0, 110.0)),
            ])
        );
    }

    #[test]
    fn placeholder_values_are_never_read_as_zero() {
        let g = grid(&[&["<>", "--", "<>"], &["08:00", "1,0", "x"]]);
        assert!(value_schedule(g, ProfileField::CorrectionFactor).is_empty());
    }

    #[test]
    fn action_minutes_reads_hours_and_minutes() {
        assert_eq!(action_minutes("4:00"), 240);
        assert_eq!(action_minutes("3:30"), 210);
        assert_eq!(action_minutes("10:15"), 615);
    }

    #[test]
    fn action_minutes_reads_bare_minutes() {
        assert_eq!(action_minutes("180"), 180);
        assert_eq!(action_minutes(":30"), 0);
        assert_eq!(action_minutes(""), 0);
    }

    #[test]
    fn insulin_action_uses_second_cell() {
        let g = grid(&[&["Wirkdauer aktiv. Insul.", "2:45"]]);
        assert_eq!(insulin_action_in_minutes(&g), Some(165));
        assert_eq!(insulin_action_in_minutes(&Grid::default()), None);
    }

    #[test]
    fn document_date_strips_label() {
        let tz = carelink_parsing::resolve_timezone("Europe/Vienna").unwrap();
        let format = DocumentDateFormat {
            label_chars: 13,
            format: "%d.%m.%Y, %H:%M".to_owned(),
        };
        let g = grid(&[&["Erstellt am: 04.03.2024, 10:15"]]);

        let dt = document_date(&g, &format, tz).unwrap();

        assert_eq!(dt.to_rfc3339(), "2024-03-04T10:15:00+01:00");
    }

    #[test]
    fn unreadable_document_date_is_absent() {
        let tz = carelink_parsing::resolve_timezone("Europe/Vienna").unwrap();
        let format = DocumentDateFormat {
            label_chars: 13,
            format: "%d.%m.%Y, %H:%M".to_owned(),
        };
        let g = grid(&[&["Erstellt am: gestern"]]);

        assert_eq!(document_date(&g, &format, tz), None);
    }
}
