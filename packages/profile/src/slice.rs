//! Backward fixed-stride table reconstruction.
//!
//! The renderer emits a table's cells back to front, ending just before the
//! label that names it. Given the ordinal of the table's first cell and the
//! table's known shape, cell `(r, c)` is the fragment at
//! `start - r * columns - c`.

use carelink_profile_models::{Grid, ProfileField, TableShape};

use crate::ProfileError;

/// A requested slice reaches outside the fragment sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("table of {rows}x{columns} from fragment {start} does not fit in {len} fragments")]
pub struct SliceError {
    /// Ordinal of the first cell.
    pub start: usize,
    /// Requested rows.
    pub rows: usize,
    /// Requested columns.
    pub columns: usize,
    /// Number of fragments available.
    pub len: usize,
}

/// Reads a `rows` x `columns` grid walking backward from `start`.
///
/// # Errors
///
/// Returns [`SliceError`] if `start` is past the end of `content` or the
/// last cell would precede ordinal 0.
pub fn slice<S: AsRef<str>>(
    content: &[S],
    start: usize,
    rows: usize,
    columns: usize,
) -> Result<Grid, SliceError> {
    if rows == 0 || columns == 0 {
        return Ok(Grid::default());
    }

    let span = TableShape::new(0, rows, columns).span();
    if start >= content.len() || start < span {
        return Err(SliceError {
            start,
            rows,
            columns,
            len: content.len(),
        });
    }

    let grid = (0..rows)
        .map(|r| {
            (0..columns)
                .map(|c| content[start - r * columns - c].as_ref().to_owned())
                .collect()
        })
        .collect();

    Ok(Grid::new(grid))
}

/// Slices the table labelled by the anchor of `field` at `anchor`, using the
/// field's fixed [`TableShape`].
///
/// # Errors
///
/// Returns [`ProfileError::Slice`] if the table does not fit, which means
/// the document does not follow the supported layout.
pub fn slice_field<S: AsRef<str>>(
    content: &[S],
    field: ProfileField,
    anchor: usize,
) -> Result<Grid, ProfileError> {
    let shape = field.shape();
    let start = shape.start(anchor).ok_or(SliceError {
        start: 0,
        rows: shape.rows,
        columns: shape.columns,
        len: content.len(),
    });

    start
        .and_then(|start| slice(content, start, shape.rows, shape.columns))
        .map_err(|source| ProfileError::Slice {
            field,
            anchor,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Places cell `(r, c)` at `start - r * columns - c` in a fresh buffer.
    fn layout(start: usize, rows: usize, columns: usize, cells: &[&[&str]]) -> Vec<String> {
        let mut content = vec!["filler".to_owned(); start + 3];
        for (r, row) in cells.iter().enumerate().take(rows) {
            for (c, cell) in row.iter().enumerate().take(columns) {
                content[start - r * columns - c] = (*cell).to_owned();
            }
        }
        content
    }

    #[test]
    fn reproduces_hand_placed_cells() {
        let cells: &[&[&str]] = &[
            &["00:00", "0,800", "a"],
            &["06:00", "1,200", "b"],
            &["22:00", "0,650", "c"],
        ];
        let content = layout(10, 3, 3, cells);

        let grid = slice(&content, 10, 3, 3).unwrap();

        assert_eq!(grid.len(), 3);
        for (r, row) in grid.rows().iter().enumerate() {
            assert_eq!(row, &cells[r].iter().map(|c| (*c).to_owned()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn slices_down_to_ordinal_zero() {
        let content = ["f", "e", "d", "c", "b", "a"];
        let grid = slice(&content, 5, 2, 3).unwrap();
        assert_eq!(
            grid.rows(),
            &[
                vec!["a".to_owned(), "b".to_owned(), "c".to_owned()],
                vec!["d".to_owned(), "e".to_owned(), "f".to_owned()],
            ]
        );
    }

    #[test]
    fn rejects_slice_before_start_of_page() {
        let content = ["e", "d", "c", "b", "a"];
        assert_eq!(
            slice(&content, 4, 2, 3),
            Err(SliceError {
                start: 4,
                rows: 2,
                columns: 3,
                len: 5,
            })
        );
    }

    #[test]
    fn rejects_start_past_end() {
        let content = ["a"];
        assert!(slice(&content, 1, 1, 1).is_err());
    }

    #[test]
    fn empty_shape_yields_empty_grid() {
        let content: [&str; 0] = [];
        assert!(slice(&content, 0, 0, 3).unwrap().is_empty());
    }

    #[test]
    fn field_slice_applies_anchor_offset() {
        let content = ["c1", "c0", "label", "(h:mm)"];
        let grid = slice_field(&content, ProfileField::InsulinActionInMinutes, 2).unwrap();
        assert_eq!(grid.rows(), &[vec!["label".to_owned(), "c0".to_owned()]]);
    }

    #[test]
    fn field_slice_too_close_to_start_is_fatal() {
        let content = ["I.E./h", "Zeit"];
        let err = slice_field(&content, ProfileField::BasalRates, 0).unwrap_err();
        assert!(matches!(
            err,
            ProfileError::Slice {
                field: ProfileField::BasalRates,
                anchor: 0,
                ..
            }
        ));
    }
}
