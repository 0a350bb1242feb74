//! Normalization of one data row against its section header.

use std::collections::BTreeMap;

use carelink_export_models::{
    DATE_FIELD, ExportRecord, FieldKind, FieldValue, INDEX_FIELD, SectionType, TIME_FIELD,
};
use carelink_parsing::{Tz, localize, parse_date, parse_time, to_float, to_int};

use crate::ExportError;

/// Pairs each header column with the row's value in the same position.
///
/// Later columns win when the header repeats a name.
///
/// # Errors
///
/// Returns [`ExportError::ColumnCountMismatch`] if the row and header have
/// different lengths.
pub fn combine(
    header: &[String],
    values: Vec<String>,
    line: u64,
) -> Result<BTreeMap<String, String>, ExportError> {
    if header.len() != values.len() {
        return Err(ExportError::ColumnCountMismatch {
            line,
            expected: header.len(),
            found: values.len(),
        });
    }

    Ok(header.iter().cloned().zip(values).collect())
}

/// Types a raw column value according to the field catalogue.
#[must_use]
pub fn coerce(name: &str, value: String) -> FieldValue {
    match FieldKind::of(name) {
        FieldKind::Float => FieldValue::Float(to_float(&value)),
        FieldKind::Integer => FieldValue::Integer(to_int(&value)),
        FieldKind::Text => FieldValue::Text(value),
    }
}

/// Turns a combined row into a record.
///
/// Empty values are dropped first. Returns `Ok(None)` for rows that carry
/// nothing besides their date and time.
///
/// # Errors
///
/// Returns [`ExportError::InvalidRow`] if `Date`, `Time` or `Index` is
/// missing and [`ExportError::Timestamp`] if the date or time cannot be
/// read.
pub fn normalize(
    section: SectionType,
    raw: &BTreeMap<String, String>,
    timezone: Tz,
    line: u64,
) -> Result<Option<ExportRecord>, ExportError> {
    let mut values: BTreeMap<String, String> = raw
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if ![DATE_FIELD, TIME_FIELD, INDEX_FIELD]
        .iter()
        .all(|f| values.contains_key(*f))
    {
        return Err(ExportError::InvalidRow { line });
    }

    values.remove(INDEX_FIELD);
    if values.len() == 2 {
        return Ok(None);
    }

    let (Some(date), Some(time)) = (values.remove(DATE_FIELD), values.remove(TIME_FIELD)) else {
        return Err(ExportError::InvalidRow { line });
    };

    let naive = parse_date(&date)
        .and_then(|d| parse_time(&time).map(|t| d.and_time(t)))
        .map_err(|source| ExportError::Timestamp { line, source })?;

    Ok(Some(ExportRecord {
        section,
        datetime: localize(naive, timezone),
        fields: values
            .into_iter()
            .map(|(name, value)| {
                let value = coerce(&name, value);
                (name, value)
            })
            .collect(),
    }))
}
