//! Lenient numeric conversion for comma-decimal source text.
//!
//! Exported values are rendered for humans: `1,25` rather than `1.25`, and
//! cells occasionally carry trailing units or stray characters. Conversion
//! therefore reads the longest numeric prefix and falls back to zero when
//! there is none, instead of rejecting the value.

/// Characters treated as insignificant around a numeric string.
const fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

/// Returns the byte length of the numeric prefix of `s` and whether the
/// mantissa contained at least one digit.
///
/// Accepts an optional sign, digits with an optional `.` fraction, and an
/// optional exponent that is only consumed when digits follow it.
fn numeric_prefix(s: &str) -> (usize, bool) {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut has_digits = false;

    if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
        i += 1;
    }
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        has_digits = true;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        let mut j = i + 1;
        let mut fraction_digits = false;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
            fraction_digits = true;
        }
        if has_digits || fraction_digits {
            i = j;
            has_digits = true;
        }
    }
    if has_digits && i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        let exponent_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exponent_start {
            i = j;
        }
    }

    (i, has_digits)
}

/// Returns `true` when the whole of `s` (ignoring surrounding whitespace)
/// is a decimal number such as `12`, `-0.5` or `1e3`.
///
/// A comma is not a decimal separator here, so `1,25` is *not* numeric.
/// Rendered labels never look numeric, which is what the fragment indexer
/// relies on to rule out data cells as anchor candidates.
#[must_use]
pub fn is_numeric(s: &str) -> bool {
    let trimmed = s.trim_matches(is_blank);
    if trimmed.is_empty() {
        return false;
    }
    let (len, has_digits) = numeric_prefix(trimmed);

    has_digits && len == trimmed.len()
}

/// Converts comma-decimal text to a float.
///
/// The value is trimmed and every `,` becomes `.` before the numeric prefix
/// is read. Text without a numeric prefix yields `0.0`.
///
/// ```
/// assert!((carelink_parsing::to_float("1,25") - 1.25).abs() < f64::EPSILON);
/// assert!(carelink_parsing::to_float("n/a").abs() < f64::EPSILON);
/// ```
#[must_use]
pub fn to_float(s: &str) -> f64 {
    let normalized = s.trim_matches(is_blank).replace(',', ".");
    let (len, has_digits) = numeric_prefix(&normalized);
    if !has_digits {
        return 0.0;
    }

    normalized[..len].parse::<f64>().unwrap_or(0.0)
}

/// Converts base-10 text to an integer.
///
/// Leading whitespace and an optional sign are accepted; conversion stops at
/// the first non-digit. Text without leading digits yields `0`, and values
/// beyond the `i64` range saturate.
#[must_use]
pub fn to_int(s: &str) -> i64 {
    let trimmed = s.trim_start_matches(is_blank);
    let bytes = trimmed.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return 0;
    }

    trimmed[..end].parse::<i64>().unwrap_or_else(|_| {
        if bytes[0] == b'-' {
            i64::MIN
        } else {
            i64::MAX
        }
    })
}
