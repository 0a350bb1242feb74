#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parser for the CareLink delimited event export.
//!
//! The export is one semicolon-separated file holding several tables. Each
//! table starts with a divider line (seven or more dashes followed by the
//! section name), then a header row, then data rows; a blank line closes
//! it. Anything before the first divider is preamble and is ignored.
//!
//! Rows are streamed to a caller-supplied handler as they are read, so
//! exports of any size are parsed in constant memory.

pub mod row;

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::path::Path;

use carelink_export_models::{ExportRecord, SectionType};
use carelink_parsing::{ParsingError, Tz};

/// Prefix that marks a section divider line.
pub const DIVIDER_PREFIX: &str = "-------";

/// Errors that can occur while parsing an export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The delimited text could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The configured time zone could not be resolved.
    #[error(transparent)]
    Timezone(#[from] ParsingError),

    /// A divider names a section this parser does not know.
    #[error("Unknown section divider on line {line}: {marker:?}")]
    UnknownSection {
        /// Line number of the divider.
        line: u64,
        /// The divider line.
        marker: String,
    },

    /// A data row lacks its `Date`, `Time` or `Index` value.
    #[error("Row on line {line} is missing Date, Time or Index")]
    InvalidRow {
        /// Line number of the row.
        line: u64,
    },

    /// A data row does not have as many fields as its header.
    #[error("Row on line {line} has {found} fields, header has {expected}")]
    ColumnCountMismatch {
        /// Line number of the row.
        line: u64,
        /// Number of header columns.
        expected: usize,
        /// Number of fields in the row.
        found: usize,
    },

    /// A row's date or time could not be read.
    #[error("Invalid timestamp on line {line}: {source}")]
    Timestamp {
        /// Line number of the row.
        line: u64,
        /// The underlying parse failure.
        source: ParsingError,
    },
}

/// A data row as it appeared in the export, before normalization.
#[derive(Debug, Clone, Copy)]
pub struct RawRow<'a> {
    /// The divider line that opened the row's section.
    pub marker: &'a str,
    /// Line number of the row (1-based).
    pub line: u64,
    /// Header column to value, empty values included.
    pub values: &'a BTreeMap<String, String>,
}

/// Where the parser is within the export.
#[derive(Debug)]
enum State {
    /// Outside any section; waiting for a divider.
    Seeking,
    /// After a divider; the next line is the header.
    Header {
        section: SectionType,
        marker: String,
    },
    /// Reading data rows.
    Rows {
        section: SectionType,
        marker: String,
        header: Vec<String>,
    },
}

/// Drops a trailing `\n` or `\r\n`.
fn strip_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Splits one line into its `;`-separated fields.
fn split_fields(line: &str) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    reader.read_record(&mut record)?;

    Ok(record.iter().map(str::to_owned).collect())
}

/// Streams the records of an export in one time zone.
#[derive(Debug, Clone, Copy)]
pub struct ExportParser {
    timezone: Tz,
}

impl ExportParser {
    /// Creates a parser that places row timestamps in `timezone`.
    #[must_use]
    pub const fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Parses an export from `reader`, calling `handler` for every row in
    /// file order. Returns the number of rows emitted.
    ///
    /// # Errors
    ///
    /// Returns the first fatal condition encountered: an unknown section
    /// divider, a row whose width differs from its header, a row without
    /// `Date`, `Time` or `Index`, or an unreadable timestamp. Rows emitted
    /// before the error stay emitted.
    pub fn parse_reader<R: BufRead>(
        &self,
        mut reader: R,
        mut handler: impl FnMut(ExportRecord, &RawRow<'_>),
    ) -> Result<usize, ExportError> {
        let mut state = State::Seeking;
        let mut buf = Vec::new();
        let mut line = 0;
        let mut emitted = 0;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line += 1;

            let text = String::from_utf8_lossy(strip_line_end(&buf));
            if text.is_empty() {
                state = State::Seeking;
                continue;
            }

            if text.starts_with(DIVIDER_PREFIX) {
                let marker = text.into_owned();
                let section = SectionType::from_divider(&marker).ok_or_else(|| {
                    ExportError::UnknownSection {
                        line,
                        marker: marker.clone(),
                    }
                })?;
                log::debug!("Line {line}: {section} section");
                state = State::Header { section, marker };
                continue;
            }

            state = match state {
                State::Seeking => State::Seeking,
                State::Header { section, marker } => State::Rows {
                    section,
                    marker,
                    header: split_fields(&text)?,
                },
                State::Rows {
                    section,
                    marker,
                    header,
                } => {
                    let values = row::combine(&header, split_fields(&text)?, line)?;
                    if let Some(record) = row::normalize(section, &values, self.timezone, line)? {
                        handler(
                            record,
                            &RawRow {
                                marker: &marker,
                                line,
                                values: &values,
                            },
                        );
                        emitted += 1;
                    }
                    State::Rows {
                        section,
                        marker,
                        header,
                    }
                }
            };
        }

        log::info!("Parsed {emitted} rows over {line} lines");

        Ok(emitted)
    }

    /// Parses the export file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or
    /// [`parse_reader`](Self::parse_reader) fails.
    pub fn parse_file(
        &self,
        path: &Path,
        handler: impl FnMut(ExportRecord, &RawRow<'_>),
    ) -> Result<usize, ExportError> {
        let file = std::fs::File::open(path)?;
        log::debug!("Parsing export {} ({})", path.display(), self.timezone);
        self.parse_reader(BufReader::new(file), handler)
    }
}

/// Parses the export at `path`, placing timestamps in the IANA zone
/// `timezone`.
///
/// # Errors
///
/// Returns [`ExportError::Timezone`] for an unknown zone, and otherwise
/// whatever [`ExportParser::parse_file`] returns.
pub fn parse(
    path: &Path,
    timezone: &str,
    handler: impl FnMut(ExportRecord, &RawRow<'_>),
) -> Result<usize, ExportError> {
    let timezone = carelink_parsing::resolve_timezone(timezone)?;
    ExportParser::new(timezone).parse_file(path, handler)
}
