#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Therapy profile extraction from rendered CareLink reports.
//!
//! A rendered profile exposes nothing but an ordered stream of text
//! fragments per page; the basal, correction factor, target range and carb
//! ratio tables have no structure of their own. Extraction therefore works
//! in three steps:
//!
//! 1. [`index::FragmentIndex`] finds the label of every schedule using the
//!    locale's anchor phrases ([`locale`], [`anchor`]).
//! 2. [`slice`] walks backward from each label with the field's fixed
//!    [`TableShape`](carelink_profile_models::TableShape) to rebuild the
//!    table as a grid.
//! 3. [`extract`] turns each grid into a schedule.
//!
//! [`ProfileParser`] ties the steps together and [`parse`] is the
//! file-level entry point.

pub mod anchor;
pub mod extract;
pub mod index;
pub mod locale;
pub mod slice;
pub mod source;

use std::collections::BTreeMap;
use std::path::Path;

use carelink_parsing::{ParsingError, Tz};
use carelink_profile_models::{Page, ProfileField, ProfileResult};

use crate::anchor::AnchorSet;
use crate::index::FragmentIndex;
use crate::locale::LocaleAnchors;
use crate::slice::{SliceError, slice_field};
use crate::source::DocumentSource;

/// Errors that can occur while extracting a profile.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON page dump could not be parsed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A locale config is not valid TOML or has the wrong structure.
    #[error("Invalid locale config: {0}")]
    LocaleConfig(#[from] toml::de::Error),

    /// A locale config declares an unusable anchor phrase.
    #[error("Invalid {field} anchor in locale {locale:?}")]
    InvalidAnchor {
        /// The locale whose config is invalid.
        locale: String,
        /// The field with the invalid phrase.
        field: ProfileField,
    },

    /// The configured time zone could not be resolved.
    #[error(transparent)]
    Timezone(#[from] ParsingError),

    /// A table does not fit between its anchor and the start of the page,
    /// so the document does not follow the supported layout.
    #[error("Cannot slice {field} table anchored at fragment {anchor}: {source}")]
    Slice {
        /// The field being sliced.
        field: ProfileField,
        /// Ordinal of the field's anchor.
        anchor: usize,
        /// The underlying bounds failure.
        source: SliceError,
    },

    /// PDF rendering failed.
    #[error("PDF extraction error: {0}")]
    Pdf(String),

    /// The document format is not supported.
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),
}

/// Extracts [`ProfileResult`]s using one locale's anchors and one time zone.
///
/// A parser holds only immutable configuration, so one instance can parse
/// any number of documents, including from several threads.
#[derive(Debug)]
pub struct ProfileParser {
    locale: Option<LocaleAnchors>,
    matchers: AnchorSet,
    timezone: Tz,
}

impl ProfileParser {
    /// Creates a parser for an embedded locale.
    ///
    /// An unsupported locale is not an error: every document then yields an
    /// empty result.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded config for `locale` is invalid.
    pub fn new(locale: &str, timezone: Tz) -> Result<Self, ProfileError> {
        let anchors = locale::locale_anchors(locale)?;
        if anchors.is_none() {
            log::warn!("No anchor table for locale {locale:?}; profiles will be empty");
        }
        Ok(Self::from_anchors(anchors, timezone))
    }

    /// Creates a parser from an explicit anchor table.
    #[must_use]
    pub fn with_anchors(anchors: LocaleAnchors, timezone: Tz) -> Self {
        Self::from_anchors(Some(anchors), timezone)
    }

    fn from_anchors(locale: Option<LocaleAnchors>, timezone: Tz) -> Self {
        let matchers = locale
            .as_ref()
            .map(LocaleAnchors::matchers)
            .unwrap_or_default();
        Self {
            locale,
            matchers,
            timezone,
        }
    }

    /// Extracts the profile from a document source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or a table does not
    /// fit the supported layout.
    pub fn parse_source(&self, source: &dyn DocumentSource) -> Result<ProfileResult, ProfileError> {
        self.parse_pages(&source.pages()?)
    }

    /// Extracts the profile from already rendered pages.
    ///
    /// Only the first page containing the locale's header marker is read.
    /// Without such a page the result is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Slice`] if an anchor sits too close to the
    /// start of the page for its table.
    pub fn parse_pages(&self, pages: &[Page]) -> Result<ProfileResult, ProfileError> {
        let Some(locale) = &self.locale else {
            return Ok(ProfileResult::default());
        };

        let Some(page) = pages.iter().find(|p| p.text.contains(&locale.header_marker)) else {
            log::warn!(
                "No page contains the {:?} header; returning an empty profile",
                locale.header_marker
            );
            return Ok(ProfileResult::default());
        };

        let index = FragmentIndex::build(&page.fragments, &self.matchers);
        let content = page.contents();

        let result = ProfileResult {
            created_at: self.created_at(&index, &content, locale)?,
            basal_rates: Self::basal_rates(&index, &content)?,
            correction_factor: Self::first_grid(&index, &content, ProfileField::CorrectionFactor)?
                .map(|g| extract::value_schedule(g, ProfileField::CorrectionFactor))
                .unwrap_or_default(),
            target_blood_sugar: Self::first_grid(&index, &content, ProfileField::TargetBloodSugar)?
                .map(extract::target_blood_sugar)
                .unwrap_or_default(),
            carb_ratio_factor: Self::first_grid(&index, &content, ProfileField::CarbRatioFactor)?
                .map(|g| extract::value_schedule(g, ProfileField::CarbRatioFactor))
                .unwrap_or_default(),
            insulin_action_in_minutes: Self::first_grid(
                &index,
                &content,
                ProfileField::InsulinActionInMinutes,
            )?
            .and_then(|g| extract::insulin_action_in_minutes(&g)),
        };

        log::info!(
            "Extracted {} basal block(s), {} correction, {} target, {} carb ratio entries",
            result.basal_rates.len(),
            result.correction_factor.len(),
            result.target_blood_sugar.len(),
            result.carb_ratio_factor.len()
        );

        Ok(result)
    }

    /// Slices the table at the first anchor of `field`, if there is one.
    fn first_grid(
        index: &FragmentIndex,
        content: &[&str],
        field: ProfileField,
    ) -> Result<Option<carelink_profile_models::Grid>, ProfileError> {
        index
            .first(field)
            .map(|anchor| slice_field(content, field, anchor))
            .transpose()
    }

    /// Reads every basal block, last printed block first.
    fn basal_rates(
        index: &FragmentIndex,
        content: &[&str],
    ) -> Result<BTreeMap<usize, carelink_profile_models::Schedule>, ProfileError> {
        let mut blocks = BTreeMap::new();

        for (block, &anchor) in index
            .positions(ProfileField::BasalRates)
            .iter()
            .rev()
            .enumerate()
        {
            let grid = slice_field(content, ProfileField::BasalRates, anchor)?;
            let schedule = extract::basal_rates(grid);
            if !schedule.is_empty() {
                blocks.insert(block, schedule);
            }
        }

        Ok(blocks)
    }

    fn created_at(
        &self,
        index: &FragmentIndex,
        content: &[&str],
        locale: &LocaleAnchors,
    ) -> Result<Option<chrono::DateTime<Tz>>, ProfileError> {
        Ok(Self::first_grid(index, content, ProfileField::CreatedAt)?
            .and_then(|g| extract::document_date(&g, &locale.document_date, self.timezone)))
    }
}

/// Extracts the therapy profile from the document at `path`.
///
/// The document source is chosen by extension (see [`source::open`]),
/// `locale` selects the embedded anchor table and `timezone` is an IANA
/// identifier applied to the document date.
///
/// # Errors
///
/// Returns an error if the time zone is unknown, the document cannot be
/// read, or its layout does not match the supported template.
pub fn parse(path: &Path, locale: &str, timezone: &str) -> Result<ProfileResult, ProfileError> {
    let timezone = carelink_parsing::resolve_timezone(timezone)?;
    let parser = ProfileParser::new(locale, timezone)?;
    let source = source::open(path)?;

    log::debug!("Parsing profile {} ({locale}, {timezone})", path.display());

    parser.parse_source(source.as_ref())
}
