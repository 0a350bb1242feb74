//! Locale anchor tables, loaded from embedded TOML configs.
//!
//! Each `.toml` file in `packages/profile/locales/` describes how one
//! report language labels the profile's schedules. The files are baked into
//! the binary at compile time via [`include_str!`]; supporting another
//! language is a matter of adding a file and listing it below.

use std::collections::BTreeMap;

use carelink_profile_models::ProfileField;
use serde::Deserialize;

use crate::ProfileError;
use crate::anchor::{AnchorMatcher, AnchorSet, ExactPhraseMatcher, PrefixPhraseMatcher};

/// Locale configs embedded at compile time.
const LOCALE_TOMLS: &[(&str, &str)] = &[("de", include_str!("../locales/de.toml"))];

/// How a field's label is recognized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PhraseSpec {
    /// Two adjacent fragments written as `"first;second"`.
    Exact(String),
    /// Prefixes tested against `"first;second"`; any one may match.
    Prefix(Vec<String>),
}

/// How the document creation timestamp is read from its anchor fragment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentDateFormat {
    /// Number of leading characters (the label) to drop.
    pub label_chars: usize,
    /// `chrono` format of the remaining text.
    pub format: String,
}

/// The complete anchor configuration for one report language.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocaleAnchors {
    /// Locale identifier (e.g. `"de"`).
    pub locale: String,
    /// Text that identifies the page carrying the profile tables.
    pub header_marker: String,
    /// Label phrase per field. Fields absent here are never extracted.
    #[serde(default)]
    pub anchors: BTreeMap<ProfileField, PhraseSpec>,
    /// Layout of the document date.
    pub document_date: DocumentDateFormat,
}

impl LocaleAnchors {
    /// Parses and validates a locale config.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::LocaleConfig`] if the TOML is malformed and
    /// [`ProfileError::InvalidAnchor`] if an exact phrase lacks its `;`
    /// separator or a prefix list is empty.
    pub fn from_toml_str(toml: &str) -> Result<Self, ProfileError> {
        let anchors: Self = toml::from_str(toml)?;
        anchors.validate()?;
        Ok(anchors)
    }

    fn validate(&self) -> Result<(), ProfileError> {
        for (field, spec) in &self.anchors {
            let valid = match spec {
                PhraseSpec::Exact(phrase) => phrase.contains(';'),
                PhraseSpec::Prefix(prefixes) => {
                    !prefixes.is_empty() && prefixes.iter().all(|p| !p.is_empty())
                }
            };
            if !valid {
                return Err(ProfileError::InvalidAnchor {
                    locale: self.locale.clone(),
                    field: *field,
                });
            }
        }
        Ok(())
    }

    /// Builds the matchers for this locale: exact phrases first, then
    /// prefixes.
    #[must_use]
    pub fn matchers(&self) -> AnchorSet {
        let mut exact = ExactPhraseMatcher::default();
        let mut prefix = PrefixPhraseMatcher::default();

        for (field, spec) in &self.anchors {
            match spec {
                PhraseSpec::Exact(phrase) => exact.insert(phrase, *field),
                PhraseSpec::Prefix(prefixes) => {
                    for p in prefixes {
                        prefix.push(p, *field);
                    }
                }
            }
        }

        let matchers: Vec<Box<dyn AnchorMatcher>> = vec![Box::new(exact), Box::new(prefix)];
        AnchorSet::new(matchers)
    }
}

/// Returns the identifiers of all embedded locales.
#[must_use]
pub fn available_locales() -> Vec<&'static str> {
    LOCALE_TOMLS.iter().map(|(id, _)| *id).collect()
}

/// Returns the embedded anchor table for `locale`, or `None` if the locale
/// is not supported.
///
/// # Errors
///
/// Returns an error if the embedded config for `locale` is invalid.
pub fn locale_anchors(locale: &str) -> Result<Option<LocaleAnchors>, ProfileError> {
    LOCALE_TOMLS
        .iter()
        .find(|(id, _)| *id == locale)
        .map(|(_, toml)| LocaleAnchors::from_toml_str(toml))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_all_locales() {
        for id in available_locales() {
            let anchors = locale_anchors(id).unwrap().unwrap();
            assert_eq!(anchors.locale, id);
            assert!(!anchors.header_marker.is_empty());
        }
    }

    #[test]
    fn german_locale_covers_every_field() {
        let anchors = locale_anchors("de").unwrap().unwrap();
        for field in ProfileField::all() {
            assert!(anchors.anchors.contains_key(field), "{field} has no anchor");
        }
        assert_eq!(
            anchors.anchors[&ProfileField::TargetBloodSugar],
            PhraseSpec::Exact(";Hoch".to_owned())
        );
        assert!(matches!(
            anchors.anchors[&ProfileField::CreatedAt],
            PhraseSpec::Prefix(_)
        ));
    }

    #[test]
    fn unknown_locale_is_not_an_error() {
        assert!(locale_anchors("xx").unwrap().is_none());
    }

    #[test]
    fn rejects_exact_phrase_without_separator() {
        let toml = r#"
            locale = "test"
            header_marker = "Profile"
            [anchors]
            basal_rates = "Rate"
            [document_date]
            label_chars = 0
            format = "%d.%m.%Y, %H:%M"
        "#;
        assert!(matches!(
            LocaleAnchors::from_toml_str(toml),
            Err(ProfileError::InvalidAnchor {
                field: ProfileField::BasalRates,
                ..
            })
        ));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            LocaleAnchors::from_toml_str("locale = "),
            Err(ProfileError::LocaleConfig(_))
        ));
    }

    #[test]
    fn missing_anchor_table_means_no_fields() {
        let toml = r#"
            locale = "bare"
            header_marker = "Profile"
            [document_date]
            label_chars = 0
            format = "%d.%m.%Y, %H:%M"
        "#;
        let anchors = LocaleAnchors::from_toml_str(toml).unwrap();
        assert!(anchors.anchors.is_empty());
        assert_eq!(anchors.matchers().match_pair("Rate", "Zeit"), None);
    }
}
