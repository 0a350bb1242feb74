//! Fragment indexing: one forward pass that records where each field's
//! label appears.

use std::collections::BTreeMap;

use carelink_parsing::is_numeric;
use carelink_profile_models::{Fragment, ProfileField, is_placeholder};

use crate::anchor::AnchorMatcher;

/// Anchor ordinals per field, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentIndex {
    positions: BTreeMap<ProfileField, Vec<usize>>,
}

impl FragmentIndex {
    /// Indexes `fragments` against `matcher`.
    ///
    /// Placeholder and numeric fragments are data, never labels, so they are
    /// not tried as the first half of a pair. Each ordinal is attributed to
    /// at most one field.
    #[must_use]
    pub fn build(fragments: &[Fragment], matcher: &dyn AnchorMatcher) -> Self {
        let mut positions: BTreeMap<ProfileField, Vec<usize>> = BTreeMap::new();

        for pair in fragments.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            if is_placeholder(&current.text) || is_numeric(&current.text) {
                continue;
            }
            if let Some(field) = matcher.match_pair(&current.text, &next.text) {
                log::debug!("Found {field} anchor at fragment {}", current.ordinal);
                positions.entry(field).or_default().push(current.ordinal);
            }
        }

        Self { positions }
    }

    /// Returns every anchor ordinal for `field`, in increasing order.
    #[must_use]
    pub fn positions(&self, field: ProfileField) -> &[usize] {
        self.positions.get(&field).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the first anchor ordinal for `field`.
    #[must_use]
    pub fn first(&self, field: ProfileField) -> Option<usize> {
        self.positions(field).first().copied()
    }

    /// Returns `true` if no anchor was found at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use carelink_profile_models::Page;

    use super::*;
    use crate::locale::locale_anchors;

    fn index(fragments: &[&str]) -> FragmentIndex {
        let anchors = locale_anchors("de").unwrap().unwrap();
        let page = Page::from_fragments(fragments.iter().copied());
        FragmentIndex::build(&page.fragments, &anchors.matchers())
    }

    #[test]
    fn records_every_occurrence_in_document_order() {
        let idx = index(&[
            "1,000", "00:00", "I.E./h", "Zeit", "2,000", "00:00", "I.E./h", "Zeit", "x",
            "I.E./h", "Zeit",
        ]);
        assert_eq!(idx.positions(ProfileField::BasalRates), &[2, 6, 9]);
        assert_eq!(idx.first(ProfileField::BasalRates), Some(2));
    }

    #[test]
    fn missing_field_has_no_positions() {
        let idx = index(&["I.E./h", "Zeit"]);
        assert!(idx.positions(ProfileField::CorrectionFactor).is_empty());
        assert_eq!(idx.first(ProfileField::CarbRatioFactor), None);
    }

    #[test]
    fn last_fragment_never_starts_an_anchor() {
        let idx = index(&["a", "b", "I.E./h"]);
        assert!(idx.is_empty());
    }

    #[test]
    fn placeholder_and_numeric_fragments_are_not_labels() {
        let mut exact = crate::anchor::ExactPhraseMatcher::default();
        exact.insert("<>;Zeit", ProfileField::BasalRates);
        exact.insert("12;Zeit", ProfileField::CorrectionFactor);
        exact.insert("Rate;Zeit", ProfileField::CarbRatioFactor);
        let page = Page::from_fragments(["<>", "Zeit", "12", "Zeit", "Rate", "Zeit"]);

        let idx = FragmentIndex::build(&page.fragments, &exact);

        assert!(idx.positions(ProfileField::BasalRates).is_empty());
        assert!(idx.positions(ProfileField::CorrectionFactor).is_empty());
        assert_eq!(idx.positions(ProfileField::CarbRatioFactor), &[4]);
    }

    #[test]
    fn recognizes_empty_fragment_label() {
        let idx = index(&["8:00", "5,0", "6,5", "", "Hoch", "Zeit"]);
        assert_eq!(idx.positions(ProfileField::TargetBloodSugar), &[3]);
    }

    #[test]
    fn recognizes_prefixed_date_label() {
        let idx = index(&["Erstellt am: 04.03.2024, 10:15", "Seite 1"]);
        assert_eq!(idx.positions(ProfileField::CreatedAt), &[0]);
    }
}
