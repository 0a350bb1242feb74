//! Anchor recognition strategies.
//!
//! Profiles carry no table structure, only labels rendered next to their
//! tables. A label is recognized from two adjacent fragments, either as an
//! exact pair or as a prefix of the pair joined by `;` (for labels with a
//! variable suffix such as an embedded timestamp). Each strategy sits behind
//! [`AnchorMatcher`] so the indexing loop does not need to know about them.

use std::collections::HashMap;

use carelink_profile_models::ProfileField;

/// Decides whether a pair of adjacent fragments labels a profile field.
pub trait AnchorMatcher: Send + Sync {
    /// Returns the field labelled by `first` followed by `second`, if any.
    fn match_pair(&self, first: &str, second: &str) -> Option<ProfileField>;
}

/// Matches exact `"first;second"` phrases by direct lookup.
#[derive(Debug, Clone, Default)]
pub struct ExactPhraseMatcher {
    phrases: HashMap<String, ProfileField>,
}

impl ExactPhraseMatcher {
    /// Registers `phrase` (written as `"first;second"`) for `field`.
    pub fn insert(&mut self, phrase: &str, field: ProfileField) {
        self.phrases.insert(phrase.to_owned(), field);
    }
}

impl AnchorMatcher for ExactPhraseMatcher {
    fn match_pair(&self, first: &str, second: &str) -> Option<ProfileField> {
        if self.phrases.is_empty() {
            return None;
        }
        self.phrases.get(&format!("{first};{second}")).copied()
    }
}

/// Matches prefixes of `"first;second"` by scanning, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct PrefixPhraseMatcher {
    prefixes: Vec<(String, ProfileField)>,
}

impl PrefixPhraseMatcher {
    /// Registers `prefix` for `field`.
    pub fn push(&mut self, prefix: &str, field: ProfileField) {
        self.prefixes.push((prefix.to_owned(), field));
    }
}

impl AnchorMatcher for PrefixPhraseMatcher {
    fn match_pair(&self, first: &str, second: &str) -> Option<ProfileField> {
        if self.prefixes.is_empty() {
            return None;
        }
        let joined = format!("{first};{second}");
        self.prefixes
            .iter()
            .find(|(prefix, _)| joined.starts_with(prefix.as_str()))
            .map(|(_, field)| *field)
    }
}

/// An ordered list of matchers; the first one that matches wins.
#[derive(Default)]
pub struct AnchorSet {
    matchers: Vec<Box<dyn AnchorMatcher>>,
}

impl AnchorSet {
    /// Creates a set that consults `matchers` in order.
    #[must_use]
    pub fn new(matchers: Vec<Box<dyn AnchorMatcher>>) -> Self {
        Self { matchers }
    }
}

impl std::fmt::Debug for AnchorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorSet")
            .field("matchers", &self.matchers.len())
            .finish()
    }
}

impl AnchorMatcher for AnchorSet {
    fn match_pair(&self, first: &str, second: &str) -> Option<ProfileField> {
        self.matchers
            .iter()
            .find_map(|m| m.match_pair(first, second))
    }
}
