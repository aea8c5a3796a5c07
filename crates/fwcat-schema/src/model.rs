//! Device model identifiers.
//!
//! A firmware release applies to a list of hardware models. Models are
//! compared case-insensitively, and the literal `*` model matches anything.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Model identifier that matches any device.
pub const WILDCARD: &str = "*";

/// A string or pattern matcher applied to model identifiers.
pub trait Matcher: Send + Sync {
    /// Returns true if `value` satisfies the matcher.
    fn is_match(&self, value: &str) -> bool;
}

impl Matcher for regex::Regex {
    fn is_match(&self, value: &str) -> bool {
        regex::Regex::is_match(self, value)
    }
}

impl Matcher for glob::Pattern {
    fn is_match(&self, value: &str) -> bool {
        self.matches_with(
            value,
            glob::MatchOptions {
                case_sensitive: false,
                ..glob::MatchOptions::new()
            },
        )
    }
}

impl<M: Matcher + ?Sized> Matcher for Box<M> {
    fn is_match(&self, value: &str) -> bool {
        (**self).is_match(value)
    }
}

/// Ordered list of model identifiers.
///
/// Encoded on the wire as a single comma-joined string (`"D40,D45,D50"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ModelSet(Vec<String>);

impl ModelSet {
    /// Create a model set from identifiers, keeping them exactly as given.
    pub fn new(models: Vec<String>) -> Self {
        Self(models)
    }

    /// Parse user input into a model set.
    ///
    /// Tokens are separated by whitespace and/or commas and are uppercased.
    /// Blank input yields an empty set.
    pub fn parse(value: &str) -> Self {
        Self(
            value
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|field| !field.is_empty())
                .map(str::to_uppercase)
                .collect(),
        )
    }

    /// True if the set includes the wildcard model.
    pub fn has_wildcard(&self) -> bool {
        self.0.iter().any(|model| model == WILDCARD)
    }

    /// True if any model in the set satisfies `matcher`.
    pub fn matches(&self, matcher: &dyn Matcher) -> bool {
        self.0.iter().any(|model| matcher.is_match(model))
    }

    /// Build a lookup map keyed by lowercased model.
    pub fn map(&self) -> ModelMap {
        ModelMap(self.0.iter().map(|model| model.to_lowercase()).collect())
    }

    /// Iterate over the models in order.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    /// Number of models in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the set has no models.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a model to the end of the set.
    pub fn push(&mut self, model: impl Into<String>) {
        self.0.push(model.into());
    }

    /// Return the models as a slice.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for ModelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

impl From<Vec<String>> for ModelSet {
    fn from(models: Vec<String>) -> Self {
        Self::new(models)
    }
}

impl From<&[&str]> for ModelSet {
    fn from(models: &[&str]) -> Self {
        Self(models.iter().map(|m| (*m).to_string()).collect())
    }
}

impl FromIterator<String> for ModelSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ModelSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for ModelSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.join(","))
    }
}

impl<'de> Deserialize<'de> for ModelSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let joined = String::deserialize(deserializer)?;
        if joined.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self(joined.split(',').map(str::to_string).collect()))
    }
}

/// Set of lowercased model identifiers for containment tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelMap(HashSet<String>);

impl ModelMap {
    /// Returns true if any of `models` is in the map, or the map holds the
    /// wildcard. An empty map contains nothing.
    pub fn contains<I, S>(&self, models: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        models
            .into_iter()
            .any(|model| self.0.contains(&model.as_ref().to_lowercase()))
            || self.0.contains(WILDCARD)
    }

    /// Number of distinct models in the map.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
