//! Release filters.
//!
//! Filters are plain values that compose by wrapping: [`Filter::invert`] takes
//! another filter and negates it.

use crate::model::{Matcher, ModelMap, ModelSet};
use crate::release::Release;

/// A predicate deciding whether a release is included.
pub enum Filter {
    /// Matches releases listing one of the given models (or when the filter
    /// itself holds the wildcard).
    Models(ModelMap),
    /// Matches releases with any model accepted by the matcher.
    ModelMatch(Box<dyn Matcher>),
    /// Negation of the wrapped filter.
    Invert(Box<Filter>),
}

impl Filter {
    /// Filter on membership in the given model names (case-insensitive).
    pub fn models<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: ModelSet = names.into_iter().map(Into::into).collect();
        Self::Models(set.map())
    }

    /// Filter on any model satisfying `matcher`.
    pub fn model_match(matcher: impl Matcher + 'static) -> Self {
        Self::ModelMatch(Box::new(matcher))
    }

    /// Negate `filter`.
    pub fn invert(filter: Filter) -> Self {
        Self::Invert(Box::new(filter))
    }

    /// Returns true if `release` passes the filter.
    pub fn matches(&self, release: &Release) -> bool {
        match self {
            Self::Models(map) => map.contains(release.models.iter()),
            Self::ModelMatch(matcher) => release.models.matches(matcher.as_ref()),
            Self::Invert(inner) => !inner.matches(release),
        }
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Models(map) => f.debug_tuple("Models").field(map).finish(),
            Self::ModelMatch(_) => f.write_str("ModelMatch(..)"),
            Self::Invert(inner) => f.debug_tuple("Invert").field(inner).finish(),
        }
    }
}
