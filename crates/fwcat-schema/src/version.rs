//! Firmware versions and branch derivation.

use serde::{Deserialize, Serialize};

/// Separator between the branch name and the rest of a version.
pub const BRANCH_SEPARATOR: char = '_';

/// A firmware version string (e.g. `"1_3_8"`).
///
/// Versions order lexically by their raw text. Existing catalogs depend on this
/// ordering, so `"1_10"` sorts below `"1_9"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Create a new version from the given string (stored as-is).
    pub fn new(v: &str) -> Self {
        Self(v.to_string())
    }

    /// Return the version string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the branch this version belongs to: everything before the
    /// first `_`, or the whole version when there is no separator.
    pub fn branch(&self) -> &str {
        self.0
            .split_once(BRANCH_SEPARATOR)
            .map_or(self.0.as_str(), |(branch, _)| branch)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for Version {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_is_prefix_before_first_underscore() {
        assert_eq!(Version::new("2_1_5").branch(), "2");
        assert_eq!(Version::new("1_").branch(), "1");
        assert_eq!(Version::new("_1").branch(), "");
    }

    #[test]
    fn branch_without_separator_is_whole_version() {
        assert_eq!(Version::new("nightly").branch(), "nightly");
        assert_eq!(Version::new("").branch(), "");
    }

    #[test]
    fn ordering_is_lexical() {
        assert!(Version::new("1_9") > Version::new("1_10"));
        assert!(Version::new("2_0") > Version::new("1_9_9"));
        assert!(Version::new("1_3_8b") > Version::new("1_3_8"));
    }
}
