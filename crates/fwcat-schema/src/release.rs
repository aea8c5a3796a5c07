//! Firmware releases and their grouping into branches.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::filter::Filter;
use crate::model::ModelSet;
use crate::version::Version;

/// Initial capacity reserved for each branch group.
const STARTING_BRANCH_CAP: usize = 32;

/// A single firmware release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Release date, `YYYY-MM-DD`.
    pub date: String,
    /// MD5 checksum of the compressed package, lower-case hex.
    #[serde(rename = "md5sum")]
    pub checksum: String,
    /// Device models the release applies to.
    pub models: ModelSet,
    /// Release version.
    pub version: Version,
}

impl Release {
    /// Name of the branch the release is on.
    pub fn branch(&self) -> &str {
        self.version.branch()
    }

    /// Write the release fields into a flat JSON object.
    pub(crate) fn write_fields(&self, raw: &mut Map<String, Value>) {
        raw.insert("date".to_string(), Value::String(self.date.clone()));
        raw.insert("md5sum".to_string(), Value::String(self.checksum.clone()));
        raw.insert("models".to_string(), Value::String(self.models.to_string()));
        raw.insert(
            "version".to_string(),
            Value::String(self.version.as_str().to_string()),
        );
    }
}

impl std::fmt::Display for Release {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} [{}] {}",
            self.version, self.date, self.models, self.checksum
        )
    }
}

/// A group of releases sharing a branch name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Branch {
    /// Branch name, the version prefix before the first `_`.
    pub name: String,
    /// Releases on the branch, in their order of appearance.
    pub releases: ReleaseSet,
}

/// An ordered list of releases.
///
/// After [`ReleaseSet::sort`] the most recent version comes first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseSet(Vec<Release>);

impl ReleaseSet {
    /// Create a release set from releases, preserving their order.
    pub fn new(releases: Vec<Release>) -> Self {
        Self(releases)
    }

    /// Sort descending by lexical version.
    ///
    /// The sort is stable: releases with equal versions keep their relative
    /// order, so sorting twice is a no-op.
    pub fn sort(&mut self) {
        self.0.sort_by(|a, b| b.version.cmp(&a.version));
    }

    /// Group releases by branch.
    ///
    /// Branches appear in the order they are first seen, and releases keep
    /// their relative order within each branch.
    pub fn branches(&self) -> Vec<Branch> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut branches: Vec<Branch> = Vec::new();

        for release in &self.0 {
            let name = release.branch();
            let index = *seen.entry(name).or_insert_with(|| {
                branches.push(Branch {
                    name: name.to_string(),
                    releases: ReleaseSet(Vec::with_capacity(STARTING_BRANCH_CAP)),
                });
                branches.len() - 1
            });
            branches[index].releases.0.push(release.clone());
        }

        branches
    }

    /// Releases on the named branch, in order. Never absent: an unknown branch
    /// yields an empty group.
    pub fn branch(&self, name: &str) -> Branch {
        Branch {
            name: name.to_string(),
            releases: self
                .0
                .iter()
                .filter(|release| release.branch() == name)
                .cloned()
                .collect(),
        }
    }

    /// The release with the greatest version across the whole set, or a
    /// default release when the set is empty. Ties go to the earliest.
    pub fn latest(&self) -> Release {
        let mut latest: Option<&Release> = None;
        for release in &self.0 {
            if latest.is_none_or(|current| release.version > current.version) {
                latest = Some(release);
            }
        }
        latest.cloned().unwrap_or_default()
    }

    /// Releases matched by `filter`, in order.
    pub fn filter(&self, filter: &Filter) -> ReleaseSet {
        self.0
            .iter()
            .filter(|release| filter.matches(release))
            .cloned()
            .collect()
    }

    /// Find a release by exact version.
    pub fn find(&self, version: &str) -> Option<&Release> {
        self.0.iter().find(|release| release.version == version)
    }

    /// Append a release at the end.
    pub fn push(&mut self, release: Release) {
        self.0.push(release);
    }

    /// Iterate over the releases in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Release> {
        self.0.iter()
    }

    /// Number of releases.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return the releases as a slice.
    pub fn as_slice(&self) -> &[Release] {
        &self.0
    }
}

impl From<Vec<Release>> for ReleaseSet {
    fn from(releases: Vec<Release>) -> Self {
        Self(releases)
    }
}

impl FromIterator<Release> for ReleaseSet {
    fn from_iter<I: IntoIterator<Item = Release>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Release> for ReleaseSet {
    fn extend<I: IntoIterator<Item = Release>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for ReleaseSet {
    type Item = Release;
    type IntoIter = std::vec::IntoIter<Release>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ReleaseSet {
    type Item = &'a Release;
    type IntoIter = std::slice::Iter<'a, Release>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(version: &str, models: &str) -> Release {
        Release {
            date: "2024-01-01".to_string(),
            checksum: format!("sum-{version}"),
            models: ModelSet::parse(models),
            version: Version::new(version),
        }
    }

    fn versions(set: &ReleaseSet) -> Vec<&str> {
        set.iter().map(|r| r.version.as_str()).collect()
    }

    fn mixed() -> ReleaseSet {
        ReleaseSet::new(vec![
            release("2_0_1", "D40"),
            release("1_3_8", "D40"),
            release("2_1_0", "D45"),
            release("nightly", "*"),
            release("1_3_9", "D50"),
        ])
    }

    #[test]
    fn branches_keep_first_seen_order() {
        let branches = mixed().branches();
        let names: Vec<&str> = branches.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["2", "1", "nightly"]);
        assert_eq!(versions(&branches[0].releases), ["2_0_1", "2_1_0"]);
        assert_eq!(versions(&branches[1].releases), ["1_3_8", "1_3_9"]);
    }

    #[test]
    fn branches_after_sort_follow_sorted_order() {
        let mut set = mixed();
        set.sort();
        let branches = set.branches();
        let names: Vec<&str> = branches.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["nightly", "2", "1"]);
        assert_eq!(versions(&branches[1].releases), ["2_1_0", "2_0_1"]);
        assert_eq!(versions(&branches[2].releases), ["1_3_9", "1_3_8"]);
    }

    #[test]
    fn branch_lookup_returns_empty_group_when_missing() {
        let set = mixed();
        let group = set.branch("1");
        assert_eq!(group.name, "1");
        assert_eq!(versions(&group.releases), ["1_3_8", "1_3_9"]);

        let missing = set.branch("7");
        assert_eq!(missing.name, "7");
        assert!(missing.releases.is_empty());
    }

    #[test]
    fn latest_spans_all_branches() {
        assert_eq!(mixed().latest().version, "nightly");
        assert_eq!(mixed().branch("1").releases.latest().version, "1_3_9");
    }

    #[test]
    fn latest_of_empty_set_is_default() {
        assert_eq!(ReleaseSet::default().latest(), Release::default());
    }

    #[test]
    fn sort_is_descending_lexical_and_idempotent() {
        let mut set = ReleaseSet::new(vec![
            release("1_9", ""),
            release("1_10", ""),
            release("1_2", ""),
        ]);
        set.sort();
        assert_eq!(versions(&set), ["1_9", "1_2", "1_10"]);

        let once = set.clone();
        set.sort();
        assert_eq!(set, once);
    }

    #[test]
    fn find_by_version() {
        let set = mixed();
        assert_eq!(set.find("1_3_8").map(|r| r.checksum.as_str()), Some("sum-1_3_8"));
        assert!(set.find("9_9").is_none());
    }

    #[test]
    fn release_json_field_names() {
        let json = serde_json::to_value(release("1_3_8", "D40 D45")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "date": "2024-01-01",
                "md5sum": "sum-1_3_8",
                "models": "D40,D45",
                "version": "1_3_8",
            })
        );
    }
}
