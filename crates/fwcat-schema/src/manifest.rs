//! Catalog manifest wire format.
//!
//! A manifest is a flat JSON object. The origin's `path` and `tarball` sit at
//! the top level next to one release array per branch:
//!
//! ```text
//! {
//!   "path": "https://downloads.example.com/firmware/",
//!   "tarball": "{version}/firmware.tar.gz",
//!   "versions":  [ ...releases on branch "1"... ],
//!   "versions2": [ ...releases on branch "2"... ],
//!   "date": "...", "md5sum": "...", "models": "...", "version": "..."
//! }
//! ```
//!
//! Branch `"1"` uses the bare `versions` key, and its latest release is also
//! copied to the top level. Decoding ignores those promoted fields and reads
//! every key starting with `versions`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::filter::Filter;
use crate::origin::{Origin, RawOrigin};
use crate::release::{Release, ReleaseSet};

/// Prefix shared by every per-branch release array key.
pub const BRANCH_PREFIX: &str = "versions";

/// Branch stored under the bare prefix key and promoted to the top level.
pub const PROMOTED_BRANCH: &str = "1";

/// Manifest key for the release array of `branch`.
pub fn branch_key(branch: &str) -> String {
    if branch == PROMOTED_BRANCH {
        BRANCH_PREFIX.to_string()
    } else {
        format!("{BRANCH_PREFIX}{branch}")
    }
}

/// A firmware catalog: an origin plus every known release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Where packages are downloaded from.
    pub origin: Origin,
    /// Known releases, most recent first once normalized.
    pub releases: ReleaseSet,
}

impl Manifest {
    /// Create a manifest. Releases are sorted most recent first.
    pub fn new(origin: Origin, releases: ReleaseSet) -> Self {
        let mut manifest = Self { origin, releases };
        manifest.normalize();
        manifest
    }

    /// Sort the releases most recent first.
    pub fn normalize(&mut self) {
        self.releases.sort();
    }

    /// A manifest with the same origin and only the releases matched by
    /// `filter`.
    pub fn filter(&self, filter: &Filter) -> Manifest {
        Manifest {
            origin: self.origin.clone(),
            releases: self.releases.filter(filter),
        }
    }

    /// Download URL of `release` under this manifest's origin.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MalformedUrl`] if the URL cannot be resolved.
    pub fn resolve(&self, release: &Release) -> Result<url::Url, SchemaError> {
        self.origin.resolve(release)
    }

    /// Multi-line summary of the origin and each branch's releases.
    pub fn summary(&self) -> String {
        self.to_string()
    }

    /// Decode a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Json`] for invalid JSON,
    /// [`SchemaError::MalformedOrigin`] or [`SchemaError::MalformedUrl`] for a
    /// bad origin, and [`SchemaError::MalformedReleaseList`] for a bad branch.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Decode a manifest from JSON bytes.
    ///
    /// # Errors
    ///
    /// See [`Manifest::from_json`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SchemaError> {
        Self::from_value(serde_json::from_slice(bytes)?)
    }

    /// Decode a manifest from a parsed JSON value.
    ///
    /// # Errors
    ///
    /// See [`Manifest::from_json`].
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let Value::Object(raw) = value else {
            return Err(SchemaError::Json(serde::de::Error::custom(
                "manifest must be a JSON object",
            )));
        };

        let origin = RawOrigin::deserialize(&Value::Object(raw.clone()))
            .map_err(SchemaError::MalformedOrigin)
            .and_then(Origin::try_from)?;

        let mut releases = ReleaseSet::default();
        for (key, value) in raw {
            if !key.starts_with(BRANCH_PREFIX) {
                continue;
            }
            let branch = ReleaseSet::deserialize(value)
                .map_err(|source| SchemaError::MalformedReleaseList { key, source })?;
            releases.extend(branch);
        }
        releases.sort();

        tracing::debug!(releases = releases.len(), origin = %origin.url(), "decoded manifest");

        Ok(Self { origin, releases })
    }

    /// Encode the manifest as a JSON value, sorting the releases first.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Json`] if a release cannot be encoded.
    pub fn to_value(&mut self) -> Result<Value, SchemaError> {
        self.normalize();
        self.encode_sorted().map(Value::Object)
    }

    /// Encode the manifest as compact JSON, sorting the releases first.
    ///
    /// # Errors
    ///
    /// See [`Manifest::to_value`].
    pub fn to_json(&mut self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string(&self.to_value()?)?)
    }

    /// Encode the manifest as indented JSON, sorting the releases first.
    ///
    /// # Errors
    ///
    /// See [`Manifest::to_value`].
    pub fn to_json_pretty(&mut self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string_pretty(&self.to_value()?)?)
    }

    /// Build the flat wire object. Assumes the releases are already sorted.
    fn encode_sorted(&self) -> Result<Map<String, Value>, SchemaError> {
        let mut raw = Map::new();
        self.origin.write_fields(&mut raw);

        for branch in self.releases.branches() {
            if branch.name == PROMOTED_BRANCH {
                branch.releases.latest().write_fields(&mut raw);
            }
            raw.insert(
                branch_key(&branch.name),
                serde_json::to_value(&branch.releases)?,
            );
        }

        Ok(raw)
    }
}

impl std::fmt::Display for Manifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Origin: {}", self.origin)?;
        for branch in self.releases.branches() {
            writeln!(f, "Branch {}:", branch.name)?;
            for release in &branch.releases {
                writeln!(f, "  {release}")?;
            }
        }
        Ok(())
    }
}

impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut sorted = self.clone();
        sorted.normalize();
        sorted
            .encode_sorted()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Manifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}
