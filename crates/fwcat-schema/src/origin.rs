//! Release origins: where firmware packages are downloaded from.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use url::Url;

use crate::error::SchemaError;
use crate::release::Release;

/// Placeholder substituted with a release version in tarball templates.
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Manifest key for the origin base URL.
pub const PATH_KEY: &str = "path";

/// Manifest key for the tarball template.
pub const TARBALL_KEY: &str = "tarball";

/// A firmware origin: a base URL plus a tarball path template.
///
/// Plain `http` base URLs are upgraded to `https` when the origin is built.
/// The base is written back out as it was given, apart from that upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    url: Url,
    path: String,
    tarball: String,
}

/// Wire shape of the origin fields.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RawOrigin {
    pub(crate) path: String,
    pub(crate) tarball: String,
}

impl Origin {
    /// Build an origin from a base URL and a tarball template such as
    /// `"firmware/{version}/fw.tar.gz"`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MalformedUrl`] if the base is not an absolute URL
    /// or the template is not a valid URL reference.
    pub fn new(base: &str, tarball: &str) -> Result<Self, SchemaError> {
        let mut url = Url::parse(base).map_err(|source| SchemaError::MalformedUrl {
            url: base.to_string(),
            source,
        })?;

        let mut path = base.trim().to_string();
        if url.scheme() == "http" && url.set_scheme("https").is_ok() {
            tracing::debug!(url = %url, "upgraded origin scheme to https");
            if let Some(colon) = path.find(':') {
                path.replace_range(..colon, "https");
            }
        }

        let mut origin = Self::from_url(url, tarball)?;
        origin.path = path;
        Ok(origin)
    }

    /// Build an origin from an already parsed base URL, which is kept as-is
    /// (no scheme upgrade).
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MalformedUrl`] if the template is not a valid URL
    /// reference.
    pub fn from_url(url: Url, tarball: &str) -> Result<Self, SchemaError> {
        let malformed = |source| SchemaError::MalformedUrl {
            url: tarball.to_string(),
            source,
        };

        match Url::parse(tarball) {
            Ok(_) => {}
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                url.join(tarball).map_err(malformed)?;
            }
            Err(source) => return Err(malformed(source)),
        }

        Ok(Self {
            path: url.to_string(),
            url,
            tarball: tarball.to_string(),
        })
    }

    /// The base URL packages are resolved against.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The unsubstituted tarball template.
    pub fn tarball(&self) -> &str {
        &self.tarball
    }

    /// Tarball template with every placeholder replaced by `version`.
    pub fn tarball_for(&self, version: &str) -> String {
        self.tarball.replace(VERSION_PLACEHOLDER, version)
    }

    /// Resolve the download URL of `release` against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MalformedUrl`] if the substituted template cannot
    /// be joined onto the base URL.
    pub fn resolve(&self, release: &Release) -> Result<Url, SchemaError> {
        let reference = self.tarball_for(release.version.as_str());
        self.url
            .join(&reference)
            .map_err(|source| SchemaError::MalformedUrl {
                url: reference,
                source,
            })
    }

    pub(crate) fn write_fields(&self, raw: &mut Map<String, Value>) {
        raw.insert(PATH_KEY.to_string(), Value::String(self.path.clone()));
        raw.insert(TARBALL_KEY.to_string(), Value::String(self.tarball.clone()));
    }
}

impl TryFrom<RawOrigin> for Origin {
    type Error = SchemaError;

    fn try_from(raw: RawOrigin) -> Result<Self, Self::Error> {
        Self::new(&raw.path, &raw.tarball)
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.url, self.tarball)
    }
}

impl Serialize for Origin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawOrigin {
            path: self.path.clone(),
            tarball: self.tarball.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Origin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawOrigin::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Version;

    fn release(version: &str) -> Release {
        Release {
            version: Version::new(version),
            ..Release::default()
        }
    }

    #[test]
    fn http_base_is_upgraded() {
        let origin = Origin::new("http://example.com/", "fw/{version}.tar.gz").unwrap();
        assert_eq!(origin.url().scheme(), "https");
        assert_eq!(origin.url().as_str(), "https://example.com/");
    }

    #[test]
    fn other_schemes_are_untouched() {
        let origin = Origin::new("ftp://example.com/pub/", "{version}.tgz").unwrap();
        assert_eq!(origin.url().scheme(), "ftp");
    }

    #[test]
    fn from_url_keeps_scheme() {
        let url = Url::parse("http://127.0.0.1:8080/fw/").unwrap();
        let origin = Origin::from_url(url, "{version}.tgz").unwrap();
        assert_eq!(origin.url().scheme(), "http");
    }

    #[test]
    fn malformed_base_is_rejected() {
        let err = Origin::new("not a url", "{version}.tgz").unwrap_err();
        assert!(matches!(err, SchemaError::MalformedUrl { .. }));

        let err = Origin::new("/firmware/", "{version}.tgz").unwrap_err();
        assert!(matches!(err, SchemaError::MalformedUrl { url, .. } if url == "/firmware/"));
    }

    #[test]
    fn malformed_template_is_rejected() {
        let err = Origin::new("https://example.com/", "http://[::1/{version}").unwrap_err();
        assert!(matches!(err, SchemaError::MalformedUrl { url, .. } if url.contains("[::1")));
    }

    #[test]
    fn resolve_substitutes_every_placeholder() {
        let origin = Origin::new(
            "https://downloads.example.com/firmware/",
            "{version}/fw-{version}.tar.gz",
        )
        .unwrap();
        let url = origin.resolve(&release("1_3_8")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://downloads.example.com/firmware/1_3_8/fw-1_3_8.tar.gz"
        );
    }

    #[test]
    fn resolve_follows_reference_rules() {
        let origin = Origin::new("https://example.com/a/b/", "/root/{version}.tgz").unwrap();
        let url = origin.resolve(&release("2_0")).unwrap();
        assert_eq!(url.as_str(), "https://example.com/root/2_0.tgz");

        let origin = Origin::new("https://example.com/a/b", "{version}.tgz").unwrap();
        let url = origin.resolve(&release("2_0")).unwrap();
        assert_eq!(url.as_str(), "https://example.com/a/2_0.tgz");
    }

    #[test]
    fn decodes_from_json() {
        let origin: Origin = serde_json::from_str(
            r#"{"path":"http://example.com/fw/","tarball":"{version}.tar.gz","extra":1}"#,
        )
        .unwrap();
        assert_eq!(origin.url().as_str(), "https://example.com/fw/");
        assert_eq!(origin.tarball(), "{version}.tar.gz");
    }

    #[test]
    fn encodes_base_as_given() {
        let origin = Origin::new("https://Example.COM/a b", "{version}.tgz").unwrap();
        assert_eq!(origin.url().as_str(), "https://example.com/a%20b");
        let json = serde_json::to_value(&origin).unwrap();
        assert_eq!(json["path"], "https://Example.COM/a b");

        let mut raw = Map::new();
        origin.write_fields(&mut raw);
        assert_eq!(raw[PATH_KEY], "https://Example.COM/a b");

        let origin = Origin::new("HTTP://Example.COM/fw/", "{version}.tgz").unwrap();
        assert_eq!(origin.url().scheme(), "https");
        let json = serde_json::to_value(&origin).unwrap();
        assert_eq!(json["path"], "https://Example.COM/fw/");

        let decoded: Origin = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, origin);
    }
}
