//! Errors raised while decoding catalog data.

use thiserror::Error;

/// Errors that can occur when decoding or resolving catalog data.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A base URL or tarball template is not a valid URL.
    #[error("Malformed URL '{url}': {source}")]
    MalformedUrl {
        /// The offending URL text.
        url: String,
        /// Underlying parse failure.
        #[source]
        source: url::ParseError,
    },

    /// The origin fields of a manifest could not be decoded.
    #[error("Malformed origin: {0}")]
    MalformedOrigin(#[source] serde_json::Error),

    /// A per-branch release list could not be decoded.
    #[error("Malformed release list under '{key}': {source}")]
    MalformedReleaseList {
        /// Manifest key holding the list.
        key: String,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// The manifest is not a JSON object, or could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
