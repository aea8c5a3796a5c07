//! HTTP transport for manifests and firmware packages.
//!
//! Every request carries [`crate::USER_AGENT`], and only a `200 OK` answer is
//! accepted. Package bodies are streamed straight into a [`PackageReader`];
//! nothing is buffered on disk before extraction.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::TryStreamExt;
use fwcat_schema::{Manifest, Origin, Release, SchemaError};
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::io::cancel::Cancellable;
use crate::io::extract::{ExtractError, ExtractedFile, unpack};
use crate::io::package::{PackageError, PackageReader};

/// Errors raised while fetching manifests or packages.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The server answered with something other than `200 OK`.
    #[error("Unexpected status {status} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status received.
        status: StatusCode,
    },

    /// The request itself failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The manifest could not be decoded, or a URL could not be resolved.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The package stream could not be read.
    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    /// Extracting the package failed.
    #[error("Extract error: {0}")]
    Extract(#[from] ExtractError),

    /// Local file access failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The downloaded bytes do not match the release checksum.
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum recorded in the manifest.
        expected: String,
        /// Checksum of the bytes received.
        actual: String,
    },
}

/// Where a manifest is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    /// Fetched over HTTP(S).
    Remote(Url),
    /// Read from the local filesystem.
    Local(PathBuf),
}

impl ManifestSource {
    /// Classify `source`: `http://` and `https://` are remote, anything else
    /// is a file path.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MalformedUrl`] for an unparseable remote URL.
    pub fn parse(source: &str) -> Result<Self, SchemaError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let url = Url::parse(source).map_err(|err| SchemaError::MalformedUrl {
                url: source.to_string(),
                source: err,
            })?;
            Ok(Self::Remote(url))
        } else {
            Ok(Self::Local(PathBuf::from(source)))
        }
    }
}

impl std::fmt::Display for ManifestSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{url}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Build an HTTP client with an optional overall request timeout.
///
/// # Errors
///
/// Returns [`FetchError::Http`] if the TLS backend cannot be initialised.
pub fn client(timeout: Option<Duration>) -> Result<Client, FetchError> {
    let mut builder = Client::builder().user_agent(crate::USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

async fn get(client: &Client, url: &Url) -> Result<Response, FetchError> {
    let response = client
        .get(url.clone())
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }
    Ok(response)
}

/// Fetch and decode the manifest at `url`.
///
/// # Errors
///
/// Returns [`FetchError::Status`] for any answer but `200 OK`,
/// [`FetchError::Http`] for transport failures and [`FetchError::Schema`] if
/// the body is not a valid manifest.
pub async fn fetch_manifest(client: &Client, url: &Url) -> Result<Manifest, FetchError> {
    tracing::info!(url = %url, "fetching manifest");
    let body = get(client, url).await?.bytes().await?;
    let manifest = Manifest::from_slice(&body)?;
    tracing::info!(releases = manifest.releases.len(), "manifest loaded");
    Ok(manifest)
}

/// Load a manifest from a remote or local source.
///
/// # Errors
///
/// See [`fetch_manifest`]; local sources additionally fail with
/// [`FetchError::Io`].
pub async fn load_manifest(
    client: &Client,
    source: &ManifestSource,
) -> Result<Manifest, FetchError> {
    match source {
        ManifestSource::Remote(url) => fetch_manifest(client, url).await,
        ManifestSource::Local(path) => {
            let body = tokio::fs::read(path).await?;
            let manifest = Manifest::from_slice(&body)?;
            tracing::debug!(path = %path.display(), releases = manifest.releases.len(), "manifest read");
            Ok(manifest)
        }
    }
}

/// Start downloading `release` and open a reader over the package stream.
///
/// The transfer is tied to a fresh cancellation token attached to the
/// reader, so [`PackageReader::close`] aborts it even mid-read.
///
/// # Errors
///
/// Returns [`FetchError::Schema`] if the URL cannot be resolved,
/// [`FetchError::Status`]/[`FetchError::Http`] if the request fails, and
/// [`FetchError::Package`] if the body is not a readable package.
pub async fn open_package(
    client: &Client,
    origin: &Origin,
    release: &Release,
) -> Result<PackageReader, FetchError> {
    let url = origin.resolve(release)?;
    tracing::info!(version = %release.version, url = %url, "downloading package");

    let response = get(client, &url).await?;
    let stream = Box::pin(response.bytes_stream().map_err(io::Error::other));
    let token = CancellationToken::new();
    let source = Cancellable::new(StreamReader::new(stream), token.clone());

    Ok(PackageReader::builder(source)
        .with_cancel(token)
        .open()
        .await?)
}

/// Compare the raw-stream digest of a drained reader with the release record.
///
/// # Errors
///
/// Returns [`FetchError::ChecksumMismatch`] if they differ.
pub fn verify(reader: &PackageReader, release: &Release) -> Result<String, FetchError> {
    let actual = reader.checksum_digest();
    if !actual.eq_ignore_ascii_case(&release.checksum) {
        tracing::warn!(
            version = %release.version,
            expected = %release.checksum,
            actual = %actual,
            "package checksum mismatch"
        );
        return Err(FetchError::ChecksumMismatch {
            expected: release.checksum.clone(),
            actual,
        });
    }
    Ok(actual)
}

/// Download `release`, unpack it under `dest` and verify its checksum.
///
/// Files already written are left in place when verification fails.
///
/// # Errors
///
/// See [`open_package`], [`unpack`] and [`verify`].
pub async fn download_package(
    client: &Client,
    origin: &Origin,
    release: &Release,
    dest: &Path,
) -> Result<Vec<ExtractedFile>, FetchError> {
    let reader = open_package(client, origin, release).await?;
    let files = unpack_and_verify(&reader, release, dest).await;
    let closed = reader.close().await;
    let files = files?;
    closed?;
    Ok(files)
}

/// Unpack an opened package and verify it once the stream is drained.
///
/// # Errors
///
/// See [`unpack`] and [`verify`].
pub async fn unpack_and_verify(
    reader: &PackageReader,
    release: &Release,
    dest: &Path,
) -> Result<Vec<ExtractedFile>, FetchError> {
    let files = unpack(reader, dest).await?;
    let digest = verify(reader, release)?;
    tracing::info!(files = files.len(), md5 = %digest, "package verified");
    Ok(files)
}
