//! Streaming reader for firmware packages.
//!
//! A package is a gzip-compressed tar archive. [`PackageReader`] walks its
//! regular files one at a time straight off the byte stream, while an MD5 of
//! the raw (still compressed) bytes is accumulated for verification against
//! the release checksum.
//!
//! The reader is shared by reference: one task typically drives
//! [`PackageReader::next`] and [`PackageReader::read_content`], while another
//! may call [`PackageReader::close`] at any time to abort. When a
//! [`CancellationToken`] is attached, `close` fires it before waiting for the
//! reader lock, which unblocks a read stalled on the network.

use std::io;
use std::sync::LazyLock;

use async_compression::tokio::bufread::GzipDecoder;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use fwcat_schema::{GZIP_MAGIC, ModelSet};
use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::io::checksum::{Checksum, ChecksumReader};

/// Pattern locating model identifiers inside entry paths. The capture group
/// holds the model (e.g. `D65` in `firmware_D65_1.bin`). Word boundaries are
/// ASCII-only, so a non-ASCII letter right before a model does not hide it.
pub const MODEL_PATTERN: &str = r"(?:_|(?-u:\b))([dD][0-9]{2,})(?:_|(?-u:\b))";

static MODEL_MATCHER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(MODEL_PATTERN).expect("MODEL_PATTERN is a valid regex"));

type Source = Box<dyn AsyncRead + Send + Unpin>;
type Raw = BufReader<Source>;
type Decoder = GzipDecoder<Raw>;
type Archive = tokio_tar::Archive<Decoder>;

/// Callback releasing an external resource tied to the package stream.
pub type Closer = Box<dyn FnOnce() -> io::Result<()> + Send>;

/// Errors raised while reading a firmware package.
#[derive(Error, Debug)]
pub enum PackageError {
    /// The stream is not gzip, or its compressed data is corrupt.
    #[error("Invalid compressed stream: {0}")]
    InvalidCompressedStream(#[source] io::Error),

    /// The archive holds no regular files.
    #[error("Empty package: archive has no regular files")]
    EmptyPackage,

    /// The reader was used after being closed.
    #[error("Package reader was cancelled or closed")]
    ReaderClosed,

    /// Reading the stream failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Metadata for a regular file inside a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Base name of the file.
    pub name: String,
    /// Cleaned path within the archive.
    pub path: String,
    /// Size of the file contents in bytes.
    pub size: u64,
    /// Modification time recorded in the archive.
    pub mod_time: DateTime<Utc>,
    /// Models named in the path, in order of appearance.
    pub models: ModelSet,
}

impl Header {
    fn new(raw_path: &str, size: u64, mtime: u64) -> Self {
        let path = clean_path(raw_path);
        let name = base_name(&path).to_string();
        Self {
            name,
            path,
            size,
            mod_time: DateTime::from_timestamp(mtime as i64, 0).unwrap_or_default(),
            models: models_in_path(raw_path),
        }
    }
}

/// Every model token found in `path`, as written.
pub fn models_in_path(path: &str) -> ModelSet {
    MODEL_MATCHER
        .captures_iter(path)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Lexically clean a slash-separated path: collapse repeated separators,
/// drop `.` elements, and resolve `..` against preceding elements.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

fn base_name(cleaned: &str) -> &str {
    match cleaned.rsplit('/').next() {
        Some("") | None => cleaned,
        Some(name) => name,
    }
}

struct State {
    archive: Option<Archive>,
    entries: Option<tokio_tar::Entries<Decoder>>,
    current: Option<tokio_tar::Entry<Archive>>,
    first: Option<Header>,
    started: bool,
    exhausted: bool,
    closed: bool,
    closer: Option<Closer>,
}

impl State {
    /// Move to the next regular file, skipping directories, links and other
    /// special members.
    async fn advance(&mut self) -> io::Result<Option<Header>> {
        if self.exhausted {
            return Ok(None);
        }
        self.current = None;

        if let Some(entries) = self.entries.as_mut() {
            while let Some(entry) = entries.next().await {
                let entry = entry?;
                let raw_path = entry.path()?.to_string_lossy().into_owned();
                let kind = entry.header().entry_type();
                if !kind.is_file() {
                    tracing::debug!(path = %raw_path, kind = ?kind, "skipping non-regular entry");
                    continue;
                }

                let header = Header::new(&raw_path, entry.header().size()?, entry.header().mtime()?);
                self.current = Some(entry);
                return Ok(Some(header));
            }
        }

        self.exhausted = true;
        self.drain().await?;
        Ok(None)
    }

    /// Read whatever follows the archive (end blocks, gzip trailer) so the
    /// checksum covers the complete stream.
    async fn drain(&mut self) -> io::Result<()> {
        self.entries = None;
        let Some(archive) = self.archive.take() else {
            return Ok(());
        };
        match archive.into_inner() {
            Ok(decoder) => {
                let mut raw = decoder.into_inner();
                let drained = tokio::io::copy(&mut raw, &mut tokio::io::sink()).await?;
                tracing::debug!(bytes = drained, "drained package trailer");
            }
            Err(_) => tracing::debug!("archive still shared, trailer left unread"),
        }
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        self.current = None;
        self.entries = None;
        self.archive = None;
        self.first = None;
        match self.closer.take() {
            Some(closer) => closer(),
            None => Ok(()),
        }
    }
}

/// Options for opening a [`PackageReader`].
pub struct PackageReaderBuilder {
    source: Source,
    cancel: Option<CancellationToken>,
    closer: Option<Closer>,
}

impl PackageReaderBuilder {
    /// Attach a token that [`PackageReader::close`] cancels before taking the
    /// reader lock. The source should fail its reads once the token fires
    /// (see [`crate::io::cancel::Cancellable`]).
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Attach a callback run once when the reader is released.
    pub fn with_closer(mut self, closer: Closer) -> Self {
        self.closer = Some(closer);
        self
    }

    /// Set up decompression and read ahead to the first regular file.
    ///
    /// Part of the stream may have been consumed even when this fails. On
    /// failure the closer, if any, is still run.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::InvalidCompressedStream`] if the stream is not
    /// gzip, [`PackageError::EmptyPackage`] if the archive holds no regular
    /// file, and [`PackageError::Io`] for read failures.
    pub async fn open(self) -> Result<PackageReader, PackageError> {
        let Self {
            source,
            cancel,
            closer,
        } = self;

        let checksum = Checksum::new();
        let mut state = State {
            archive: None,
            entries: None,
            current: None,
            first: None,
            started: false,
            exhausted: false,
            closed: false,
            closer,
        };

        match Self::prefetch(source, &checksum, &mut state).await {
            Ok(()) => Ok(PackageReader {
                state: Mutex::new(state),
                checksum,
                cancel,
            }),
            Err(err) => {
                if let Err(close_err) = state.release() {
                    tracing::debug!(error = %close_err, "closer failed after open error");
                }
                Err(err)
            }
        }
    }

    async fn prefetch(
        source: Source,
        checksum: &Checksum,
        state: &mut State,
    ) -> Result<(), PackageError> {
        let mut tee = ChecksumReader::new(source, checksum.clone());

        let mut magic = [0u8; 2];
        match tee.read_exact(&mut magic).await {
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(PackageError::InvalidCompressedStream(err));
            }
            Err(err) => return Err(PackageError::Io(err)),
        }
        if magic != GZIP_MAGIC {
            return Err(PackageError::InvalidCompressedStream(io::Error::new(
                io::ErrorKind::InvalidData,
                "missing gzip magic bytes",
            )));
        }

        let rechained: Source = Box::new(io::Cursor::new(magic).chain(tee));
        let raw = BufReader::new(rechained);
        let mut decoder = GzipDecoder::new(raw);
        decoder.multiple_members(true);

        let mut archive = tokio_tar::Archive::new(decoder);
        state.entries = Some(archive.entries()?);
        state.archive = Some(archive);

        match state.advance().await {
            Ok(Some(header)) => {
                tracing::debug!(path = %header.path, size = header.size, "first package entry");
                state.first = Some(header);
                Ok(())
            }
            Ok(None) => Err(PackageError::EmptyPackage),
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                Err(PackageError::InvalidCompressedStream(err))
            }
            Err(err) => Err(PackageError::Io(err)),
        }
    }
}

impl std::fmt::Debug for PackageReaderBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageReaderBuilder")
            .field("cancel", &self.cancel.is_some())
            .field("closer", &self.closer.is_some())
            .finish_non_exhaustive()
    }
}

/// Reader over the regular files of a firmware package.
///
/// It is the caller's responsibility to [`close`](PackageReader::close) the
/// reader when finished with it. Closing is safe from any task, at any time,
/// any number of times.
pub struct PackageReader {
    state: Mutex<State>,
    checksum: Checksum,
    cancel: Option<CancellationToken>,
}

impl PackageReader {
    /// Start configuring a reader over `stream`.
    pub fn builder<R>(stream: R) -> PackageReaderBuilder
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        PackageReaderBuilder {
            source: Box::new(stream),
            cancel: None,
            closer: None,
        }
    }

    /// Open a reader over `stream` with no cancellation or closer attached.
    ///
    /// # Errors
    ///
    /// See [`PackageReaderBuilder::open`].
    pub async fn new<R>(stream: R) -> Result<Self, PackageError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::builder(stream).open().await
    }

    /// Advance to the next regular file. Returns `Ok(None)` once the package
    /// is exhausted, and keeps doing so on later calls.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::ReaderClosed`] after [`close`](Self::close),
    /// and [`PackageError::Io`] if the stream fails (including when it is
    /// cancelled mid-read).
    pub async fn next(&self) -> Result<Option<Header>, PackageError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(PackageError::ReaderClosed);
        }
        if !state.started {
            state.started = true;
            return Ok(state.first.take());
        }
        Ok(state.advance().await?)
    }

    /// Read contents of the file last returned by [`next`](Self::next).
    /// Returns `Ok(0)` at the end of the file, or when no file has been
    /// returned yet.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::ReaderClosed`] after [`close`](Self::close),
    /// and [`PackageError::Io`] if the stream fails.
    pub async fn read_content(&self, buf: &mut [u8]) -> Result<usize, PackageError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(PackageError::ReaderClosed);
        }
        if !state.started {
            return Ok(0);
        }
        match state.current.as_mut() {
            Some(entry) => Ok(entry.read(buf).await?),
            None => Ok(0),
        }
    }

    /// Read the rest of the current file into memory.
    ///
    /// # Errors
    ///
    /// See [`read_content`](Self::read_content).
    pub async fn read_to_end(&self) -> Result<Vec<u8>, PackageError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(PackageError::ReaderClosed);
        }
        let mut data = Vec::new();
        if state.started {
            if let Some(entry) = state.current.as_mut() {
                entry.read_to_end(&mut data).await?;
            }
        }
        Ok(data)
    }

    /// Hex MD5 of every raw byte consumed from the stream so far. Remains
    /// available after the reader is closed.
    pub fn checksum_digest(&self) -> String {
        self.checksum.hex_digest()
    }

    /// True once [`close`](Self::close) has completed.
    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// Release the decompressor and stream, then run the closer.
    ///
    /// Any attached cancellation token is fired first, outside the lock, so a
    /// [`next`](Self::next) or [`read_content`](Self::read_content) call
    /// blocked on the stream fails and gives up the lock. Later calls return
    /// `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns the closer's error, if any.
    pub async fn close(&self) -> Result<(), PackageError> {
        if let Some(token) = &self.cancel {
            token.cancel();
        }

        let mut state = self.state.lock().await;
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        state.release()?;
        Ok(())
    }
}

impl std::fmt::Debug for PackageReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageReader")
            .field("checksum", &self.checksum)
            .field("cancel", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}
