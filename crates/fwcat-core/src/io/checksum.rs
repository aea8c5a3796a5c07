//! Running MD5 over raw bytes as they are read.

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, ready};

use md5::{Digest, Md5};
use tokio::io::{AsyncRead, ReadBuf};

/// Shared MD5 accumulator.
///
/// Clones share the same state, so a digest can be taken from one handle while
/// another is still being fed.
#[derive(Clone, Default)]
pub struct Checksum(Arc<Mutex<Md5>>);

impl Checksum {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the digest.
    pub fn update(&self, data: &[u8]) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(data);
    }

    /// Lower-case hex digest of every byte fed so far. Does not reset state.
    pub fn hex_digest(&self) -> String {
        let hasher = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Debug for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Checksum").field(&self.hex_digest()).finish()
    }
}

/// Reader adapter that tees every byte read into a [`Checksum`].
#[derive(Debug)]
pub struct ChecksumReader<R> {
    inner: R,
    checksum: Checksum,
}

impl<R> ChecksumReader<R> {
    /// Wrap `inner`, feeding reads into `checksum`.
    pub fn new(inner: R, checksum: Checksum) -> Self {
        Self { inner, checksum }
    }

    /// Handle to the accumulator.
    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    /// Unwrap the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ChecksumReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        let read = &buf.filled()[before..];
        if !read.is_empty() {
            this.checksum.update(read);
        }
        Poll::Ready(Ok(()))
    }
}
