//! Unpacking firmware packages to disk.

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::io::package::{PackageError, PackageReader};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Errors raised while unpacking a package.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Writing to the destination failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Reading the package failed.
    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    /// The archive contains an entry that cannot be unpacked safely.
    #[error("Archive error: {0}")]
    Archive(String),
}

/// A file written by [`unpack`].
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    /// Path relative to the extraction root
    pub relative_path: PathBuf,
    /// Path on disk
    pub absolute_path: PathBuf,
    /// Bytes written
    pub size: u64,
}

/// Relative path for an entry, rejecting anything that would escape the root.
fn relative_path(entry_path: &str) -> Result<PathBuf, ExtractError> {
    let path = Path::new(entry_path);
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::Archive(format!(
                    "Invalid path in archive: {entry_path}"
                )));
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(ExtractError::Archive(format!(
            "Invalid path in archive: {entry_path}"
        )));
    }
    Ok(relative)
}

/// Write every remaining regular file of `reader` under `dest_dir`.
///
/// Entries are streamed one at a time. The reader is not closed.
///
/// # Errors
///
/// Returns [`ExtractError::Archive`] for absolute or parent-relative entry
/// paths, and propagates read and write failures.
pub async fn unpack(
    reader: &PackageReader,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    fs::create_dir_all(dest_dir).await?;

    let mut extracted = Vec::new();
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];

    while let Some(header) = reader.next().await? {
        let relative_path = relative_path(&header.path)?;
        let absolute_path = dest_dir.join(&relative_path);

        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = File::create(&absolute_path).await?;
        let mut size = 0u64;
        loop {
            let n = reader.read_content(&mut buf).await?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).await?;
            size += n as u64;
        }
        file.flush().await?;

        tracing::debug!(path = %relative_path.display(), size, "extracted");
        extracted.push(ExtractedFile {
            relative_path,
            absolute_path,
            size,
        });
    }

    Ok(extracted)
}
