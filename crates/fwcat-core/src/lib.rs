//! Streaming access to firmware packages.
//!
//! [`PackageReader`] walks the files of a gzip-compressed tar package while
//! checksumming the raw stream. The [`io::fetch`] functions load manifests and
//! open packages over HTTP, and [`io::extract::unpack`] writes a package to
//! disk.

pub mod io;

pub use io::cancel::Cancellable;
pub use io::checksum::{Checksum, ChecksumReader};
pub use io::extract::{ExtractError, ExtractedFile, unpack};
pub use io::fetch::{
    FetchError, ManifestSource, client, download_package, fetch_manifest, load_manifest,
    open_package,
};
pub use io::package::{Closer, Header, PackageError, PackageReader, PackageReaderBuilder};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("fwcat-core/", env!("CARGO_PKG_VERSION"));
