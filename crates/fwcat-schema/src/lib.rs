//! Shared types and wire format for fwcat.
//!
//! A [`Manifest`] pairs an [`Origin`] with a [`ReleaseSet`]. Releases are
//! grouped into branches by the prefix of their [`Version`] and can be
//! narrowed with a [`Filter`].

pub mod error;
pub mod filter;
pub mod manifest;
pub mod model;
pub mod origin;
pub mod release;
pub mod version;

// Re-exports
pub use error::SchemaError;
pub use filter::Filter;
pub use manifest::Manifest;
pub use model::{Matcher, ModelMap, ModelSet, WILDCARD};
pub use origin::Origin;
pub use release::{Branch, Release, ReleaseSet};
pub use version::Version;

/// Magic bytes opening every gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
