//! IO modules - side effects (network, filesystem)

pub mod cancel;
pub mod checksum;
pub mod extract;
pub mod fetch;
pub mod package;

#[cfg(test)]
pub(crate) mod fixtures;
