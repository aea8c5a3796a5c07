//! In-memory firmware packages for tests.

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;

/// One archive member.
pub(crate) enum Member<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8]),
    Symlink(&'a str, &'a str),
}

fn append(builder: &mut tar::Builder<GzEncoder<Vec<u8>>>, member: &Member<'_>) {
    let mut header = tar::Header::new_gnu();
    header.set_mtime(1_700_000_000);
    match *member {
        Member::Dir(path) => {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_mode(0o755);
            header.set_size(0);
            builder.append_data(&mut header, path, std::io::empty()).unwrap();
        }
        Member::File(path, data) => {
            header.set_entry_type(tar::EntryType::Regular);
            header.set_mode(0o644);
            header.set_size(data.len() as u64);
            builder.append_data(&mut header, path, data).unwrap();
        }
        Member::Symlink(path, target) => {
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_mode(0o777);
            header.set_size(0);
            builder.append_link(&mut header, path, target).unwrap();
        }
    }
}

/// Build a gzip-compressed tar archive of `members`.
pub(crate) fn package(members: &[Member<'_>]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for member in members {
        append(&mut builder, member);
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Build a package whose leading members are flushed as a self-contained
/// prefix. Returns the full bytes and the prefix length; a reader fed only the
/// prefix can decode `head` but stalls before `tail`.
pub(crate) fn flushed_package(head: &[Member<'_>], tail: &[Member<'_>]) -> (Vec<u8>, usize) {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for member in head {
        append(&mut builder, member);
    }
    builder.get_mut().flush().unwrap();
    let prefix = builder.get_ref().get_ref().len();
    for member in tail {
        append(&mut builder, member);
    }
    (builder.into_inner().unwrap().finish().unwrap(), prefix)
}

/// Build a single-file package flushed partway through the file contents.
/// Returns the full bytes and the prefix length; a reader fed only the prefix
/// can read the header and the first `available` content bytes, then stalls.
pub(crate) fn split_entry_package(path: &str, data: &[u8], available: usize) -> (Vec<u8>, usize) {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_mtime(1_700_000_000);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_mode(0o644);
    header.set_size(data.len() as u64);
    builder.append_data(&mut header, path, data).unwrap();
    let archive = builder.into_inner().unwrap();

    // header block, then file contents
    let split = 512 + available;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&archive[..split]).unwrap();
    encoder.flush().unwrap();
    let prefix = encoder.get_ref().len();
    encoder.write_all(&archive[split..]).unwrap();
    (encoder.finish().unwrap(), prefix)
}

/// Lower-case hex MD5 of `data`.
pub(crate) fn md5_hex(data: &[u8]) -> String {
    use md5::{Digest, Md5};
    hex::encode(Md5::digest(data))
}
