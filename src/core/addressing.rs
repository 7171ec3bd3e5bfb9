//! Content addressing for downloaded assets.
//!
//! Output files are named from a 64-bit FNV-1a hash of the source URL,
//! rendered in decimal. The name depends on nothing but the URL bytes, so a
//! re-run overwrites the files of an earlier run instead of duplicating them.

use std::hash::Hasher;
use std::path::{Path, PathBuf};

use fnv::FnvHasher;

/// 64-bit FNV-1a digest of a URL
pub fn url_digest(source_url: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(source_url.as_bytes());
    hasher.finish()
}

/// Filename for an asset fetched from `source_url`
pub fn addressed_name(source_url: &str) -> String {
    url_digest(source_url).to_string()
}

/// Full destination path for an asset under `target_directory`
pub fn addressed_path(target_directory: &Path, source_url: &str) -> PathBuf {
    target_directory.join(addressed_name(source_url))
}
