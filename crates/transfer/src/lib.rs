//! Content-addressed view of a local directory tree.
//!
//! Walks an asset root, streams every regular file through SHA-256 and
//! collects the results into a [`LocalAssetMap`] keyed by normalized
//! relative path.

mod digest;
mod walk;

use std::path::PathBuf;

pub use digest::{ContentDigest, checksum_bytes, hash_file, hash_reader};
pub use walk::{LocalAssetMap, TreeWalker, WalkEntry, WalkFailure, WalkReport, hash_tree};

/// Read buffer used while hashing: 64 KiB.
pub const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl TransferError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
