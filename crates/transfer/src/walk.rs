//! Recursive directory walk producing a path → digest map.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::digest::{ContentDigest, hash_file};
use crate::TransferError;

/// A regular file found under the walk root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path on disk (root joined with the relative path).
    pub path: PathBuf,
    /// Root-relative path with `/` separators.
    pub relative: String,
}

/// A file or directory that could not be read during the walk.
#[derive(Debug, thiserror::Error)]
#[error("{}: {source}", path.display())]
pub struct WalkFailure {
    pub path: PathBuf,
    #[source]
    pub source: TransferError,
}

impl WalkFailure {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            source: TransferError::io(path, source),
        }
    }
}

/// Lazy, iterative walk over every regular file below a root.
///
/// Directories are visited in file-name order. Symlinks, sockets and
/// devices are skipped. A directory or entry that cannot be read yields
/// an `Err` item and the walk moves on to its siblings.
pub struct TreeWalker {
    root: PathBuf,
    stack: Vec<std::vec::IntoIter<fs::DirEntry>>,
    started: bool,
}

impl TreeWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            stack: Vec::new(),
            started: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn descend(&mut self, dir: &Path) -> Result<(), WalkFailure> {
        let mut entries = fs::read_dir(dir)
            .and_then(|rd| rd.collect::<std::io::Result<Vec<_>>>())
            .map_err(|e| WalkFailure::io(dir, e))?;
        entries.sort_by_key(|e| e.file_name());
        self.stack.push(entries.into_iter());
        Ok(())
    }

    fn relative(&self, path: &Path) -> Result<String, WalkFailure> {
        let failure = |source| WalkFailure {
            path: path.to_path_buf(),
            source,
        };

        let rel = path
            .strip_prefix(&self.root)
            .map_err(|_| failure(TransferError::InvalidPath(path.display().to_string())))?;

        let mut parts = Vec::new();
        for component in rel.components() {
            let Component::Normal(name) = component else {
                return Err(failure(TransferError::InvalidPath(format!(
                    "unexpected component in {}",
                    path.display()
                ))));
            };
            let part = name.to_str().ok_or_else(|| {
                failure(TransferError::InvalidPath(format!(
                    "non UTF-8 path: {}",
                    path.display()
                )))
            })?;
            parts.push(part);
        }
        Ok(parts.join("/"))
    }
}

impl Iterator for TreeWalker {
    type Item = Result<WalkEntry, WalkFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            let root = self.root.clone();
            if let Err(e) = self.descend(&root) {
                return Some(Err(e));
            }
        }

        loop {
            let top = self.stack.last_mut()?;
            let Some(entry) = top.next() else {
                self.stack.pop();
                continue;
            };

            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => return Some(Err(WalkFailure::io(&path, e))),
            };

            if file_type.is_dir() {
                if let Err(e) = self.descend(&path) {
                    return Some(Err(e));
                }
            } else if file_type.is_file() {
                return Some(self.relative(&path).map(|relative| WalkEntry { path, relative }));
            } else {
                debug!(path = %path.display(), "skipping non-regular entry");
            }
        }
    }
}

/// Path → digest map for one asset root.
///
/// Keys are root-relative, `/`-separated paths. Iteration order is
/// sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalAssetMap {
    root: PathBuf,
    entries: BTreeMap<String, ContentDigest>,
}

impl LocalAssetMap {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, relative: String, digest: ContentDigest) {
        self.entries.insert(relative, digest);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a relative key back to its path on disk.
    pub fn absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn get(&self, relative: &str) -> Option<&ContentDigest> {
        self.entries.get(relative)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContentDigest)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Digest → representative path.
    ///
    /// When several paths share a digest, the lexicographically smallest
    /// path represents it.
    pub fn invert(&self) -> BTreeMap<&ContentDigest, &str> {
        let mut inverted = BTreeMap::new();
        for (path, digest) in &self.entries {
            inverted.entry(digest).or_insert(path.as_str());
        }
        inverted
    }
}

/// Outcome of hashing a tree: every readable file, plus what failed.
#[derive(Debug, Default)]
pub struct WalkReport {
    pub assets: LocalAssetMap,
    pub failures: Vec<WalkFailure>,
}

impl WalkReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Walks `root` and hashes every regular file below it.
///
/// Per-file failures are collected into the report rather than aborting
/// the walk. Only a missing or non-directory root is a hard error.
pub fn hash_tree(root: &Path) -> Result<WalkReport, TransferError> {
    let metadata = fs::metadata(root).map_err(|e| TransferError::io(root, e))?;
    if !metadata.is_dir() {
        return Err(TransferError::NotADirectory(root.to_path_buf()));
    }

    let mut report = WalkReport {
        assets: LocalAssetMap::new(root),
        failures: Vec::new(),
    };

    for entry in TreeWalker::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(failure) => {
                warn!(error = %failure, "skipping unreadable entry");
                report.failures.push(failure);
                continue;
            }
        };

        match hash_file(&entry.path) {
            Ok(digest) => {
                debug!(path = %entry.relative, %digest, "hashed");
                report.assets.insert(entry.relative, digest);
            }
            Err(source) => {
                warn!(path = %entry.path.display(), error = %source, "failed to hash file");
                report.failures.push(WalkFailure {
                    path: entry.path,
                    source,
                });
            }
        }
    }

    Ok(report)
}
