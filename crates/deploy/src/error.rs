//! Deploy error types.

use std::fmt;
use std::path::PathBuf;

use hostsync_protocol::VersionId;
use hostsync_transfer::{TransferError, WalkFailure};

use crate::types::Phase;

/// Errors produced while deploying or managing versions.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("version {0} already exists")]
    VersionExists(VersionId),

    #[error("version {0} does not exist")]
    VersionNotFound(VersionId),

    #[error(transparent)]
    Hosting(#[from] hostsync_hosting::Error),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("{} file(s) could not be read: {}", .0.len(), list(.0))]
    Walk(Vec<WalkFailure>),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("{}", list(.0))]
    Phases(Vec<PhaseFailure>),

    #[error("background task failed: {0}")]
    Task(String),

    #[error("cancelled")]
    Cancelled,
}

impl DeployError {
    /// True for version-existence violations detected before any upload.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::VersionExists(_) | Self::VersionNotFound(_))
    }

    /// Phases that failed, for a failed `create_version`.
    pub fn failed_phases(&self) -> Vec<Phase> {
        match self {
            Self::Phases(failures) => failures.iter().map(|f| f.phase).collect(),
            _ => Vec::new(),
        }
    }
}

/// One failed phase of a version creation.
#[derive(Debug)]
pub struct PhaseFailure {
    pub phase: Phase,
    pub error: DeployError,
}

impl fmt::Display for PhaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.phase, self.error)
    }
}

fn list<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
