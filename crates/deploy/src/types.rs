//! Data types for the deploy flow.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use hostsync_protocol::VersionId;

use crate::error::DeployError;

/// Default number of concurrent asset uploads.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 4;

/// Upper bound on concurrent asset uploads.
pub const MAX_UPLOAD_CONCURRENCY: usize = 16;

/// Engine settings for one orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    /// Directory of static assets (`public/`).
    pub asset_root: PathBuf,
    /// Directory of server-side code (`cloud/`).
    pub code_root: PathBuf,
    /// Worker pool size for asset uploads.
    pub upload_concurrency: usize,
    /// Proceed with a partial asset map when some files are unreadable.
    pub allow_partial_assets: bool,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("public"),
            code_root: PathBuf::from("cloud"),
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            allow_partial_assets: false,
        }
    }
}

impl DeployConfig {
    /// Upload concurrency clamped to `1..=MAX_UPLOAD_CONCURRENCY`.
    pub fn concurrency(&self) -> usize {
        self.upload_concurrency.clamp(1, MAX_UPLOAD_CONCURRENCY)
    }

    /// Checks that both roots are set and distinct.
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.asset_root.as_os_str().is_empty() {
            return Err(DeployError::Config("asset root is not set".into()));
        }
        if self.code_root.as_os_str().is_empty() {
            return Err(DeployError::Config("code root is not set".into()));
        }
        if self.asset_root == self.code_root {
            return Err(DeployError::Config(format!(
                "asset root and code root are both {}",
                self.asset_root.display()
            )));
        }
        Ok(())
    }
}

/// Digests already stored in the remote asset container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteDigestSet(HashSet<String>);

impl RemoteDigestSet {
    pub fn contains(&self, digest: &str) -> bool {
        self.0.contains(digest)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for RemoteDigestSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<String> for RemoteDigestSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// The three independent phases of a version creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Upload missing assets.
    Sync,
    /// Stream the code bundle.
    Bundle,
    /// Publish the path mapping.
    Mapping,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Sync => "asset sync",
            Phase::Bundle => "code upload",
            Phase::Mapping => "mapping upload",
        })
    }
}

/// Orchestrator lifecycle.
///
/// `Idle → Listing → {Creating | Activating | Querying} → Done | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Listing,
    Creating,
    Activating,
    Querying,
    Done,
    Failed,
}

impl OrchestratorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Progress event emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum DeployEvent {
    /// Lifecycle transition.
    State(OrchestratorState),
    /// Asset tree hashed.
    Walked { files: usize, failures: usize },
    /// Remote inventory fetched.
    Inventoried { blobs: usize },
    /// Upload plan computed.
    UploadPlanned { missing: usize, total: usize },
    /// One asset stored remotely.
    AssetUploaded { path: String, digest: String },
    /// A phase finished successfully.
    PhaseCompleted(Phase),
    /// A phase failed.
    PhaseFailed { phase: Phase, error: String },
    /// The version became current.
    Activated(VersionId),
}

/// Result of an asset sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    /// Files in the local asset map.
    pub local_files: usize,
    /// Distinct digests missing remotely.
    pub planned: usize,
    /// Digests uploaded by this call.
    pub uploaded: usize,
}

impl UploadSummary {
    /// True when nothing needed uploading.
    pub fn already_synchronized(&self) -> bool {
        self.planned == 0
    }
}

/// Result of a successful `create_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSummary {
    pub version: VersionId,
    pub upload: UploadSummary,
    /// Files stored in the code bundle.
    pub code_files: usize,
    /// Entries in the published mapping.
    pub mapped_paths: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_is_clamped() {
        let mut config = DeployConfig::default();
        assert_eq!(config.concurrency(), DEFAULT_UPLOAD_CONCURRENCY);
        config.upload_concurrency = 0;
        assert_eq!(config.concurrency(), 1);
        config.upload_concurrency = 500;
        assert_eq!(config.concurrency(), MAX_UPLOAD_CONCURRENCY);
    }

    #[test]
    fn roots_must_be_set_and_distinct() {
        assert!(DeployConfig::default().validate().is_ok());

        let mut config = DeployConfig::default();
        config.code_root = PathBuf::new();
        assert!(matches!(config.validate(), Err(DeployError::Config(m)) if m.contains("code root")));

        let mut config = DeployConfig::default();
        config.code_root = config.asset_root.clone();
        assert!(matches!(config.validate(), Err(DeployError::Config(m)) if m.contains("both public")));
    }

    #[test]
    fn remote_set_membership() {
        let set: RemoteDigestSet = vec!["a".to_string(), "b".to_string()].into_iter().collect();
        assert!(set.contains("a"));
        assert!(!set.contains("c"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn terminal_states() {
        assert!(OrchestratorState::Done.is_terminal());
        assert!(OrchestratorState::Failed.is_terminal());
        assert!(!OrchestratorState::Creating.is_terminal());
    }
}
