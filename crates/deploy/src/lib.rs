//! Deployment synchronization engine.
//!
//! This crate implements the **business logic** for publishing a local
//! application bundle to the hosting service. It has no UI and no
//! concrete transport: callers hand it a [`HostingService`] and a
//! [`BlobStore`] (implemented here for the `hostsync-hosting` clients,
//! and by mocks in tests).
//!
//! # Pipeline
//!
//! 1. **Walk**: hash every file under the asset root
//! 2. **Inventory**: list digests already stored remotely
//! 3. **Sync**: upload the missing digests, bounded concurrency
//! 4. **Bundle**: stream the code directory as a zip
//! 5. **Map**: publish the path → digest mapping
//! 6. **Activate**: switch the current version, only if 3 to 5 succeeded

pub mod bundler;
pub mod content_type;
pub mod error;
pub mod inventory;
pub mod mapping;
pub mod orchestrator;
pub mod remote;
pub mod types;
pub mod uploader;

#[cfg(test)]
pub(crate) mod testing;

// Re-export primary types for convenience.
pub use bundler::CodeBundler;
pub use content_type::{detect_for_file, resolve_content_type};
pub use error::{DeployError, PhaseFailure};
pub use inventory::fetch_remote_digests;
pub use mapping::{MappingPublisher, path_mapping};
pub use orchestrator::VersionOrchestrator;
pub use remote::{BlobStore, HostingService, RemoteFuture};
pub use types::{
    CreateSummary, DeployConfig, DeployEvent, OrchestratorState, Phase, RemoteDigestSet,
    UploadSummary,
};
pub use uploader::{AssetUploader, PlannedUpload, UploadPlan};
