//! Path mapping: tells the service which blob serves each public path.

use hostsync_protocol::{PathMapping, VersionId};
use hostsync_transfer::LocalAssetMap;
use tracing::info;

use crate::error::DeployError;
use crate::remote::HostingService;

/// Builds the root-relative path → digest mapping for `assets`.
pub fn path_mapping(assets: &LocalAssetMap) -> PathMapping {
    PathMapping::from_entries(assets.iter().map(|(path, digest)| (path, digest.as_str())))
}

/// Publishes a version's path mapping.
pub struct MappingPublisher<'a> {
    api: &'a dyn HostingService,
}

impl<'a> MappingPublisher<'a> {
    pub fn new(api: &'a dyn HostingService) -> Self {
        Self { api }
    }

    /// Publishes the mapping of `assets` for `version`, returning the
    /// number of mapped paths.
    pub async fn publish(
        &self,
        version: VersionId,
        assets: &LocalAssetMap,
    ) -> Result<usize, DeployError> {
        let mapping = path_mapping(assets);
        self.api.publish_mapping(version, &mapping).await?;
        info!(version = %version, paths = mapping.len(), "Published path mapping");
        Ok(mapping.len())
    }
}
