//! Remote seams: the hosting API and the blob store.
//!
//! The engine only talks to these traits. The `hostsync-hosting`
//! clients implement them below; tests use in-memory spies.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use hostsync_hosting::{ArchiveStream, BlobClient, BlobSegment, HostingClient};
use hostsync_protocol::{HostingGrant, PathMapping, VersionId, VersionList};

use crate::error::DeployError;

/// Boxed future returned by the remote traits.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DeployError>> + Send + 'a>>;

/// Versioned hosting API of one application.
pub trait HostingService: Send + Sync {
    /// Application identifier, used to name the asset container.
    fn app_id(&self) -> &str;

    fn list_versions(&self) -> RemoteFuture<'_, VersionList>;

    fn current_version(&self) -> RemoteFuture<'_, Option<VersionId>>;

    fn set_version(&self, version: VersionId) -> RemoteFuture<'_, ()>;

    /// Read grant for the asset container.
    fn hosting_grant(&self) -> RemoteFuture<'_, HostingGrant>;

    /// Write grant for the blob named `digest`.
    fn upload_target<'a>(&'a self, digest: &'a str) -> RemoteFuture<'a, HostingGrant>;

    fn publish_mapping<'a>(
        &'a self,
        version: VersionId,
        mapping: &'a PathMapping,
    ) -> RemoteFuture<'a, ()>;

    /// Consumes `archive` as the request body.
    fn upload_code(&self, version: VersionId, archive: ArchiveStream) -> RemoteFuture<'_, ()>;
}

/// Content-addressed blob container.
pub trait BlobStore: Send + Sync {
    fn list_segment<'a>(
        &'a self,
        grant: &'a HostingGrant,
        container: &'a str,
        marker: Option<&'a str>,
    ) -> RemoteFuture<'a, BlobSegment>;

    fn put_object<'a>(
        &'a self,
        grant: &'a HostingGrant,
        container: &'a str,
        key: &'a str,
        path: &'a Path,
        content_type: Option<&'a str>,
    ) -> RemoteFuture<'a, ()>;
}

impl HostingService for HostingClient {
    fn app_id(&self) -> &str {
        HostingClient::app_id(self)
    }

    fn list_versions(&self) -> RemoteFuture<'_, VersionList> {
        Box::pin(async move { Ok(HostingClient::list_versions(self).await?) })
    }

    fn current_version(&self) -> RemoteFuture<'_, Option<VersionId>> {
        Box::pin(async move { Ok(HostingClient::current_version(self).await?) })
    }

    fn set_version(&self, version: VersionId) -> RemoteFuture<'_, ()> {
        Box::pin(async move { Ok(HostingClient::set_version(self, version).await?) })
    }

    fn hosting_grant(&self) -> RemoteFuture<'_, HostingGrant> {
        Box::pin(async move { Ok(HostingClient::hosting_grant(self).await?) })
    }

    fn upload_target<'a>(&'a self, digest: &'a str) -> RemoteFuture<'a, HostingGrant> {
        Box::pin(async move { Ok(HostingClient::upload_target(self, digest).await?) })
    }

    fn publish_mapping<'a>(
        &'a self,
        version: VersionId,
        mapping: &'a PathMapping,
    ) -> RemoteFuture<'a, ()> {
        Box::pin(async move { Ok(HostingClient::publish_mapping(self, version, mapping).await?) })
    }

    fn upload_code(&self, version: VersionId, archive: ArchiveStream) -> RemoteFuture<'_, ()> {
        Box::pin(async move { Ok(HostingClient::upload_code(self, version, archive).await?) })
    }
}

impl BlobStore for BlobClient {
    fn list_segment<'a>(
        &'a self,
        grant: &'a HostingGrant,
        container: &'a str,
        marker: Option<&'a str>,
    ) -> RemoteFuture<'a, BlobSegment> {
        Box::pin(async move { Ok(BlobClient::list_segment(self, grant, container, marker).await?) })
    }

    fn put_object<'a>(
        &'a self,
        grant: &'a HostingGrant,
        container: &'a str,
        key: &'a str,
        path: &'a Path,
        content_type: Option<&'a str>,
    ) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            Ok(BlobClient::put_object(self, grant, container, key, path, content_type).await?)
        })
    }
}
