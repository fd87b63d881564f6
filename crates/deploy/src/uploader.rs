//! Asset sync: upload every local digest the remote container lacks.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::{TryStreamExt, stream};
use hostsync_protocol::endpoints;
use hostsync_transfer::LocalAssetMap;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::content_type::detect_for_file;
use crate::error::DeployError;
use crate::remote::{BlobStore, HostingService};
use crate::types::{DeployEvent, RemoteDigestSet, UploadSummary};

/// One digest to upload, with the file that represents it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpload {
    pub digest: String,
    /// Root-relative path of the representative file.
    pub relative: String,
    pub path: PathBuf,
}

/// Local digests that are not stored remotely, one entry per digest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPlan {
    entries: Vec<PlannedUpload>,
}

impl UploadPlan {
    /// Diffs `assets` against `remote`.
    ///
    /// Files sharing a digest are planned once, through the
    /// lexicographically smallest path.
    pub fn new(assets: &LocalAssetMap, remote: &RemoteDigestSet) -> Self {
        let entries = assets
            .invert()
            .into_iter()
            .filter(|(digest, _)| !remote.contains(digest.as_str()))
            .map(|(digest, relative)| PlannedUpload {
                digest: digest.to_string(),
                relative: relative.to_string(),
                path: assets.absolute(relative),
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlannedUpload> {
        self.entries.iter()
    }
}

/// Uploads planned assets through a bounded worker pool.
pub struct AssetUploader<'a> {
    api: &'a dyn HostingService,
    store: &'a dyn BlobStore,
    concurrency: usize,
}

impl<'a> AssetUploader<'a> {
    pub fn new(api: &'a dyn HostingService, store: &'a dyn BlobStore, concurrency: usize) -> Self {
        Self {
            api,
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// Uploads every digest of `assets` missing from `remote`.
    ///
    /// The first failing upload fails the call and drops the in-flight
    /// peers. Re-running after a failure uploads only what is still
    /// missing.
    pub async fn sync(
        &self,
        assets: &LocalAssetMap,
        remote: &RemoteDigestSet,
        events_tx: &mpsc::Sender<DeployEvent>,
    ) -> Result<UploadSummary, DeployError> {
        let plan = UploadPlan::new(assets, remote);
        let mut summary = UploadSummary {
            local_files: assets.len(),
            planned: plan.len(),
            uploaded: 0,
        };
        let _ = events_tx.try_send(DeployEvent::UploadPlanned {
            missing: plan.len(),
            total: assets.len(),
        });

        if plan.is_empty() {
            info!("{} public assets already synchronized", assets.len());
            return Ok(summary);
        }
        info!(
            "Uploading {} (of {}) public asset(s)",
            plan.len(),
            assets.len()
        );

        summary.uploaded = self.upload(&plan, events_tx).await?;
        Ok(summary)
    }

    /// Uploads every entry of `plan`, returning how many completed.
    pub async fn upload(
        &self,
        plan: &UploadPlan,
        events_tx: &mpsc::Sender<DeployEvent>,
    ) -> Result<usize, DeployError> {
        let container = endpoints::asset_container(self.api.app_id());
        let uploaded = AtomicUsize::new(0);

        let api = self.api;
        let store = self.store;
        let container = container.as_str();
        let counter = &uploaded;

        stream::iter(plan.iter().map(Ok::<_, DeployError>))
            .try_for_each_concurrent(self.concurrency, move |entry| async move {
                let grant = api.upload_target(&entry.digest).await?;
                let content_type = detect_for_file(&entry.path).await?;
                store
                    .put_object(&grant, container, &entry.digest, &entry.path, content_type)
                    .await?;

                counter.fetch_add(1, Ordering::Relaxed);
                debug!(path = %entry.relative, digest = %entry.digest, content_type, "uploaded asset");
                let _ = events_tx.try_send(DeployEvent::AssetUploaded {
                    path: entry.relative.clone(),
                    digest: entry.digest.clone(),
                });
                Ok::<(), DeployError>(())
            })
            .await?;

        Ok(uploaded.into_inner())
    }
}
