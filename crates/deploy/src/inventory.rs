//! Remote inventory: every digest already stored in the asset container.

use hostsync_protocol::endpoints;
use tracing::debug;

use crate::error::DeployError;
use crate::remote::{BlobStore, HostingService};
use crate::types::RemoteDigestSet;

/// Lists the application's asset container, following continuation
/// markers until the listing is exhausted.
///
/// Any page failure fails the whole call; a partial set is never returned.
pub async fn fetch_remote_digests(
    api: &dyn HostingService,
    store: &dyn BlobStore,
) -> Result<RemoteDigestSet, DeployError> {
    let grant = api.hosting_grant().await?;
    let container = endpoints::asset_container(api.app_id());

    let mut digests = RemoteDigestSet::default();
    let mut marker: Option<String> = None;
    let mut pages = 0usize;
    loop {
        let segment = store
            .list_segment(&grant, &container, marker.as_deref())
            .await?;
        pages += 1;
        digests.extend(segment.names);
        match segment.next_marker {
            Some(next) => marker = Some(next),
            None => break,
        }
    }

    debug!(container = %container, pages, blobs = digests.len(), "fetched remote inventory");
    Ok(digests)
}
