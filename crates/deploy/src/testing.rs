//! In-memory spies for the remote traits.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use hostsync_hosting::{ArchiveStream, BlobSegment};
use hostsync_protocol::{HostingGrant, PathMapping, VersionId, VersionList};

use crate::error::DeployError;
use crate::remote::{BlobStore, HostingService, RemoteFuture};

pub(crate) fn injected(operation: &'static str) -> DeployError {
    DeployError::Hosting(hostsync_hosting::Error::Remote {
        operation,
        status: 500,
        detail: "injected failure".into(),
    })
}

pub(crate) fn grant() -> HostingGrant {
    HostingGrant {
        uri: "https://store.example.net/".into(),
        token: "sv=1&sig=abc".into(),
    }
}

/// Hosting API spy.
pub(crate) struct MockHosting {
    versions: Mutex<Vec<u64>>,
    current: Mutex<Option<VersionId>>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
    stalled: Mutex<HashSet<&'static str>>,
    mappings: Mutex<Vec<(VersionId, PathMapping)>>,
    code: Mutex<Vec<u8>>,
    short_read: AtomicBool,
}

impl MockHosting {
    pub(crate) fn new(versions: &[u64]) -> Self {
        Self {
            versions: Mutex::new(versions.to_vec()),
            current: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            stalled: Mutex::new(HashSet::new()),
            mappings: Mutex::new(Vec::new()),
            code: Mutex::new(Vec::new()),
            short_read: AtomicBool::new(false),
        }
    }

    /// Makes `upload_code` read one chunk of the archive and report success.
    pub(crate) fn cut_code_short(&self) {
        self.short_read.store(true, Ordering::SeqCst);
    }

    /// Makes `operation` return an error.
    pub(crate) fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    /// Makes `operation` never complete.
    pub(crate) fn stall(&self, operation: &'static str) {
        self.stalled.lock().unwrap().insert(operation);
    }

    pub(crate) fn set_current(&self, version: u64) {
        *self.current.lock().unwrap() = Some(VersionId::new(version).unwrap());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub(crate) fn mappings(&self) -> Vec<(VersionId, PathMapping)> {
        self.mappings.lock().unwrap().clone()
    }

    pub(crate) fn code(&self) -> Vec<u8> {
        self.code.lock().unwrap().clone()
    }

    /// Records the call and reports whether it should fail or stall.
    fn enter(&self, operation: &'static str, call: String) -> (bool, bool) {
        self.calls.lock().unwrap().push(call);
        (
            self.failing.lock().unwrap().contains(operation),
            self.stalled.lock().unwrap().contains(operation),
        )
    }
}

async fn outcome(operation: &'static str, (fail, stall): (bool, bool)) -> Result<(), DeployError> {
    if stall {
        std::future::pending::<()>().await;
    }
    if fail {
        return Err(injected(operation));
    }
    Ok(())
}

impl HostingService for MockHosting {
    fn app_id(&self) -> &str {
        "app123"
    }

    fn list_versions(&self) -> RemoteFuture<'_, VersionList> {
        let state = self.enter("list_versions", "list_versions".into());
        Box::pin(async move {
            outcome("list versions", state).await?;
            let versions = self
                .versions
                .lock()
                .unwrap()
                .iter()
                .map(|v| VersionId::new(*v).unwrap())
                .collect();
            Ok(VersionList { versions })
        })
    }

    fn current_version(&self) -> RemoteFuture<'_, Option<VersionId>> {
        let state = self.enter("current_version", "current_version".into());
        Box::pin(async move {
            outcome("get current version", state).await?;
            Ok(*self.current.lock().unwrap())
        })
    }

    fn set_version(&self, version: VersionId) -> RemoteFuture<'_, ()> {
        let state = self.enter("set_version", format!("set_version {version}"));
        Box::pin(async move {
            outcome("set version", state).await?;
            *self.current.lock().unwrap() = Some(version);
            Ok(())
        })
    }

    fn hosting_grant(&self) -> RemoteFuture<'_, HostingGrant> {
        let state = self.enter("hosting_grant", "hosting_grant".into());
        Box::pin(async move {
            outcome("fetch hosting grant", state).await?;
            Ok(grant())
        })
    }

    fn upload_target<'a>(&'a self, digest: &'a str) -> RemoteFuture<'a, HostingGrant> {
        let state = self.enter("upload_target", format!("upload_target {digest}"));
        Box::pin(async move {
            outcome("request upload target", state).await?;
            Ok(grant())
        })
    }

    fn publish_mapping<'a>(
        &'a self,
        version: VersionId,
        mapping: &'a PathMapping,
    ) -> RemoteFuture<'a, ()> {
        let state = self.enter("publish_mapping", format!("publish_mapping {version}"));
        Box::pin(async move {
            outcome("publish mapping", state).await?;
            self.mappings.lock().unwrap().push((version, mapping.clone()));
            Ok(())
        })
    }

    fn upload_code(&self, version: VersionId, mut archive: ArchiveStream) -> RemoteFuture<'_, ()> {
        let state = self.enter("upload_code", format!("upload_code {version}"));
        Box::pin(async move {
            outcome("upload code bundle", state).await?;
            let mut body = Vec::new();
            while let Some(chunk) = archive.next().await {
                let chunk = chunk.map_err(|source| DeployError::Io {
                    path: "archive".into(),
                    source,
                })?;
                body.extend_from_slice(&chunk);
                if self.short_read.load(Ordering::SeqCst) {
                    break;
                }
            }
            *self.code.lock().unwrap() = body;
            Ok(())
        })
    }
}

/// Blob container spy.
pub(crate) struct MockBlobStore {
    pages: Mutex<Vec<BlobSegment>>,
    markers: Mutex<Vec<Option<String>>>,
    fail_listing_at: Option<usize>,
    failing_keys: Mutex<HashSet<String>>,
    puts: Mutex<Vec<(String, String, Option<String>)>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockBlobStore {
    /// A store whose listing returns `pages` in order.
    pub(crate) fn with_pages(pages: Vec<Vec<&str>>) -> Self {
        let count = pages.len();
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, names)| BlobSegment {
                names: names.into_iter().map(String::from).collect(),
                next_marker: (i + 1 < count).then(|| format!("m{}", i + 1)),
            })
            .collect();
        Self {
            pages: Mutex::new(pages),
            markers: Mutex::new(Vec::new()),
            fail_listing_at: None,
            failing_keys: Mutex::new(HashSet::new()),
            puts: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub(crate) fn empty() -> Self {
        Self::with_pages(vec![Vec::new()])
    }

    /// Fails the listing call with index `call`.
    pub(crate) fn failing_listing_at(mut self, call: usize) -> Self {
        self.fail_listing_at = Some(call);
        self
    }

    pub(crate) fn fail_key(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    /// Markers passed to each listing call.
    pub(crate) fn markers(&self) -> Vec<Option<String>> {
        self.markers.lock().unwrap().clone()
    }

    /// `(key, container, content type)` per successful put.
    pub(crate) fn puts(&self) -> Vec<(String, String, Option<String>)> {
        self.puts.lock().unwrap().clone()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl BlobStore for MockBlobStore {
    fn list_segment<'a>(
        &'a self,
        _grant: &'a HostingGrant,
        _container: &'a str,
        marker: Option<&'a str>,
    ) -> RemoteFuture<'a, BlobSegment> {
        Box::pin(async move {
            let call = {
                let mut markers = self.markers.lock().unwrap();
                markers.push(marker.map(String::from));
                markers.len() - 1
            };
            if self.fail_listing_at == Some(call) {
                return Err(injected("list blobs"));
            }
            let pages = self.pages.lock().unwrap();
            Ok(pages.get(call).cloned().unwrap_or_default())
        })
    }

    fn put_object<'a>(
        &'a self,
        _grant: &'a HostingGrant,
        container: &'a str,
        key: &'a str,
        _path: &'a Path,
        content_type: Option<&'a str>,
    ) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing_keys.lock().unwrap().contains(key) {
                return Err(injected("put blob"));
            }
            self.puts.lock().unwrap().push((
                key.to_string(),
                container.to_string(),
                content_type.map(String::from),
            ));
            Ok(())
        })
    }
}
