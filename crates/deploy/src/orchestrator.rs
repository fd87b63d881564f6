//! Version orchestrator: list, query, create, and activate versions.
//!
//! `create_version` runs asset sync, code upload, and mapping upload
//! concurrently and only activates the version once all three succeeded.

use std::future::Future;

use hostsync_protocol::VersionId;
use hostsync_transfer::hash_tree;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bundler::CodeBundler;
use crate::error::{DeployError, PhaseFailure};
use crate::inventory::fetch_remote_digests;
use crate::mapping::MappingPublisher;
use crate::remote::{BlobStore, HostingService};
use crate::types::{CreateSummary, DeployConfig, DeployEvent, OrchestratorState, Phase};
use crate::uploader::AssetUploader;

/// Drives version operations against one application.
///
/// Holds no state across calls beyond its configuration; each call walks
/// `Idle → Listing → {Creating | Activating | Querying} → Done | Failed`.
pub struct VersionOrchestrator<'a> {
    api: &'a dyn HostingService,
    store: &'a dyn BlobStore,
    config: DeployConfig,
    events_tx: mpsc::Sender<DeployEvent>,
    events_rx: Option<mpsc::Receiver<DeployEvent>>,
    cancel: CancellationToken,
}

impl<'a> VersionOrchestrator<'a> {
    pub fn new(
        api: &'a dyn HostingService,
        store: &'a dyn BlobStore,
        config: DeployConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            api,
            store,
            config,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<DeployEvent>> {
        self.events_rx.take()
    }

    /// Returns a cancellation token for running operations.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Every existing version, sorted ascending.
    pub async fn list_versions(&self) -> Result<Vec<VersionId>, DeployError> {
        self.enter(OrchestratorState::Listing);
        let result = self.api.list_versions().await.map(|list| list.sorted());
        self.finish(result)
    }

    /// The active version, if any.
    pub async fn current_version(&self) -> Result<Option<VersionId>, DeployError> {
        self.enter(OrchestratorState::Querying);
        let result = self.api.current_version().await;
        self.finish(result)
    }

    /// Uploads assets, code, and mapping for a new `version`, then makes it
    /// current.
    ///
    /// Fails with [`DeployError::VersionExists`] before any upload when the
    /// version is already known. When any phase fails, every failed phase is
    /// reported and the current version is left untouched.
    pub async fn create_version(&self, version: VersionId) -> Result<CreateSummary, DeployError> {
        let result = self.create(version).await;
        self.finish(result)
    }

    /// Makes an existing `version` current without uploading anything.
    pub async fn activate_version(&self, version: VersionId) -> Result<(), DeployError> {
        let result = self.activate(version).await;
        self.finish(result)
    }

    async fn create(&self, version: VersionId) -> Result<CreateSummary, DeployError> {
        self.config.validate()?;
        self.enter(OrchestratorState::Listing);
        let versions = self.until_cancelled(self.api.list_versions()).await?;
        if versions.contains(version) {
            return Err(DeployError::VersionExists(version));
        }

        self.enter(OrchestratorState::Creating);
        info!(version = %version, "Creating version");

        let root = self.config.asset_root.clone();
        let walk = async move {
            tokio::task::spawn_blocking(move || hash_tree(&root))
                .await
                .map_err(|e| DeployError::Task(e.to_string()))?
                .map_err(DeployError::from)
        };
        let inventory = fetch_remote_digests(self.api, self.store);
        let (report, remote) = self
            .until_cancelled(async { tokio::try_join!(walk, inventory) })
            .await?;

        self.emit(DeployEvent::Walked {
            files: report.assets.len(),
            failures: report.failures.len(),
        });
        self.emit(DeployEvent::Inventoried { blobs: remote.len() });

        if !report.is_complete() {
            if !self.config.allow_partial_assets {
                return Err(DeployError::Walk(report.failures));
            }
            warn!(
                skipped = report.failures.len(),
                "Continuing with a partial asset map"
            );
        }
        let assets = report.assets;

        let phases = self.cancel.child_token();
        let uploader = AssetUploader::new(self.api, self.store, self.config.concurrency());
        let bundler = CodeBundler::new(&self.config.code_root);
        let publisher = MappingPublisher::new(self.api);

        let (sync, bundle, mapping) = tokio::join!(
            self.run_phase(
                Phase::Sync,
                &phases,
                uploader.sync(&assets, &remote, &self.events_tx)
            ),
            self.run_phase(Phase::Bundle, &phases, bundler.upload(self.api, version)),
            self.run_phase(Phase::Mapping, &phases, publisher.publish(version, &assets)),
        );

        let mut failures = Vec::new();
        let sync = settle(Phase::Sync, sync, &mut failures);
        let bundle = settle(Phase::Bundle, bundle, &mut failures);
        let mapping = settle(Phase::Mapping, mapping, &mut failures);
        if !failures.is_empty() {
            return Err(DeployError::Phases(failures));
        }
        let (Some(upload), Some(code_files), Some(mapped_paths)) = (sync, bundle, mapping) else {
            return Err(DeployError::Cancelled);
        };
        if self.cancel.is_cancelled() {
            return Err(DeployError::Cancelled);
        }

        self.api.set_version(version).await?;
        self.emit(DeployEvent::Activated(version));
        info!(
            version = %version,
            uploaded = upload.uploaded,
            code_files,
            mapped_paths,
            "Version created and activated"
        );

        Ok(CreateSummary {
            version,
            upload,
            code_files,
            mapped_paths,
        })
    }

    async fn activate(&self, version: VersionId) -> Result<(), DeployError> {
        self.enter(OrchestratorState::Listing);
        let versions = self.until_cancelled(self.api.list_versions()).await?;
        if !versions.contains(version) {
            return Err(DeployError::VersionNotFound(version));
        }

        self.enter(OrchestratorState::Activating);
        self.until_cancelled(self.api.set_version(version)).await?;
        self.emit(DeployEvent::Activated(version));
        info!(version = %version, "Version activated");
        Ok(())
    }

    /// Runs one phase until it finishes or `token` fires.
    ///
    /// A failing phase cancels `token` so its siblings stop early.
    async fn run_phase<T>(
        &self,
        phase: Phase,
        token: &CancellationToken,
        fut: impl Future<Output = Result<T, DeployError>>,
    ) -> Result<T, DeployError> {
        let result = tokio::select! {
            biased;
            r = fut => r,
            _ = token.cancelled() => Err(DeployError::Cancelled),
        };

        match &result {
            Ok(_) => {
                debug!(%phase, "phase completed");
                self.emit(DeployEvent::PhaseCompleted(phase));
            }
            Err(DeployError::Cancelled) => debug!(%phase, "phase cancelled"),
            Err(e) => {
                error!(%phase, error = %e, "phase failed");
                self.emit(DeployEvent::PhaseFailed {
                    phase,
                    error: e.to_string(),
                });
                token.cancel();
            }
        }
        result
    }

    async fn until_cancelled<T>(
        &self,
        fut: impl Future<Output = Result<T, DeployError>>,
    ) -> Result<T, DeployError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DeployError::Cancelled),
            r = fut => r,
        }
    }

    fn enter(&self, state: OrchestratorState) {
        debug!(?state, "orchestrator state");
        self.emit(DeployEvent::State(state));
    }

    fn finish<T>(&self, result: Result<T, DeployError>) -> Result<T, DeployError> {
        match &result {
            Ok(_) => self.enter(OrchestratorState::Done),
            Err(e) => {
                if !e.is_precondition() {
                    error!(error = %e, "operation failed");
                }
                self.enter(OrchestratorState::Failed);
            }
        }
        result
    }

    fn emit(&self, event: DeployEvent) {
        // Progress is best effort; a lagging receiver loses events.
        let _ = self.events_tx.try_send(event);
    }
}

/// Keeps a phase's output, recording it as a failure unless it was cancelled.
fn settle<T>(
    phase: Phase,
    result: Result<T, DeployError>,
    failures: &mut Vec<PhaseFailure>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(DeployError::Cancelled) => None,
        Err(error) => {
            failures.push(PhaseFailure { phase, error });
            None
        }
    }
}
