use std::{
    path::{Component, Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    application::{
        interfaces::{
            artifact_uploader::ArtifactUploader, connectivity::ConnectivityCheck,
            sync_runner::SyncRunner,
        },
        usecases::artifact_upload::upload_all,
    },
    domain::{
        entities::{
            deliveries::{DeliveryMetadataPayload, DeliveryOutcome},
            sync_records::{SyncRecord, SyncRecordPatch},
        },
        errors::{RecordStoreError, SyncError, TransportError},
        repositories::{delivery_transport::DeliveryTransport, record_store::RecordStore},
        sync_state_machine::next_state,
        value_objects::{
            artifacts::{ArtifactRef, ArtifactUploadStatus, DeliveryArtifacts},
            business_key::BusinessKey,
            enums::{artifact_kinds::ArtifactKind, sync_events::SyncEvent, sync_states::SyncState},
            sync_failures::{FailureKind, SyncFailure},
            sync_results::{BatchSummary, QueueReason, SubmitResult, SyncOneOutcome, SyncPassResult},
        },
    },
};

#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Pause between two records of a batch pass.
    pub inter_record_delay: Duration,
    /// Directory the captured image names are resolved against.
    pub media_root: PathBuf,
}

pub struct SyncOrchestrator {
    store: Arc<dyn RecordStore + Send + Sync>,
    transport: Arc<dyn DeliveryTransport + Send + Sync>,
    connectivity: Arc<dyn ConnectivityCheck + Send + Sync>,
    settings: SyncSettings,
    in_flight: AtomicBool,
}

/// Releases the single-flight flag when dropped.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn RecordStore + Send + Sync>,
        transport: Arc<dyn DeliveryTransport + Send + Sync>,
        connectivity: Arc<dyn ConnectivityCheck + Send + Sync>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            store,
            transport,
            connectivity,
            settings,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> Option<FlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard(&self.in_flight))
    }

    /// Foreground path used right after capture.
    pub async fn submit_now(&self, outcome: DeliveryOutcome) -> Result<SubmitResult, SyncError> {
        let key = outcome.business_key();

        if !self.connectivity.check_connection().await {
            let record_id = self.queue(outcome).await?;
            info!(%record_id, key = %key, "sync_orchestrator: offline, delivery queued");
            return Ok(SubmitResult::Queued {
                record_id,
                reason: QueueReason::Offline,
            });
        }

        let Some(_guard) = self.try_acquire() else {
            let record_id = self.queue(outcome).await?;
            info!(%record_id, key = %key, "sync_orchestrator: sync in progress, delivery queued");
            return Ok(SubmitResult::Queued {
                record_id,
                reason: QueueReason::SyncInProgress,
            });
        };

        let state = next_state(SyncState::PendingSend, SyncEvent::SubmitMetadata)?;
        let record = SyncRecord::new(outcome, state);
        let record_id = record.id;
        self.store.insert_record(record.clone()).await?;
        info!(%record_id, key = %key, "sync_orchestrator: delivery stored, sending inline");

        if self.sync_record(record).await {
            return Ok(SubmitResult::Synced { record_id });
        }

        let message = match self.store.find_record(record_id).await {
            Ok(Some(SyncRecord {
                last_error: Some(failure),
                ..
            })) => failure.to_string(),
            _ => "delivery will retry automatically".to_string(),
        };
        Ok(SubmitResult::RetryScheduled { record_id, message })
    }

    async fn queue(&self, outcome: DeliveryOutcome) -> Result<Uuid, SyncError> {
        let record = SyncRecord::new(outcome, SyncState::PendingSend);
        let record_id = record.id;
        self.store.insert_record(record).await?;
        Ok(record_id)
    }

    pub async fn sync_one(&self, record_id: Uuid) -> SyncOneOutcome {
        let Some(_guard) = self.try_acquire() else {
            debug!(%record_id, "sync_orchestrator: busy, sync_one skipped");
            return SyncOneOutcome::Busy;
        };

        let record = match self.store.find_record(record_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(%record_id, "sync_orchestrator: record not found");
                return SyncOneOutcome::Failed;
            }
            Err(err) => {
                error!(%record_id, error = %err, "sync_orchestrator: failed to load record");
                return SyncOneOutcome::Failed;
            }
        };

        if self.sync_record(record).await {
            SyncOneOutcome::Synced
        } else {
            SyncOneOutcome::Failed
        }
    }

    pub async fn sync_all_pending(&self) -> SyncPassResult {
        let Some(_guard) = self.try_acquire() else {
            info!("sync_orchestrator: batch pass already running, returning busy");
            return SyncPassResult::Busy;
        };

        let mut summary = BatchSummary {
            recovered: self.recover_interrupted().await,
            ..Default::default()
        };

        let records = match self.store.list_pending_records().await {
            Ok(records) => records,
            Err(err) => {
                error!(error = %err, "sync_orchestrator: failed to list pending records");
                summary.store_unavailable = true;
                return SyncPassResult::Completed(summary);
            }
        };

        let resumable: Vec<SyncRecord> = records
            .into_iter()
            .filter(|record| record.state.is_resumable())
            .collect();
        let total = resumable.len();
        info!(total, recovered = summary.recovered, "sync_orchestrator: batch pass started");

        for (index, record) in resumable.into_iter().enumerate() {
            if index > 0 && !self.settings.inter_record_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_record_delay).await;
            }

            if !self.connectivity.check_connection().await {
                summary.aborted_offline = true;
                summary.skipped = total - index;
                warn!(skipped = summary.skipped, "sync_orchestrator: connectivity lost, batch aborted");
                break;
            }

            if self.sync_record(record).await {
                summary.synced += 1;
            } else {
                summary.failed += 1;
            }
        }

        info!(
            synced = summary.synced,
            failed = summary.failed,
            skipped = summary.skipped,
            "sync_orchestrator: batch pass finished"
        );
        SyncPassResult::Completed(summary)
    }

    /// Drops a record the user gave up on. Returns whether it existed. Refused
    /// with `Busy` while a sync runs, since that sync may be driving the record.
    pub async fn discard_record(&self, record_id: Uuid) -> Result<bool, SyncError> {
        let Some(_guard) = self.try_acquire() else {
            info!(%record_id, "sync_orchestrator: sync in progress, discard refused");
            return Err(SyncError::Busy);
        };

        let Some(record) = self.store.find_record(record_id).await? else {
            return Ok(false);
        };

        self.store.delete_record(record_id).await?;
        warn!(
            %record_id,
            key = %record.business_key(),
            state = %record.state,
            "sync_orchestrator: record discarded by user"
        );
        Ok(true)
    }

    pub async fn list_records(&self) -> Result<Vec<SyncRecord>, SyncError> {
        Ok(self.store.list_pending_records().await?)
    }

    /// Moves records orphaned in SENDING or DATA_SENT by a previous process to
    /// ERROR so the pass can resume them. Must run under the single-flight guard.
    async fn recover_interrupted(&self) -> usize {
        let records = match self.store.list_pending_records().await {
            Ok(records) => records,
            Err(err) => {
                error!(error = %err, "sync_orchestrator: recovery could not list records");
                return 0;
            }
        };

        let mut recovered = 0;
        for record in records {
            let (event, failure) = match record.state {
                SyncState::Sending => (
                    SyncEvent::MetadataRejected,
                    SyncFailure::metadata(
                        FailureKind::Interrupted,
                        "interrupted before the backend answered",
                    ),
                ),
                SyncState::DataSent => (
                    SyncEvent::ArtifactsAborted,
                    SyncFailure::artifacts(
                        record.outcome.artifacts.sent_count(),
                        record.outcome.artifacts.total(),
                        FailureKind::Interrupted,
                        "interrupted before images were uploaded",
                    ),
                ),
                _ => continue,
            };

            let state = match next_state(record.state, event) {
                Ok(state) => state,
                Err(violation) => {
                    error!(record_id = %record.id, error = %violation, "sync_orchestrator: recovery rejected");
                    continue;
                }
            };

            let patch = SyncRecordPatch {
                state: Some(state),
                last_error: Some(Some(failure)),
                ..Default::default()
            };
            match self.store.update_record(record.id, patch).await {
                Ok(()) => {
                    recovered += 1;
                    info!(record_id = %record.id, from = %record.state, "sync_orchestrator: interrupted record recovered");
                }
                Err(err) => {
                    error!(record_id = %record.id, error = %err, "sync_orchestrator: failed to recover record");
                }
            }
        }
        recovered
    }

    /// Drives one record as far as it gets. Never propagates errors; a failure
    /// leaves the record resumable and returns false.
    async fn sync_record(&self, mut record: SyncRecord) -> bool {
        let record_id = record.id;
        match self.drive(&mut record).await {
            Ok(synced) => synced,
            Err(SyncError::ProtocolViolation(violation)) => {
                error!(%record_id, error = %violation, "sync_orchestrator: protocol violation, attempt aborted");
                let failure = failure_for(&record, FailureKind::Protocol, violation.to_string());
                self.record_failure(record_id, failure).await;
                false
            }
            Err(err) => {
                error!(%record_id, error = %err, "sync_orchestrator: sync attempt failed");
                let failure = failure_for(&record, FailureKind::Storage, err.to_string());
                self.record_failure(record_id, failure).await;
                false
            }
        }
    }

    async fn drive(&self, record: &mut SyncRecord) -> Result<bool, SyncError> {
        match record.state {
            SyncState::Complete => {
                self.finish(record).await?;
                return Ok(true);
            }
            SyncState::PendingSend | SyncState::Sending => {
                if !self.submit_metadata(record).await? {
                    return Ok(false);
                }
            }
            SyncState::Error if !record.metadata_accepted() => {
                if !self.submit_metadata(record).await? {
                    return Ok(false);
                }
            }
            SyncState::Error | SyncState::DataSent | SyncState::ImagesPending => {}
        }

        self.upload_artifacts(record).await
    }

    /// Returns false when the backend did not accept the metadata.
    async fn submit_metadata(&self, record: &mut SyncRecord) -> Result<bool, SyncError> {
        if record.state != SyncState::Sending {
            let state = next_state(record.state, SyncEvent::SubmitMetadata)?;
            self.persist(record, SyncRecordPatch::state(state)).await?;
        }

        let payload = DeliveryMetadataPayload::from(&record.outcome);
        match self.transport.submit_delivery_metadata(&payload).await {
            Ok(()) => {
                let state = next_state(record.state, SyncEvent::MetadataAccepted)?;
                let patch = SyncRecordPatch {
                    state: Some(state),
                    accepted_at: Some(Utc::now()),
                    last_error: Some(None),
                    ..Default::default()
                };
                self.persist(record, patch).await?;
                info!(record_id = %record.id, key = %record.business_key(), "sync_orchestrator: metadata accepted");
                Ok(true)
            }
            Err(err) => {
                self.reject_metadata(record, &err).await?;
                Ok(false)
            }
        }
    }

    async fn reject_metadata(
        &self,
        record: &mut SyncRecord,
        err: &TransportError,
    ) -> Result<(), SyncError> {
        let state = next_state(record.state, SyncEvent::MetadataRejected)?;
        let attempts = record.attempts.saturating_add(1);
        let patch = SyncRecordPatch {
            state: Some(state),
            attempts: Some(attempts),
            last_error: Some(Some(SyncFailure::metadata(
                FailureKind::Transport,
                err.message.clone(),
            ))),
            ..Default::default()
        };
        self.persist(record, patch).await?;
        warn!(
            record_id = %record.id,
            key = %record.business_key(),
            attempts,
            error = %err,
            "sync_orchestrator: metadata submission failed"
        );
        Ok(())
    }

    async fn upload_artifacts(&self, record: &mut SyncRecord) -> Result<bool, SyncError> {
        if record.state == SyncState::DataSent && record.outcome.artifacts.total() == 0 {
            next_state(record.state, SyncEvent::NoArtifacts)?;
            self.finish(record).await?;
            return Ok(true);
        }

        let state = next_state(record.state, SyncEvent::BeginArtifacts)?;
        if state != record.state {
            self.persist(record, SyncRecordPatch::state(state)).await?;
        }

        let uploader = RecordArtifactUploader {
            store: self.store.as_ref(),
            transport: self.transport.as_ref(),
            media_root: &self.settings.media_root,
            record_id: record.id,
            key: record.business_key(),
        };
        let summary = upload_all(&mut record.outcome.artifacts, &uploader).await;

        if summary.is_complete() {
            next_state(record.state, SyncEvent::AllArtifactsSent)?;
            self.finish(record).await?;
            return Ok(true);
        }

        let state = next_state(record.state, SyncEvent::SomeArtifactsFailed)?;
        let failure = SyncFailure::artifacts(
            summary.sent_count,
            summary.total,
            FailureKind::Transport,
            format!("{} image(s) not acknowledged", summary.total - summary.sent_count),
        );
        let patch = SyncRecordPatch {
            state: Some(state),
            last_error: Some(Some(failure)),
            artifacts: Some(record.outcome.artifacts.clone()),
            ..Default::default()
        };
        self.persist(record, patch).await?;
        warn!(
            record_id = %record.id,
            sent = summary.sent_count,
            total = summary.total,
            "sync_orchestrator: images pending"
        );
        Ok(false)
    }

    /// Terminal cleanup: a COMPLETE record leaves the pending list and its key
    /// is remembered so the delivery cannot be queued again.
    async fn finish(&self, record: &SyncRecord) -> Result<(), SyncError> {
        self.store.complete_record(record.id).await?;
        info!(record_id = %record.id, key = %record.business_key(), "sync_orchestrator: delivery complete");
        Ok(())
    }

    async fn persist(
        &self,
        record: &mut SyncRecord,
        patch: SyncRecordPatch,
    ) -> Result<(), RecordStoreError> {
        self.store.update_record(record.id, patch.clone()).await?;
        record.apply(&patch);
        Ok(())
    }

    async fn record_failure(&self, record_id: Uuid, failure: SyncFailure) {
        let patch = SyncRecordPatch {
            last_error: Some(Some(failure)),
            ..Default::default()
        };
        if let Err(err) = self.store.update_record(record_id, patch).await {
            error!(%record_id, error = %err, "sync_orchestrator: failed to store failure");
        }
    }
}

#[async_trait]
impl SyncRunner for SyncOrchestrator {
    async fn sync_all_pending(&self) -> SyncPassResult {
        SyncOrchestrator::sync_all_pending(self).await
    }

    /// Records orphaned in flight by a previous process count too, as long as
    /// no sync is running; the pass recovers them before resuming.
    async fn has_resumable_records(&self) -> bool {
        match self.store.list_pending_records().await {
            Ok(records) => {
                let idle = !self.is_busy();
                records.iter().any(|record| {
                    record.state.is_resumable() || (idle && record.state.is_in_flight())
                })
            }
            Err(err) => {
                error!(error = %err, "sync_orchestrator: failed to list pending records");
                false
            }
        }
    }
}

fn failure_for(record: &SyncRecord, kind: FailureKind, message: String) -> SyncFailure {
    if record.metadata_accepted() {
        let artifacts = &record.outcome.artifacts;
        SyncFailure::artifacts(artifacts.sent_count(), artifacts.total(), kind, message)
    } else {
        SyncFailure::metadata(kind, message)
    }
}

/// Uploads the images of one record and checkpoints its `sent` flags.
struct RecordArtifactUploader<'a> {
    store: &'a (dyn RecordStore + Send + Sync),
    transport: &'a (dyn DeliveryTransport + Send + Sync),
    media_root: &'a Path,
    record_id: Uuid,
    key: BusinessKey,
}

#[async_trait]
impl ArtifactUploader for RecordArtifactUploader<'_> {
    async fn upload(
        &self,
        kind: ArtifactKind,
        item: &ArtifactUploadStatus,
    ) -> Result<bool, TransportError> {
        let path = resolve_artifact_path(self.media_root, &item.name)?;
        let artifact = ArtifactRef {
            kind,
            name: item.name.clone(),
            path,
        };
        self.transport.upload_artifact(&self.key, &artifact).await
    }

    async fn checkpoint(&self, artifacts: &DeliveryArtifacts) -> Result<(), RecordStoreError> {
        self.store
            .update_record(self.record_id, SyncRecordPatch::artifacts(artifacts.clone()))
            .await
    }
}

/// Image names are relative to the media directory and may not escape it.
fn resolve_artifact_path(media_root: &Path, name: &str) -> Result<PathBuf, TransportError> {
    let relative = Path::new(name);
    let escapes = relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_)));
    if name.is_empty() || escapes {
        return Err(TransportError::rejected(format!(
            "artifact name {name:?} is outside the media directory"
        )));
    }
    Ok(media_root.join(relative))
}
