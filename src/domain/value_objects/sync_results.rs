use serde::Serialize;
use uuid::Uuid;

use super::enums::background_fetch_results::BackgroundFetchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOneOutcome {
    Synced,
    Failed,
    /// Another sync execution held the single-flight guard; nothing was touched.
    Busy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub synced: usize,
    pub failed: usize,
    /// Resumable records left untouched because connectivity dropped mid-batch.
    pub skipped: usize,
    pub recovered: usize,
    pub aborted_offline: bool,
    /// The pending list could not be read, so no record was attempted.
    pub store_unavailable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncPassResult {
    Completed(BatchSummary),
    Busy,
}

impl SyncPassResult {
    pub fn summary(&self) -> Option<&BatchSummary> {
        match self {
            SyncPassResult::Completed(summary) => Some(summary),
            SyncPassResult::Busy => None,
        }
    }

    /// Maps the aggregate of a pass onto the host background-task contract.
    pub fn to_background_result(&self) -> BackgroundFetchResult {
        match self {
            SyncPassResult::Busy => BackgroundFetchResult::NoData,
            SyncPassResult::Completed(summary) if summary.synced > 0 => {
                BackgroundFetchResult::NewData
            }
            SyncPassResult::Completed(summary) if summary.failed > 0 || summary.store_unavailable => {
                BackgroundFetchResult::Failed
            }
            SyncPassResult::Completed(_) => BackgroundFetchResult::NoData,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitResult {
    Synced {
        record_id: Uuid,
    },
    /// Stored as PENDING_SEND; a later pass transmits it.
    Queued {
        record_id: Uuid,
        reason: QueueReason,
    },
    /// The inline attempt failed; the record stays resumable and retries automatically.
    RetryScheduled {
        record_id: Uuid,
        message: String,
    },
}

impl SubmitResult {
    pub fn record_id(&self) -> Uuid {
        match self {
            SubmitResult::Synced { record_id }
            | SubmitResult::Queued { record_id, .. }
            | SubmitResult::RetryScheduled { record_id, .. } => *record_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueReason {
    Offline,
    SyncInProgress,
}
