use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::sync_results::SyncPassResult;

/// Batch entry point shared by the connectivity monitor, the background
/// scheduler and the host bridge.
#[automock]
#[async_trait]
pub trait SyncRunner {
    async fn sync_all_pending(&self) -> SyncPassResult;

    async fn has_resumable_records(&self) -> bool;
}
