use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    errors::{RecordStoreError, TransportError},
    value_objects::{
        artifacts::{ArtifactUploadStatus, DeliveryArtifacts},
        enums::artifact_kinds::ArtifactKind,
    },
};

#[automock]
#[async_trait]
pub trait ArtifactUploader {
    /// `Ok(true)` only on a confirmed acknowledgment.
    async fn upload(
        &self,
        kind: ArtifactKind,
        item: &ArtifactUploadStatus,
    ) -> Result<bool, TransportError>;

    /// Persists the current `sent` flags after an attempt.
    async fn checkpoint(&self, artifacts: &DeliveryArtifacts) -> Result<(), RecordStoreError>;
}
