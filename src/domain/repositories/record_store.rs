use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::{
        open_orders::OpenOrderGroup,
        sync_records::{SyncRecord, SyncRecordPatch},
    },
    errors::RecordStoreError,
    value_objects::business_key::BusinessKey,
};

/// Durable store for pending sync records (`entregasSync`), the open-orders
/// cache (`clientesEntrega`) and the keys of delivered outcomes
/// (`entregasCompletadas`). Every mutation is committed before it returns.
#[automock]
#[async_trait]
pub trait RecordStore {
    async fn list_pending_records(&self) -> Result<Vec<SyncRecord>, RecordStoreError>;

    async fn find_record(&self, id: Uuid) -> Result<Option<SyncRecord>, RecordStoreError>;

    async fn find_record_by_key(
        &self,
        key: &BusinessKey,
    ) -> Result<Option<SyncRecord>, RecordStoreError>;

    /// Appends the record, then drops the matching open-order line. Fails with
    /// `DuplicateKey` when the business key is already queued or was delivered.
    async fn insert_record(&self, record: SyncRecord) -> Result<(), RecordStoreError>;

    /// Merges the patch into the stored record. Silently does nothing for an unknown id.
    async fn update_record(&self, id: Uuid, patch: SyncRecordPatch)
    -> Result<(), RecordStoreError>;

    /// Idempotent.
    async fn delete_record(&self, id: Uuid) -> Result<(), RecordStoreError>;

    /// Removes a COMPLETE record and remembers its business key as delivered.
    /// Idempotent; an unknown id is ignored.
    async fn complete_record(&self, id: Uuid) -> Result<(), RecordStoreError>;

    async fn list_open_orders(&self) -> Result<Vec<OpenOrderGroup>, RecordStoreError>;

    /// Folds backend orders into the cache without overwriting local lines.
    /// Returns the number of deliveries and line items appended.
    async fn merge_incoming_orders(
        &self,
        incoming: Vec<OpenOrderGroup>,
    ) -> Result<usize, RecordStoreError>;

    /// Returns whether a delivery line was removed.
    async fn remove_order(&self, key: &BusinessKey) -> Result<bool, RecordStoreError>;
}
