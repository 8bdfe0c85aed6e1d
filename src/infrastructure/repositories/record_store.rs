use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    domain::{
        entities::{
            open_orders::OpenOrderGroup,
            sync_records::{SyncRecord, SyncRecordPatch},
        },
        errors::RecordStoreError,
        repositories::record_store::RecordStore,
        value_objects::business_key::BusinessKey,
    },
    infrastructure::kv_store::KeyValueStore,
};

pub const OPEN_ORDERS_NAMESPACE: &str = "clientesEntrega";
pub const PENDING_SYNC_NAMESPACE: &str = "entregasSync";
pub const COMPLETED_NAMESPACE: &str = "entregasCompletadas";

/// Record store over three JSON lists in a key-value backend.
///
/// Reads take a consistent snapshot of a namespace; every read-modify-write holds
/// `write_lock` from load to durable write so concurrent triggers cannot lose updates.
pub struct KvRecordStore {
    kv: Arc<dyn KeyValueStore + Send + Sync>,
    write_lock: Mutex<()>,
}

impl KvRecordStore {
    pub fn new(kv: Arc<dyn KeyValueStore + Send + Sync>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    async fn load<T: DeserializeOwned>(&self, namespace: &str) -> Result<Vec<T>, RecordStoreError> {
        match self.kv.read(namespace).await? {
            Some(raw) if !raw.trim().is_empty() => {
                serde_json::from_str(&raw).map_err(|source| RecordStoreError::Serialization {
                    namespace: namespace.to_string(),
                    source,
                })
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn save<T: Serialize>(&self, namespace: &str, items: &[T]) -> Result<(), RecordStoreError> {
        let raw = serde_json::to_string(items).map_err(|source| RecordStoreError::Serialization {
            namespace: namespace.to_string(),
            source,
        })?;
        self.kv.write(namespace, raw).await
    }

    async fn load_records(&self) -> Result<Vec<SyncRecord>, RecordStoreError> {
        self.load(PENDING_SYNC_NAMESPACE).await
    }

    async fn load_orders(&self) -> Result<Vec<OpenOrderGroup>, RecordStoreError> {
        self.load(OPEN_ORDERS_NAMESPACE).await
    }

    async fn load_completed(&self) -> Result<Vec<BusinessKey>, RecordStoreError> {
        self.load(COMPLETED_NAMESPACE).await
    }

    /// Keys that must not come back: queued records plus delivered ones.
    async fn known_keys(&self) -> Result<HashSet<BusinessKey>, RecordStoreError> {
        let mut keys: HashSet<BusinessKey> = self
            .load_records()
            .await?
            .iter()
            .map(SyncRecord::business_key)
            .collect();
        keys.extend(self.load_completed().await?);
        Ok(keys)
    }

    /// Caller must hold `write_lock`.
    async fn remove_order_locked(&self, key: &BusinessKey) -> Result<bool, RecordStoreError> {
        let mut groups = self.load_orders().await?;
        if !remove_delivery(&mut groups, key) {
            return Ok(false);
        }
        self.save(OPEN_ORDERS_NAMESPACE, &groups).await?;
        Ok(true)
    }
}

#[async_trait]
impl RecordStore for KvRecordStore {
    async fn list_pending_records(&self) -> Result<Vec<SyncRecord>, RecordStoreError> {
        self.load_records().await
    }

    async fn find_record(&self, id: Uuid) -> Result<Option<SyncRecord>, RecordStoreError> {
        Ok(self
            .load_records()
            .await?
            .into_iter()
            .find(|record| record.id == id))
    }

    async fn find_record_by_key(
        &self,
        key: &BusinessKey,
    ) -> Result<Option<SyncRecord>, RecordStoreError> {
        Ok(self
            .load_records()
            .await?
            .into_iter()
            .find(|record| &record.business_key() == key))
    }

    async fn insert_record(&self, record: SyncRecord) -> Result<(), RecordStoreError> {
        let _guard = self.write_lock.lock().await;

        let key = record.business_key();
        let mut records = self.load_records().await?;
        if records.iter().any(|existing| existing.business_key() == key)
            || self.load_completed().await?.contains(&key)
        {
            return Err(RecordStoreError::DuplicateKey(key));
        }

        let record_id = record.id;
        records.push(record);
        self.save(PENDING_SYNC_NAMESPACE, &records).await?;
        info!(%record_id, key = %key, "record_store: record inserted");

        // The record is durable; only now may the open-order line go.
        match self.remove_order_locked(&key).await {
            Ok(removed) => {
                debug!(%record_id, removed, "record_store: open order released");
            }
            Err(err) => {
                // list_open_orders filters pending keys, so a stale line stays hidden.
                warn!(
                    %record_id,
                    key = %key,
                    error = %err,
                    "record_store: failed to remove open order after insert"
                );
            }
        }

        Ok(())
    }

    async fn update_record(
        &self,
        id: Uuid,
        patch: SyncRecordPatch,
    ) -> Result<(), RecordStoreError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load_records().await?;
        let Some(record) = records.iter_mut().find(|record| record.id == id) else {
            debug!(record_id = %id, "record_store: update for unknown record ignored");
            return Ok(());
        };
        record.apply(&patch);
        self.save(PENDING_SYNC_NAMESPACE, &records).await
    }

    async fn delete_record(&self, id: Uuid) -> Result<(), RecordStoreError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load_records().await?;
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Ok(());
        }
        self.save(PENDING_SYNC_NAMESPACE, &records).await?;
        info!(record_id = %id, "record_store: record deleted");
        Ok(())
    }

    async fn complete_record(&self, id: Uuid) -> Result<(), RecordStoreError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load_records().await?;
        let Some(position) = records.iter().position(|record| record.id == id) else {
            return Ok(());
        };
        let key = records.remove(position).business_key();

        // Key first: a crash before the second write leaves a pending record
        // that is retried, never a delivered key that can be submitted again.
        let mut completed = self.load_completed().await?;
        if !completed.contains(&key) {
            completed.push(key.clone());
            self.save(COMPLETED_NAMESPACE, &completed).await?;
        }
        self.save(PENDING_SYNC_NAMESPACE, &records).await?;
        info!(record_id = %id, key = %key, "record_store: record completed");
        Ok(())
    }

    async fn list_open_orders(&self) -> Result<Vec<OpenOrderGroup>, RecordStoreError> {
        let known = self.known_keys().await?;

        let mut groups = self.load_orders().await?;
        for group in groups.iter_mut() {
            group
                .deliveries
                .retain(|delivery| !known.contains(&delivery.business_key()));
        }
        groups.retain(|group| !group.deliveries.is_empty());
        Ok(groups)
    }

    async fn merge_incoming_orders(
        &self,
        incoming: Vec<OpenOrderGroup>,
    ) -> Result<usize, RecordStoreError> {
        let _guard = self.write_lock.lock().await;

        let known = self.known_keys().await?;
        let mut groups = self.load_orders().await?;

        let appended = merge_groups(&mut groups, incoming, &known);
        if appended > 0 {
            self.save(OPEN_ORDERS_NAMESPACE, &groups).await?;
        }
        info!(appended, groups = groups.len(), "record_store: incoming orders merged");
        Ok(appended)
    }

    async fn remove_order(&self, key: &BusinessKey) -> Result<bool, RecordStoreError> {
        let _guard = self.write_lock.lock().await;
        self.remove_order_locked(key).await
    }
}

fn remove_delivery(groups: &mut Vec<OpenOrderGroup>, key: &BusinessKey) -> bool {
    let Some(group_index) = groups
        .iter()
        .position(|group| group.deliveries.iter().any(|delivery| delivery.matches(key)))
    else {
        return false;
    };

    let group = &mut groups[group_index];
    group.deliveries.retain(|delivery| !delivery.matches(key));
    if group.deliveries.is_empty() {
        groups.remove(group_index);
    }
    true
}

/// Append-only merge: new groups, new deliveries and new line items are added;
/// anything already known locally is left exactly as it is.
fn merge_groups(
    groups: &mut Vec<OpenOrderGroup>,
    incoming: Vec<OpenOrderGroup>,
    known: &HashSet<BusinessKey>,
) -> usize {
    let mut appended = 0;

    for mut incoming_group in incoming {
        incoming_group
            .deliveries
            .retain(|delivery| !known.contains(&delivery.business_key()));

        let Some(position) = groups
            .iter()
            .position(|group| group.same_group(&incoming_group))
        else {
            if !incoming_group.deliveries.is_empty() {
                appended += incoming_group.deliveries.len();
                groups.push(incoming_group);
            }
            continue;
        };
        let existing = &mut groups[position];

        for incoming_delivery in incoming_group.deliveries {
            let key = incoming_delivery.business_key();
            match existing
                .deliveries
                .iter_mut()
                .find(|delivery| delivery.matches(&key))
            {
                None => {
                    existing.deliveries.push(incoming_delivery);
                    appended += 1;
                }
                Some(known) => {
                    for item in incoming_delivery.line_items {
                        if !known
                            .line_items
                            .iter()
                            .any(|line| line.product_code == item.product_code)
                        {
                            known.line_items.push(item);
                            appended += 1;
                        }
                    }
                }
            }
        }
    }

    appended
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            entities::{
                deliveries::{DeliveryOutcome, GeoPoint},
                open_orders::{OpenDelivery, OpenLineItem},
            },
            value_objects::{
                artifacts::DeliveryArtifacts,
                enums::{delivery_types::DeliveryType, sync_states::SyncState},
            },
        },
        infrastructure::kv_store::memory::MemoryKeyValueStore,
    };
    use chrono::Utc;

    fn store() -> (KvRecordStore, Arc<MemoryKeyValueStore>) {
        let kv = Arc::new(MemoryKeyValueStore::default());
        (KvRecordStore::new(kv.clone()), kv)
    }

    fn outcome(order_id: &str, folio: &str) -> DeliveryOutcome {
        DeliveryOutcome {
            order_id: order_id.to_string(),
            folio: folio.to_string(),
            delivery_type: DeliveryType::Full,
            line_items: vec![],
            comments: None,
            reporter_name: "Driver".to_string(),
            location: GeoPoint {
                latitude: 20.67,
                longitude: -103.35,
            },
            captured_at: Utc::now(),
            artifacts: DeliveryArtifacts::default(),
        }
    }

    fn line(code: &str, programmed: f64) -> OpenLineItem {
        OpenLineItem {
            product_code: code.to_string(),
            description: None,
            programmed,
        }
    }

    fn delivery(order_id: &str, folio: &str, lines: Vec<OpenLineItem>) -> OpenDelivery {
        OpenDelivery {
            order_id: order_id.to_string(),
            folio: folio.to_string(),
            address: None,
            location: None,
            line_items: lines,
        }
    }

    fn group(account: &str, load: &str, deliveries: Vec<OpenDelivery>) -> OpenOrderGroup {
        OpenOrderGroup {
            account_id: account.to_string(),
            load_id: load.to_string(),
            client_name: None,
            deliveries,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_business_key() {
        let (store, _) = store();
        store
            .insert_record(SyncRecord::new(outcome("PED-1", "F-1"), SyncState::PendingSend))
            .await
            .unwrap();

        let err = store
            .insert_record(SyncRecord::new(outcome("PED-1", "F-1"), SyncState::PendingSend))
            .await
            .unwrap_err();

        assert!(matches!(err, RecordStoreError::DuplicateKey(_)));
        assert_eq!(store.list_pending_records().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn insert_moves_delivery_out_of_open_orders() {
        let (store, _) = store();
        store
            .merge_incoming_orders(vec![group(
                "C-1",
                "L-1",
                vec![
                    delivery("PED-1", "F-1", vec![line("SKU-1", 4.0)]),
                    delivery("PED-2", "F-2", vec![line("SKU-2", 1.0)]),
                ],
            )])
            .await
            .unwrap();

        store
            .insert_record(SyncRecord::new(outcome("PED-1", "F-1"), SyncState::PendingSend))
            .await
            .unwrap();

        let groups = store.list_open_orders().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].deliveries.len(), 1);
        assert_eq!(groups[0].deliveries[0].order_id, "PED-2");
        assert!(
            store
                .find_record_by_key(&BusinessKey::new("PED-1", "F-1"))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn update_unknown_id_is_silent_no_op() {
        let (store, _) = store();
        store
            .update_record(Uuid::new_v4(), SyncRecordPatch::state(SyncState::Error))
            .await
            .unwrap();
        assert!(store.list_pending_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_merges_patch_and_persists() {
        let (store, kv) = store();
        let record = SyncRecord::new(outcome("PED-1", "F-1"), SyncState::PendingSend);
        let id = record.id;
        store.insert_record(record).await.unwrap();

        store
            .update_record(
                id,
                SyncRecordPatch {
                    state: Some(SyncState::Error),
                    attempts: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let reread = KvRecordStore::new(kv).find_record(id).await.unwrap().unwrap();
        assert_eq!(reread.state, SyncState::Error);
        assert_eq!(reread.attempts, 3);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (store, _) = store();
        let record = SyncRecord::new(outcome("PED-1", "F-1"), SyncState::PendingSend);
        let id = record.id;
        store.insert_record(record).await.unwrap();

        store.delete_record(id).await.unwrap();
        store.delete_record(id).await.unwrap();

        assert!(store.find_record(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn merge_appends_without_overwriting_known_quantities() {
        let (store, _) = store();
        store
            .merge_incoming_orders(vec![group(
                "C-1",
                "L-1",
                vec![delivery("PED-1", "F-1", vec![line("SKU-1", 4.0)])],
            )])
            .await
            .unwrap();

        let appended = store
            .merge_incoming_orders(vec![group(
                "C-1",
                "L-1",
                vec![
                    delivery("PED-1", "F-1", vec![line("SKU-1", 99.0), line("SKU-9", 2.0)]),
                    delivery("PED-3", "F-3", vec![]),
                ],
            )])
            .await
            .unwrap();

        assert_eq!(appended, 2);
        let groups = store.list_open_orders().await.unwrap();
        assert_eq!(groups.len(), 1);
        let first = &groups[0].deliveries[0];
        assert_eq!(first.line_items.len(), 2);
        assert_eq!(first.line_items[0].programmed, 4.0);
        assert_eq!(groups[0].deliveries[1].order_id, "PED-3");
    }

    #[tokio::test]
    async fn merge_skips_deliveries_already_pending_sync() {
        let (store, _) = store();
        store
            .insert_record(SyncRecord::new(outcome("PED-1", "F-1"), SyncState::PendingSend))
            .await
            .unwrap();

        let appended = store
            .merge_incoming_orders(vec![group(
                "C-1",
                "L-1",
                vec![delivery("PED-1", "F-1", vec![line("SKU-1", 4.0)])],
            )])
            .await
            .unwrap();

        assert_eq!(appended, 0);
        assert!(store.list_open_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn completed_key_is_rejected_on_insert() {
        let (store, kv) = store();
        let record = SyncRecord::new(outcome("PED-1", "F-1"), SyncState::Complete);
        let id = record.id;
        store.insert_record(record).await.unwrap();

        store.complete_record(id).await.unwrap();
        store.complete_record(id).await.unwrap();
        assert!(store.list_pending_records().await.unwrap().is_empty());

        let err = KvRecordStore::new(kv)
            .insert_record(SyncRecord::new(outcome("PED-1", "F-1"), SyncState::PendingSend))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordStoreError::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn merge_skips_deliveries_already_completed() {
        let (store, kv) = store();
        let record = SyncRecord::new(outcome("PED-1", "F-1"), SyncState::Complete);
        let id = record.id;
        store.insert_record(record).await.unwrap();
        store.complete_record(id).await.unwrap();

        let appended = store
            .merge_incoming_orders(vec![group(
                "C-1",
                "L-1",
                vec![
                    delivery("PED-1", "F-1", vec![line("SKU-1", 4.0)]),
                    delivery("PED-2", "F-2", vec![line("SKU-2", 1.0)]),
                ],
            )])
            .await
            .unwrap();

        assert_eq!(appended, 1);
        let groups = store.list_open_orders().await.unwrap();
        assert_eq!(groups[0].deliveries.len(), 1);
        assert_eq!(groups[0].deliveries[0].order_id, "PED-2");

        let raw = kv.read(COMPLETED_NAMESPACE).await.unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed[0]["order_id"], "PED-1");
    }

    #[tokio::test]
    async fn remove_order_drops_empty_group() {
        let (store, _) = store();
        store
            .merge_incoming_orders(vec![
                group("C-1", "L-1", vec![delivery("PED-1", "F-1", vec![])]),
                group("C-2", "L-1", vec![delivery("PED-2", "F-2", vec![])]),
            ])
            .await
            .unwrap();

        assert!(
            store
                .remove_order(&BusinessKey::new("PED-1", "F-1"))
                .await
                .unwrap()
        );
        assert!(
            !store
                .remove_order(&BusinessKey::new("PED-1", "F-1"))
                .await
                .unwrap()
        );

        let groups = store.list_open_orders().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].account_id, "C-2");
    }

    #[tokio::test]
    async fn records_are_stored_under_pending_sync_namespace() {
        let (store, kv) = store();
        store
            .insert_record(SyncRecord::new(outcome("PED-1", "F-1"), SyncState::PendingSend))
            .await
            .unwrap();

        let raw = kv.read(PENDING_SYNC_NAMESPACE).await.unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed[0]["state"], "PENDING_SEND");
        assert_eq!(parsed[0]["outcome"]["folio"], "F-1");
    }
}
