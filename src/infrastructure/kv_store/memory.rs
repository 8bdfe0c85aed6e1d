use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::KeyValueStore;
use crate::domain::errors::RecordStoreError;

/// Process-local backend. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn read(&self, namespace: &str) -> Result<Option<String>, RecordStoreError> {
        Ok(self.entries.read().await.get(namespace).cloned())
    }

    async fn write(&self, namespace: &str, value: String) -> Result<(), RecordStoreError> {
        self.entries
            .write()
            .await
            .insert(namespace.to_string(), value);
        Ok(())
    }
}
