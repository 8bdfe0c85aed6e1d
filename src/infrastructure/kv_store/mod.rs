pub mod json_file;
pub mod memory;

use async_trait::async_trait;

use crate::domain::errors::RecordStoreError;

/// Namespaced string storage. A `write` is durable once it returns.
#[async_trait]
pub trait KeyValueStore {
    async fn read(&self, namespace: &str) -> Result<Option<String>, RecordStoreError>;

    async fn write(&self, namespace: &str, value: String) -> Result<(), RecordStoreError>;
}
