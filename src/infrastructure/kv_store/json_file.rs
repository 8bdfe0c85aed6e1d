use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

use super::KeyValueStore;
use crate::domain::errors::RecordStoreError;

/// One `<namespace>.json` file per namespace. Writes land in a temp file that is
/// fsynced and renamed over the target, so a crash leaves either the old or the
/// new list on disk, never a torn one.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, RecordStoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|err| backend_error("create data dir", &root, err))?;
        Ok(Self { root })
    }

    fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.root.join(format!("{namespace}.json"))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn read(&self, namespace: &str) -> Result<Option<String>, RecordStoreError> {
        let path = self.namespace_path(namespace);
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(backend_error("read", &path, err)),
        }
    }

    async fn write(&self, namespace: &str, value: String) -> Result<(), RecordStoreError> {
        let path = self.namespace_path(namespace);
        let tmp_path = self.root.join(format!("{namespace}.json.tmp"));

        let mut file = fs::File::create(&tmp_path)
            .await
            .map_err(|err| backend_error("create", &tmp_path, err))?;
        file.write_all(value.as_bytes())
            .await
            .map_err(|err| backend_error("write", &tmp_path, err))?;
        file.sync_all()
            .await
            .map_err(|err| backend_error("fsync", &tmp_path, err))?;
        drop(file);

        fs::rename(&tmp_path, &path)
            .await
            .map_err(|err| backend_error("rename", &path, err))?;

        #[cfg(unix)]
        {
            let dir = fs::File::open(&self.root)
                .await
                .map_err(|err| backend_error("open data dir", &self.root, err))?;
            dir.sync_all()
                .await
                .map_err(|err| backend_error("fsync data dir", &self.root, err))?;
        }

        debug!(namespace, bytes = value.len(), "kv_store: namespace written");
        Ok(())
    }
}

fn backend_error(action: &str, path: &Path, err: std::io::Error) -> RecordStoreError {
    RecordStoreError::Backend(format!("failed to {action} {}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_namespace_reads_as_none() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();

        assert!(store.read("entregasSync").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn written_value_survives_reopen() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("data")).await.unwrap();
        store
            .write("entregasSync", "[1,2,3]".to_string())
            .await
            .unwrap();

        let reopened = JsonFileStore::open(dir.path().join("data")).await.unwrap();
        assert_eq!(
            reopened.read("entregasSync").await.unwrap().as_deref(),
            Some("[1,2,3]")
        );
        assert!(!dir.path().join("data/entregasSync.json.tmp").exists());
    }

    #[tokio::test]
    async fn overwrite_replaces_previous_contents() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        store.write("clientesEntrega", "[]".to_string()).await.unwrap();
        store
            .write("clientesEntrega", "[{\"a\":1}]".to_string())
            .await
            .unwrap();

        assert_eq!(
            store.read("clientesEntrega").await.unwrap().as_deref(),
            Some("[{\"a\":1}]")
        );
    }
}
