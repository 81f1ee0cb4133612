//! JSON documents grouped into containers and partitions on top of a `Storage`.
//!
//! A document lives at `{container}/{partition}/{id}.json`. Partition keys and
//! ids are escaped so any string can be used as either.

use crate::domain::ports::Storage;
use crate::utils::error::{Result, WorkerlyError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

const DOCUMENT_EXTENSION: &str = ".json";

/// Container names for each document kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerNames {
    pub users: String,
    pub workspaces: String,
    pub memberships: String,
    pub workspace_configs: String,
    pub snapshots: String,
}

impl Default for ContainerNames {
    fn default() -> Self {
        Self {
            users: "users".to_string(),
            workspaces: "workspaces".to_string(),
            memberships: "userWorkspaces".to_string(),
            workspace_configs: "workspaceConfigs".to_string(),
            snapshots: "remainingWorkSnapshots".to_string(),
        }
    }
}

fn escape_segment(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => escaped.push(byte as char),
            other => escaped.push_str(&format!("%{:02X}", other)),
        }
    }
    escaped
}

pub struct DocumentStore<S: Storage> {
    storage: S,
    write_lock: Mutex<()>,
}

impl<S: Storage> DocumentStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    fn document_path(container: &str, partition: &str, id: &str) -> String {
        format!(
            "{}/{}/{}{}",
            escape_segment(container),
            escape_segment(partition),
            escape_segment(id),
            DOCUMENT_EXTENSION
        )
    }

    pub async fn read<T: DeserializeOwned>(
        &self,
        container: &str,
        partition: &str,
        id: &str,
    ) -> Result<Option<T>> {
        let path = Self::document_path(container, partition, id);
        if !self.storage.exists(&path).await? {
            return Ok(None);
        }

        let data = self.storage.read_file(&path).await?;
        Ok(Some(serde_json::from_slice(&data)?))
    }

    /// Stores a new document; `DocumentConflict` when the id is taken.
    pub async fn create<T: Serialize + Sync>(
        &self,
        container: &str,
        partition: &str,
        id: &str,
        document: &T,
    ) -> Result<()> {
        let path = Self::document_path(container, partition, id);
        let data = serde_json::to_vec_pretty(document)?;

        let _guard = self.write_lock.lock().await;
        if self.storage.exists(&path).await? {
            return Err(WorkerlyError::DocumentConflict {
                container: container.to_string(),
                id: id.to_string(),
            });
        }
        self.storage.write_file(&path, &data).await?;

        tracing::debug!("Created document {}/{}", container, id);
        Ok(())
    }

    pub async fn upsert<T: Serialize + Sync>(
        &self,
        container: &str,
        partition: &str,
        id: &str,
        document: &T,
    ) -> Result<()> {
        let path = Self::document_path(container, partition, id);
        let data = serde_json::to_vec_pretty(document)?;

        let _guard = self.write_lock.lock().await;
        self.storage.write_file(&path, &data).await?;

        tracing::debug!("Upserted document {}/{}", container, id);
        Ok(())
    }

    /// Read-modify-write under the write lock. `apply` receives the current
    /// document (`None` when absent) and returns the one to store.
    pub async fn update<T, F>(
        &self,
        container: &str,
        partition: &str,
        id: &str,
        apply: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce(Option<T>) -> T + Send,
    {
        let _guard = self.write_lock.lock().await;
        let current = self.read(container, partition, id).await?;
        let updated = apply(current);

        let path = Self::document_path(container, partition, id);
        let data = serde_json::to_vec_pretty(&updated)?;
        self.storage.write_file(&path, &data).await?;

        tracing::debug!("Updated document {}/{}", container, id);
        Ok(updated)
    }

    pub async fn query_partition<T: DeserializeOwned + Send>(
        &self,
        container: &str,
        partition: &str,
    ) -> Result<Vec<T>> {
        let dir = format!("{}/{}", escape_segment(container), escape_segment(partition));
        self.load_all(&dir).await
    }

    /// Every document in the container that matches `predicate`.
    pub async fn query_container<T, F>(&self, container: &str, predicate: F) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
        F: Fn(&T) -> bool + Send,
    {
        let documents: Vec<T> = self.load_all(&escape_segment(container)).await?;
        Ok(documents.into_iter().filter(|d| predicate(d)).collect())
    }

    async fn load_all<T: DeserializeOwned + Send>(&self, dir: &str) -> Result<Vec<T>> {
        let mut documents = Vec::new();
        for path in self.storage.list_files(dir).await? {
            if !path.ends_with(DOCUMENT_EXTENSION) {
                continue;
            }
            let data = self.storage.read_file(&path).await?;
            documents.push(serde_json::from_slice(&data)?);
        }
        Ok(documents)
    }
}
