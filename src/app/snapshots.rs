use crate::adapters::document_store::{ContainerNames, DocumentStore};
use crate::domain::model::RemainingWorkSnapshot;
use crate::domain::ports::Storage;
use crate::utils::error::{Result, WorkerlyError};
use std::sync::Arc;
use uuid::Uuid;

pub struct SnapshotService<S: Storage> {
    store: Arc<DocumentStore<S>>,
    container: String,
}

impl<S: Storage> SnapshotService<S> {
    pub fn new(store: Arc<DocumentStore<S>>, containers: &ContainerNames) -> Self {
        Self {
            store,
            container: containers.snapshots.clone(),
        }
    }

    /// Persists the snapshot under the workspace partition and returns its id.
    pub async fn create(&self, workspace_id: Uuid, snapshot: &RemainingWorkSnapshot) -> Result<String> {
        if snapshot.root.workspace_id != workspace_id {
            return Err(WorkerlyError::ValidationError {
                message: format!(
                    "Snapshot belongs to workspace {}, not {}",
                    snapshot.root.workspace_id, workspace_id
                ),
            });
        }

        let id = snapshot.id();
        self.store
            .create(&self.container, &workspace_id.to_string(), &id, snapshot)
            .await?;
        tracing::info!("Snapshot {} created successfully.", id);

        Ok(id)
    }

    /// Burndown history of one work item, oldest first.
    pub async fn list_for_work_item(
        &self,
        workspace_id: Uuid,
        work_item_id: i64,
    ) -> Result<Vec<RemainingWorkSnapshot>> {
        let mut snapshots: Vec<RemainingWorkSnapshot> = self
            .store
            .query_partition(&self.container, &workspace_id.to_string())
            .await?;
        snapshots.retain(|s| s.root.work_item_id == work_item_id);
        snapshots.sort_by_key(|s| s.root.execution_date_utc);
        Ok(snapshots)
    }
}
