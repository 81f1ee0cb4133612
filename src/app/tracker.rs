//! Burndown snapping: one remaining work snapshot per tracked work item and run.

use crate::adapters::azure_devops::AzureDevOpsClient;
use crate::adapters::document_store::{ContainerNames, DocumentStore};
use crate::app::snapshots::SnapshotService;
use crate::app::workspace_config::WorkspaceConfigService;
use crate::config::{AzureDevOpsConfig, TrackerOptions};
use crate::core::remaining_work::RemainingWorkEngine;
use crate::domain::model::RemainingWorkSnapshot;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerSummary {
    pub processed: usize,
    pub persisted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl TrackerSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

pub struct BurndownTracker<S: Storage> {
    options: TrackerOptions,
    azure_devops: AzureDevOpsConfig,
    configs: WorkspaceConfigService<S>,
    snapshots: SnapshotService<S>,
}

impl<S: Storage> BurndownTracker<S> {
    pub fn new(
        options: TrackerOptions,
        azure_devops: AzureDevOpsConfig,
        store: Arc<DocumentStore<S>>,
        containers: &ContainerNames,
    ) -> Self {
        Self {
            options,
            azure_devops,
            configs: WorkspaceConfigService::new(Arc::clone(&store), containers),
            snapshots: SnapshotService::new(store, containers),
        }
    }

    pub async fn run(&self) -> Result<TrackerSummary> {
        self.run_at(Utc::now()).await
    }

    /// Snapshots every item whose tracking window contains the date of `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<TrackerSummary> {
        tracing::info!("Remaining Work Tracker started at {} UTC.", now);

        let workspace_id = self.options.workspace_id;
        let items = &self.options.to_track_items;
        let mut summary = TrackerSummary::default();

        if items.is_empty() {
            tracing::info!("No items to track.");
            return Ok(summary);
        }

        let connection = match self.configs.get(workspace_id).await? {
            Some(connection) if connection.is_configured() => connection,
            _ => {
                tracing::warn!("Azure DevOps connection missing for workspace {}", workspace_id);
                summary.skipped = items.len();
                return Ok(summary);
            }
        };

        let client = AzureDevOpsClient::for_connection(
            &self.azure_devops.base_url,
            &connection,
            self.azure_devops.timeout_seconds,
        )?;
        let engine = RemainingWorkEngine::new(client).with_batch_size(self.azure_devops.batch_size);
        let today = now.date_naive();
        let mut seen = HashSet::new();

        for item in items {
            if !item.is_active_on(today) {
                tracing::info!(
                    "Skipping item {}: {} is outside {} to {}.",
                    item.work_item_id,
                    today,
                    item.from,
                    item.to
                );
                summary.skipped += 1;
                continue;
            }

            // Snapshot ids are per item and run, so one snapshot per id.
            if !seen.insert(item.work_item_id) {
                tracing::warn!(
                    "Skipping item {}: already snapshotted in this run.",
                    item.work_item_id
                );
                summary.skipped += 1;
                continue;
            }

            tracing::info!(
                "Processing item {} from {} to {}.",
                item.work_item_id,
                item.from,
                item.to
            );
            summary.processed += 1;

            let response = match engine
                .compute(item.work_item_id, &connection.teams_definition)
                .await
            {
                Ok(Some(response)) => response,
                Ok(None) => {
                    tracing::error!(
                        "Failed to get remaining work for item {}: work item not found.",
                        item.work_item_id
                    );
                    summary.failed += 1;
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to get remaining work for item {}: {} ({})",
                        item.work_item_id,
                        e,
                        e.recovery_suggestion()
                    );
                    summary.failed += 1;
                    continue;
                }
            };

            let snapshot = RemainingWorkSnapshot::from_response(workspace_id, response, now);
            tracing::info!(
                "Snapshot computation successful for item {}. Proceeding to persisting.",
                item.work_item_id
            );

            match self.snapshots.create(workspace_id, &snapshot).await {
                Ok(id) => {
                    tracing::info!("Snapshot persisted with id {}.", id);
                    summary.persisted += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to persist snapshot for item {}: {}", item.work_item_id, e);
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            "Remaining Work Tracker finished at {} UTC. Processed: {}, persisted: {}, skipped: {}, failed: {}.",
            Utc::now(),
            summary.processed,
            summary.persisted,
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }
}
