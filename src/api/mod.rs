//! HTTP API over the workspace services and the remaining work engines.

pub mod current_user;
pub mod error;
pub mod handlers;

use crate::adapters::azure_devops::AzureDevOpsClient;
use crate::adapters::document_store::DocumentStore;
use crate::adapters::storage::LocalStorage;
use crate::app::{SnapshotService, UserService, WorkspaceConfigService, WorkspaceService};
use crate::config::{AzureDevOpsConfig, WorkerlyConfig};
use crate::domain::model::TeamsDefinition;
use crate::utils::error::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use current_user::CurrentUser;
pub use error::{ApiError, ApiResult};

pub struct AppContext {
    pub users: UserService<LocalStorage>,
    pub workspaces: WorkspaceService<LocalStorage>,
    pub configs: WorkspaceConfigService<LocalStorage>,
    pub snapshots: SnapshotService<LocalStorage>,
    pub azure_devops: AzureDevOpsConfig,
    /// Client for the service-level endpoints; `None` when no token is configured.
    pub service_client: Option<AzureDevOpsClient>,
    pub service_teams: TeamsDefinition,
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppContext>,
}

impl std::ops::Deref for AppState {
    type Target = AppContext;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl AppState {
    pub fn from_config(config: &WorkerlyConfig) -> Result<Self> {
        let store = Arc::new(DocumentStore::new(LocalStorage::new(&config.storage.data_dir)));
        let containers = &config.storage.containers;

        let service_client = config.azure_devops.service_client()?;
        if service_client.is_none() {
            tracing::warn!("No service-level Azure DevOps connection; work item endpoints are disabled.");
        }

        Ok(Self {
            inner: Arc::new(AppContext {
                users: UserService::new(Arc::clone(&store), containers),
                workspaces: WorkspaceService::new(Arc::clone(&store), containers),
                configs: WorkspaceConfigService::new(Arc::clone(&store), containers),
                snapshots: SnapshotService::new(store, containers),
                azure_devops: config.azure_devops.clone(),
                service_client,
                service_teams: config.teams_definition(),
            }),
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Service-level reports
        .route(
            "/api/work-items/{id}/remaining-work",
            get(handlers::get_remaining_work),
        )
        .route(
            "/api/work-items/{id}/reporting-info",
            get(handlers::get_reporting_info),
        )
        // Workspaces
        .route(
            "/api/workspaces",
            get(handlers::list_workspaces).post(handlers::create_workspace),
        )
        .route("/api/workspaces/{id}/select", post(handlers::select_workspace))
        .route("/api/workspaces/{id}/invitations", post(handlers::invite_user))
        .route(
            "/api/workspaces/{id}/connection",
            axum::routing::put(handlers::save_connection),
        )
        .route(
            "/api/workspaces/{id}/teams",
            get(handlers::get_teams).put(handlers::save_teams),
        )
        .route(
            "/api/workspaces/{id}/remaining-work",
            post(handlers::compute_workspace_remaining_work),
        )
        .route("/api/workspaces/{id}/snapshots", get(handlers::list_snapshots))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
