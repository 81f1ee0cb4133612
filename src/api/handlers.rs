use crate::adapters::azure_devops::AzureDevOpsClient;
use crate::api::{ApiError, ApiResult, AppState, CurrentUser};
use crate::core::remaining_work::RemainingWorkEngine;
use crate::core::reporting_info::ReportingInfoEngine;
use crate::domain::model::{
    InviteUserResult, RemainingWorkResponse, RemainingWorkSnapshot, ReportingInfoResponse,
    SaveConnectionResult, SaveTeamsResult, TeamRow, TeamsDefinition, WorkspaceListItem,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateWorkspaceRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateWorkspaceResponse {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub personal_access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemRequest {
    pub work_item_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotQuery {
    pub work_item_id: i64,
}

fn positive_work_item_id(id: i64) -> ApiResult<i64> {
    if id <= 0 {
        return Err(ApiError::BadRequest("WorkItemId must be positive.".to_string()));
    }
    Ok(id)
}

async fn require_member(state: &AppState, user: &CurrentUser, workspace_id: Uuid) -> ApiResult<()> {
    if state.workspaces.is_member(user.id(), workspace_id).await? {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "Not a member of workspace {}",
            workspace_id
        )))
    }
}

fn service_client(state: &AppState) -> ApiResult<&AzureDevOpsClient> {
    state.service_client.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("Azure DevOps connection is not configured".to_string())
    })
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn get_remaining_work(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<RemainingWorkResponse>> {
    let id = positive_work_item_id(id)?;
    let client = service_client(&state)?.clone();

    let engine = RemainingWorkEngine::new(client).with_batch_size(state.azure_devops.batch_size);
    engine
        .compute(id, &state.service_teams)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Work item {} not found", id)))
}

pub async fn get_reporting_info(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ReportingInfoResponse>> {
    let id = positive_work_item_id(id)?;
    let client = service_client(&state)?.clone();

    let engine = ReportingInfoEngine::new(client)
        .with_field_name(state.azure_devops.reporting_info_field.clone());
    engine
        .compute(id, &state.service_teams)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Work item {} not found", id)))
}

pub async fn list_workspaces(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<WorkspaceListItem>>> {
    state.users.ensure_exists(user.0.clone()).await?;
    Ok(Json(state.workspaces.get_for_user(user.id()).await?))
}

pub async fn create_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateWorkspaceRequest>,
) -> ApiResult<(StatusCode, Json<CreateWorkspaceResponse>)> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Workspace name is required.".to_string()));
    }

    state.users.ensure_exists(user.0.clone()).await?;
    let id = state.workspaces.create(&req.name, user.id()).await?;
    Ok((StatusCode::CREATED, Json(CreateWorkspaceResponse { id })))
}

pub async fn select_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(workspace_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_member(&state, &user, workspace_id).await?;
    state.workspaces.set_selected(user.id(), workspace_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn invite_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(workspace_id): Path<Uuid>,
    Json(req): Json<InviteRequest>,
) -> ApiResult<StatusCode> {
    match state
        .workspaces
        .invite_user_by_email(user.id(), workspace_id, &req.email)
        .await
    {
        InviteUserResult::Success => Ok(StatusCode::NO_CONTENT),
        InviteUserResult::Forbidden => Err(ApiError::Forbidden(
            "Only workspace admins can invite users.".to_string(),
        )),
        InviteUserResult::UserNotFound => Err(ApiError::NotFound(format!(
            "No user registered with email '{}'",
            req.email.trim()
        ))),
        InviteUserResult::AlreadyMember => Err(ApiError::Conflict(
            "User is already a member of the workspace.".to_string(),
        )),
        InviteUserResult::Error => Err(ApiError::Internal("Failed to invite user.".to_string())),
    }
}

pub async fn save_connection(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(workspace_id): Path<Uuid>,
    Json(req): Json<ConnectionRequest>,
) -> ApiResult<StatusCode> {
    match state
        .configs
        .upsert_connection(
            user.id(),
            workspace_id,
            &req.organization,
            &req.personal_access_token,
        )
        .await
    {
        SaveConnectionResult::Success => Ok(StatusCode::NO_CONTENT),
        SaveConnectionResult::Invalid => Err(ApiError::BadRequest(
            "Organization and personal access token are required.".to_string(),
        )),
        SaveConnectionResult::Forbidden => Err(ApiError::Forbidden(
            "Only workspace admins can change the connection.".to_string(),
        )),
        SaveConnectionResult::Error => {
            Err(ApiError::Internal("Failed to save connection.".to_string()))
        }
    }
}

pub async fn get_teams(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(workspace_id): Path<Uuid>,
) -> ApiResult<Json<Vec<TeamRow>>> {
    require_member(&state, &user, workspace_id).await?;
    Ok(Json(state.configs.get_teams(workspace_id).await?.to_rows()))
}

pub async fn save_teams(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(workspace_id): Path<Uuid>,
    Json(rows): Json<Vec<TeamRow>>,
) -> ApiResult<StatusCode> {
    let teams = TeamsDefinition::from_rows(&rows);
    match state.configs.save_teams(user.id(), workspace_id, teams).await {
        SaveTeamsResult::Success => Ok(StatusCode::NO_CONTENT),
        SaveTeamsResult::Invalid => Err(ApiError::BadRequest(
            "Team names must be at most 80 characters and members may belong to one team only."
                .to_string(),
        )),
        SaveTeamsResult::Forbidden => Err(ApiError::Forbidden(format!(
            "Not a member of workspace {}",
            workspace_id
        ))),
        SaveTeamsResult::Error => Err(ApiError::Internal("Failed to save teams.".to_string())),
    }
}

pub async fn compute_workspace_remaining_work(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(workspace_id): Path<Uuid>,
    Json(req): Json<WorkItemRequest>,
) -> ApiResult<Json<RemainingWorkResponse>> {
    let work_item_id = positive_work_item_id(req.work_item_id)?;
    require_member(&state, &user, workspace_id).await?;

    let connection = state
        .configs
        .get(workspace_id)
        .await?
        .filter(|c| c.is_configured())
        .ok_or_else(|| {
            ApiError::Conflict(
                "Azure DevOps connection is not configured for this workspace.".to_string(),
            )
        })?;

    let client = AzureDevOpsClient::for_connection(
        &state.azure_devops.base_url,
        &connection,
        state.azure_devops.timeout_seconds,
    )?;
    let engine = RemainingWorkEngine::new(client).with_batch_size(state.azure_devops.batch_size);

    engine
        .compute(work_item_id, &connection.teams_definition)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Work item {} not found", work_item_id)))
}

pub async fn list_snapshots(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(workspace_id): Path<Uuid>,
    Query(query): Query<SnapshotQuery>,
) -> ApiResult<Json<Vec<RemainingWorkSnapshot>>> {
    let work_item_id = positive_work_item_id(query.work_item_id)?;
    require_member(&state, &user, workspace_id).await?;

    Ok(Json(
        state
            .snapshots
            .list_for_work_item(workspace_id, work_item_id)
            .await?,
    ))
}
