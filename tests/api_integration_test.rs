#![cfg(feature = "server")]

mod common;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use httpmock::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;
use workerly::api::current_user::{USER_EMAIL_HEADER, USER_ID_HEADER};
use workerly::api::{create_router, AppState};
use workerly::WorkerlyConfig;

struct Caller {
    id: String,
    email: String,
}

impl Caller {
    fn new(email: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
        }
    }
}

fn test_config(temp_dir: &TempDir, server: &MockServer, with_token: bool) -> WorkerlyConfig {
    let mut config = WorkerlyConfig::default();
    config.storage.data_dir = temp_dir.path().display().to_string();
    config.azure_devops.base_url = server.base_url();
    config.azure_devops.organization_url = Some(server.url("/contoso"));
    if with_token {
        config.azure_devops.access_token = Some("pat".to_string());
    }
    config
        .teams
        .insert("Platform".to_string(), vec!["jdoe".to_string()]);
    config
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    caller: Option<&Caller>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder
            .header(USER_ID_HEADER, &caller.id)
            .header(USER_EMAIL_HEADER, &caller.email);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

#[tokio::test]
async fn test_health_and_identity() -> Result<()> {
    let server = MockServer::start();
    let temp_dir = TempDir::new()?;
    let app = create_router(AppState::from_config(&test_config(&temp_dir, &server, true))?);

    let (status, body) = send(&app, Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, Method::GET, "/api/workspaces", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    let bogus = Caller {
        id: "not-a-uuid".to_string(),
        email: String::new(),
    };
    let (status, _) = send(&app, Method::GET, "/api/workspaces", Some(&bogus), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let nil = Caller {
        id: Uuid::nil().to_string(),
        email: String::new(),
    };
    let (status, _) = send(&app, Method::GET, "/api/workspaces", Some(&nil), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_service_level_reports() -> Result<()> {
    let server = MockServer::start();
    common::mock_hierarchy(&server, "/contoso");
    let temp_dir = TempDir::new()?;
    let app = create_router(AppState::from_config(&test_config(&temp_dir, &server, true))?);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/work-items/100/remaining-work",
        None,
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 100);
    assert_eq!(body["title"], "Release 1");
    assert_eq!(body["report"][0]["team"], "PLATFORM");
    assert_eq!(body["report"][0]["remainingWork"]["functionality"], 3.0);
    assert_eq!(body["report"][1]["team"], "UNKNOWN TEAM ON ASMITH");
    assert_eq!(body["report"][1]["remainingWork"]["other"], 2.0);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/work-items/999/remaining-work",
        None,
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/work-items/0/remaining-work",
        None,
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_service_level_reports_need_a_token() -> Result<()> {
    let server = MockServer::start();
    let temp_dir = TempDir::new()?;
    let app = create_router(AppState::from_config(&test_config(&temp_dir, &server, false))?);

    for uri in [
        "/api/work-items/100/remaining-work",
        "/api/work-items/100/reporting-info",
    ] {
        let (status, body) = send(&app, Method::GET, uri, None, None).await?;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], 503);
    }
    Ok(())
}

#[tokio::test]
async fn test_workspace_lifecycle() -> Result<()> {
    let server = MockServer::start();
    common::mock_hierarchy(&server, "/contoso");
    let temp_dir = TempDir::new()?;
    let app = create_router(AppState::from_config(&test_config(&temp_dir, &server, false))?);

    let owner = Caller::new("owner@contoso.com");
    let member = Caller::new("Bob@Contoso.com");
    let outsider = Caller::new("eve@contoso.com");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/workspaces",
        Some(&owner),
        Some(json!({"name": "   "})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/workspaces",
        Some(&owner),
        Some(json!({"name": "Delivery"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let workspace_id = body["id"].as_str().unwrap_or_default().to_string();
    let base = format!("/api/workspaces/{}", workspace_id);

    let (status, body) = send(&app, Method::GET, "/api/workspaces", Some(&owner), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Delivery");
    assert_eq!(body[0]["isSelected"], true);

    // Registers the member's email.
    let (status, body) = send(&app, Method::GET, "/api/workspaces", Some(&member), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let invitations = format!("{}/invitations", base);
    let (status, _) = send(
        &app,
        Method::POST,
        &invitations,
        Some(&owner),
        Some(json!({"email": " bob@contoso.com "})),
    )
    .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::POST,
        &invitations,
        Some(&owner),
        Some(json!({"email": "bob@contoso.com"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        &invitations,
        Some(&owner),
        Some(json!({"email": "nobody@contoso.com"})),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        &invitations,
        Some(&member),
        Some(json!({"email": "owner@contoso.com"})),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, "/api/workspaces", Some(&member), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["isSelected"], false);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("{}/select", base),
        Some(&member),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("{}/select", base),
        Some(&outsider),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let teams = format!("{}/teams", base);
    let (status, _) = send(&app, Method::GET, &teams, Some(&outsider), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::PUT,
        &teams,
        Some(&owner),
        Some(json!([{"team": "Platform", "membersCsv": "jdoe"}])),
    )
    .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::GET, &teams, Some(&member), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"team": "PLATFORM", "membersCsv": "jdoe"}]));

    let remaining_work = format!("{}/remaining-work", base);
    let (status, _) = send(
        &app,
        Method::POST,
        &remaining_work,
        Some(&owner),
        Some(json!({"workItemId": 100})),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        &remaining_work,
        Some(&owner),
        Some(json!({"workItemId": 0})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let connection = format!("{}/connection", base);
    let (status, _) = send(
        &app,
        Method::PUT,
        &connection,
        Some(&member),
        Some(json!({"organization": "contoso", "personalAccessToken": "pat"})),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::PUT,
        &connection,
        Some(&owner),
        Some(json!({"organization": "contoso"})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::PUT,
        &connection,
        Some(&owner),
        Some(json!({"organization": "contoso", "personalAccessToken": "pat"})),
    )
    .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        Method::POST,
        &remaining_work,
        Some(&member),
        Some(json!({"workItemId": 100})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Release 1");
    assert_eq!(body["report"][0]["team"], "PLATFORM");

    let (status, _) = send(
        &app,
        Method::POST,
        &remaining_work,
        Some(&member),
        Some(json!({"workItemId": 999})),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("{}/snapshots?workItemId=100", base),
        Some(&member),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    Ok(())
}
