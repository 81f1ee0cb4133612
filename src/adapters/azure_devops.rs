use crate::domain::model::WorkspaceConnection;
use crate::domain::ports::WorkItemSource;
use crate::domain::work_item::WorkItem;
use crate::utils::error::{Result, WorkerlyError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://dev.azure.com";
pub const API_VERSION: &str = "7.1";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct WorkItemBatch {
    #[serde(default)]
    value: Vec<Option<WorkItem>>,
}

/// Work item tracking client for one Azure DevOps organization.
#[derive(Debug, Clone)]
pub struct AzureDevOpsClient {
    client: Client,
    organization_url: String,
    personal_access_token: String,
}

impl AzureDevOpsClient {
    pub fn with_organization_url(
        organization_url: impl Into<String>,
        personal_access_token: impl Into<String>,
        timeout_seconds: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            organization_url: organization_url.into().trim_end_matches('/').to_string(),
            personal_access_token: personal_access_token.into(),
        })
    }

    /// Client for a workspace connection, `{base_url}/{organization}`.
    pub fn for_connection(
        base_url: &str,
        connection: &WorkspaceConnection,
        timeout_seconds: u64,
    ) -> Result<Self> {
        if !connection.is_configured() {
            return Err(WorkerlyError::MissingConfigError {
                field: format!("workspace {} connection", connection.workspace_id),
            });
        }

        let organization_url = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            connection.organization.trim()
        );
        Self::with_organization_url(
            organization_url,
            connection.personal_access_token.trim(),
            timeout_seconds,
        )
    }

    pub fn organization_url(&self) -> &str {
        &self.organization_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth("", Some(&self.personal_access_token))
    }

    async fn error_from(response: Response) -> WorkerlyError {
        let status = response.status().as_u16();
        let mut message = response.text().await.unwrap_or_default();
        if message.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !message.is_char_boundary(cut) {
                cut -= 1;
            }
            message.truncate(cut);
        }
        WorkerlyError::AzureDevOpsError { status, message }
    }
}

#[async_trait]
impl WorkItemSource for AzureDevOpsClient {
    async fn get_work_item(&self, id: i64, fields: &[&str]) -> Result<Option<WorkItem>> {
        let url = format!("{}/_apis/wit/workitems/{}", self.organization_url, id);
        let mut request = self
            .authorize(self.client.get(&url))
            .query(&[("api-version", API_VERSION)]);
        if !fields.is_empty() {
            request = request.query(&[("fields", fields.join(","))]);
        }

        tracing::debug!("📡 GET work item {} from {}", id, self.organization_url);
        let response = request.send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(Some(response.json::<WorkItem>().await?))
    }

    async fn get_work_items(&self, ids: &[i64]) -> Result<Vec<WorkItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/_apis/wit/workitemsbatch", self.organization_url);
        let body = json!({
            "ids": ids,
            "$expand": "Relations",
            "errorPolicy": "Omit",
        });

        tracing::debug!("📡 POST batch of {} work items to {}", ids.len(), self.organization_url);
        let response = self
            .authorize(self.client.post(&url))
            .query(&[("api-version", API_VERSION)])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let batch: WorkItemBatch = response.json().await?;
        Ok(batch.value.into_iter().flatten().collect())
    }
}
