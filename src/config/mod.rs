#[cfg(feature = "cli")]
pub mod cli;

use crate::adapters::azure_devops::{AzureDevOpsClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECONDS};
use crate::adapters::document_store::ContainerNames;
use crate::core::remaining_work::DEFAULT_BATCH_SIZE;
use crate::domain::model::TeamsDefinition;
use crate::domain::work_item::field_names;
use crate::utils::error::{Result, WorkerlyError};
use crate::utils::validation::{
    validate_date_window, validate_non_empty_string, validate_one_of, validate_path,
    validate_range, validate_socket_addr, validate_url, validate_work_item_id, Validate,
};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerlyConfig {
    #[serde(default)]
    pub azure_devops: AzureDevOpsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Service-level team mapping: team name to member identifiers.
    #[serde(default)]
    pub teams: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub tracker: Option<TrackerOptions>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureDevOpsConfig {
    /// Organizations of workspace connections live below this URL.
    pub base_url: String,
    /// Organization used by the service-level endpoints.
    pub organization_url: Option<String>,
    pub access_token: Option<String>,
    pub timeout_seconds: u64,
    pub batch_size: usize,
    pub reporting_info_field: String,
}

impl Default for AzureDevOpsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            organization_url: None,
            access_token: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            batch_size: DEFAULT_BATCH_SIZE,
            reporting_info_field: field_names::DEFAULT_REPORTING_INFO.to_string(),
        }
    }
}

fn configured(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.starts_with("${"))
}

impl AzureDevOpsConfig {
    /// Client for the service-level organization, `None` unless both the URL
    /// and the access token are set.
    pub fn service_client(&self) -> Result<Option<AzureDevOpsClient>> {
        match (configured(&self.organization_url), configured(&self.access_token)) {
            (Some(url), Some(token)) => Ok(Some(AzureDevOpsClient::with_organization_url(
                url,
                token,
                self.timeout_seconds,
            )?)),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub containers: ContainerNames,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            containers: ContainerNames::default(),
        }
    }
}

/// Work items the burndown job snapshots for one workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerOptions {
    pub workspace_id: Uuid,
    #[serde(default)]
    pub to_track_items: Vec<TrackedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub work_item_id: i64,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl TrackedItem {
    /// Whether `day` falls inside the inclusive tracking window.
    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.from <= day && day <= self.to
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl WorkerlyConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(WorkerlyError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// Loads `path` when given, otherwise the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| WorkerlyError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn teams_definition(&self) -> TeamsDefinition {
        let mut definition = TeamsDefinition::default();
        for (team, members) in &self.teams {
            definition.teams.insert(
                team.trim().to_string(),
                members
                    .iter()
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect(),
            );
        }
        definition
    }

    pub fn validate_config(&self) -> Result<()> {
        let ado = &self.azure_devops;
        validate_url("azure_devops.base_url", &ado.base_url)?;
        if let Some(url) = configured(&ado.organization_url) {
            validate_url("azure_devops.organization_url", url)?;
        }
        validate_range("azure_devops.timeout_seconds", ado.timeout_seconds, 1, 600)?;
        validate_range("azure_devops.batch_size", ado.batch_size, 1, DEFAULT_BATCH_SIZE)?;
        validate_non_empty_string("azure_devops.reporting_info_field", &ado.reporting_info_field)?;

        validate_path("storage.data_dir", &self.storage.data_dir)?;
        let containers = &self.storage.containers;
        for (field, name) in [
            ("storage.containers.users", &containers.users),
            ("storage.containers.workspaces", &containers.workspaces),
            ("storage.containers.memberships", &containers.memberships),
            ("storage.containers.workspace_configs", &containers.workspace_configs),
            ("storage.containers.snapshots", &containers.snapshots),
        ] {
            validate_non_empty_string(field, name)?;
        }

        self.teams_definition()
            .validate()
            .map_err(|e| WorkerlyError::ConfigValidationError {
                field: "teams".to_string(),
                message: e.to_string(),
            })?;

        if let Some(tracker) = &self.tracker {
            for item in &tracker.to_track_items {
                validate_work_item_id("tracker.to_track_items.work_item_id", item.work_item_id)?;
                validate_date_window("tracker.to_track_items", item.from, item.to)?;
            }
        }

        validate_socket_addr("server.bind_address", &self.server.bind_address)?;
        validate_one_of("logging.level", &self.logging.level, LOG_LEVELS)?;

        Ok(())
    }
}

impl Validate for WorkerlyConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
