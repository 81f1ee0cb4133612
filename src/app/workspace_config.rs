use crate::adapters::document_store::{ContainerNames, DocumentStore};
use crate::domain::model::{
    SaveConnectionResult, SaveTeamsResult, TeamsDefinition, UserWorkspace, WorkspaceConnection,
};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::sync::Arc;
use uuid::Uuid;

/// Azure DevOps connection and team mapping of each workspace.
pub struct WorkspaceConfigService<S: Storage> {
    store: Arc<DocumentStore<S>>,
    configs: String,
    memberships: String,
}

impl<S: Storage> WorkspaceConfigService<S> {
    pub fn new(store: Arc<DocumentStore<S>>, containers: &ContainerNames) -> Self {
        Self {
            store,
            configs: containers.workspace_configs.clone(),
            memberships: containers.memberships.clone(),
        }
    }

    pub async fn get(&self, workspace_id: Uuid) -> Result<Option<WorkspaceConnection>> {
        let key = workspace_id.to_string();
        let connection = self.store.read(&self.configs, &key, &key).await?;
        if connection.is_none() {
            tracing::info!("No connection document for workspace {}.", workspace_id);
        }
        Ok(connection)
    }

    async fn membership(&self, user_id: Uuid, workspace_id: Uuid) -> Result<Option<UserWorkspace>> {
        let id = format!("{}:{}", user_id, workspace_id);
        self.store
            .read(&self.memberships, &workspace_id.to_string(), &id)
            .await
    }

    /// Applies `change` to the workspace's connection document (created empty
    /// when missing) atomically with respect to other writers.
    async fn modify<F>(&self, workspace_id: Uuid, change: F) -> Result<WorkspaceConnection>
    where
        F: FnOnce(&mut WorkspaceConnection) + Send,
    {
        let key = workspace_id.to_string();
        self.store
            .update(&self.configs, &key, &key, |current: Option<WorkspaceConnection>| {
                let mut connection =
                    current.unwrap_or_else(|| WorkspaceConnection::empty(workspace_id));
                change(&mut connection);
                connection
            })
            .await
    }

    pub async fn upsert_connection(
        &self,
        requester_id: Uuid,
        workspace_id: Uuid,
        organization: &str,
        personal_access_token: &str,
    ) -> SaveConnectionResult {
        tracing::info!("Saving connection for workspace {} by {}.", workspace_id, requester_id);

        if organization.trim().is_empty() || personal_access_token.trim().is_empty() {
            tracing::warn!(
                "Save connection invalid input. Organization or PAT empty. Workspace {}, user {}.",
                workspace_id,
                requester_id
            );
            return SaveConnectionResult::Invalid;
        }

        match self
            .try_upsert_connection(requester_id, workspace_id, organization, personal_access_token)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    "Failure saving connection for workspace {} by {}: {}",
                    workspace_id,
                    requester_id,
                    e
                );
                SaveConnectionResult::Error
            }
        }
    }

    async fn try_upsert_connection(
        &self,
        requester_id: Uuid,
        workspace_id: Uuid,
        organization: &str,
        personal_access_token: &str,
    ) -> Result<SaveConnectionResult> {
        let is_admin = self
            .membership(requester_id, workspace_id)
            .await?
            .is_some_and(|m| m.is_admin);
        if !is_admin {
            tracing::warn!(
                "Save connection forbidden. User {} is not admin of workspace {}.",
                requester_id,
                workspace_id
            );
            return Ok(SaveConnectionResult::Forbidden);
        }

        // An existing teams definition survives a connection change.
        let organization = organization.trim().to_string();
        let personal_access_token = personal_access_token.trim().to_string();
        self.modify(workspace_id, move |connection| {
            connection.organization = organization;
            connection.personal_access_token = personal_access_token;
        })
        .await?;

        tracing::info!("Connection saved for workspace {}.", workspace_id);
        Ok(SaveConnectionResult::Success)
    }

    pub async fn get_teams(&self, workspace_id: Uuid) -> Result<TeamsDefinition> {
        Ok(self
            .get(workspace_id)
            .await?
            .map(|c| c.teams_definition)
            .unwrap_or_default())
    }

    pub async fn save_teams(
        &self,
        requester_id: Uuid,
        workspace_id: Uuid,
        teams: TeamsDefinition,
    ) -> SaveTeamsResult {
        tracing::info!("Saving teams for workspace {} by user {}.", workspace_id, requester_id);

        match self.try_save_teams(requester_id, workspace_id, teams).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    "Failure saving teams for workspace {} by {}: {}",
                    workspace_id,
                    requester_id,
                    e
                );
                SaveTeamsResult::Error
            }
        }
    }

    async fn try_save_teams(
        &self,
        requester_id: Uuid,
        workspace_id: Uuid,
        teams: TeamsDefinition,
    ) -> Result<SaveTeamsResult> {
        if self.membership(requester_id, workspace_id).await?.is_none() {
            tracing::warn!(
                "Save teams forbidden: user {} is not a member of workspace {}.",
                requester_id,
                workspace_id
            );
            return Ok(SaveTeamsResult::Forbidden);
        }

        if let Err(e) = teams.validate() {
            tracing::warn!("Rejected teams for workspace {}: {}", workspace_id, e);
            return Ok(SaveTeamsResult::Invalid);
        }

        self.modify(workspace_id, move |connection| {
            connection.teams_definition = teams;
        })
        .await?;

        tracing::info!("Teams saved for workspace {}.", workspace_id);
        Ok(SaveTeamsResult::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::{LocalStorage, MemoryStorage};
    use crate::app::workspaces::WorkspaceService;
    use crate::domain::model::TeamRow;

    struct Fixture {
        config: WorkspaceConfigService<MemoryStorage>,
        workspaces: WorkspaceService<MemoryStorage>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(DocumentStore::new(MemoryStorage::new()));
        let containers = ContainerNames::default();
        Fixture {
            config: WorkspaceConfigService::new(Arc::clone(&store), &containers),
            workspaces: WorkspaceService::new(store, &containers),
        }
    }

    fn teams(rows: &[(&str, &str)]) -> TeamsDefinition {
        let rows: Vec<TeamRow> = rows
            .iter()
            .map(|(team, members)| TeamRow {
                team: team.to_string(),
                members_csv: Some(members.to_string()),
            })
            .collect();
        TeamsDefinition::from_rows(&rows)
    }

    #[tokio::test]
    async fn test_upsert_connection_requires_admin_and_input() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let workspace = f.workspaces.create("Team", owner).await.unwrap();

        assert_eq!(
            f.config.upsert_connection(owner, workspace, " ", "pat").await,
            SaveConnectionResult::Invalid
        );
        assert_eq!(
            f.config.upsert_connection(stranger, workspace, "contoso", "pat").await,
            SaveConnectionResult::Forbidden
        );
        assert_eq!(
            f.config.upsert_connection(owner, workspace, " contoso ", " pat ").await,
            SaveConnectionResult::Success
        );

        let connection = f.config.get(workspace).await.unwrap().unwrap();
        assert_eq!(connection.organization, "contoso");
        assert_eq!(connection.personal_access_token, "pat");
    }

    #[tokio::test]
    async fn test_connection_and_teams_do_not_overwrite_each_other() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let workspace = f.workspaces.create("Team", owner).await.unwrap();

        assert!(f.config.get_teams(workspace).await.unwrap().is_empty());
        assert_eq!(
            f.config
                .save_teams(owner, workspace, teams(&[("Platform", "jdoe")]))
                .await,
            SaveTeamsResult::Success
        );
        f.config.upsert_connection(owner, workspace, "contoso", "pat").await;

        let connection = f.config.get(workspace).await.unwrap().unwrap();
        assert!(connection.is_configured());
        assert_eq!(connection.teams_definition.team_for("JDOE"), Some("Platform"));

        f.config
            .save_teams(owner, workspace, teams(&[("Web", "bob")]))
            .await;
        let connection = f.config.get(workspace).await.unwrap().unwrap();
        assert_eq!(connection.organization, "contoso");
        assert_eq!(connection.teams_definition.team_for("jdoe"), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_connection_and_teams_saves_both_survive() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(DocumentStore::new(LocalStorage::new(temp_dir.path())));
        let containers = ContainerNames::default();
        let config = Arc::new(WorkspaceConfigService::new(Arc::clone(&store), &containers));
        let workspaces = WorkspaceService::new(store, &containers);
        let owner = Uuid::new_v4();

        for _ in 0..20 {
            let workspace = workspaces.create("Team", owner).await.unwrap();

            let connection_task = {
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    config.upsert_connection(owner, workspace, "contoso", "pat").await
                })
            };
            let teams_task = {
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    config
                        .save_teams(owner, workspace, teams(&[("Platform", "jdoe")]))
                        .await
                })
            };

            assert_eq!(connection_task.await.unwrap(), SaveConnectionResult::Success);
            assert_eq!(teams_task.await.unwrap(), SaveTeamsResult::Success);

            let connection = config.get(workspace).await.unwrap().unwrap();
            assert!(connection.is_configured());
            assert_eq!(connection.teams_definition.team_for("jdoe"), Some("Platform"));
        }
    }

    #[tokio::test]
    async fn test_save_teams_checks_membership_and_validity() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let workspace = f.workspaces.create("Team", owner).await.unwrap();

        assert_eq!(
            f.config
                .save_teams(Uuid::new_v4(), workspace, teams(&[("A", "x")]))
                .await,
            SaveTeamsResult::Forbidden
        );
        assert_eq!(
            f.config
                .save_teams(owner, workspace, teams(&[("A", "x"), ("B", "X")]))
                .await,
            SaveTeamsResult::Invalid
        );
        assert!(f.config.get(workspace).await.unwrap().is_none());
    }
}
