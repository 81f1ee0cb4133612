use crate::adapters::document_store::{ContainerNames, DocumentStore};
use crate::app::users::{normalize_email, UserService};
use crate::domain::model::{InviteUserResult, UserWorkspace, Workspace, WorkspaceListItem};
use crate::domain::ports::Storage;
use crate::utils::error::{Result, WorkerlyError};
use futures::future::try_join_all;
use std::sync::Arc;
use uuid::Uuid;

pub struct WorkspaceService<S: Storage> {
    store: Arc<DocumentStore<S>>,
    users: UserService<S>,
    workspaces: String,
    memberships: String,
}

impl<S: Storage> WorkspaceService<S> {
    pub fn new(store: Arc<DocumentStore<S>>, containers: &ContainerNames) -> Self {
        Self {
            users: UserService::new(Arc::clone(&store), containers),
            store,
            workspaces: containers.workspaces.clone(),
            memberships: containers.memberships.clone(),
        }
    }

    async fn memberships_of(&self, user_id: Uuid) -> Result<Vec<UserWorkspace>> {
        self.store
            .query_container(&self.memberships, |m: &UserWorkspace| m.user_id == user_id)
            .await
    }

    pub async fn membership(&self, user_id: Uuid, workspace_id: Uuid) -> Result<Option<UserWorkspace>> {
        let id = format!("{}:{}", user_id, workspace_id);
        self.store
            .read(&self.memberships, &workspace_id.to_string(), &id)
            .await
    }

    pub async fn is_member(&self, user_id: Uuid, workspace_id: Uuid) -> Result<bool> {
        Ok(self.membership(user_id, workspace_id).await?.is_some())
    }

    pub async fn get(&self, workspace_id: Uuid) -> Result<Option<Workspace>> {
        let key = workspace_id.to_string();
        self.store.read(&self.workspaces, &key, &key).await
    }

    /// Workspaces the user belongs to, the selected one first, then by name.
    pub async fn get_for_user(&self, user_id: Uuid) -> Result<Vec<WorkspaceListItem>> {
        tracing::info!("Loading workspaces for user {}.", user_id);

        let memberships = self.memberships_of(user_id).await?;
        if memberships.is_empty() {
            tracing::info!("No workspace memberships found for user {}.", user_id);
            return Ok(Vec::new());
        }

        let workspaces = try_join_all(memberships.iter().map(|m| async move {
            let workspace = self.get(m.workspace_id).await?;
            if workspace.is_none() {
                tracing::warn!("Workspace {} not found for user {}.", m.workspace_id, user_id);
            }
            Ok::<_, WorkerlyError>(workspace.map(|w| WorkspaceListItem {
                id: w.id,
                name: w.name,
                is_selected: m.is_selected,
            }))
        }))
        .await?;

        let mut items: Vec<WorkspaceListItem> = workspaces.into_iter().flatten().collect();
        items.sort_by(|a, b| {
            b.is_selected
                .cmp(&a.is_selected)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        Ok(items)
    }

    /// Marks `workspace_id` as the user's only selected workspace.
    pub async fn set_selected(&self, user_id: Uuid, workspace_id: Uuid) -> Result<()> {
        tracing::info!("Setting selected workspace {} for user {}.", workspace_id, user_id);

        let mut updated = 0;
        for mut membership in self.memberships_of(user_id).await? {
            let is_selected = membership.workspace_id == workspace_id;
            if membership.is_selected == is_selected {
                continue;
            }

            membership.is_selected = is_selected;
            self.store
                .upsert(
                    &self.memberships,
                    &membership.workspace_id.to_string(),
                    &membership.id(),
                    &membership,
                )
                .await?;
            updated += 1;
        }

        tracing::info!(
            "Updated selection for {} memberships (user {}, workspace {}).",
            updated,
            user_id,
            workspace_id
        );
        Ok(())
    }

    /// Creates a workspace owned and selected by `owner_id`.
    pub async fn create(&self, name: &str, owner_id: Uuid) -> Result<Uuid> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkerlyError::ValidationError {
                message: "Workspace name cannot be empty".to_string(),
            });
        }

        let workspace = Workspace {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        let key = workspace.id.to_string();
        tracing::info!(
            "Creating workspace {} ('{}') for user {}.",
            workspace.id,
            workspace.name,
            owner_id
        );
        self.store.create(&self.workspaces, &key, &key, &workspace).await?;

        let membership = UserWorkspace {
            user_id: owner_id,
            workspace_id: workspace.id,
            is_admin: true,
            is_selected: true,
        };
        self.store
            .create(&self.memberships, &key, &membership.id(), &membership)
            .await?;

        self.set_selected(owner_id, workspace.id).await?;
        tracing::info!("Workspace {} created and selected for user {}.", workspace.id, owner_id);

        Ok(workspace.id)
    }

    /// Adds the user registered under `email` to the workspace as a regular member.
    pub async fn invite_user_by_email(
        &self,
        inviter_id: Uuid,
        workspace_id: Uuid,
        email: &str,
    ) -> InviteUserResult {
        match self.try_invite(inviter_id, workspace_id, email).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    "Failed to invite '{}' to workspace {} by {}: {}",
                    email,
                    workspace_id,
                    inviter_id,
                    e
                );
                InviteUserResult::Error
            }
        }
    }

    async fn try_invite(
        &self,
        inviter_id: Uuid,
        workspace_id: Uuid,
        email: &str,
    ) -> Result<InviteUserResult> {
        let is_admin = self
            .membership(inviter_id, workspace_id)
            .await?
            .is_some_and(|m| m.is_admin);
        if !is_admin {
            tracing::warn!(
                "Invite forbidden. User {} is not admin of workspace {}.",
                inviter_id,
                workspace_id
            );
            return Ok(InviteUserResult::Forbidden);
        }

        let email = normalize_email(email);
        let Some(invitee) = self.users.find_by_email(&email).await? else {
            tracing::info!("No user registered with email '{}'.", email);
            return Ok(InviteUserResult::UserNotFound);
        };

        if self.is_member(invitee.id, workspace_id).await? {
            return Ok(InviteUserResult::AlreadyMember);
        }

        let membership = UserWorkspace {
            user_id: invitee.id,
            workspace_id,
            is_admin: false,
            is_selected: false,
        };
        match self
            .store
            .create(
                &self.memberships,
                &workspace_id.to_string(),
                &membership.id(),
                &membership,
            )
            .await
        {
            Ok(()) => {
                tracing::info!("User {} invited to workspace {}.", invitee.id, workspace_id);
                Ok(InviteUserResult::Success)
            }
            Err(WorkerlyError::DocumentConflict { .. }) => Ok(InviteUserResult::AlreadyMember),
            Err(e) => Err(e),
        }
    }
}
