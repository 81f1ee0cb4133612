use crate::adapters::document_store::{ContainerNames, DocumentStore};
use crate::domain::model::User;
use crate::domain::ports::Storage;
use crate::utils::error::{Result, WorkerlyError};
use std::sync::Arc;
use uuid::Uuid;

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct UserService<S: Storage> {
    store: Arc<DocumentStore<S>>,
    container: String,
}

impl<S: Storage> Clone for UserService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            container: self.container.clone(),
        }
    }
}

impl<S: Storage> UserService<S> {
    pub fn new(store: Arc<DocumentStore<S>>, containers: &ContainerNames) -> Self {
        Self {
            store,
            container: containers.users.clone(),
        }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let key = id.to_string();
        let user = self.store.read(&self.container, &key, &key).await?;
        if user.is_some() {
            tracing::debug!("Found user {}", id);
        } else {
            tracing::info!("User {} not found.", id);
        }
        Ok(user)
    }

    /// Records `user` on first sight. Existing users are left as they are.
    pub async fn ensure_exists(&self, mut user: User) -> Result<()> {
        if user.id.is_nil() {
            tracing::warn!("ensure_exists called with an empty id. Skipping creation.");
            return Ok(());
        }

        user.email = normalize_email(&user.email);

        if self.get_by_id(user.id).await?.is_some() {
            tracing::debug!("User {} already exists. No action taken.", user.id);
            return Ok(());
        }

        let key = user.id.to_string();
        match self.store.create(&self.container, &key, &key, &user).await {
            Ok(()) => {
                tracing::info!("Created user {}", user.id);
                Ok(())
            }
            Err(WorkerlyError::DocumentConflict { .. }) => {
                tracing::warn!("Conflict creating user {} ('{}').", user.id, user.email);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Ok(None);
        }

        let mut users: Vec<User> = self
            .store
            .query_container(&self.container, |u: &User| normalize_email(&u.email) == email)
            .await?;
        users.sort_by_key(|u| u.id);
        Ok(users.into_iter().next())
    }
}
