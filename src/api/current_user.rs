//! Identity of the caller, forwarded by the authenticating proxy in front of the service.

use crate::api::error::ApiError;
use crate::domain::model::User;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-workerly-user-id";
pub const USER_EMAIL_HEADER: &str = "x-workerly-user-email";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_id = header(parts, USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("No authenticated user".to_string()))?;

        let id = Uuid::parse_str(raw_id)
            .ok()
            .filter(|id| !id.is_nil())
            .ok_or_else(|| {
                ApiError::BadRequest(format!("'{}' is not a valid user id", raw_id))
            })?;

        let email = header(parts, USER_EMAIL_HEADER).unwrap_or_default().to_string();
        tracing::debug!("Resolved current user {}", id);

        Ok(CurrentUser(User { id, email }))
    }
}
