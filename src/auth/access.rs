use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{claims::Identity, extractors::AuthUser, jwt::JwtKeys, repo_types::Role};
use crate::error::{AppError, AppResult};

pub const CONTENT_ROLES: &[Role] = &[Role::ContentCreator, Role::Admin];

pub fn require_role(identity: &Identity, allowed: &[Role]) -> AppResult<()> {
    if allowed.contains(&identity.role) {
        return Ok(());
    }
    warn!(user_id = %identity.user_id, role = identity.role.as_str(), "role not allowed");
    Err(AppError::Forbidden(
        "Access denied. Only content creators can perform this action.".into(),
    ))
}

/// Authenticated caller holding a content-publishing role.
pub struct ContentCreator(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for ContentCreator
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;
        require_role(&identity, CONTENT_ROLES)?;
        Ok(ContentCreator(identity))
    }
}
