use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::{claims::Identity, jwt::JwtKeys};
use crate::error::AppError;

/// Requires a valid session token and yields the caller's identity.
pub struct AuthUser(pub Identity);

/// Like [`AuthUser`], but a request without `Authorization` is anonymous.
/// A header that is present and invalid is still rejected.
pub struct MaybeAuthUser(pub Option<Identity>);

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let raw = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?
        .trim();
    // clients have sent both "Bearer <jwt>" and the bare token
    let token = raw
        .strip_prefix("Bearer ")
        .or_else(|| raw.strip_prefix("bearer "))
        .unwrap_or(raw)
        .trim();
    if token.is_empty() {
        return Err(AppError::Unauthorized("Unauthorized: No token provided".into()));
    }
    Ok(Some(token))
}

fn verify<S>(token: &str, state: &S) -> Result<Identity, AppError>
where
    JwtKeys: FromRef<S>,
{
    JwtKeys::from_ref(state).verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::Unauthorized("Invalid or expired token".into())
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::Unauthorized("Unauthorized: No token provided".into()))?;
        Ok(AuthUser(verify(token, state)?))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(MaybeAuthUser(Some(verify(token, state)?))),
            None => Ok(MaybeAuthUser(None)),
        }
    }
}
