use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, LoginRequest, LoginResponse, LoginUser, MessageResponse,
            ProtectedResponse, PublicUser, RegisterRequest, ResetPasswordRequest,
        },
        extractors::AuthUser,
        services,
    },
    error::AppResult,
    extract::AppJson,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/forgot-password", post(forgot_password))
        .route("/users/forgot-password/:token", patch(reset_password))
        .route("/users/protected", get(protected))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    let user = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, user) = services::login(&state, payload).await?;
    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
        user: LoginUser {
            id: user.id,
            name: user.first_name,
            email: user.email,
            role: user.role,
        },
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::request_password_reset(&state, payload, OffsetDateTime::now_utc()).await?;
    Ok(Json(MessageResponse {
        message: "Reset link sent to your email",
    }))
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::reset_password(&state, &token, &payload.password, OffsetDateTime::now_utc()).await?;
    Ok(Json(MessageResponse {
        message: "Password reset successful",
    }))
}

pub async fn protected(AuthUser(identity): AuthUser) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        message: "Protected route accessed",
        user: identity,
    })
}
