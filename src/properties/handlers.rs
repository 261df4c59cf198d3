use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser},
    config::AppConfig,
    error::AppResult,
    images::{read_form, MultipartForm},
    listing::ListQuery,
    ownership::parse_id,
    properties::{
        dto::PropertyListResponse,
        repo_types::Property,
        services,
    },
    state::AppState,
};

const PHOTO_FIELD: &str = "photos";

pub fn property_routes(cfg: &AppConfig) -> Router<AppState> {
    let uploads = &cfg.uploads;
    let body_limit = DefaultBodyLimit::max(uploads.body_limit(uploads.max_property_photos));
    Router::new()
        .route(
            "/api/properties",
            get(list_properties).post(create_property).layer(body_limit),
        )
        .route("/api/properties/user/properties", get(my_properties))
        .route(
            "/api/properties/:id",
            get(get_property)
                .put(update_property)
                .delete(delete_property)
                .layer(body_limit),
        )
}

async fn photo_form(state: &AppState, mp: Multipart) -> AppResult<MultipartForm> {
    let uploads = &state.config.uploads;
    read_form(mp, PHOTO_FIELD, uploads.max_property_photos, uploads.max_file_bytes).await
}

#[instrument(skip(state))]
pub async fn list_properties(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<PropertyListResponse>> {
    Ok(Json(services::list(&state, &query).await?))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn my_properties(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> AppResult<Json<Vec<Property>>> {
    Ok(Json(services::list_own(&state, &identity).await?))
}

#[instrument(skip(state))]
pub async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Property>> {
    let id = parse_id::<Property>(&id)?;
    Ok(Json(services::get(&state, id).await?))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn create_property(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    mp: Multipart,
) -> AppResult<(StatusCode, Json<Property>)> {
    let form = photo_form(&state, mp).await?;
    let property = services::create(&state, &identity, form).await?;
    Ok((StatusCode::CREATED, Json(property)))
}

#[instrument(skip_all, fields(user_id = %identity.user_id, property_id = %id))]
pub async fn update_property(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
    mp: Multipart,
) -> AppResult<Json<Property>> {
    let id = parse_id::<Property>(&id)?;
    let form = photo_form(&state, mp).await?;
    Ok(Json(services::update(&state, &identity, id, form).await?))
}

#[instrument(skip_all, fields(user_id = %identity.user_id, property_id = %id))]
pub async fn delete_property(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id::<Property>(&id)?;
    services::delete(&state, &identity, id).await?;
    Ok(Json(MessageResponse {
        message: "Property deleted successfully",
    }))
}
