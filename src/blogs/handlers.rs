use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        access::ContentCreator,
        dto::MessageResponse,
        extractors::{AuthUser, MaybeAuthUser},
    },
    blogs::{
        dto::{BlogChanges, BlogListResponse, BlogResponse, ViewsResponse},
        repo_types::{Blog, LikeState},
        services,
    },
    config::AppConfig,
    error::AppResult,
    extract::AppJson,
    images::read_form,
    listing::ListQuery,
    ownership::parse_id,
    state::AppState,
};

const COVER_FIELD: &str = "coverImage";

pub fn blog_routes(cfg: &AppConfig) -> Router<AppState> {
    let body_limit = DefaultBodyLimit::max(cfg.uploads.body_limit(1));
    Router::new()
        .route(
            "/api/blogs",
            get(list_blogs).post(create_blog).layer(body_limit),
        )
        .route(
            "/api/blogs/:id",
            get(get_blog).put(update_blog).delete(delete_blog),
        )
        .route("/api/blogs/:id/view", post(record_view))
        .route("/api/blogs/:id/like", post(toggle_like))
}

#[instrument(skip(state))]
pub async fn list_blogs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<BlogListResponse>> {
    Ok(Json(services::list(&state, &query).await?))
}

#[instrument(skip(state))]
pub async fn get_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<BlogResponse>> {
    let id = parse_id::<Blog>(&id)?;
    Ok(Json(services::get(&state, id).await?))
}

#[instrument(skip_all, fields(user_id = %identity.user_id))]
pub async fn create_blog(
    State(state): State<AppState>,
    ContentCreator(identity): ContentCreator,
    mp: Multipart,
) -> AppResult<(StatusCode, Json<BlogResponse>)> {
    let form = read_form(mp, COVER_FIELD, 1, state.config.uploads.max_file_bytes).await?;
    let blog = services::create(&state, &identity, form).await?;
    Ok((StatusCode::CREATED, Json(blog)))
}

#[instrument(skip_all, fields(user_id = %identity.user_id, blog_id = %id))]
pub async fn update_blog(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
    AppJson(changes): AppJson<BlogChanges>,
) -> AppResult<Json<BlogResponse>> {
    let id = parse_id::<Blog>(&id)?;
    Ok(Json(services::update(&state, &identity, id, changes).await?))
}

#[instrument(skip_all, fields(user_id = %identity.user_id, blog_id = %id))]
pub async fn delete_blog(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id::<Blog>(&id)?;
    services::delete(&state, &identity, id).await?;
    Ok(Json(MessageResponse {
        message: "Blog deleted successfully",
    }))
}

#[instrument(skip(state))]
pub async fn record_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ViewsResponse>> {
    let id = parse_id::<Blog>(&id)?;
    let views = services::record_view(&state, id).await?;
    Ok(Json(ViewsResponse { views }))
}

#[instrument(skip_all, fields(blog_id = %id))]
pub async fn toggle_like(
    State(state): State<AppState>,
    MaybeAuthUser(identity): MaybeAuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<LikeState>> {
    let id = parse_id::<Blog>(&id)?;
    Ok(Json(services::toggle_like(&state, identity.as_ref(), id).await?))
}
