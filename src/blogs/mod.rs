use crate::config::AppConfig;
use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router(cfg: &AppConfig) -> Router<AppState> {
    handlers::blog_routes(cfg)
}
