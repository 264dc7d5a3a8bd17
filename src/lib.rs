pub mod config;
pub mod credential;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod portal_id;
pub mod sqlite_store;
pub mod store;
pub mod util;

use axum::{
    http::{header, HeaderName, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use store::PortalStore;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PortalStore>,
    pub public_base_url: String,
    pub http: reqwest::Client,
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/portal",
            post(handlers::portal::save_portal).get(handlers::portal::load_portal),
        )
        .route("/api/upload", post(handlers::upload::upload))
        .route("/api/music_search", get(handlers::music::music_search))
        .route("/files/{key}", get(handlers::files::serve_object))
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health_check))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(handlers::stats::get_stats))
        .layer(axum_middleware::from_fn(
            middleware::admin_auth::require_admin_token,
        ))
}

/// Share links get embedded anywhere, so the CORS policy is a fixed
/// wildcard rather than a configured origin list.
fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-portal-password"),
        ])
}

/// Build the full application router (used by main and tests).
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(api_routes())
        .merge(health_routes())
        .merge(admin_routes())
        .layer(build_cors())
        .with_state(state)
}
