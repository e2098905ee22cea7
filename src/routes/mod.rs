//! HTTP route handlers

pub mod convert;
pub mod health;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_upload_bytes = state.config().render.max_upload_bytes();

    Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health_check))
        .route("/api/v1/health", get(health::health_check))
        .nest("/convert", convert::router(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
