use axum::{extract::DefaultBodyLimit, routing::post, Router};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

// API Routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/getsql",
        post(handlers::api::get_sql)
            .options(handlers::api::preflight)
            .fallback(handlers::api::method_not_allowed)
            // Prompts have no size limit
            .layer(DefaultBodyLimit::disable()),
    )
}
