//! Route definitions.

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;

use super::handlers::{self, AppState};

/// The `/api` surface.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/generate", post(handlers::generate))
        .route("/api/chat", post(handlers::chat))
        .route("/api/tags", get(handlers::tags))
        .route("/api/delete", delete(handlers::delete))
        .route("/api/health", get(handlers::health))
}
