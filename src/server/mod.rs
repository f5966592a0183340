//! HTTP serving gateway.
//!
//! Accepts concurrent requests, admits them through the shutdown
//! coordinator, and serializes all engine work through [`Gateway`].

mod error;
mod gateway;
mod handlers;
mod routes;
mod streaming;
pub mod types;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use gateway::{Gateway, GatewayError};
pub use handlers::AppState;
pub use routes::api_routes;
pub use streaming::{ndjson_response, NDJSON_CONTENT_TYPE};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Router with middleware, ready to serve.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `addr` until `shutdown` resolves, then stop accepting
/// connections and let open ones finish.
pub async fn serve<S>(addr: &str, state: Arc<AppState>, shutdown: S) -> Result<(), ServerError>
where
    S: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
        addr: addr.to_string(),
        source,
    })?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  POST   /api/generate - Text generation");
    tracing::info!("  POST   /api/chat     - Chat completion");
    tracing::info!("  GET    /api/tags     - List models");
    tracing::info!("  DELETE /api/delete   - Remove a model");
    tracing::info!("  GET    /api/health   - Health check");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
