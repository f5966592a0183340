//! API error envelope.
//!
//! Every per-request failure is converted here into a status code plus a
//! `{"error": "..."}` body; none of them reach the server loop.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use super::gateway::GatewayError;
use super::types::ErrorResponse;
use crate::engine::EngineError;
use crate::models::ResolveError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing request fields.
    #[error("{0}")]
    Input(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Native engine failure, or a precondition refused by the context.
    #[error("{0}")]
    Engine(String),

    #[error("{0}")]
    Internal(String),

    #[error("server is shutting down")]
    Unavailable,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Input(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Engine(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Engine(_) => "engine",
            Self::Internal(_) => "internal",
            Self::Unavailable => "unavailable",
        }
    }

    /// Map a gateway failure during generation. Engine failures are prefixed
    /// the same way for both the full-text and the streaming path.
    pub fn from_generation(err: GatewayError) -> Self {
        match err {
            GatewayError::Engine(e) if !e.is_input() => {
                Self::Engine(format!("generation failed: {}", e))
            }
            other => other.into(),
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        let message = err.to_string();
        if err.is_not_found() {
            return Self::NotFound(message);
        }
        match err {
            ResolveError::Conflict(_) => Self::Conflict(message),
            ResolveError::InvalidName(_) => Self::Input(message),
            _ => Self::Internal(message),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        if err.is_input() {
            Self::Input(err.to_string())
        } else {
            Self::Engine(err.to_string())
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Resolve(e) => e.into(),
            GatewayError::Engine(e) => e.into(),
            err @ GatewayError::Load { .. } => Self::Engine(err.to_string()),
            GatewayError::Worker(msg) => Self::Internal(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Input(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::{BridgeError, NativeStatus};
    use std::path::PathBuf;

    #[test]
    fn test_resolve_errors_map_to_status() {
        let e: ApiError = ResolveError::UnknownModel("x".into()).into();
        assert_eq!(e.status(), StatusCode::NOT_FOUND);

        let e: ApiError = ResolveError::MissingFile(PathBuf::from("/x")).into();
        assert_eq!(e.status(), StatusCode::NOT_FOUND);

        let e: ApiError = ResolveError::Conflict("x".into()).into();
        assert_eq!(e.status(), StatusCode::CONFLICT);

        let e: ApiError = ResolveError::InvalidName("../x".into()).into();
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_engine_errors_are_500_except_bad_options() {
        let e: ApiError = EngineError::NotLoaded.into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let native = BridgeError::new(NativeStatus::Generate, "boom");
        let e = ApiError::from_generation(GatewayError::Engine(native.into()));
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.to_string(), "generation failed: generate error: boom");

        let e = ApiError::from_generation(GatewayError::Engine(EngineError::InvalidOptions(
            "top_p".into(),
        )));
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
    }
}
