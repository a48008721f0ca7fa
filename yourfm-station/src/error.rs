//! Error types for yourfm-station

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::bumpers::BumperError;
use crate::catalog::CatalogError;
use crate::mixer::MixError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No usable Spotify token (401)
    #[error("Not authenticated with Spotify")]
    Unauthenticated,

    /// Required credentials missing from configuration (500)
    #[error("{0}")]
    NotConfigured(String),

    /// Third-party service failed (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// yourfm-common error
    #[error("Common error: {0}")]
    Common(#[from] yourfm_common::Error),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Unauthenticated => ApiError::Unauthenticated,
            CatalogError::NotFound(what) => ApiError::NotFound(what),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<MixError> for ApiError {
    fn from(err: MixError) -> Self {
        match err {
            MixError::Unauthenticated => ApiError::Unauthenticated,
            MixError::Catalog(inner) => inner.into(),
        }
    }
}

impl From<BumperError> for ApiError {
    fn from(err: BumperError) -> Self {
        match err {
            BumperError::NotConfigured(service) => {
                ApiError::NotConfigured(format!("{} API key not configured", service))
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "NOT_AUTHENTICATED",
                "Not authenticated with Spotify".to_string(),
            ),
            ApiError::NotConfigured(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "NOT_CONFIGURED", msg)
            }
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Unauthenticated.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::NotFound("station".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(BumperError::NotConfigured("Gemini")).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(CatalogError::Timeout).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_auth_errors_map_to_unauthenticated() {
        assert!(matches!(
            ApiError::from(CatalogError::Unauthenticated),
            ApiError::Unauthenticated
        ));
        assert!(matches!(
            ApiError::from(MixError::Unauthenticated),
            ApiError::Unauthenticated
        ));
    }
}
