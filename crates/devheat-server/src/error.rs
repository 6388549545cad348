//! Server error types and their HTTP mapping.

use std::io;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use devheat_providers::{ProviderError, ProviderErrorCode};
use serde_json::json;
use thiserror::Error;

use crate::aggregator::AggregateError;
use crate::config::ConfigError;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (bind, accept, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A provider could not be constructed.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Logging could not be initialized.
    #[error("Tracing error: {0}")]
    Tracing(#[from] devheat_core::TracingError),
}

/// Returns the HTTP status for a provider failure class.
pub fn status_for(code: ProviderErrorCode) -> StatusCode {
    match code {
        ProviderErrorCode::NotFound | ProviderErrorCode::InvalidResponse => StatusCode::NOT_FOUND,
        ProviderErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ProviderErrorCode::Timeout | ProviderErrorCode::NetworkError => StatusCode::GATEWAY_TIMEOUT,
        ProviderErrorCode::ServerError | ProviderErrorCode::ConfigurationError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        ProviderErrorCode::BadRequest => StatusCode::BAD_REQUEST,
    }
}

/// An error returned to HTTP clients as `{"error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// A provider failed with nothing cached.
    Provider(ProviderError),
    /// The heatmap could not be built.
    Aggregate(AggregateError),
    /// No route matched.
    NotFound,
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        Self::Provider(e)
    }
}

impl From<AggregateError> for ApiError {
    fn from(e: AggregateError) -> Self {
        Self::Aggregate(e)
    }
}

impl ApiError {
    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Provider(e) => status_for(e.code()),
            Self::Aggregate(AggregateError::AllProvidersFailed { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Aggregate(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Provider(e) => json!({ "error": e.user_message() }),
            Self::Aggregate(AggregateError::AllProvidersFailed { github, leetcode }) => json!({
                "error": "Failed to fetch data from all providers",
                "details": { "github": github, "leetcode": leetcode },
            }),
            Self::Aggregate(e) => json!({ "error": e.to_string() }),
            Self::NotFound => json!({ "error": "Not found" }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devheat_core::ProviderKind;

    #[test]
    fn provider_status_mapping() {
        assert_eq!(status_for(ProviderErrorCode::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ProviderErrorCode::InvalidResponse), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ProviderErrorCode::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(status_for(ProviderErrorCode::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for(ProviderErrorCode::NetworkError), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for(ProviderErrorCode::ServerError), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status_for(ProviderErrorCode::ConfigurationError),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_for(ProviderErrorCode::BadRequest), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn aggregate_status_mapping() {
        assert_eq!(
            ApiError::from(AggregateError::MissingIdentity).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AggregateError::AllProvidersFailed {
                github: "a".to_string(),
                leetcode: "b".to_string(),
            })
            .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn provider_error_uses_user_message() {
        let err = ApiError::from(
            ProviderError::rate_limited("upstream returned HTTP 403")
                .with_provider(ProviderKind::GitHub),
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn server_error_display() {
        let err = ServerError::from(io::Error::new(io::ErrorKind::AddrInUse, "address in use"));
        insta::assert_snapshot!(err.to_string(), @"IO error: address in use");
    }
}
