//! Route-boundary errors
//!
//! Only these four categories ever reach a caller. Each maps to one status
//! code and always renders a JSON body carrying the offending identifiers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::api::UpstreamError;
use crate::stream::InputError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    InvalidInput {
        message: String,
        context: Map<String, Value>,
    },

    #[error("{message}")]
    UpstreamUnreachable {
        message: String,
        timed_out: bool,
        context: Map<String, Value>,
    },

    #[error("{message}")]
    NoDataFound {
        message: String,
        context: Map<String, Value>,
    },

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ApiError::InvalidInput {
            message: message.into(),
            context: Map::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NoDataFound {
            message: message.into(),
            context: Map::new(),
        }
    }

    /// Terminal upstream failure on a route with no fallback
    pub fn from_upstream(err: UpstreamError) -> Self {
        if err.is_not_found() {
            return Self::not_found("Content not found");
        }
        ApiError::UpstreamUnreachable {
            timed_out: matches!(err, UpstreamError::Timeout),
            message: format!("Upstream service unavailable: {}", err),
            context: Map::new(),
        }
    }

    /// Attach an identifier to the error body
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        match &mut self {
            ApiError::InvalidInput { context, .. }
            | ApiError::UpstreamUnreachable { context, .. }
            | ApiError::NoDataFound { context, .. } => {
                context.insert(key.to_string(), value.into());
            }
            ApiError::MethodNotAllowed => {}
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            ApiError::UpstreamUnreachable {
                timed_out: true, ..
            } => StatusCode::GATEWAY_TIMEOUT,
            ApiError::UpstreamUnreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NoDataFound { .. } => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl From<InputError> for ApiError {
    fn from(err: InputError) -> Self {
        ApiError::invalid_input(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = Map::new();
        body.insert("error".to_string(), Value::String(self.to_string()));

        match self {
            ApiError::InvalidInput { context, .. }
            | ApiError::UpstreamUnreachable { context, .. }
            | ApiError::NoDataFound { context, .. } => {
                for (key, value) in context {
                    body.entry(key).or_insert(value);
                }
            }
            ApiError::MethodNotAllowed => {}
        }

        (status, Json(Value::Object(body))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::invalid_input("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            ApiError::from_upstream(UpstreamError::Timeout).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::from_upstream(UpstreamError::Server { status: 502 }).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from_upstream(UpstreamError::Rejected { status: 404 }).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_body_carries_context() {
        let response = ApiError::from(InputError::MissingEpisode)
            .with("anime_id", "666243")
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "episode number required");
        assert_eq!(body["anime_id"], "666243");
    }
}
