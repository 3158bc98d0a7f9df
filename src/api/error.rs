// src/api/error.rs
// Error responses for the HTTP API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use tracing::error;

/// Standard API error response format
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
    pub error_code: Option<String>,
}

impl ApiError {
    fn new(status_code: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code,
            error_code: Some(code.to_string()),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Another operation holds the resource
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response_json = json!({
            "error": true,
            "message": self.message,
            "status": self.status_code.as_u16()
        });

        if let Some(error_code) = self.error_code {
            response_json["error_code"] = json!(error_code);
        }

        (self.status_code, Json(response_json)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Log the cause and hide it behind a generic 500
pub trait IntoApiError<T> {
    fn into_internal_error(self, message: &str) -> Result<T, ApiError>;
}

impl<T, E> IntoApiError<T> for Result<T, E>
where
    E: std::fmt::Debug,
{
    fn into_internal_error(self, message: &str) -> Result<T, ApiError> {
        self.map_err(|e| {
            error!("{}: {:?}", message, e);
            ApiError::internal(message)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_status_and_code() {
        let error = ApiError::conflict("sync running");
        assert_eq!(error.status_code, StatusCode::CONFLICT);
        assert_eq!(error.error_code.as_deref(), Some("CONFLICT"));
        assert_eq!(error.to_string(), "sync running");

        assert_eq!(ApiError::not_found("x").status_code, StatusCode::NOT_FOUND);
        assert_eq!(ApiError::bad_request("x").status_code, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_error_hides_cause() {
        let result: Result<(), &str> = Err("disk on fire");
        let error = result.into_internal_error("Failed to build response").unwrap_err();
        assert_eq!(error.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message, "Failed to build response");
    }

    #[test]
    fn response_has_json_status() {
        let response = ApiError::bad_request("empty prompt").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
