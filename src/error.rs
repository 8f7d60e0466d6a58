use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::models::MessageResponse;
use crate::response::{build_response, ApiResponse};

/// Body of a 500 response
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct InternalErrorResponse {
    pub message: String,
    pub error: String,
}

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Every way a request can fail.
///
/// Operations return exactly one of these; anything unexpected (store failures
/// included) is folded into `Internal` so it still leaves as a well-formed
/// response.
#[derive(Debug)]
pub enum ApiError {
    /// Unsupported method or an unusable request body
    BadRequest(String),
    /// Unknown identifier or unmatched route
    NotFound(String),
    /// Create on an identifier that already exists
    Conflict(String),
    /// Store or other unexpected failure
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn unsupported_method() -> Self {
        ApiError::BadRequest("Unsupported method".to_string())
    }

    pub fn resource_not_found() -> Self {
        ApiError::NotFound("Resource not found".to_string())
    }

    pub fn item_not_found() -> Self {
        ApiError::NotFound("Item not found".to_string())
    }

    pub fn item_exists() -> Self {
        ApiError::Conflict("Item with this ID already exists".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_api_response(&self) -> ApiResponse {
        match self {
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message) => {
                build_response(self.status(), &MessageResponse::new(message.as_str()))
            }
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                build_response(
                    self.status(),
                    &InternalErrorResponse {
                        message: "Internal server error".to_string(),
                        error: format!("{:#}", err),
                    },
                )
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message) => write!(f, "{}", message),
            ApiError::Internal(err) => write!(f, "Internal server error: {:#}", err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.to_api_response().into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use serde_json::json;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::unsupported_method().status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::resource_not_found().status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::item_not_found().status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::item_exists().status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_errors_render_message_body() {
        let response = ApiError::item_exists().to_api_response();
        assert_eq!(response.status, StatusCode::CONFLICT);
        assert_eq!(
            response.json().unwrap(),
            json!({"message": "Item with this ID already exists"})
        );
    }

    #[test]
    fn test_internal_error_surfaces_cause() {
        let err: anyhow::Result<()> = Err(anyhow::anyhow!("connection reset"));
        let err = err.context("Failed to query items from Spanner").unwrap_err();

        let response = ApiError::from(err).to_api_response();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);

        let body: InternalErrorResponse = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body.message, "Internal server error");
        assert!(body.error.contains("Failed to query items from Spanner"));
        assert!(body.error.contains("connection reset"));
    }
}
