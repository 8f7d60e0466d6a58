use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Headers attached to every response, identical for all operations
pub const RESPONSE_HEADERS: [(&str, &str); 4] = [
    ("content-type", "application/json"),
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET, POST, PUT, DELETE, OPTIONS"),
    (
        "access-control-allow-headers",
        "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token",
    ),
];

/// Transport-level response: status, fixed headers, JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    /// Decode the body back into JSON
    #[cfg(test)]
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.body)
    }
}

/// Map a status code and payload to a response carrying the fixed header set
pub fn build_response<T: Serialize + ?Sized>(status: StatusCode, payload: &T) -> ApiResponse {
    match serde_json::to_string(payload) {
        Ok(body) => ApiResponse { status, body },
        Err(err) => {
            tracing::error!("Failed to encode response body: {}", err);
            ApiResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: r#"{"message":"Internal server error"}"#.to_string(),
            }
        }
    }
}

/// Answer to a CORS preflight; no body
pub fn preflight_response() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    apply_headers(&mut response);
    response.headers_mut().remove(header::CONTENT_TYPE);
    response
}

fn apply_headers(response: &mut Response) {
    let headers = response.headers_mut();
    for (name, value) in RESPONSE_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        apply_headers(&mut response);
        response
    }
}
