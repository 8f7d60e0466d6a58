//! HTTP adapters for the items API.
//!
//! Each handler only translates the axum request into an `InboundRequest`;
//! all routing decisions and response shaping live in the dispatcher.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection},
        Path, State,
    },
    http::{Method, Uri},
    response::Response,
};

use crate::dispatcher::InboundRequest;
use crate::error::{ApiError, InternalErrorResponse};
use crate::models::MessageResponse;
use crate::response::{preflight_response, ApiResponse};
use crate::routes;
use crate::state::AppState;

/// Extractor rejections are client errors and get the same JSON + CORS shape as the rest
fn rejected(reason: String) -> ApiError {
    ApiError::BadRequest(reason)
}

fn item_request(
    method: Method,
    id: Result<Path<String>, PathRejection>,
) -> Result<InboundRequest, ApiError> {
    let Path(id) = id.map_err(|rejection| rejected(rejection.body_text()))?;
    Ok(InboundRequest::new(method, routes::ITEM).with_id(id))
}

fn body_text(body: Result<Bytes, BytesRejection>) -> Result<Option<String>, ApiError> {
    let body = body.map_err(|rejection| rejected(rejection.body_text()))?;
    if body.is_empty() {
        return Ok(None);
    }
    String::from_utf8(body.to_vec())
        .map(Some)
        .map_err(|_| rejected("Request body must be valid UTF-8".to_string()))
}

fn attach_body(
    request: Result<InboundRequest, ApiError>,
    body: Result<Bytes, BytesRejection>,
) -> Result<InboundRequest, ApiError> {
    let request = request?;
    Ok(InboundRequest {
        body: body_text(body)?,
        ..request
    })
}

async fn forward(state: &AppState, request: Result<InboundRequest, ApiError>) -> ApiResponse {
    match request {
        Ok(request) => state.dispatcher.dispatch(request).await,
        Err(err) => {
            tracing::info!("Rejected request before dispatch: {}", err);
            err.to_api_response()
        }
    }
}

/// GET /items handler - List every item
#[utoipa::path(
    get,
    path = routes::ITEMS,
    responses(
        (status = 200, description = "All stored items, unordered", body = Vec<serde_json::Value>),
        (status = 500, description = "Store error", body = InternalErrorResponse)
    ),
    tag = "items"
)]
pub async fn list_items(State(state): State<AppState>) -> ApiResponse {
    state
        .dispatcher
        .dispatch(InboundRequest::new(Method::GET, routes::ITEMS))
        .await
}

/// POST /items handler - Create an item
#[utoipa::path(
    post,
    path = routes::ITEMS,
    request_body = serde_json::Value,
    responses(
        (status = 201, description = "Item created, with its id and createdAt", body = serde_json::Value),
        (status = 400, description = "Body is not a JSON object", body = MessageResponse),
        (status = 409, description = "An item with this id already exists", body = MessageResponse),
        (status = 500, description = "Store error", body = InternalErrorResponse)
    ),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResponse {
    let request = attach_body(Ok(InboundRequest::new(Method::POST, routes::ITEMS)), body);
    forward(&state, request).await
}

/// GET /items/{id} handler - Fetch one item
#[utoipa::path(
    get,
    path = routes::ITEM,
    params(
        ("id" = String, Path, description = "Item identifier")
    ),
    responses(
        (status = 200, description = "Item found", body = serde_json::Value),
        (status = 404, description = "Item not found", body = MessageResponse),
        (status = 500, description = "Store error", body = InternalErrorResponse)
    ),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResponse {
    forward(&state, item_request(Method::GET, id)).await
}

/// PUT /items/{id} handler - Replace an existing item
#[utoipa::path(
    put,
    path = routes::ITEM,
    params(
        ("id" = String, Path, description = "Item identifier; overrides any id in the body")
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Item replaced, with updatedAt", body = serde_json::Value),
        (status = 400, description = "Body is not a JSON object", body = MessageResponse),
        (status = 404, description = "Item not found", body = MessageResponse),
        (status = 500, description = "Store error", body = InternalErrorResponse)
    ),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResponse {
    forward(&state, attach_body(item_request(Method::PUT, id), body)).await
}

/// DELETE /items/{id} handler - Remove an item
#[utoipa::path(
    delete,
    path = routes::ITEM,
    params(
        ("id" = String, Path, description = "Item identifier")
    ),
    responses(
        (status = 200, description = "Item deleted", body = MessageResponse),
        (status = 404, description = "Item not found", body = MessageResponse),
        (status = 500, description = "Store error", body = InternalErrorResponse)
    ),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResponse {
    forward(&state, item_request(Method::DELETE, id)).await
}

/// Any other method on /items
pub async fn forward_collection(
    State(state): State<AppState>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> ApiResponse {
    forward(&state, attach_body(Ok(InboundRequest::new(method, routes::ITEMS)), body)).await
}

/// Any other method on /items/{id}
pub async fn forward_item(
    State(state): State<AppState>,
    method: Method,
    id: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResponse {
    forward(&state, attach_body(item_request(method, id), body)).await
}

/// OPTIONS on either items path
pub async fn preflight() -> Response {
    preflight_response()
}

/// Paths outside the items API
pub async fn unmatched(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Result<Bytes, BytesRejection>,
) -> ApiResponse {
    forward(&state, attach_body(Ok(InboundRequest::new(method, uri.path())), body)).await
}
