use utoipa::OpenApi;

use crate::error::{HealthResponse, InternalErrorResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::MessageResponse;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "rust-spanner-items API",
        version = "1.0.0",
        description = "CRUD over a schema-less items collection backed by Google Cloud Spanner"
    ),
    paths(
        handlers::health::health_handler,
        handlers::items::list_items,
        handlers::items::create_item,
        handlers::items::get_item,
        handlers::items::update_item,
        handlers::items::delete_item
    ),
    components(
        schemas(
            MessageResponse,
            InternalErrorResponse,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "items", description = "Item collection operations")
    )
)]
pub struct ApiDoc;
