use axum::{routing::get, Router};
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::error::ApiError;
use crate::handlers::{
    create_item, delete_item, forward_collection, forward_item, get_item, health_handler,
    list_items, preflight, unmatched, update_item,
};
use crate::routes;
use crate::state::AppState;

/// Assemble the HTTP surface: items API, health, docs, middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(routes::HEALTH, get(health_handler))
        .route(
            routes::ITEMS,
            get(list_items)
                .post(create_item)
                .head(forward_collection)
                .options(preflight)
                .fallback(forward_collection),
        )
        .route(
            routes::ITEM,
            get(get_item)
                .put(update_item)
                .delete(delete_item)
                .head(forward_item)
                .options(preflight)
                .fallback(forward_item),
        )
        .fallback(unmatched)
        .with_state(state)
        .merge(SwaggerUi::new(routes::SWAGGER_UI).url(routes::OPENAPI_JSON, ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> axum::response::Response {
    let detail = if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    };

    let err = ApiError::Internal(anyhow::anyhow!("request handler panicked: {}", detail));
    axum::response::IntoResponse::into_response(err)
}
