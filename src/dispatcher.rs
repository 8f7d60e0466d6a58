use axum::http::{Method, StatusCode};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::error::ApiError;
use crate::models::{Item, MessageResponse};
use crate::operations::ItemOperations;
use crate::response::{build_response, ApiResponse};
use crate::routes;

/// A request as handed over by the routing layer
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Route template the request matched, e.g. `/items/{id}`; anything else is unmatched
    pub resource: String,
    pub path_parameters: HashMap<String, String>,
    pub body: Option<String>,
}

impl InboundRequest {
    pub fn new(method: Method, resource: impl Into<String>) -> Self {
        Self {
            method,
            resource: resource.into(),
            path_parameters: HashMap::new(),
            body: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.path_parameters.insert("id".to_string(), id.into());
        self
    }

    #[cfg(test)]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    fn item_id(&self) -> Option<&str> {
        self.path_parameters
            .get("id")
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }
}

/// Resolves (method, route template) to one item operation and shapes the reply
#[derive(Clone)]
pub struct Dispatcher {
    items: ItemOperations,
}

impl Dispatcher {
    pub fn new(items: ItemOperations) -> Self {
        Self { items }
    }

    /// Never fails: every outcome, including store errors, becomes a response
    pub async fn dispatch(&self, request: InboundRequest) -> ApiResponse {
        tracing::debug!(
            "Dispatching {} {} (id: {:?})",
            request.method,
            request.resource,
            request.item_id()
        );

        match self.route(&request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::info!("{} {} failed: {}", request.method, request.resource, err);
                err.to_api_response()
            }
        }
    }

    async fn route(&self, request: &InboundRequest) -> Result<ApiResponse, ApiError> {
        let resource = request.resource.as_str();
        let item_id = request.item_id();

        match request.method {
            Method::GET => match (resource, item_id) {
                (routes::ITEMS, _) => {
                    let items = self.items.list().await?;
                    Ok(build_response(StatusCode::OK, &items))
                }
                (routes::ITEM, Some(id)) => {
                    let item = self.items.get(id).await?;
                    Ok(build_response(StatusCode::OK, &item))
                }
                _ => Err(ApiError::resource_not_found()),
            },
            Method::POST => match resource {
                routes::ITEMS => {
                    let candidate = parse_item_body(request.body.as_deref())?;
                    let item = self.items.create(candidate).await?;
                    Ok(build_response(StatusCode::CREATED, &item))
                }
                _ => Err(ApiError::resource_not_found()),
            },
            Method::PUT => match (resource, item_id) {
                (routes::ITEM, Some(id)) => {
                    let candidate = parse_item_body(request.body.as_deref())?;
                    let item = self.items.update(id, candidate).await?;
                    Ok(build_response(StatusCode::OK, &item))
                }
                _ => Err(ApiError::resource_not_found()),
            },
            Method::DELETE => match (resource, item_id) {
                (routes::ITEM, Some(id)) => {
                    self.items.delete(id).await?;
                    Ok(build_response(
                        StatusCode::OK,
                        &MessageResponse::new("Item deleted successfully"),
                    ))
                }
                _ => Err(ApiError::resource_not_found()),
            },
            _ => Err(ApiError::unsupported_method()),
        }
    }
}

/// Create/update bodies must be a JSON object
fn parse_item_body(body: Option<&str>) -> Result<Item, ApiError> {
    let body = body
        .filter(|body| !body.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Request body is required".to_string()))?;

    match serde_json::from_str::<JsonValue>(body) {
        Ok(JsonValue::Object(attributes)) => Ok(Item::from(attributes)),
        Ok(_) => Err(ApiError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
        Err(err) => Err(ApiError::BadRequest(format!("Invalid JSON body: {}", err))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UuidGenerator;
    use crate::operations::tests::FailingStore;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(ItemOperations::new(
            Arc::new(MemoryStore::new()),
            Arc::new(UuidGenerator),
        ))
    }

    fn get(resource: &str) -> InboundRequest {
        InboundRequest::new(Method::GET, resource)
    }

    #[tokio::test]
    async fn test_crud_scenario() {
        let dispatcher = dispatcher();

        let created = dispatcher
            .dispatch(InboundRequest::new(Method::POST, routes::ITEMS).with_body(r#"{"name":"x"}"#))
            .await;
        assert_eq!(created.status, StatusCode::CREATED);
        let created = created.json().unwrap();
        let id = created["id"].as_str().unwrap().to_string();
        assert!(created["createdAt"].is_string());

        let fetched = dispatcher.dispatch(get(routes::ITEM).with_id(&id)).await;
        assert_eq!(fetched.status, StatusCode::OK);
        assert_eq!(fetched.json().unwrap(), created);

        let updated = dispatcher
            .dispatch(
                InboundRequest::new(Method::PUT, routes::ITEM)
                    .with_id(&id)
                    .with_body(r#"{"name":"y"}"#),
            )
            .await;
        assert_eq!(updated.status, StatusCode::OK);
        let updated = updated.json().unwrap();
        assert_eq!(updated["name"], "y");
        assert!(updated["updatedAt"].is_string());
        assert_eq!(updated["createdAt"], created["createdAt"]);

        let deleted = dispatcher
            .dispatch(InboundRequest::new(Method::DELETE, routes::ITEM).with_id(&id))
            .await;
        assert_eq!(deleted.status, StatusCode::OK);
        assert_eq!(deleted.json().unwrap(), json!({"message": "Item deleted successfully"}));

        let gone = dispatcher.dispatch(get(routes::ITEM).with_id(&id)).await;
        assert_eq!(gone.status, StatusCode::NOT_FOUND);
        assert_eq!(gone.json().unwrap(), json!({"message": "Item not found"}));
    }

    #[tokio::test]
    async fn test_list_empty_collection() {
        let response = dispatcher().dispatch(get(routes::ITEMS)).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json().unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        for method in [Method::PATCH, Method::OPTIONS, Method::HEAD] {
            let response = dispatcher()
                .dispatch(InboundRequest::new(method, routes::ITEMS))
                .await;
            assert_eq!(response.status, StatusCode::BAD_REQUEST);
            assert_eq!(response.json().unwrap(), json!({"message": "Unsupported method"}));
        }
    }

    #[tokio::test]
    async fn test_known_method_on_wrong_shape_is_not_found() {
        let dispatcher = dispatcher();

        let cases = [
            InboundRequest::new(Method::POST, routes::ITEM).with_id("a").with_body("{}"),
            InboundRequest::new(Method::PUT, routes::ITEMS).with_body("{}"),
            InboundRequest::new(Method::DELETE, routes::ITEMS),
            InboundRequest::new(Method::GET, "/widgets"),
            // item route without its path parameter
            InboundRequest::new(Method::GET, routes::ITEM),
            InboundRequest::new(Method::DELETE, routes::ITEM).with_id(""),
        ];

        for request in cases {
            let response = dispatcher.dispatch(request).await;
            assert_eq!(response.status, StatusCode::NOT_FOUND);
            assert_eq!(response.json().unwrap(), json!({"message": "Resource not found"}));
        }
    }

    #[tokio::test]
    async fn test_unparsable_bodies_are_bad_requests() {
        let dispatcher = dispatcher();

        for body in [None, Some(""), Some("{invalid json}"), Some("[1,2]"), Some("\"text\"")] {
            let mut request = InboundRequest::new(Method::POST, routes::ITEMS);
            request.body = body.map(str::to_string);
            let response = dispatcher.dispatch(request).await;
            assert_eq!(response.status, StatusCode::BAD_REQUEST, "body: {:?}", body);
        }
        assert!(dispatcher.items.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_bad_body_on_missing_item_is_bad_request() {
        let response = dispatcher()
            .dispatch(
                InboundRequest::new(Method::PUT, routes::ITEM)
                    .with_id("a")
                    .with_body("not json"),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let dispatcher = dispatcher();
        let request = InboundRequest::new(Method::POST, routes::ITEMS).with_body(r#"{"id":"k"}"#);

        assert_eq!(dispatcher.dispatch(request.clone()).await.status, StatusCode::CREATED);

        let conflict = dispatcher.dispatch(request).await;
        assert_eq!(conflict.status, StatusCode::CONFLICT);
        assert_eq!(
            conflict.json().unwrap(),
            json!({"message": "Item with this ID already exists"})
        );
    }

    #[tokio::test]
    async fn test_store_failure_becomes_internal_error() {
        let dispatcher = Dispatcher::new(ItemOperations::new(
            Arc::new(FailingStore),
            Arc::new(UuidGenerator),
        ));

        let response = dispatcher.dispatch(get(routes::ITEMS)).await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.json().unwrap();
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["error"], "store unavailable");
    }
}
