use chrono::{SecondsFormat, Utc};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::error::ApiError;
use crate::ids::IdGenerator;
use crate::models::{Item, CREATED_AT, ID, UPDATED_AT};
use crate::store::{ItemStore, WriteOutcome};

/// Current UTC time as ISO-8601 with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The CRUD behaviours over the items table.
///
/// Each operation makes exactly one store call. Existence checks are never done
/// here; they ride on the store's conditional writes.
#[derive(Clone)]
pub struct ItemOperations {
    store: Arc<dyn ItemStore>,
    ids: Arc<dyn IdGenerator>,
}

impl ItemOperations {
    pub fn new(store: Arc<dyn ItemStore>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { store, ids }
    }

    pub async fn list(&self) -> Result<Vec<Item>, ApiError> {
        let items = self.store.scan_all().await?;
        tracing::info!("Listed {} items", items.len());
        Ok(items)
    }

    pub async fn get(&self, id: &str) -> Result<Item, ApiError> {
        match self.store.get_by_key(id).await? {
            Some(item) => {
                tracing::info!("Retrieved item with id: {}", id);
                Ok(item)
            }
            None => {
                tracing::info!("Item not found with id: {}", id);
                Err(ApiError::item_not_found())
            }
        }
    }

    /// Store a new item, generating its `id` when the caller left it out.
    ///
    /// A missing, `null` or empty `id` counts as absent.
    pub async fn create(&self, mut candidate: Item) -> Result<Item, ApiError> {
        let generate = match candidate.get(ID) {
            None | Some(JsonValue::Null) => true,
            Some(JsonValue::String(id)) => id.is_empty(),
            Some(_) => return Err(ApiError::BadRequest("id must be a string".to_string())),
        };
        if generate {
            candidate.set_id(self.ids.generate());
        }

        candidate.remove(UPDATED_AT);
        candidate.set_created_at(timestamp());

        match self.store.put_if_absent(candidate).await? {
            WriteOutcome::Written(item) => {
                tracing::info!("Created item with id: {}", item.id().unwrap_or_default());
                Ok(item)
            }
            WriteOutcome::PreconditionFailed => {
                tracing::info!("Create rejected, item already exists");
                Err(ApiError::item_exists())
            }
        }
    }

    /// Replace the whole item at `id`; the path identifier overrides any `id` in the body
    pub async fn update(&self, id: &str, mut candidate: Item) -> Result<Item, ApiError> {
        candidate.set_id(id);
        candidate.remove(CREATED_AT);
        candidate.set_updated_at(timestamp());

        match self.store.put_if_present(candidate).await? {
            WriteOutcome::Written(item) => {
                tracing::info!("Updated item with id: {}", id);
                Ok(item)
            }
            WriteOutcome::PreconditionFailed => {
                tracing::info!("Update rejected, item not found with id: {}", id);
                Err(ApiError::item_not_found())
            }
        }
    }

    /// Remove the item at `id`, returning what was stored
    pub async fn delete(&self, id: &str) -> Result<Item, ApiError> {
        match self.store.delete_if_present(id).await? {
            Some(removed) => {
                tracing::info!("Deleted item with id: {}", id);
                Ok(removed)
            }
            None => {
                tracing::info!("Delete rejected, item not found with id: {}", id);
                Err(ApiError::item_not_found())
            }
        }
    }
}
