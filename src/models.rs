use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Attribute carrying the primary key
pub const ID: &str = "id";
/// Set once when the item is created
pub const CREATED_AT: &str = "createdAt";
/// Set on every successful update
pub const UPDATED_AT: &str = "updatedAt";

/// A stored item: an open attribute bag keyed by attribute name.
///
/// Only `id`, `createdAt` and `updatedAt` are owned by the service; every other
/// attribute passes through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Map<String, JsonValue>);

impl Item {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, attribute: &str) -> Option<&JsonValue> {
        self.0.get(attribute)
    }

    #[cfg(test)]
    pub fn insert(&mut self, attribute: impl Into<String>, value: JsonValue) -> Option<JsonValue> {
        self.0.insert(attribute.into(), value)
    }

    pub fn remove(&mut self, attribute: &str) -> Option<JsonValue> {
        self.0.remove(attribute)
    }

    /// The `id` attribute, when present and a string
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID).and_then(JsonValue::as_str)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0.insert(ID.to_string(), JsonValue::String(id.into()));
    }

    pub fn created_at(&self) -> Option<&str> {
        self.0.get(CREATED_AT).and_then(JsonValue::as_str)
    }

    pub fn set_created_at(&mut self, timestamp: impl Into<String>) {
        self.0.insert(CREATED_AT.to_string(), JsonValue::String(timestamp.into()));
    }

    #[cfg(test)]
    pub fn updated_at(&self) -> Option<&str> {
        self.0.get(UPDATED_AT).and_then(JsonValue::as_str)
    }

    pub fn set_updated_at(&mut self, timestamp: impl Into<String>) {
        self.0.insert(UPDATED_AT.to_string(), JsonValue::String(timestamp.into()));
    }

    /// Split off the system timestamps, leaving only client attributes and `id`
    pub fn take_timestamps(&mut self) -> (Option<String>, Option<String>) {
        let created_at = take_string(&mut self.0, CREATED_AT);
        let updated_at = take_string(&mut self.0, UPDATED_AT);
        (created_at, updated_at)
    }
}

impl From<Map<String, JsonValue>> for Item {
    fn from(attributes: Map<String, JsonValue>) -> Self {
        Self(attributes)
    }
}

fn take_string(attributes: &mut Map<String, JsonValue>, key: &str) -> Option<String> {
    match attributes.remove(key) {
        Some(JsonValue::String(s)) => Some(s),
        _ => None,
    }
}

/// Plain `{ "message": ... }` payload
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
