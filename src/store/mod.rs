pub mod memory;
pub mod spanner;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Item;

pub use memory::MemoryStore;
pub use spanner::SpannerStore;

/// Result of a write guarded by an existence precondition
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The write went through; carries the item exactly as stored
    Written(Item),
    /// The key existed (put-if-absent) or did not exist (put-if-present)
    PreconditionFailed,
}

/// Capability interface over a single key-value table keyed by `id`.
///
/// Every conditional operation must evaluate its existence check and its write
/// atomically: of several callers racing to create the same `id`, exactly one
/// `put_if_absent` returns `Written`.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Every stored item, in no particular order
    async fn scan_all(&self) -> Result<Vec<Item>>;

    /// Point lookup by primary key
    async fn get_by_key(&self, id: &str) -> Result<Option<Item>>;

    /// Store `item` only if no item with its `id` exists.
    ///
    /// `item` must carry a string `id` and its `createdAt`.
    async fn put_if_absent(&self, item: Item) -> Result<WriteOutcome>;

    /// Replace the item with the same `id` only if one exists.
    ///
    /// All client attributes are overwritten; the stored `createdAt` is carried
    /// over into the new version.
    async fn put_if_present(&self, item: Item) -> Result<WriteOutcome>;

    /// Remove the item and return its last stored value
    async fn delete_if_present(&self, id: &str) -> Result<Option<Item>>;

    /// Verify the backing table is reachable
    async fn health_check(&self) -> Result<()>;
}

pub(crate) fn require_id(item: &Item) -> Result<String> {
    item.id()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("item has no string id"))
}
