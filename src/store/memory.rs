use anyhow::Result;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use super::{require_id, ItemStore, WriteOutcome};
use crate::models::Item;

/// In-process table, mainly for local development and tests.
///
/// Conditional writes go through the `DashMap` entry API, which holds the shard
/// lock for the key across the existence check and the write.
#[derive(Clone, Default)]
pub struct MemoryStore {
    items: Arc<DashMap<String, Item>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn scan_all(&self) -> Result<Vec<Item>> {
        Ok(self.items.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn get_by_key(&self, id: &str) -> Result<Option<Item>> {
        Ok(self.items.get(id).map(|entry| entry.value().clone()))
    }

    async fn put_if_absent(&self, item: Item) -> Result<WriteOutcome> {
        let id = require_id(&item)?;
        match self.items.entry(id) {
            Entry::Occupied(_) => Ok(WriteOutcome::PreconditionFailed),
            Entry::Vacant(slot) => {
                slot.insert(item.clone());
                Ok(WriteOutcome::Written(item))
            }
        }
    }

    async fn put_if_present(&self, mut item: Item) -> Result<WriteOutcome> {
        let id = require_id(&item)?;
        match self.items.entry(id) {
            Entry::Vacant(_) => Ok(WriteOutcome::PreconditionFailed),
            Entry::Occupied(mut slot) => {
                match slot.get().created_at().map(str::to_string) {
                    Some(created_at) => item.set_created_at(created_at),
                    None => {
                        item.remove(crate::models::CREATED_AT);
                    }
                }
                slot.insert(item.clone());
                Ok(WriteOutcome::Written(item))
            }
        }
    }

    async fn delete_if_present(&self, id: &str) -> Result<Option<Item>> {
        Ok(self.items.remove(id).map(|(_, item)| item))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
