use crate::dispatcher::Dispatcher;
use crate::ids::IdGenerator;
use crate::operations::ItemOperations;
use crate::store::ItemStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub store: Arc<dyn ItemStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn ItemStore>, ids: Arc<dyn IdGenerator>) -> Self {
        let dispatcher = Dispatcher::new(ItemOperations::new(store.clone(), ids));
        Self { dispatcher, store }
    }
}
