pub mod health;
pub mod items;

pub use health::health_handler;
pub use items::{
    create_item, delete_item, forward_collection, forward_item, get_item, list_items, preflight,
    unmatched, update_item,
};
