//! Canonical items, owned by the item service.

mod model;
mod service;

pub use model::Item;
pub use service::ItemService;
