pub mod api;
pub mod client;

pub use api::{BaseItem, ItemQuery, ItemStream, QueryResult, SortOrder, item_types};
pub use client::EmbyClient;
