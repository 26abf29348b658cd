//! Catalog/inventory store for the marketplace.
//!
//! Product records (price, seller, available quantity) live in an external
//! document store. This crate defines the narrow contract the order engine
//! relies on ([`CatalogStore`]) together with two adapters:
//! - [`InMemoryCatalogStore`] for tests and local runs
//! - [`ElasticsearchCatalogStore`] talking to the Elasticsearch REST API

pub mod elasticsearch;
pub mod error;
pub mod memory;
pub mod product;
pub mod query;
pub mod store;

pub use common::{Money, ProductId, SellerId};
pub use elasticsearch::{ElasticsearchCatalogStore, ElasticsearchConfig};
pub use error::{CatalogError, Result};
pub use memory::InMemoryCatalogStore;
pub use product::Product;
pub use query::{SearchQuery, SortField, SortOrder};
pub use store::CatalogStore;
