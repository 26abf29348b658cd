//! Order placement and order queries for the marketplace.
//!
//! This crate provides:
//! - [`PlacementEngine`]: turns a cart into a master order, per-seller
//!   sub-orders and line items, and adjusts catalog stock
//! - [`OrderQueryService`]: read-only access to placed orders
//!
//! Both work against the [`CatalogStore`] and [`LedgerStore`] contracts and
//! are handed their collaborators at construction time.

pub mod cart;
pub mod config;
pub mod error;
pub mod placement;
pub mod query;

pub use catalog::CatalogStore;
pub use common::{CustomerId, Money, OrderNumber, ProductId, SellerId};
pub use ledger::{LedgerStore, MasterOrder, OrderItem, SubOrder};

pub use cart::{CartLine, PlaceOrder};
pub use config::{ParseStockPolicyError, PlacementConfig, StockPolicy};
pub use error::{CartError, PlacementError, QueryError, Result};
pub use placement::{InventoryUpdateFailed, PlacedOrder, PlacementEngine};
pub use query::{OrderDetail, OrderQueryService};
