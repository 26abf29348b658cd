//! Order ledger store.
//!
//! The ledger is the store of record for placed orders. It holds three
//! related record kinds, written together in one atomic unit:
//! - [`MasterOrder`]: the customer's whole checkout
//! - [`SubOrder`]: the per-seller partition of a master order
//! - [`OrderItem`]: one product/quantity line within a sub-order

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use common::{CustomerId, LineNumber, Money, OrderNumber, ProductId, SellerId, SubOrderNumber};
pub use error::{LedgerError, Result};
pub use memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use record::{ItemStatus, MAX_ID_LEN, MasterOrder, NewOrder, OrderItem, SubOrder};
pub use store::LedgerStore;
