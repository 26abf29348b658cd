use thiserror::Error;

use crate::OrderNumber;

/// Errors that can occur when interacting with the ledger store.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An order with this number already exists.
    #[error("Order {0} already exists")]
    DuplicateOrder(OrderNumber),

    /// The records handed to `insert_order` are inconsistent with each other.
    #[error("Invalid order batch: {0}")]
    InvalidBatch(String),

    /// A stored row could not be mapped back to a record.
    #[error("Corrupt ledger record: {0}")]
    CorruptRecord(String),

    /// The store refused the operation.
    #[error("Ledger store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for ledger store operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
