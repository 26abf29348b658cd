use thiserror::Error;

use crate::ProductId;

/// Errors that can occur when interacting with the catalog store.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The product does not exist.
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// A conditional decrement was refused because stock is too low.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The backing store cannot be reached or refused the request.
    #[error("Catalog store unavailable: {0}")]
    Unavailable(String),

    /// The backing store answered with something we could not interpret.
    #[error("Unexpected catalog response (status {status}): {body}")]
    UnexpectedResponse { status: u16, body: String },

    /// An HTTP transport error occurred.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for catalog store operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
