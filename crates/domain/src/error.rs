//! Domain error types.

use id_generator::IdError;
use ledger::LedgerError;
use thiserror::Error;

use crate::ProductId;

/// Problems with the shape of a cart, found before any store is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Customer id is required")]
    MissingCustomer,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Cart line {line} has no product id")]
    MissingProduct { line: usize },

    #[error("Quantity for product {product_id} must be at least 1")]
    InvalidQuantity { product_id: ProductId },

    #[error("{field} is longer than {max} bytes")]
    IdTooLong { field: &'static str, max: usize },
}

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// The cart was rejected before any store access.
    #[error("Invalid cart: {0}")]
    Validation(#[from] CartError),

    /// A cart line references a product the catalog does not know.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A product does not have enough stock for the requested quantity.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The catalog record cannot be sold as listed (negative price, seller id
    /// the ledger cannot store).
    #[error("Product {product_id} cannot be ordered: {reason}")]
    InvalidListing {
        product_id: ProductId,
        reason: String,
    },

    /// A line or order total does not fit in the amount range.
    #[error("Amount overflow for product {0}")]
    AmountOverflow(ProductId),

    /// The catalog could not be read or updated.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// The ledger transaction failed; nothing was persisted.
    #[error("Ledger write failed: {0}")]
    LedgerWriteFailed(String),

    /// No identifier could be generated.
    #[error("Id generation failed: {0}")]
    IdGeneration(#[from] IdError),
}

impl PlacementError {
    /// Returns true when the caller can fix the request and retry.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PlacementError::Validation(_)
                | PlacementError::ProductNotFound(_)
                | PlacementError::InsufficientStock { .. }
                | PlacementError::InvalidListing { .. }
                | PlacementError::AmountOverflow(_)
        )
    }

    /// The product the error is about, if any.
    pub fn product_id(&self) -> Option<&ProductId> {
        match self {
            PlacementError::ProductNotFound(id) | PlacementError::AmountOverflow(id) => Some(id),
            PlacementError::InsufficientStock { product_id, .. }
            | PlacementError::InvalidListing { product_id, .. } => Some(product_id),
            PlacementError::Validation(CartError::InvalidQuantity { product_id }) => {
                Some(product_id)
            }
            _ => None,
        }
    }

    /// Short label used for the failure metric.
    pub fn reason(&self) -> &'static str {
        match self {
            PlacementError::Validation(_) => "validation",
            PlacementError::ProductNotFound(_) => "product_not_found",
            PlacementError::InsufficientStock { .. } => "insufficient_stock",
            PlacementError::InvalidListing { .. } => "invalid_listing",
            PlacementError::AmountOverflow(_) => "amount_overflow",
            PlacementError::CatalogUnavailable(_) => "catalog_unavailable",
            PlacementError::LedgerWriteFailed(_) => "ledger_write_failed",
            PlacementError::IdGeneration(_) => "id_generation",
        }
    }
}

/// Errors that can occur while reading orders.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Result type for order placement.
pub type Result<T> = std::result::Result<T, PlacementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_classified() {
        assert!(PlacementError::ProductNotFound(ProductId::new("p1")).is_client_error());
        assert!(PlacementError::Validation(CartError::EmptyCart).is_client_error());
        assert!(
            PlacementError::InsufficientStock {
                product_id: ProductId::new("p1"),
                requested: 5,
                available: 1,
            }
            .is_client_error()
        );
        let listing = PlacementError::InvalidListing {
            product_id: ProductId::new("p1"),
            reason: "negative price".into(),
        };
        assert!(listing.is_client_error());
        assert_eq!(listing.reason(), "invalid_listing");
        assert!(!PlacementError::LedgerWriteFailed("boom".into()).is_client_error());
        assert!(!PlacementError::CatalogUnavailable("down".into()).is_client_error());
        assert!(!PlacementError::IdGeneration(IdError::ClockBeforeEpoch).is_client_error());
    }

    #[test]
    fn product_id_points_at_offending_line() {
        let err = PlacementError::InsufficientStock {
            product_id: ProductId::new("p1"),
            requested: 5,
            available: 1,
        };
        assert_eq!(err.product_id(), Some(&ProductId::new("p1")));
        assert_eq!(PlacementError::LedgerWriteFailed("x".into()).product_id(), None);
    }
}
