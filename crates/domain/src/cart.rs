//! Typed order placement request.

use ledger::MAX_ID_LEN;
use serde::{Deserialize, Serialize};

use crate::error::CartError;
use crate::{CustomerId, ProductId};

/// One requested product and quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Command to place an order for a customer's cart.
///
/// Lines need not be grouped by seller, and the same product may appear on
/// more than one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub customer_id: CustomerId,
    pub items: Vec<CartLine>,
}

impl PlaceOrder {
    /// Creates a new PlaceOrder command.
    pub fn new(customer_id: impl Into<CustomerId>, items: Vec<CartLine>) -> Self {
        Self {
            customer_id: customer_id.into(),
            items,
        }
    }

    /// Adds a line to the cart.
    pub fn with_line(mut self, product_id: impl Into<ProductId>, quantity: u32) -> Self {
        self.items.push(CartLine::new(product_id, quantity));
        self
    }

    /// Checks the cart shape without touching any store.
    pub fn validate(&self) -> Result<(), CartError> {
        if self.customer_id.is_blank() {
            return Err(CartError::MissingCustomer);
        }
        if self.customer_id.as_str().len() > MAX_ID_LEN {
            return Err(CartError::IdTooLong {
                field: "customer_id",
                max: MAX_ID_LEN,
            });
        }
        if self.items.is_empty() {
            return Err(CartError::EmptyCart);
        }
        for (line, item) in self.items.iter().enumerate() {
            if item.product_id.is_blank() {
                return Err(CartError::MissingProduct { line });
            }
            if item.product_id.as_str().len() > MAX_ID_LEN {
                return Err(CartError::IdTooLong {
                    field: "product_id",
                    max: MAX_ID_LEN,
                });
            }
            if item.quantity == 0 {
                return Err(CartError::InvalidQuantity {
                    product_id: item.product_id.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_cart_passes() {
        let cart = PlaceOrder::new("alice", vec![])
            .with_line("p1", 2)
            .with_line("p2", 1);
        assert!(cart.validate().is_ok());
    }

    #[test]
    fn empty_cart_is_rejected() {
        let cart = PlaceOrder::new("alice", vec![]);
        assert_eq!(cart.validate(), Err(CartError::EmptyCart));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let cart = PlaceOrder::new("alice", vec![]).with_line("p1", 0);
        assert_eq!(
            cart.validate(),
            Err(CartError::InvalidQuantity {
                product_id: ProductId::new("p1")
            })
        );
    }

    #[test]
    fn blank_ids_are_rejected() {
        let cart = PlaceOrder::new("  ", vec![]).with_line("p1", 1);
        assert_eq!(cart.validate(), Err(CartError::MissingCustomer));

        let cart = PlaceOrder::new("alice", vec![])
            .with_line("p1", 1)
            .with_line("", 1);
        assert_eq!(cart.validate(), Err(CartError::MissingProduct { line: 1 }));
    }

    #[test]
    fn overlong_ids_are_rejected() {
        let cart = PlaceOrder::new("c".repeat(MAX_ID_LEN + 1), vec![]).with_line("p1", 1);
        assert_eq!(
            cart.validate(),
            Err(CartError::IdTooLong {
                field: "customer_id",
                max: MAX_ID_LEN
            })
        );

        let cart = PlaceOrder::new("c".repeat(MAX_ID_LEN), vec![]).with_line("p".repeat(65), 1);
        assert_eq!(
            cart.validate(),
            Err(CartError::IdTooLong {
                field: "product_id",
                max: MAX_ID_LEN
            })
        );
    }

    #[test]
    fn deserializes_from_request_json() {
        let cart: PlaceOrder = serde_json::from_str(
            r#"{"customer_id": "alice", "items": [{"product_id": "p1", "quantity": 2}]}"#,
        )
        .unwrap();
        assert_eq!(cart.items, vec![CartLine::new("p1", 2)]);
    }
}
