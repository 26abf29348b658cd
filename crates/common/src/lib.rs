//! Shared types for the marketplace order system.
//!
//! Identifier newtypes keep product, customer, seller and order identifiers
//! from being mixed up, and [`Money`] fixes every amount to integer minor
//! currency units.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{
    CustomerId, LineNumber, OrderNumber, ParseOrderNumberError, ProductId, SellerId,
    SubOrderNumber,
};
