use std::sync::Arc;

use async_trait::async_trait;

use crate::{CustomerId, MasterOrder, NewOrder, OrderItem, OrderNumber, Result, SubOrder};

/// Contract for order ledger stores.
///
/// Writes are all-or-nothing per order; reads observe everything committed
/// before they started.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Inserts a master order with its sub-orders and items atomically.
    ///
    /// On any error nothing from `order` is visible to readers.
    async fn insert_order(&self, order: NewOrder) -> Result<()>;

    /// Fetches a master order. Returns None if it does not exist.
    async fn get_order(&self, order_number: OrderNumber) -> Result<Option<MasterOrder>>;

    /// Fetches the sub-orders of a master order, in insertion order.
    async fn get_sub_orders(&self, order_number: OrderNumber) -> Result<Vec<SubOrder>>;

    /// Fetches the items of a master order, in insertion order.
    async fn get_items(&self, order_number: OrderNumber) -> Result<Vec<OrderItem>>;

    /// Lists a customer's master orders, newest first.
    async fn list_orders_for_customer(&self, customer_id: &CustomerId) -> Result<Vec<MasterOrder>>;
}

#[async_trait]
impl<T: LedgerStore + ?Sized> LedgerStore for Arc<T> {
    async fn insert_order(&self, order: NewOrder) -> Result<()> {
        (**self).insert_order(order).await
    }

    async fn get_order(&self, order_number: OrderNumber) -> Result<Option<MasterOrder>> {
        (**self).get_order(order_number).await
    }

    async fn get_sub_orders(&self, order_number: OrderNumber) -> Result<Vec<SubOrder>> {
        (**self).get_sub_orders(order_number).await
    }

    async fn get_items(&self, order_number: OrderNumber) -> Result<Vec<OrderItem>> {
        (**self).get_items(order_number).await
    }

    async fn list_orders_for_customer(&self, customer_id: &CustomerId) -> Result<Vec<MasterOrder>> {
        (**self).list_orders_for_customer(customer_id).await
    }
}
