//! Read-only access to placed orders.

use std::future::Future;
use std::time::Duration;

use ledger::LedgerError;
use serde::Serialize;

use crate::config::DEFAULT_STORE_TIMEOUT;
use crate::error::QueryError;
use crate::{CustomerId, LedgerStore, MasterOrder, OrderItem, OrderNumber, SubOrder};

/// A master order with its sub-orders and lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetail {
    pub order: MasterOrder,
    pub sub_orders: Vec<SubOrder>,
    pub items: Vec<OrderItem>,
}

/// Service for reading orders back from the ledger.
///
/// Pure reads: nothing here writes to any store.
pub struct OrderQueryService<L> {
    ledger: L,
    timeout: Duration,
}

impl<L: LedgerStore> OrderQueryService<L> {
    /// Creates a new query service over `ledger`.
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Sets the per-call timeout on ledger reads.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Gets the master order, or None if no such order exists.
    #[tracing::instrument(skip_all, fields(order_number = %order_number))]
    pub async fn get_order(
        &self,
        order_number: OrderNumber,
    ) -> Result<Option<MasterOrder>, QueryError> {
        self.bounded(self.ledger.get_order(order_number)).await
    }

    /// Gets the master order together with its sub-orders and lines.
    #[tracing::instrument(skip_all, fields(order_number = %order_number))]
    pub async fn get_order_detail(
        &self,
        order_number: OrderNumber,
    ) -> Result<Option<OrderDetail>, QueryError> {
        let Some(order) = self.bounded(self.ledger.get_order(order_number)).await? else {
            return Ok(None);
        };

        let (sub_orders, items) = tokio::try_join!(
            self.bounded(self.ledger.get_sub_orders(order_number)),
            self.bounded(self.ledger.get_items(order_number)),
        )?;

        Ok(Some(OrderDetail {
            order,
            sub_orders,
            items,
        }))
    }

    /// Lists a customer's orders, newest first.
    #[tracing::instrument(skip_all, fields(customer_id = %customer_id))]
    pub async fn list_orders(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<MasterOrder>, QueryError> {
        self.bounded(self.ledger.list_orders_for_customer(customer_id))
            .await
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = ledger::Result<T>>,
    ) -> Result<T, QueryError> {
        let limit = self.timeout;
        let result = tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
            Err(LedgerError::Unavailable(format!(
                "ledger read timed out after {limit:?}"
            )))
        });
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use ledger::InMemoryLedgerStore;

    use super::*;

    #[tokio::test]
    async fn missing_order_is_none() {
        let queries = OrderQueryService::new(InMemoryLedgerStore::new());

        assert!(queries.get_order(OrderNumber::new(7)).await.unwrap().is_none());
        assert!(
            queries
                .get_order_detail(OrderNumber::new(7))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn unknown_customer_has_no_orders() {
        let queries = OrderQueryService::new(InMemoryLedgerStore::new());
        let orders = queries
            .list_orders(&CustomerId::new("nobody"))
            .await
            .unwrap();
        assert!(orders.is_empty());
    }
}
