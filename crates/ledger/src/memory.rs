use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    CustomerId, LedgerError, LedgerStore, LineNumber, MasterOrder, NewOrder, OrderItem,
    OrderNumber, Result, SubOrder, SubOrderNumber,
};

#[derive(Debug, Default)]
struct InMemoryLedgerState {
    orders: HashMap<OrderNumber, MasterOrder>,
    sub_orders: HashMap<OrderNumber, Vec<SubOrder>>,
    items: HashMap<OrderNumber, Vec<OrderItem>>,
    sub_order_numbers: HashSet<SubOrderNumber>,
    line_numbers: HashSet<LineNumber>,
    fail_on_write: bool,
    write_latency: Option<Duration>,
}

/// In-memory ledger store for testing and local runs.
///
/// An insert is checked in full before anything is written, and the whole
/// write happens under one lock, so readers never see a partial order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<InMemoryLedgerState>>,
}

impl InMemoryLedgerStore {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to reject writes.
    pub async fn set_fail_on_write(&self, fail: bool) {
        self.state.write().await.fail_on_write = fail;
    }

    /// Delays every write by `latency`.
    pub async fn set_write_latency(&self, latency: Option<Duration>) {
        self.state.write().await.write_latency = latency;
    }

    /// Returns the number of master orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the number of sub-orders stored.
    pub async fn sub_order_count(&self) -> usize {
        self.state.read().await.sub_order_numbers.len()
    }

    /// Returns the number of order items stored.
    pub async fn item_count(&self) -> usize {
        self.state.read().await.line_numbers.len()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert_order(&self, order: NewOrder) -> Result<()> {
        order.validate()?;

        let latency = self.state.read().await.write_latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.write().await;
        if state.fail_on_write {
            return Err(LedgerError::Unavailable(
                "in-memory ledger rejecting writes".to_string(),
            ));
        }

        let number = order.order_number();
        if state.orders.contains_key(&number) {
            return Err(LedgerError::DuplicateOrder(number));
        }
        if let Some(sub) = order
            .sub_orders
            .iter()
            .find(|s| state.sub_order_numbers.contains(&s.sub_order_number))
        {
            return Err(LedgerError::InvalidBatch(format!(
                "sub-order {} already exists",
                sub.sub_order_number
            )));
        }
        if let Some(item) = order
            .items
            .iter()
            .find(|i| state.line_numbers.contains(&i.line_number))
        {
            return Err(LedgerError::InvalidBatch(format!(
                "line {} already exists",
                item.line_number
            )));
        }

        let NewOrder {
            master,
            sub_orders,
            items,
        } = order;
        state
            .sub_order_numbers
            .extend(sub_orders.iter().map(|s| s.sub_order_number.clone()));
        state
            .line_numbers
            .extend(items.iter().map(|i| i.line_number.clone()));
        state.sub_orders.insert(number, sub_orders);
        state.items.insert(number, items);
        state.orders.insert(number, master);

        Ok(())
    }

    async fn get_order(&self, order_number: OrderNumber) -> Result<Option<MasterOrder>> {
        Ok(self.state.read().await.orders.get(&order_number).cloned())
    }

    async fn get_sub_orders(&self, order_number: OrderNumber) -> Result<Vec<SubOrder>> {
        Ok(self
            .state
            .read()
            .await
            .sub_orders
            .get(&order_number)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_items(&self, order_number: OrderNumber) -> Result<Vec<OrderItem>> {
        Ok(self
            .state
            .read()
            .await
            .items
            .get(&order_number)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_orders_for_customer(&self, customer_id: &CustomerId) -> Result<Vec<MasterOrder>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| &o.customer_id == customer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.order_number.cmp(&a.order_number))
        });
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::sample_order;

    #[tokio::test]
    async fn insert_and_read_back() {
        let store = InMemoryLedgerStore::new();
        let order = sample_order(1_000, "alice");
        store.insert_order(order.clone()).await.unwrap();

        let master = store.get_order(OrderNumber::new(1_000)).await.unwrap();
        assert_eq!(master, Some(order.master.clone()));

        let subs = store.get_sub_orders(OrderNumber::new(1_000)).await.unwrap();
        assert_eq!(subs, order.sub_orders);

        let items = store.get_items(OrderNumber::new(1_000)).await.unwrap();
        assert_eq!(items, order.items);
    }

    #[tokio::test]
    async fn missing_order_reads_empty() {
        let store = InMemoryLedgerStore::new();
        let number = OrderNumber::new(42);

        assert!(store.get_order(number).await.unwrap().is_none());
        assert!(store.get_sub_orders(number).await.unwrap().is_empty());
        assert!(store.get_items(number).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_order_number_is_rejected() {
        let store = InMemoryLedgerStore::new();
        store
            .insert_order(sample_order(1_000, "alice"))
            .await
            .unwrap();

        let err = store
            .insert_order(sample_order(1_000, "bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateOrder(_)));
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn colliding_line_number_writes_nothing() {
        let store = InMemoryLedgerStore::new();
        store
            .insert_order(sample_order(1_000, "alice"))
            .await
            .unwrap();

        // Order 2_000 reuses line I-1003 from the first order.
        let mut second = sample_order(2_000, "alice");
        second.items[2].line_number = LineNumber::from_id(1_003);

        let err = store.insert_order(second).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidBatch(_)));
        assert_eq!(store.order_count().await, 1);
        assert_eq!(store.sub_order_count().await, 2);
        assert_eq!(store.item_count().await, 3);
    }

    #[tokio::test]
    async fn failed_write_leaves_no_rows() {
        let store = InMemoryLedgerStore::new();
        store.set_fail_on_write(true).await;

        let err = store
            .insert_order(sample_order(1_000, "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unavailable(_)));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.item_count().await, 0);
    }

    #[tokio::test]
    async fn lists_customer_orders_newest_first() {
        let store = InMemoryLedgerStore::new();
        let mut older = sample_order(1_000, "alice");
        older.master.created_at -= chrono::Duration::minutes(5);
        store.insert_order(older).await.unwrap();
        store
            .insert_order(sample_order(2_000, "alice"))
            .await
            .unwrap();
        store
            .insert_order(sample_order(3_000, "bob"))
            .await
            .unwrap();

        let orders = store
            .list_orders_for_customer(&CustomerId::new("alice"))
            .await
            .unwrap();
        let numbers: Vec<_> = orders.iter().map(|o| o.order_number.as_u64()).collect();
        assert_eq!(numbers, vec![2_000, 1_000]);
    }
}
