//! Order placement engine.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use catalog::{CatalogError, Product};
use chrono::{SubsecRound, Utc};
use common::{LineNumber, SubOrderNumber};
use id_generator::SnowflakeGenerator;
use ledger::{ItemStatus, LedgerError, MAX_ID_LEN, NewOrder};
use serde::Serialize;

use crate::config::{PlacementConfig, StockPolicy};
use crate::error::{PlacementError, Result};
use crate::{
    CatalogStore, CustomerId, LedgerStore, MasterOrder, Money, OrderItem, OrderNumber, PlaceOrder,
    ProductId, SellerId, SubOrder,
};

/// A stock decrement that could not be applied after the order was committed.
///
/// The order itself is valid; the catalog quantity for `product_id` is stale
/// by `quantity` units until someone reconciles it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryUpdateFailed {
    pub order_number: OrderNumber,
    pub product_id: ProductId,
    pub quantity: u32,
    pub reason: String,
}

/// Everything written for a successful placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedOrder {
    pub order: MasterOrder,
    pub sub_orders: Vec<SubOrder>,
    pub items: Vec<OrderItem>,
    pub inventory_failures: Vec<InventoryUpdateFailed>,
}

impl PlacedOrder {
    fn new(order: NewOrder, inventory_failures: Vec<InventoryUpdateFailed>) -> Self {
        Self {
            order: order.master,
            sub_orders: order.sub_orders,
            items: order.items,
            inventory_failures,
        }
    }

    pub fn order_number(&self) -> OrderNumber {
        self.order.order_number
    }

    /// False when some stock decrement did not go through.
    pub fn is_inventory_consistent(&self) -> bool {
        self.inventory_failures.is_empty()
    }
}

/// A cart line joined with the catalog record read for it.
#[derive(Debug)]
struct PricedLine {
    product_id: ProductId,
    seller_id: SellerId,
    quantity: u32,
    /// Price at the moment of the read, frozen into the order line.
    unit_price: Money,
    total: Money,
}

/// Places orders: checks stock, writes the ledger atomically, adjusts stock.
///
/// The engine holds no mutable state of its own. The catalog, the ledger and
/// the id generator are injected by the host, which also owns their
/// lifecycle.
pub struct PlacementEngine<C, L> {
    catalog: C,
    ledger: L,
    ids: Arc<SnowflakeGenerator>,
    config: PlacementConfig,
}

impl<C, L> PlacementEngine<C, L>
where
    C: CatalogStore,
    L: LedgerStore,
{
    /// Creates a new placement engine.
    pub fn new(catalog: C, ledger: L, ids: Arc<SnowflakeGenerator>, config: PlacementConfig) -> Self {
        Self {
            catalog,
            ledger,
            ids,
            config,
        }
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Places an order for the cart in `command`.
    ///
    /// Either the master order, every sub-order and every line are committed
    /// together, or nothing is written to the ledger. Stock handling follows
    /// the configured [`StockPolicy`].
    #[tracing::instrument(
        skip(self, command),
        fields(
            customer_id = %command.customer_id,
            lines = command.items.len(),
            order_number = tracing::field::Empty
        )
    )]
    pub async fn place_order(&self, command: PlaceOrder) -> Result<PlacedOrder> {
        let start = Instant::now();
        let result = self.place(command).await;
        metrics::histogram!("order_placement_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        match &result {
            Ok(placed) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    total = %placed.order.total_amount,
                    sub_orders = placed.sub_orders.len(),
                    inventory_failures = placed.inventory_failures.len(),
                    "order placed"
                );
            }
            Err(e) => {
                metrics::counter!("order_placement_failures_total", "reason" => e.reason())
                    .increment(1);
                if e.is_client_error() {
                    tracing::info!(error = %e, "order rejected");
                } else {
                    tracing::error!(error = %e, "order placement failed");
                }
            }
        }
        result
    }

    async fn place(&self, command: PlaceOrder) -> Result<PlacedOrder> {
        command.validate()?;

        let lines = self.price_lines(&command).await?;
        let order = self.build_order(&command.customer_id, &lines)?;
        tracing::Span::current().record(
            "order_number",
            tracing::field::display(order.order_number()),
        );

        match self.config.stock_policy {
            StockPolicy::DecrementAfterCommit => {
                self.commit(order.clone()).await?;
                let failures = self.decrement_committed(&order).await;
                Ok(PlacedOrder::new(order, failures))
            }
            StockPolicy::ReserveBeforeCommit => {
                self.reserve(&order.items).await?;
                // A commit that timed out may still land in the ledger; the
                // release below then hands back stock for a stored order.
                if let Err(e) = self.commit(order.clone()).await {
                    self.release(&order.items).await;
                    return Err(e);
                }
                Ok(PlacedOrder::new(order, Vec::new()))
            }
        }
    }

    /// Reads every product once and checks stock against the combined
    /// quantity requested for it, failing at the first offending line.
    async fn price_lines(&self, command: &PlaceOrder) -> Result<Vec<PricedLine>> {
        let mut products: HashMap<ProductId, Product> = HashMap::new();
        let mut requested: HashMap<ProductId, u64> = HashMap::new();
        let mut lines = Vec::with_capacity(command.items.len());

        for line in &command.items {
            let product = match products.entry(line.product_id.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let product = self.fetch_product(&line.product_id).await?;
                    entry.insert(product)
                }
            };

            check_listing(product)?;

            let wanted = requested.entry(line.product_id.clone()).or_default();
            *wanted += u64::from(line.quantity);
            if *wanted > u64::from(product.quantity) {
                return Err(PlacementError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    requested: u32::try_from(*wanted).unwrap_or(u32::MAX),
                    available: product.quantity,
                });
            }

            let total = product
                .price
                .checked_multiply(line.quantity)
                .ok_or_else(|| PlacementError::AmountOverflow(line.product_id.clone()))?;

            lines.push(PricedLine {
                product_id: line.product_id.clone(),
                seller_id: product.seller_id.clone(),
                quantity: line.quantity,
                unit_price: product.price,
                total,
            });
        }

        Ok(lines)
    }

    async fn fetch_product(&self, product_id: &ProductId) -> Result<Product> {
        self.catalog_call(self.catalog.get(product_id))
            .await
            .map_err(catalog_error)?
            .ok_or_else(|| PlacementError::ProductNotFound(product_id.clone()))
    }

    fn build_order(&self, customer_id: &CustomerId, lines: &[PricedLine]) -> Result<NewOrder> {
        let order_number = OrderNumber::new(self.ids.next()?);
        let now = Utc::now().trunc_subsecs(6);

        let groups = group_by_seller(lines);
        let mut sub_orders = Vec::with_capacity(groups.len());
        let mut items = Vec::with_capacity(lines.len());
        let mut order_total = Money::zero();

        for (seller_id, group) in groups {
            let sub_order_number = SubOrderNumber::from_id(self.ids.next()?);
            let mut sub_total = Money::zero();

            for line in group {
                let overflow = || PlacementError::AmountOverflow(line.product_id.clone());
                sub_total = sub_total.checked_add(line.total).ok_or_else(overflow)?;
                order_total = order_total.checked_add(line.total).ok_or_else(overflow)?;

                items.push(OrderItem {
                    line_number: LineNumber::from_id(self.ids.next()?),
                    master_order_number: order_number,
                    sub_order_number: sub_order_number.clone(),
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    total_amount: line.total,
                    status: ItemStatus::Placed,
                });
            }

            sub_orders.push(SubOrder {
                sub_order_number,
                master_order_number: order_number,
                seller_id: seller_id.clone(),
                total_amount: sub_total,
            });
        }

        Ok(NewOrder {
            master: MasterOrder {
                order_number,
                customer_id: customer_id.clone(),
                total_amount: order_total,
                created_at: now,
                updated_at: now,
            },
            sub_orders,
            items,
        })
    }

    async fn commit(&self, order: NewOrder) -> Result<()> {
        self.ledger_call(self.ledger.insert_order(order))
            .await
            .map_err(|e| PlacementError::LedgerWriteFailed(e.to_string()))
    }

    /// Applies one relative decrement per committed line.
    async fn decrement_committed(&self, order: &NewOrder) -> Vec<InventoryUpdateFailed> {
        let mut failures = Vec::new();

        for item in &order.items {
            match self
                .catalog_call(self.catalog.decrement_quantity(&item.product_id, item.quantity))
                .await
            {
                Ok(remaining) => {
                    tracing::debug!(product_id = %item.product_id, remaining, "stock decremented");
                }
                Err(e) => {
                    metrics::counter!("inventory_decrement_failures_total").increment(1);
                    tracing::warn!(
                        order_number = %item.master_order_number,
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        error = %e,
                        "stock decrement failed after commit, needs reconciliation"
                    );
                    failures.push(InventoryUpdateFailed {
                        order_number: item.master_order_number,
                        product_id: item.product_id.clone(),
                        quantity: item.quantity,
                        reason: e.to_string(),
                    });
                }
            }
        }

        failures
    }

    /// Takes stock for every line; on the first refusal gives back what was taken.
    ///
    /// A decrement that times out is treated as not applied and is not
    /// released, even though the store may have applied it.
    async fn reserve(&self, items: &[OrderItem]) -> Result<()> {
        let mut reserved = Vec::with_capacity(items.len());

        for item in items {
            let taken = self
                .catalog_call(self.catalog.decrement_quantity(&item.product_id, item.quantity))
                .await;
            if let Err(e) = taken {
                self.release(reserved).await;
                return Err(catalog_error(e));
            }
            reserved.push(item);
        }

        Ok(())
    }

    async fn release<'a>(&self, items: impl IntoIterator<Item = &'a OrderItem>) {
        for item in items {
            let released = self
                .catalog_call(self.catalog.increment_quantity(&item.product_id, item.quantity))
                .await;
            if let Err(e) = released {
                metrics::counter!("inventory_release_failures_total").increment(1);
                tracing::error!(
                    order_number = %item.master_order_number,
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    error = %e,
                    "failed to release reserved stock"
                );
            }
        }
    }

    async fn catalog_call<T>(
        &self,
        call: impl Future<Output = catalog::Result<T>>,
    ) -> catalog::Result<T> {
        let limit = self.config.store_timeout;
        tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
            Err(CatalogError::Unavailable(format!(
                "catalog call timed out after {limit:?}"
            )))
        })
    }

    async fn ledger_call<T>(&self, call: impl Future<Output = ledger::Result<T>>) -> ledger::Result<T> {
        let limit = self.config.store_timeout;
        tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
            Err(LedgerError::Unavailable(format!(
                "ledger call timed out after {limit:?}"
            )))
        })
    }
}

/// Refuses catalog records the ledger would reject at commit.
fn check_listing(product: &Product) -> Result<()> {
    let reason = if product.price.is_negative() {
        format!("negative price {}", product.price)
    } else if product.seller_id.as_str().len() > MAX_ID_LEN {
        format!("seller id longer than {MAX_ID_LEN} bytes")
    } else {
        return Ok(());
    };
    Err(PlacementError::InvalidListing {
        product_id: product.id.clone(),
        reason,
    })
}

fn catalog_error(err: CatalogError) -> PlacementError {
    match err {
        CatalogError::NotFound(product_id) => PlacementError::ProductNotFound(product_id),
        CatalogError::InsufficientStock {
            product_id,
            requested,
            available,
        } => PlacementError::InsufficientStock {
            product_id,
            requested,
            available,
        },
        other => PlacementError::CatalogUnavailable(other.to_string()),
    }
}

/// Groups lines by seller, keeping sellers in order of first appearance and
/// lines in cart order within each group.
fn group_by_seller(lines: &[PricedLine]) -> Vec<(&SellerId, Vec<&PricedLine>)> {
    let mut slots: HashMap<&SellerId, usize> = HashMap::new();
    let mut groups: Vec<(&SellerId, Vec<&PricedLine>)> = Vec::new();

    for line in lines {
        let slot = *slots.entry(&line.seller_id).or_insert_with(|| {
            groups.push((&line.seller_id, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(line);
    }

    groups
}
