use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    CustomerId, LedgerError, LineNumber, Money, OrderNumber, ProductId, Result, SellerId,
    SubOrderNumber,
};

/// Longest customer, seller or product id the ledger stores, in bytes.
pub const MAX_ID_LEN: usize = 64;

/// Lifecycle tag of an order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ItemStatus {
    /// The line has been placed and awaits fulfillment.
    #[default]
    Placed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Placed => "placed",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "placed" => Ok(ItemStatus::Placed),
            other => Err(LedgerError::CorruptRecord(format!(
                "unknown item status {other:?}"
            ))),
        }
    }
}

/// The single record representing a customer's checkout across all sellers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterOrder {
    pub order_number: OrderNumber,
    pub customer_id: CustomerId,
    /// Sum of every line subtotal.
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The per-seller partition of a master order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubOrder {
    pub sub_order_number: SubOrderNumber,
    pub master_order_number: OrderNumber,
    pub seller_id: SellerId,
    /// Sum of this sub-order's line subtotals.
    pub total_amount: Money,
}

/// One product/quantity line within a sub-order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub line_number: LineNumber,
    pub master_order_number: OrderNumber,
    pub sub_order_number: SubOrderNumber,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Product price captured when the order was placed.
    pub unit_price: Money,
    /// `quantity * unit_price`.
    pub total_amount: Money,
    pub status: ItemStatus,
}

/// Everything written for one placed order, inserted atomically.
///
/// Sub-orders and items keep the order they are given in; reads return
/// them in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub master: MasterOrder,
    pub sub_orders: Vec<SubOrder>,
    pub items: Vec<OrderItem>,
}

impl NewOrder {
    pub fn order_number(&self) -> OrderNumber {
        self.master.order_number
    }

    /// Checks that the records reference each other and that totals add up.
    pub fn validate(&self) -> Result<()> {
        let number = self.master.order_number;
        check_id_len("customer", self.master.customer_id.as_str())?;
        if self.sub_orders.is_empty() || self.items.is_empty() {
            return Err(LedgerError::InvalidBatch(format!(
                "order {number} has no sub-orders or no items"
            )));
        }

        let mut sub_numbers = HashSet::new();
        for sub in &self.sub_orders {
            if sub.master_order_number != number {
                return Err(LedgerError::InvalidBatch(format!(
                    "sub-order {} belongs to order {}, not {number}",
                    sub.sub_order_number, sub.master_order_number
                )));
            }
            check_id_len("seller", sub.seller_id.as_str())?;
            if !sub_numbers.insert(&sub.sub_order_number) {
                return Err(LedgerError::InvalidBatch(format!(
                    "duplicate sub-order {}",
                    sub.sub_order_number
                )));
            }
        }

        let mut line_numbers = HashSet::new();
        for item in &self.items {
            if item.master_order_number != number {
                return Err(LedgerError::InvalidBatch(format!(
                    "line {} belongs to order {}, not {number}",
                    item.line_number, item.master_order_number
                )));
            }
            if !sub_numbers.contains(&item.sub_order_number) {
                return Err(LedgerError::InvalidBatch(format!(
                    "line {} references unknown sub-order {}",
                    item.line_number, item.sub_order_number
                )));
            }
            if !line_numbers.insert(&item.line_number) {
                return Err(LedgerError::InvalidBatch(format!(
                    "duplicate line {}",
                    item.line_number
                )));
            }
            check_id_len("product", item.product_id.as_str())?;
            if item.quantity == 0 {
                return Err(LedgerError::InvalidBatch(format!(
                    "line {} has zero quantity",
                    item.line_number
                )));
            }
            if item.unit_price.is_negative() {
                return Err(LedgerError::InvalidBatch(format!(
                    "line {} has a negative unit price",
                    item.line_number
                )));
            }
            if item.unit_price.checked_multiply(item.quantity) != Some(item.total_amount) {
                return Err(LedgerError::InvalidBatch(format!(
                    "line {} subtotal does not equal quantity x unit price",
                    item.line_number
                )));
            }
        }

        for sub in &self.sub_orders {
            let lines_total: Money = self
                .items
                .iter()
                .filter(|i| i.sub_order_number == sub.sub_order_number)
                .map(|i| i.total_amount)
                .sum();
            if lines_total != sub.total_amount {
                return Err(LedgerError::InvalidBatch(format!(
                    "sub-order {} total {} does not match its lines ({lines_total})",
                    sub.sub_order_number, sub.total_amount
                )));
            }
        }

        let grand_total: Money = self.sub_orders.iter().map(|s| s.total_amount).sum();
        if grand_total != self.master.total_amount {
            return Err(LedgerError::InvalidBatch(format!(
                "order total {} does not match its sub-orders ({grand_total})",
                self.master.total_amount
            )));
        }

        Ok(())
    }
}

fn check_id_len(kind: &str, id: &str) -> Result<()> {
    if id.len() > MAX_ID_LEN {
        return Err(LedgerError::InvalidBatch(format!(
            "{kind} id is {} bytes, longer than {MAX_ID_LEN}",
            id.len()
        )));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_order;
    use super::*;

    #[test]
    fn consistent_order_validates() {
        assert!(sample_order(100, "alice").validate().is_ok());
    }

    #[test]
    fn mismatched_master_total_is_rejected() {
        let mut order = sample_order(100, "alice");
        order.master.total_amount = Money::from_cents(1);
        assert!(matches!(order.validate(), Err(LedgerError::InvalidBatch(_))));
    }

    #[test]
    fn line_pointing_at_unknown_sub_order_is_rejected() {
        let mut order = sample_order(100, "alice");
        order.items[0].sub_order_number = SubOrderNumber::from_id(1);
        assert!(matches!(order.validate(), Err(LedgerError::InvalidBatch(_))));
    }

    #[test]
    fn wrong_line_subtotal_is_rejected() {
        let mut order = sample_order(100, "alice");
        order.items[1].total_amount = Money::from_cents(499);
        assert!(order.validate().is_err());
    }

    #[test]
    fn duplicate_line_numbers_are_rejected() {
        let mut order = sample_order(100, "alice");
        order.items[2].line_number = order.items[0].line_number.clone();
        assert!(order.validate().is_err());
    }

    #[test]
    fn overlong_ids_are_rejected() {
        let order = sample_order(100, &"c".repeat(MAX_ID_LEN + 1));
        assert!(matches!(order.validate(), Err(LedgerError::InvalidBatch(_))));

        let mut order = sample_order(100, &"c".repeat(MAX_ID_LEN));
        assert!(order.validate().is_ok());
        order.sub_orders[0].seller_id = SellerId::new("s".repeat(MAX_ID_LEN + 1));
        assert!(matches!(order.validate(), Err(LedgerError::InvalidBatch(_))));
    }

    #[test]
    fn negative_unit_price_is_rejected() {
        let mut order = sample_order(100, "alice");
        order.items[0].unit_price = Money::from_cents(-1);
        let err = order.validate().unwrap_err();
        assert!(err.to_string().contains("negative unit price"));
    }

    #[test]
    fn item_status_parses_and_serializes() {
        assert_eq!("placed".parse::<ItemStatus>().unwrap(), ItemStatus::Placed);
        assert!("lost".parse::<ItemStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&ItemStatus::Placed).unwrap(),
            "\"placed\""
        );
    }
}
