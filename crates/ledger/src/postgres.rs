use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    CustomerId, ItemStatus, LedgerError, LedgerStore, LineNumber, MasterOrder, Money, NewOrder,
    OrderItem, OrderNumber, ProductId, Result, SellerId, SubOrder, SubOrderNumber,
};

/// PostgreSQL-backed ledger store.
#[derive(Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    /// Creates a new PostgreSQL ledger store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_master(row: PgRow) -> Result<MasterOrder> {
        Ok(MasterOrder {
            order_number: order_number_from_db(row.try_get("order_number")?)?,
            customer_id: CustomerId::new(row.try_get::<String, _>("customer_id")?),
            total_amount: Money::from_cents(row.try_get("total_amount")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_sub_order(row: PgRow) -> Result<SubOrder> {
        Ok(SubOrder {
            sub_order_number: SubOrderNumber::from_raw(
                row.try_get::<String, _>("sub_order_number")?,
            ),
            master_order_number: order_number_from_db(row.try_get("master_order_number")?)?,
            seller_id: SellerId::new(row.try_get::<String, _>("seller_id")?),
            total_amount: Money::from_cents(row.try_get("total_amount")?),
        })
    }

    fn row_to_item(row: PgRow) -> Result<OrderItem> {
        let quantity: i64 = row.try_get("quantity")?;
        let status: String = row.try_get("status")?;

        Ok(OrderItem {
            line_number: LineNumber::from_raw(row.try_get::<String, _>("line_number")?),
            master_order_number: order_number_from_db(row.try_get("master_order_number")?)?,
            sub_order_number: SubOrderNumber::from_raw(
                row.try_get::<String, _>("sub_order_number")?,
            ),
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            quantity: u32::try_from(quantity).map_err(|_| {
                LedgerError::CorruptRecord(format!("quantity {quantity} out of range"))
            })?,
            unit_price: Money::from_cents(row.try_get("unit_price")?),
            total_amount: Money::from_cents(row.try_get("total_amount")?),
            status: status.parse::<ItemStatus>()?,
        })
    }
}

/// Order numbers are stored as BIGINT; generator values always fit.
fn order_number_to_db(number: OrderNumber) -> Result<i64> {
    i64::try_from(number.as_u64())
        .map_err(|_| LedgerError::InvalidBatch(format!("order number {number} exceeds BIGINT")))
}

fn order_number_from_db(raw: i64) -> Result<OrderNumber> {
    u64::try_from(raw)
        .map(OrderNumber::new)
        .map_err(|_| LedgerError::CorruptRecord(format!("negative order number {raw}")))
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[tracing::instrument(skip(self, order), fields(order_number = %order.order_number()))]
    async fn insert_order(&self, order: NewOrder) -> Result<()> {
        order.validate()?;
        let number = order.order_number();
        let db_number = order_number_to_db(number)?;

        // Start a transaction
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO master_orders (order_number, customer_id, total_amount, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(db_number)
        .bind(order.master.customer_id.as_str())
        .bind(order.master.total_amount.cents())
        .bind(order.master.created_at)
        .bind(order.master.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("master_orders_pkey")
            {
                return LedgerError::DuplicateOrder(number);
            }
            LedgerError::Database(e)
        })?;

        for (position, sub) in order.sub_orders.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sub_orders (sub_order_number, master_order_number, seller_id, total_amount, position)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(sub.sub_order_number.as_str())
            .bind(db_number)
            .bind(sub.seller_id.as_str())
            .bind(sub.total_amount.cents())
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (line_number, master_order_number, sub_order_number, product_id,
                                         quantity, unit_price, total_amount, status, position)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(item.line_number.as_str())
            .bind(db_number)
            .bind(item.sub_order_number.as_str())
            .bind(item.product_id.as_str())
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.cents())
            .bind(item.total_amount.cents())
            .bind(item.status.as_str())
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(
            sub_orders = order.sub_orders.len(),
            items = order.items.len(),
            "order committed"
        );
        Ok(())
    }

    async fn get_order(&self, order_number: OrderNumber) -> Result<Option<MasterOrder>> {
        let Ok(db_number) = order_number_to_db(order_number) else {
            return Ok(None);
        };

        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT order_number, customer_id, total_amount, created_at, updated_at
            FROM master_orders
            WHERE order_number = $1
            "#,
        )
        .bind(db_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_master).transpose()
    }

    async fn get_sub_orders(&self, order_number: OrderNumber) -> Result<Vec<SubOrder>> {
        let Ok(db_number) = order_number_to_db(order_number) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query(
            r#"
            SELECT sub_order_number, master_order_number, seller_id, total_amount
            FROM sub_orders
            WHERE master_order_number = $1
            ORDER BY position ASC
            "#,
        )
        .bind(db_number)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_sub_order).collect()
    }

    async fn get_items(&self, order_number: OrderNumber) -> Result<Vec<OrderItem>> {
        let Ok(db_number) = order_number_to_db(order_number) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query(
            r#"
            SELECT line_number, master_order_number, sub_order_number, product_id,
                   quantity, unit_price, total_amount, status
            FROM order_items
            WHERE master_order_number = $1
            ORDER BY position ASC
            "#,
        )
        .bind(db_number)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_item).collect()
    }

    async fn list_orders_for_customer(&self, customer_id: &CustomerId) -> Result<Vec<MasterOrder>> {
        let rows = sqlx::query(
            r#"
            SELECT order_number, customer_id, total_amount, created_at, updated_at
            FROM master_orders
            WHERE customer_id = $1
            ORDER BY created_at DESC, order_number DESC
            "#,
        )
        .bind(customer_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_master).collect()
    }
}
