use std::sync::Arc;

use async_trait::async_trait;

use crate::{Product, ProductId, Result, SearchQuery};

/// Contract for catalog/inventory stores.
///
/// The store is external and eventually consistent with the order ledger.
/// Quantity changes go through [`decrement_quantity`](Self::decrement_quantity)
/// and [`increment_quantity`](Self::increment_quantity), which are relative
/// and applied atomically per product by the backing store, so concurrent
/// writers do not overwrite each other's changes.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fetches a product by id. Returns None if it does not exist.
    async fn get(&self, product_id: &ProductId) -> Result<Option<Product>>;

    /// Creates or replaces a product record.
    async fn put_product(&self, product: Product) -> Result<()>;

    /// Overwrites the available quantity of a product.
    async fn update_quantity(&self, product_id: &ProductId, quantity: u32) -> Result<()>;

    /// Removes `count` units from stock, only if at least `count` are available.
    ///
    /// Fails with `InsufficientStock` (leaving the record untouched) when
    /// stock is short, and with `NotFound` for unknown products.
    /// Returns the quantity left after the decrement.
    async fn decrement_quantity(&self, product_id: &ProductId, count: u32) -> Result<u32>;

    /// Returns `count` units to stock. Returns the new quantity.
    async fn increment_quantity(&self, product_id: &ProductId, count: u32) -> Result<u32>;

    /// Runs a keyword search.
    async fn search(&self, query: SearchQuery) -> Result<Vec<Product>>;
}

#[async_trait]
impl<T: CatalogStore + ?Sized> CatalogStore for Arc<T> {
    async fn get(&self, product_id: &ProductId) -> Result<Option<Product>> {
        (**self).get(product_id).await
    }

    async fn put_product(&self, product: Product) -> Result<()> {
        (**self).put_product(product).await
    }

    async fn update_quantity(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        (**self).update_quantity(product_id, quantity).await
    }

    async fn decrement_quantity(&self, product_id: &ProductId, count: u32) -> Result<u32> {
        (**self).decrement_quantity(product_id, count).await
    }

    async fn increment_quantity(&self, product_id: &ProductId, count: u32) -> Result<u32> {
        (**self).increment_quantity(product_id, count).await
    }

    async fn search(&self, query: SearchQuery) -> Result<Vec<Product>> {
        (**self).search(query).await
    }
}
