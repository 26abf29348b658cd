use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{CatalogError, CatalogStore, Product, ProductId, Result, SearchQuery, SortField, SortOrder};

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    products: HashMap<ProductId, Product>,
    unavailable: bool,
    failing_decrements: HashSet<ProductId>,
    latency: Option<Duration>,
}

/// In-memory catalog store for testing and local runs.
///
/// Provides the same contract as the Elasticsearch adapter, plus failure
/// injection hooks so callers can exercise degraded paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryCatalogStore {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog pre-populated with `products`.
    pub async fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write().await;
            for product in products {
                state.products.insert(product.id.clone(), product);
            }
        }
        store
    }

    /// Returns the stored quantity of a product, ignoring injected failures.
    pub async fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.state
            .read()
            .await
            .products
            .get(product_id)
            .map(|p| p.quantity)
    }

    /// Returns the number of stored products.
    pub async fn product_count(&self) -> usize {
        self.state.read().await.products.len()
    }

    /// Makes every operation fail with `Unavailable` while set.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Makes decrements of `product_id` fail with `Unavailable`.
    pub async fn fail_decrements_for(&self, product_id: impl Into<ProductId>) {
        self.state
            .write()
            .await
            .failing_decrements
            .insert(product_id.into());
    }

    /// Delays every operation by `latency` before it touches the data.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.write().await.latency = latency;
    }

    async fn simulate_backend(&self) -> Result<()> {
        let (latency, unavailable) = {
            let state = self.state.read().await;
            (state.latency, state.unavailable)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if unavailable {
            return Err(CatalogError::Unavailable(
                "in-memory catalog marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn get(&self, product_id: &ProductId) -> Result<Option<Product>> {
        self.simulate_backend().await?;
        Ok(self.state.read().await.products.get(product_id).cloned())
    }

    async fn put_product(&self, product: Product) -> Result<()> {
        self.simulate_backend().await?;
        self.state
            .write()
            .await
            .products
            .insert(product.id.clone(), product);
        Ok(())
    }

    async fn update_quantity(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        self.simulate_backend().await?;
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(product_id)
            .ok_or_else(|| CatalogError::NotFound(product_id.clone()))?;
        product.quantity = quantity;
        Ok(())
    }

    async fn decrement_quantity(&self, product_id: &ProductId, count: u32) -> Result<u32> {
        self.simulate_backend().await?;
        let mut state = self.state.write().await;
        if state.failing_decrements.contains(product_id) {
            return Err(CatalogError::Unavailable(format!(
                "decrement of {product_id} rejected"
            )));
        }

        let product = state
            .products
            .get_mut(product_id)
            .ok_or_else(|| CatalogError::NotFound(product_id.clone()))?;
        if product.quantity < count {
            return Err(CatalogError::InsufficientStock {
                product_id: product_id.clone(),
                requested: count,
                available: product.quantity,
            });
        }
        product.quantity -= count;
        Ok(product.quantity)
    }

    async fn increment_quantity(&self, product_id: &ProductId, count: u32) -> Result<u32> {
        self.simulate_backend().await?;
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(product_id)
            .ok_or_else(|| CatalogError::NotFound(product_id.clone()))?;
        product.quantity = product.quantity.saturating_add(count);
        Ok(product.quantity)
    }

    async fn search(&self, query: SearchQuery) -> Result<Vec<Product>> {
        self.simulate_backend().await?;
        let state = self.state.read().await;
        let mut hits: Vec<Product> = state
            .products
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();

        hits.sort_by(|a, b| {
            let ordering = match query.sort_field {
                SortField::Price => a.price.cmp(&b.price),
                SortField::Quantity => a.quantity.cmp(&b.quantity),
            };
            let ordering = match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            ordering.then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(query.limit);

        Ok(hits)
    }
}
