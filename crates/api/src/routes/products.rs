//! Catalog lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use catalog::{CatalogStore, Product, ProductId, SearchQuery, SortField, SortOrder};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;

const MAX_SEARCH_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub seller_id: Option<String>,
    #[serde(default)]
    pub include_out_of_stock: bool,
    pub sort: Option<SortField>,
    pub order: Option<SortOrder>,
    pub limit: Option<usize>,
}

impl SearchParams {
    fn into_query(self) -> Result<SearchQuery, ApiError> {
        let keyword = self
            .keyword
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("keyword is required".to_string()))?;

        let mut query = SearchQuery::keyword(keyword);
        if let Some(category) = self.category {
            query = query.category(category);
        }
        if let Some(seller_id) = self.seller_id {
            query = query.seller(seller_id);
        }
        if self.include_out_of_stock {
            query = query.include_out_of_stock();
        }
        query = query.sort_by(
            self.sort.unwrap_or_default(),
            self.order.unwrap_or_default(),
        );
        if let Some(limit) = self.limit {
            query = query.limit(limit.clamp(1, MAX_SEARCH_LIMIT));
        }
        Ok(query)
    }
}

/// GET /products?keyword=...: keyword search over the catalog.
#[tracing::instrument(skip(state))]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let query = params.into_query()?;
    let hits = state.catalog.search(query).await?;
    Ok(Json(hits))
}

/// GET /products/{product_id}: load one product.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .catalog
        .get(&ProductId::new(product_id.as_str()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product {product_id} not found")))?;
    Ok(Json(product))
}
