//! Order placement and order read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderNumber;
use domain::{CustomerId, MasterOrder, OrderDetail, PlaceOrder};

use crate::AppState;
use crate::error::ApiError;

/// POST /orders: place an order for a cart.
#[tracing::instrument(skip(state, payload))]
pub async fn place(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PlaceOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<MasterOrder>), ApiError> {
    let Json(req) = payload.map_err(invalid_cart)?;
    let placed = state.placement.place_order(req).await?;
    Ok((StatusCode::CREATED, Json(placed.order)))
}

/// GET /orders/{order_number}: load a master order.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(order_number): Path<String>,
) -> Result<Json<MasterOrder>, ApiError> {
    let number = parse_order_number(&order_number)?;
    let order = state
        .queries
        .get_order(number)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {number} not found")))?;
    Ok(Json(order))
}

/// GET /orders/{order_number}/detail: load a master order with its sub-orders and lines.
#[tracing::instrument(skip(state))]
pub async fn detail(
    State(state): State<Arc<AppState>>,
    Path(order_number): Path<String>,
) -> Result<Json<OrderDetail>, ApiError> {
    let number = parse_order_number(&order_number)?;
    let detail = state
        .queries
        .get_order_detail(number)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {number} not found")))?;
    Ok(Json(detail))
}

/// GET /customers/{customer_id}/orders: list a customer's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_for_customer(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
) -> Result<Json<Vec<MasterOrder>>, ApiError> {
    let orders = state
        .queries
        .list_orders(&CustomerId::new(customer_id))
        .await?;
    Ok(Json(orders))
}

/// Body rejections are cart validation failures, counted with the engine's own.
fn invalid_cart(rejection: JsonRejection) -> ApiError {
    metrics::counter!("order_placement_failures_total", "reason" => "validation").increment(1);
    tracing::info!(error = %rejection.body_text(), "order request rejected");
    ApiError::InvalidCart(rejection.body_text())
}

fn parse_order_number(raw: &str) -> Result<OrderNumber, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid order number: {e}")))
}
