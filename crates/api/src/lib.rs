//! HTTP API server with observability for marketplace order placement.
//!
//! Provides REST endpoints for placing and reading orders and for catalog
//! lookups, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use catalog::CatalogStore;
use domain::{OrderQueryService, PlacementConfig, PlacementEngine};
use id_generator::SnowflakeGenerator;
use ledger::LedgerStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Catalog handle shared by the engine and the product routes.
pub type SharedCatalog = Arc<dyn CatalogStore>;

/// Ledger handle shared by the engine and the query service.
pub type SharedLedger = Arc<dyn LedgerStore>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub placement: PlacementEngine<SharedCatalog, SharedLedger>,
    pub queries: OrderQueryService<SharedLedger>,
    pub catalog: SharedCatalog,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::place))
        .route("/orders/{order_number}", get(routes::orders::get))
        .route("/orders/{order_number}/detail", get(routes::orders::detail))
        .route(
            "/customers/{customer_id}/orders",
            get(routes::orders::list_for_customer),
        )
        .route("/products", get(routes::products::search))
        .route("/products/{product_id}", get(routes::products::get))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the engine and the query service to the given stores.
pub fn create_default_state(
    catalog: SharedCatalog,
    ledger: SharedLedger,
    ids: Arc<SnowflakeGenerator>,
    config: PlacementConfig,
) -> Arc<AppState> {
    let placement = PlacementEngine::new(catalog.clone(), ledger.clone(), ids, config);
    let queries = OrderQueryService::new(ledger).with_timeout(config.store_timeout);

    Arc::new(AppState {
        placement,
        queries,
        catalog,
    })
}
