//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use api::{SharedCatalog, SharedLedger};
use catalog::{ElasticsearchCatalogStore, ElasticsearchConfig, InMemoryCatalogStore};
use id_generator::SnowflakeGenerator;
use ledger::{InMemoryLedgerStore, PostgresLedgerStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn describe_metrics() {
    metrics::describe_counter!("orders_placed_total", "Orders committed to the ledger");
    metrics::describe_counter!(
        "order_placement_failures_total",
        "Placement attempts that failed, by reason"
    );
    metrics::describe_histogram!(
        "order_placement_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent placing an order"
    );
    metrics::describe_counter!(
        "inventory_decrement_failures_total",
        "Stock decrements that failed after the order was committed"
    );
    metrics::describe_counter!(
        "inventory_release_failures_total",
        "Reserved stock that could not be given back"
    );
    metrics::describe_counter!(
        "id_generator_clock_regressions_total",
        "Times the id generator saw the clock move backwards"
    );
}

async fn connect_ledger(config: &Config) -> SharedLedger {
    let Some(ref url) = config.database_url else {
        tracing::warn!("DATABASE_URL not set, using in-memory ledger");
        return Arc::new(InMemoryLedgerStore::new());
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(config.store_timeout)
        .connect(url)
        .await
        .expect("failed to connect to PostgreSQL");
    let store = PostgresLedgerStore::new(pool);
    store
        .run_migrations()
        .await
        .expect("failed to run ledger migrations");
    tracing::info!("connected to PostgreSQL ledger");
    Arc::new(store)
}

async fn connect_catalog(config: &Config) -> SharedCatalog {
    let Some(ref url) = config.catalog_url else {
        tracing::warn!("CATALOG_URL not set, using empty in-memory catalog");
        return Arc::new(InMemoryCatalogStore::new());
    };

    let store = ElasticsearchCatalogStore::new(ElasticsearchConfig {
        base_url: url.clone(),
        index: config.catalog_index.clone(),
        timeout: config.store_timeout,
    })
    .expect("invalid catalog configuration");

    if let Err(e) = store.ping().await {
        tracing::warn!(error = %e, "catalog not reachable yet, continuing");
    } else if let Err(e) = store.ensure_index().await {
        tracing::warn!(error = %e, "could not ensure catalog index");
    } else {
        tracing::info!(index = %config.catalog_index, "connected to Elasticsearch catalog");
    }
    Arc::new(store)
}

#[tokio::main]
async fn main() {
    let config = Config::from_env().expect("invalid configuration");

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    describe_metrics();

    // 3. Connect stores and build application state
    let ledger = connect_ledger(&config).await;
    let catalog = connect_catalog(&config).await;
    let ids = Arc::new(SnowflakeGenerator::new(config.node_id).expect("invalid NODE_ID"));
    tracing::info!(
        node_id = config.node_id,
        stock_policy = %config.stock_policy,
        store_timeout_ms = config.store_timeout.as_millis() as u64,
        "placement engine configured"
    );
    let state = api::create_default_state(catalog, ledger, ids, config.placement());

    // 4. Build the application
    let app = api::create_app(state, metrics_handle);

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
