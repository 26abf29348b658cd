//! Application configuration loaded from environment variables.

use std::time::Duration;

use domain::{PlacementConfig, StockPolicy};
use thiserror::Error;

/// A variable was set to something that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value {value:?} for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL ledger; in-memory ledger when unset
/// - `CATALOG_URL`: Elasticsearch base URL; in-memory catalog when unset
/// - `CATALOG_INDEX`: index holding products (default: `"product"`)
/// - `NODE_ID`: id generator node id, 0..=1023 (default: `1`)
/// - `STORE_TIMEOUT_MS`: per-call store timeout (default: `5000`)
/// - `STOCK_POLICY`: `decrement-after-commit` (default) or `reserve-before-commit`
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub catalog_url: Option<String>,
    pub catalog_index: String,
    pub node_id: u16,
    pub store_timeout: Duration,
    pub stock_policy: StockPolicy,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        Ok(Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: non_empty("DATABASE_URL"),
            catalog_url: non_empty("CATALOG_URL"),
            catalog_index: non_empty("CATALOG_INDEX").unwrap_or(defaults.catalog_index),
            node_id: parse_var(&lookup, "NODE_ID")?.unwrap_or(defaults.node_id),
            store_timeout: parse_var::<u64>(&lookup, "STORE_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            stock_policy: parse_var(&lookup, "STOCK_POLICY")?.unwrap_or(defaults.stock_policy),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings for the placement engine.
    pub fn placement(&self) -> PlacementConfig {
        PlacementConfig::default()
            .with_store_timeout(self.store_timeout)
            .with_stock_policy(self.stock_policy)
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError {
                    var,
                    value: value.clone(),
                    reason: e.to_string(),
                })
        }
        _ => Ok(None),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            catalog_url: None,
            catalog_index: "product".to_string(),
            node_id: 1,
            store_timeout: Duration::from_millis(5000),
            stock_policy: StockPolicy::DecrementAfterCommit,
        }
    }
}
