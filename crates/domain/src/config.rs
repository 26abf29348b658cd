//! Placement engine configuration.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default per-call timeout on catalog and ledger calls.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// How the engine keeps catalog stock in step with placed orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockPolicy {
    /// Check stock, commit the order, then decrement stock line by line.
    ///
    /// A decrement that fails after the commit does not undo the order; it is
    /// reported on the result and logged for reconciliation.
    #[default]
    DecrementAfterCommit,

    /// Conditionally decrement stock before the ledger write, and give it
    /// back if any reservation or the ledger write fails.
    ReserveBeforeCommit,
}

impl StockPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockPolicy::DecrementAfterCommit => "decrement-after-commit",
            StockPolicy::ReserveBeforeCommit => "reserve-before-commit",
        }
    }
}

impl std::fmt::Display for StockPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown stock policy {0:?}; expected decrement-after-commit or reserve-before-commit")]
pub struct ParseStockPolicyError(pub String);

impl FromStr for StockPolicy {
    type Err = ParseStockPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "decrement-after-commit" => Ok(StockPolicy::DecrementAfterCommit),
            "reserve-before-commit" => Ok(StockPolicy::ReserveBeforeCommit),
            _ => Err(ParseStockPolicyError(s.to_string())),
        }
    }
}

/// Settings handed to the placement engine by its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementConfig {
    pub store_timeout: Duration,
    pub stock_policy: StockPolicy,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
            stock_policy: StockPolicy::default(),
        }
    }
}

impl PlacementConfig {
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_stock_policy(mut self, policy: StockPolicy) -> Self {
        self.stock_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_policy_names() {
        assert_eq!(
            "decrement-after-commit".parse::<StockPolicy>().unwrap(),
            StockPolicy::DecrementAfterCommit
        );
        assert_eq!(
            " Reserve-Before-Commit ".parse::<StockPolicy>().unwrap(),
            StockPolicy::ReserveBeforeCommit
        );
        assert!("lock-everything".parse::<StockPolicy>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for policy in [
            StockPolicy::DecrementAfterCommit,
            StockPolicy::ReserveBeforeCommit,
        ] {
            assert_eq!(policy.to_string().parse::<StockPolicy>().unwrap(), policy);
        }
    }
}
