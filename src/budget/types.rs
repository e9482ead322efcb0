//! Rate budget types
//!
//! The remote GraphQL API reports the cost of every query together with a
//! leaky-bucket throttle status. These samples are stored in the
//! continuation so the next slice can size its work before sending anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Throttle status reported alongside a query cost
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleStatus {
    /// Bucket size
    pub maximum_available: f64,
    /// Points left after the query
    pub currently_available: f64,
    /// Points restored per second
    pub restore_rate: f64,
}

/// Cost accounting of one GraphQL query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryCost {
    /// Cost the server reserved before running the query
    pub requested_query_cost: f64,
    /// Cost actually charged
    #[serde(default)]
    pub actual_query_cost: Option<f64>,
    pub throttle_status: ThrottleStatus,
}

/// A cost observed at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSample {
    pub cost: QueryCost,
    pub sampled_at: DateTime<Utc>,
}

/// Rate budget data carried between slices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateBudget {
    /// Last cost sample
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_cost: Option<CostSample>,
    /// Number of entries the sampled query asked for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_max_entries_per_run: Option<u32>,
    /// Set when the previous slice yielded without doing any work
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deferred_by_ms: Option<u64>,
}

impl RateBudget {
    /// Record the cost of a query that asked for `entries` records
    pub fn record(&mut self, cost: QueryCost, entries: usize, now: DateTime<Utc>) {
        self.last_cost = Some(CostSample {
            cost,
            sampled_at: now,
        });
        self.last_max_entries_per_run = Some(entries.max(1) as u32);
    }

    /// Mark the slice as deferred
    pub fn mark_deferred(&mut self, by: Duration) {
        self.deferred_by_ms = Some(by.as_millis() as u64);
    }

    /// Check if the previous slice was deferred
    pub fn is_deferred(&self) -> bool {
        self.deferred_by_ms.is_some()
    }
}

/// Limits of the cost-metered protocol
#[derive(Debug, Clone)]
pub struct BudgetConfig {
    /// Most points a single query may cost
    pub max_query_cost: f64,
    /// Most entries a single query may ask for
    pub max_entries: u32,
    /// Wait used when the restore rate is unknown
    pub fallback_defer: Duration,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_query_cost: 1000.0,
            max_entries: 250,
            fallback_defer: Duration::from_millis(3000),
        }
    }
}

/// What the next slice may do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetEstimate {
    /// Entries to request this slice, within `[1, max_entries]`
    pub max_entries_per_run: u32,
    /// Non-zero when no fetch may happen this slice
    pub should_defer_by: Duration,
}

impl BudgetEstimate {
    /// An estimate that allows `entries` without waiting
    pub fn proceed(entries: u32) -> Self {
        Self {
            max_entries_per_run: entries,
            should_defer_by: Duration::ZERO,
        }
    }

    /// Check if the caller has to yield
    pub fn should_defer(&self) -> bool {
        !self.should_defer_by.is_zero()
    }
}
