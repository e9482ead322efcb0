//! Rate budget estimator
//!
//! Turns the last cost sample into a page size for the next query, or a
//! wait when the bucket cannot afford a single entry.

use super::types::{BudgetConfig, BudgetEstimate, RateBudget};
use chrono::{DateTime, Utc};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

/// Sizes work against the remote cost budget
#[derive(Debug, Clone, Default)]
pub struct RateBudgetEstimator {
    config: BudgetConfig,
}

impl RateBudgetEstimator {
    /// Create an estimator with the given limits
    pub fn new(config: BudgetConfig) -> Self {
        Self { config }
    }

    /// Protocol limits in use
    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Estimate the next slice
    ///
    /// Without a prior sample the default is used as is. Otherwise the
    /// per-entry cost of the sampled query is applied to the budget the
    /// bucket will have restored by `now`.
    pub fn estimate(
        &self,
        budget: &RateBudget,
        default_entries: NonZeroU32,
        now: DateTime<Utc>,
    ) -> BudgetEstimate {
        let Some(sample) = budget.last_cost else {
            return BudgetEstimate::proceed(self.clamp(default_entries.get() as f64));
        };

        let sampled_entries = budget
            .last_max_entries_per_run
            .filter(|n| *n > 0)
            .unwrap_or(default_entries.get());
        let cost_per_entry = sample.cost.requested_query_cost / f64::from(sampled_entries);
        if !cost_per_entry.is_finite() || cost_per_entry <= 0.0 {
            return BudgetEstimate::proceed(self.config.max_entries.max(1));
        }

        let throttle = sample.cost.throttle_status;
        let elapsed = (now - sample.sampled_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
            .as_secs_f64();
        let available = (throttle.currently_available + throttle.restore_rate.max(0.0) * elapsed)
            .min(throttle.maximum_available);
        let spendable = available.min(self.config.max_query_cost);
        let affordable = (spendable / cost_per_entry).floor();

        if affordable < 1.0 {
            let wait = if throttle.restore_rate > 0.0 {
                let missing = cost_per_entry - available.max(0.0);
                // a tiny restore rate can push the wait past what Duration holds
                Duration::try_from_secs_f64((missing / throttle.restore_rate).max(0.0))
                    .map_or(self.config.fallback_defer, |wait| {
                        wait.max(Duration::from_millis(1))
                    })
            } else {
                self.config.fallback_defer
            };
            debug!(
                "Budget {available:.1} cannot afford one entry at {cost_per_entry:.1}, deferring {wait:?}"
            );
            return BudgetEstimate {
                max_entries_per_run: 1,
                should_defer_by: wait,
            };
        }

        let entries = self.clamp(affordable);
        debug!("Budget {available:.1} affords {entries} entries at {cost_per_entry:.1} each");
        BudgetEstimate::proceed(entries)
    }

    /// Clamp to `[1, max_entries]`
    fn clamp(&self, entries: f64) -> u32 {
        let max = self.config.max_entries.max(1);
        if entries >= f64::from(max) {
            max
        } else {
            (entries as u32).max(1)
        }
    }
}
