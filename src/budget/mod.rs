//! Rate budget module
//!
//! Cost samples reported by the GraphQL API and the estimator that turns
//! them into a safe page size or a deferral.

mod estimator;
mod types;

pub use estimator::RateBudgetEstimator;
pub use types::{BudgetConfig, BudgetEstimate, CostSample, QueryCost, RateBudget, ThrottleStatus};
