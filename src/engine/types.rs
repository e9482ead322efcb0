//! Engine types
//!
//! Configuration, sources and results of one bounded sync slice.

use crate::budget::BudgetConfig;
use crate::continuation::Continuation;
use crate::entity::ResourceKind;
use crate::fetch::{PrimaryFetcher, SecondaryFetcher};
use crate::types::Row;
use chrono::{DateTime, Utc};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Wall clock used for rate-budget projection
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The fetchers one sync reads from
#[derive(Clone, Copy)]
pub struct SyncSource<'a> {
    pub kind: ResourceKind,
    pub primary: &'a dyn PrimaryFetcher,
    /// Custom-field lookup; only consulted when custom fields are selected
    pub secondary: Option<&'a dyn SecondaryFetcher>,
}

impl<'a> SyncSource<'a> {
    /// A source without custom-field lookup
    pub fn new(kind: ResourceKind, primary: &'a dyn PrimaryFetcher) -> Self {
        Self {
            kind,
            primary,
            secondary: None,
        }
    }

    /// Attach a custom-field lookup
    #[must_use]
    pub fn with_secondary(mut self, secondary: &'a dyn SecondaryFetcher) -> Self {
        self.secondary = Some(secondary);
        self
    }
}

impl std::fmt::Debug for SyncSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSource")
            .field("kind", &self.kind)
            .field("has_secondary", &self.secondary.is_some())
            .finish_non_exhaustive()
    }
}

/// Output of one slice
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSlice {
    /// Fully resolved rows, in listing order
    pub rows: Vec<Row>,
    /// `None` once the logical sync is complete
    pub continuation: Option<Continuation>,
    /// Set when the slice yielded without doing any work
    pub deferred_by: Option<Duration>,
}

impl SyncSlice {
    /// Check if this was the last slice
    pub fn is_final(&self) -> bool {
        self.continuation.is_none()
    }

    /// Check if the slice was deferred for rate budget
    pub fn is_deferred(&self) -> bool {
        self.deferred_by.is_some()
    }
}

/// Configuration for sync slices
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Records asked for per primary page when the listing is not cost-metered
    pub primary_page_size: NonZeroU32,
    /// Most records augmented per slice; the rate budget may lower it
    pub secondary_batch_size: NonZeroU32,
    /// Retries of one secondary batch before it is emitted as is
    pub max_secondary_retries: u32,
    pub budget: BudgetConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            primary_page_size: NonZeroU32::new(250).unwrap_or(NonZeroU32::MIN),
            secondary_batch_size: NonZeroU32::new(50).unwrap_or(NonZeroU32::MIN),
            max_secondary_retries: 3,
            budget: BudgetConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the primary page size
    #[must_use]
    pub fn with_primary_page_size(mut self, size: NonZeroU32) -> Self {
        self.primary_page_size = size;
        self
    }

    /// Set the secondary batch size
    #[must_use]
    pub fn with_secondary_batch_size(mut self, size: NonZeroU32) -> Self {
        self.secondary_batch_size = size;
        self
    }

    /// Set max secondary retries
    #[must_use]
    pub fn with_max_secondary_retries(mut self, retries: u32) -> Self {
        self.max_secondary_retries = retries;
        self
    }

    /// Set the budget limits
    #[must_use]
    pub fn with_budget(mut self, budget: BudgetConfig) -> Self {
        self.budget = budget;
        self
    }
}

/// Statistics across the slices run by one engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Slices run
    pub slices: usize,
    /// Rows emitted
    pub records_synced: usize,
    /// Primary pages fetched
    pub pages_fetched: usize,
    /// Secondary calls issued
    pub secondary_calls: usize,
    /// Secondary batches asked to be retried
    pub retries: usize,
    /// Slices deferred for rate budget
    pub deferrals: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records
    pub fn add_records(&mut self, count: usize) {
        self.records_synced += count;
    }

    /// Add a page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    pub fn add_secondary_call(&mut self) {
        self.secondary_calls += 1;
    }

    pub fn add_retry(&mut self) {
        self.retries += 1;
    }

    pub fn add_deferral(&mut self) {
        self.deferrals += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
