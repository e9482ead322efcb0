//! Execution engine module
//!
//! Runs one bounded slice of a logical sync.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - fetches, augments and projects one slice
//! - `SyncSource` - the fetchers a sync reads from
//! - `SyncConfig` - page and batch sizes, retry bound, budget limits
//!
//! A slice never mutates the continuation it was given. Everything it
//! learns goes into a fresh continuation, so a slice cut short can be run
//! again from the same input.

mod types;

pub use types::{Clock, SyncConfig, SyncSlice, SyncSource, SyncStats};

use crate::budget::{BudgetEstimate, RateBudgetEstimator};
use crate::continuation::{BatchRecord, Continuation};
use crate::entity::{parse_gid, Gid};
use crate::error::{Error, Result};
use crate::fetch::{PrimaryRequest, SecondaryRequest};
use crate::schema::FieldSelection;
use crate::types::{Row, StringMap};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Sync engine for one resource sync
pub struct SyncEngine {
    /// Sync configuration
    config: SyncConfig,
    estimator: RateBudgetEstimator,
    clock: Clock,
    /// Statistics
    stats: SyncStats,
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(config: SyncConfig) -> Self {
        Self {
            estimator: RateBudgetEstimator::new(config.budget.clone()),
            config,
            clock: Arc::new(Utc::now),
            stats: SyncStats::default(),
        }
    }

    /// Replace the wall clock
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.stats = SyncStats::default();
    }

    /// Run one slice
    ///
    /// `previous` is the continuation returned by the prior slice, `None`
    /// for the first. Fetch errors propagate unchanged; nothing of this
    /// slice is observable in that case.
    pub async fn run_slice(
        &mut self,
        source: &SyncSource<'_>,
        previous: Option<&Continuation>,
        selection: &FieldSelection,
        filters: &StringMap,
    ) -> Result<SyncSlice> {
        let start = Instant::now();
        self.stats.slices += 1;
        let kind = source.kind;

        if previous.is_some_and(Continuation::is_exhausted) {
            debug!("{kind} continuation already exhausted, nothing to do");
            return Ok(SyncSlice::default());
        }

        let augment = selection.requires_secondary();
        let secondary = match (augment, source.secondary) {
            (false, _) => None,
            (true, Some(fetcher)) if kind.capabilities().secondary_augmentation => Some(fetcher),
            (true, _) => return Err(Error::unsupported(kind.to_string(), "custom fields")),
        };

        // Budget check before any network call
        let mut next = previous.cloned().unwrap_or_default();
        next.rate_budget.deferred_by_ms = None;
        let metered = augment || source.primary.cost_metered();
        let default_entries = if augment {
            self.config.secondary_batch_size
        } else {
            self.config.primary_page_size
        };
        let now = (self.clock)();
        let estimate = if metered {
            self.estimator.estimate(&next.rate_budget, default_entries, now)
        } else {
            BudgetEstimate::proceed(default_entries.get())
        };

        if estimate.should_defer() {
            let mut deferred = previous.cloned().unwrap_or_default();
            deferred.rate_budget.mark_deferred(estimate.should_defer_by);
            self.stats.add_deferral();
            info!(
                "{kind} slice deferred by {}ms for rate budget",
                estimate.should_defer_by.as_millis()
            );
            return Ok(SyncSlice {
                rows: Vec::new(),
                continuation: Some(deferred),
                deferred_by: Some(estimate.should_defer_by),
            });
        }

        // Primary fetch, only with nothing of the previous page left
        if next.should_fetch_primary() {
            let page_size = if source.primary.cost_metered() {
                estimate.max_entries_per_run
            } else {
                self.config.primary_page_size.get()
            };
            let request = PrimaryRequest {
                cursor: next.primary_cursor.clone(),
                page_size,
                filters: filters.clone(),
                extra: next.extra.clone(),
            };
            let page = source.primary.fetch_page(&request).await?;
            self.stats.add_page();
            debug!(
                "{kind} page fetched: {} records, more: {}",
                page.records.len(),
                page.next_cursor.is_some()
            );

            if let Some(cost) = page.cost {
                next.rate_budget.record(cost, page_size as usize, now);
            }
            if let Some(extra) = page.extra {
                next.extra = extra;
            }
            next.primary_cursor = None;
            next.deferred_primary_cursor = page.next_cursor;
            next.current_batch.remaining = page.records.into_iter().map(BatchRecord::new).collect();
        }

        // Batch extraction; an open or retried batch is resumed as is
        if next.current_batch.processing.is_empty() {
            // the budget may shrink a batch but never grow it past the configured size
            let batch_size = if augment {
                estimate
                    .max_entries_per_run
                    .min(self.config.secondary_batch_size.get()) as usize
            } else {
                usize::MAX
            };
            next.current_batch.start_next(batch_size);
        }

        if let Some(fetcher) = secondary {
            if !next.current_batch.processing.is_empty() {
                let gids: Vec<Option<Gid>> = next
                    .current_batch
                    .processing
                    .iter()
                    .map(|record| record.to_model(kind).gid().and_then(|g| parse_gid(&g).ok()))
                    .collect();
                let request = SecondaryRequest {
                    gids: gids.iter().flatten().map(ToString::to_string).collect(),
                    keys: selection.secondary_keys(),
                    cursor: next.secondary_cursor.clone(),
                };
                let page = fetcher.fetch(&request).await?;
                self.stats.add_secondary_call();

                if let Some(cost) = page.cost {
                    next.rate_budget.record(cost, request.gids.len(), now);
                }

                let mut gave_up = false;
                if let Some(reason) = &page.retry {
                    // All or nothing: the whole batch is asked for again
                    next.retry_count += 1;
                    self.stats.add_retry();
                    if next.retry_count <= self.config.max_secondary_retries {
                        warn!(
                            "{kind} batch of {} will be retried ({reason}), attempt {}",
                            gids.len(),
                            next.retry_count
                        );
                        next.secondary_cursor = None;
                        return Ok(self.finish(next, Vec::new(), start));
                    }
                    // Ids deleted since listing never resolve; emit what did
                    warn!(
                        "{kind} batch of {} still incomplete after {} retries ({reason}), \
                         emitting it without the missing custom fields",
                        gids.len(),
                        self.config.max_secondary_retries
                    );
                    gave_up = true;
                }

                let graphql_type = kind.descriptor().graphql_type;
                for record in page.records {
                    let owner = match parse_gid(&record.owner_gid) {
                        Ok(owner) => owner,
                        Err(e) => {
                            warn!("Skipping secondary record: {e}");
                            continue;
                        }
                    };
                    if owner.resource_type != graphql_type {
                        warn!(
                            "Skipping secondary record for {owner}, expected {graphql_type}"
                        );
                        continue;
                    }
                    match gids.iter().position(|g| g.as_ref() == Some(&owner)) {
                        Some(index) => {
                            next.current_batch.processing[index]
                                .secondary
                                .extend(record.values);
                        }
                        None => debug!("Dropping secondary record for {owner}, not in batch"),
                    }
                }

                next.secondary_cursor = if gave_up { None } else { page.next_cursor };
                if next.secondary_cursor.is_some() {
                    debug!("{kind} batch still open, resuming next slice");
                    return Ok(self.finish(next, Vec::new(), start));
                }
            }
        }

        let rows: Vec<Row> = next
            .current_batch
            .processing
            .drain(..)
            .map(|record| record.to_model(kind).project(selection))
            .collect();
        next.retry_count = 0;
        next.secondary_cursor = None;

        Ok(self.finish(next, rows, start))
    }

    /// Build the slice result from the next continuation
    fn finish(&mut self, mut next: Continuation, rows: Vec<Row>, start: Instant) -> SyncSlice {
        next.release_deferred_cursor();
        let continuation = if next.is_exhausted() {
            None
        } else {
            Some(next)
        };

        self.stats.add_records(rows.len());
        self.stats
            .set_duration(self.stats.duration_ms + start.elapsed().as_millis() as u64);

        info!(
            "Slice done: {} rows, {}",
            rows.len(),
            if continuation.is_some() {
                "more to come"
            } else {
                "sync complete"
            }
        );

        SyncSlice {
            rows,
            continuation,
            deferred_by: None,
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
