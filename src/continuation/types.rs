//! Continuation types
//!
//! The continuation is the only state that survives between slices. The
//! host persists it opaquely as JSON and hands it back unchanged.

use crate::budget::RateBudget;
use crate::entity::{EntityModel, ResourceKind};
use crate::error::{Error, Result};
use crate::types::JsonObject;
use serde::{Deserialize, Serialize};

/// A fetched record carried between slices, with any custom-field values
/// already merged into it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub raw: JsonObject,
    #[serde(default, skip_serializing_if = "JsonObject::is_empty")]
    pub secondary: JsonObject,
}

impl BatchRecord {
    /// Wrap a freshly fetched record
    pub fn new(raw: JsonObject) -> Self {
        Self {
            raw,
            secondary: JsonObject::new(),
        }
    }

    /// Rebuild the entity model
    pub fn to_model(&self, kind: ResourceKind) -> EntityModel {
        EntityModel::with_secondary(kind, self.raw.clone(), self.secondary.clone())
    }
}

/// Partition of the most recently fetched primary page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentBatch {
    /// Records being augmented right now
    #[serde(default)]
    pub processing: Vec<BatchRecord>,
    /// Records of the page not started yet
    #[serde(default)]
    pub remaining: Vec<BatchRecord>,
}

impl CurrentBatch {
    /// Check if both halves are empty
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty() && self.remaining.is_empty()
    }

    /// Total records carried
    pub fn len(&self) -> usize {
        self.processing.len() + self.remaining.len()
    }

    /// Move up to `size` records from `remaining` into `processing`
    pub fn start_next(&mut self, size: usize) {
        let take = size.min(self.remaining.len());
        self.processing = self.remaining.drain(..take).collect();
    }
}

/// Resumption token for one logical sync
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Continuation {
    /// Where the next primary fetch starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_cursor: Option<String>,

    /// Where the open secondary batch resumes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_cursor: Option<String>,

    /// Consecutive retries of the same secondary batch
    #[serde(default)]
    pub retry_count: u32,

    #[serde(default, skip_serializing_if = "CurrentBatch::is_empty")]
    pub current_batch: CurrentBatch,

    /// Next primary cursor, parked until the current page is fully augmented
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deferred_primary_cursor: Option<String>,

    #[serde(default)]
    pub rate_budget: RateBudget,

    /// Resource-specific resumable state
    #[serde(default, skip_serializing_if = "JsonObject::is_empty")]
    pub extra: JsonObject,
}

impl Continuation {
    /// Create an empty continuation (first slice of a sync)
    pub fn new() -> Self {
        Self::default()
    }

    /// Nothing left to fetch, augment or retry
    pub fn is_exhausted(&self) -> bool {
        self.primary_cursor.is_none()
            && self.secondary_cursor.is_none()
            && self.deferred_primary_cursor.is_none()
            && self.current_batch.is_empty()
            && self.retry_count == 0
    }

    /// Whether the next slice may issue a primary fetch
    ///
    /// Never while any record of the current page is still pending, a
    /// secondary batch is open or being retried.
    pub fn should_fetch_primary(&self) -> bool {
        self.current_batch.is_empty() && self.retry_count == 0 && self.secondary_cursor.is_none()
    }

    /// Promote the parked primary cursor once the page is drained
    pub fn release_deferred_cursor(&mut self) {
        if self.current_batch.is_empty() && self.deferred_primary_cursor.is_some() {
            self.primary_cursor = self.deferred_primary_cursor.take();
        }
    }

    /// Serialize for the host
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Continuation {
            message: format!("Failed to serialize continuation: {e}"),
        })
    }

    /// Parse a continuation handed back by the host
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Continuation {
            message: format!("Failed to parse continuation: {e}"),
        })
    }
}
