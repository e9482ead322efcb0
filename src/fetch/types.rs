//! Fetch traits and their request/response types
//!
//! The engine only talks to these traits; REST and GraphQL implementations
//! live next door and tests plug in scripted ones.

use crate::budget::QueryCost;
use crate::entity::{EntityModel, MetafieldWrite, ResourceKind};
use crate::error::Result;
use crate::schema::MetafieldDefinition;
use crate::types::{JsonObject, StringMap};
use async_trait::async_trait;

// ============================================================================
// Primary
// ============================================================================

/// One page request against the primary listing
#[derive(Debug, Clone, Default)]
pub struct PrimaryRequest {
    /// Opaque cursor; `None` for the first page
    pub cursor: Option<String>,
    pub page_size: u32,
    /// Listing filters, applied to the first page
    pub filters: StringMap,
    /// Resource-specific state carried in the continuation
    pub extra: JsonObject,
}

/// One page of primary records
#[derive(Debug, Clone, Default)]
pub struct PrimaryPage {
    pub records: Vec<JsonObject>,
    pub next_cursor: Option<String>,
    /// Query cost, for cost-metered sources
    pub cost: Option<QueryCost>,
    /// Replacement for the continuation's `extra`, if the fetcher changed it
    pub extra: Option<JsonObject>,
}

/// Executes one page of the primary listing
#[async_trait]
pub trait PrimaryFetcher: Send + Sync {
    async fn fetch_page(&self, request: &PrimaryRequest) -> Result<PrimaryPage>;

    /// Whether pages report a query cost that should size the next page
    fn cost_metered(&self) -> bool {
        false
    }
}

// ============================================================================
// Secondary
// ============================================================================

/// Custom-field lookup for a batch of records
#[derive(Debug, Clone, Default)]
pub struct SecondaryRequest {
    /// Global ids of the records in the batch, in batch order
    pub gids: Vec<String>,
    /// `namespace.key` custom-field keys to fetch
    pub keys: Vec<String>,
    /// Where an earlier call for the same batch stopped
    pub cursor: Option<String>,
}

/// Custom-field values for one owner
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecondaryRecord {
    pub owner_gid: String,
    /// Values keyed by `namespace.key`
    pub values: JsonObject,
}

/// Result of one secondary call
#[derive(Debug, Clone, Default)]
pub struct SecondaryPage {
    pub records: Vec<SecondaryRecord>,
    pub cost: Option<QueryCost>,
    /// Set when the batch is not finished yet
    pub next_cursor: Option<String>,
    /// Set when the whole batch must be asked for again
    pub retry: Option<String>,
}

impl SecondaryPage {
    /// A page asking for the batch to be re-issued
    pub fn retry(reason: impl Into<String>, cost: Option<QueryCost>) -> Self {
        Self {
            cost,
            retry: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// Fetches custom-field values for a batch of records
#[async_trait]
pub trait SecondaryFetcher: Send + Sync {
    async fn fetch(&self, request: &SecondaryRequest) -> Result<SecondaryPage>;
}

// ============================================================================
// Writes
// ============================================================================

/// Remote writes for one resource family
#[async_trait]
pub trait Mutator: Send + Sync {
    /// Create a record; returns the stored record
    async fn create(&self, model: &EntityModel, fields: &JsonObject) -> Result<JsonObject>;

    /// Update a record; returns the stored record
    async fn update(&self, model: &EntityModel, id: u64, fields: &JsonObject)
        -> Result<JsonObject>;

    /// Apply custom-field writes; returns the written values keyed by
    /// `namespace.key` (null for deleted ones)
    async fn set_metafields(
        &self,
        owner_gid: &str,
        writes: &[MetafieldWrite],
    ) -> Result<JsonObject>;

    /// Delete a record; a missing record is `Error::NotFound`
    async fn delete(&self, kind: ResourceKind, id: u64) -> Result<()>;
}

/// Source of custom-field definitions
#[async_trait]
pub trait DefinitionSource: Send + Sync {
    async fn definitions(&self, owner_type: &str) -> Result<Vec<MetafieldDefinition>>;
}
