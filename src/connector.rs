//! Store connector
//!
//! The host-facing surface: one call per bounded slice with the
//! continuation carried as an opaque JSON string, plus update batches,
//! deletes, column discovery and a connection check.

use crate::config::ConnectorConfig;
use crate::continuation::Continuation;
use crate::engine::{Clock, SyncEngine, SyncSource};
use crate::entity::{PrimarySource, ResourceKind};
use crate::error::Result;
use crate::fetch::{
    GraphQlDefinitionSource, GraphQlMetafieldFetcher, GraphQlPrimaryFetcher, PrimaryFetcher,
    RestMutator, RestPrimaryFetcher,
};
use crate::http::{AdminClient, AdminClientConfig};
use crate::schema::{columns, Column, DefinitionCache, FieldSelection, MetafieldDefinition};
use crate::types::{Row, StringMap};
use crate::update::{RowEdit, UpdateReconciler};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

// ============================================================================
// Check Result
// ============================================================================

/// Result of a connection check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Whether the check succeeded
    pub success: bool,

    /// Shop name on success, error message on failure
    pub message: Option<String>,
}

impl CheckResult {
    /// Create a successful check result
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    /// Create a failed check result
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

// ============================================================================
// Slice parameters and output
// ============================================================================

/// What one sync reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncParams {
    /// Selected row keys; empty means every standard column
    #[serde(default)]
    pub selected: Vec<String>,
    /// Listing filters, applied to the first page
    #[serde(default)]
    pub filters: StringMap,
}

impl SyncParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select row keys
    #[must_use]
    pub fn select<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.selected = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Add a listing filter
    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }
}

/// Output of one slice as seen by the host
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SliceOutput {
    pub rows: Vec<Row>,
    /// Opaque token for the next slice; `None` once the sync is complete
    pub continuation: Option<String>,
    /// Set when the slice yielded for rate budget without fetching
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deferred_by: Option<Duration>,
}

impl SliceOutput {
    /// Check if this was the last slice
    pub fn is_final(&self) -> bool {
        self.continuation.is_none()
    }
}

// ============================================================================
// Shop Connector
// ============================================================================

/// A connection to one store
pub struct ShopConnector {
    config: ConnectorConfig,
    client: Arc<AdminClient>,
    clock: Option<Clock>,
}

impl ShopConnector {
    /// Connect with the client described by `config`
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        let client = AdminClient::with_config(AdminClientConfig::from_connector(&config))?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Connect through an already built client
    pub fn with_client(config: ConnectorConfig, client: Arc<AdminClient>) -> Self {
        Self {
            config,
            client,
            clock: None,
        }
    }

    /// Replace the wall clock used for rate-budget projection
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<AdminClient> {
        &self.client
    }

    /// Verify the credentials by reading the shop name
    pub async fn check(&self) -> CheckResult {
        let response = match self.client.graphql("{ shop { name } }", json!({})).await {
            Ok(response) => response,
            Err(e) => return CheckResult::failure(e.to_string()),
        };
        match response.into_data() {
            Ok(data) => {
                let name = data
                    .pointer("/shop/name")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                CheckResult::success(format!("Connected to {name}"))
            }
            Err(e) => CheckResult::failure(e.to_string()),
        }
    }

    /// Custom-field definitions of a resource, through the per-sync cache
    pub async fn definitions(
        &self,
        kind: ResourceKind,
        cache: &mut DefinitionCache,
    ) -> Result<Vec<MetafieldDefinition>> {
        let Some(owner_type) = kind.descriptor().owner_type else {
            return Ok(Vec::new());
        };
        let source = GraphQlDefinitionSource::new(Arc::clone(&self.client));
        Ok(cache.definitions(owner_type, &source).await?.to_vec())
    }

    /// Run one bounded slice of a sync
    ///
    /// `previous` is the continuation string of the prior slice, `None`
    /// to start. Custom-field keys are checked against the resource's
    /// definitions, loaded once per `cache`.
    pub async fn run_sync_slice(
        &self,
        kind: ResourceKind,
        previous: Option<&str>,
        params: &SyncParams,
        cache: &mut DefinitionCache,
    ) -> Result<SliceOutput> {
        let previous = previous.map(Continuation::from_json).transpose()?;

        let wants_custom = params.selected.iter().any(|key| key.contains('.'))
            && kind.capabilities().secondary_augmentation;
        let definitions = if wants_custom {
            Some(self.definitions(kind, cache).await?)
        } else {
            None
        };
        let selection = FieldSelection::resolve(kind, &params.selected, definitions.as_deref());

        let primary = self.primary_fetcher(kind)?;
        let secondary = GraphQlMetafieldFetcher::new(Arc::clone(&self.client));
        let source = SyncSource::new(kind, primary.as_ref()).with_secondary(&secondary);

        let mut engine = SyncEngine::new(self.config.sync_config_for(kind));
        if let Some(clock) = &self.clock {
            engine = engine.with_clock(Arc::clone(clock));
        }

        let slice = engine
            .run_slice(&source, previous.as_ref(), &selection, &params.filters)
            .await?;
        debug!("{kind} slice stats: {:?}", engine.stats());

        Ok(SliceOutput {
            rows: slice.rows,
            continuation: slice
                .continuation
                .as_ref()
                .map(Continuation::to_json)
                .transpose()?,
            deferred_by: slice.deferred_by,
        })
    }

    /// Apply row edits; one result per edit, in input order
    pub async fn run_update_batch(
        &self,
        kind: ResourceKind,
        edits: &[RowEdit],
        cache: &mut DefinitionCache,
    ) -> Result<Vec<Result<Row>>> {
        let touches_custom = edits
            .iter()
            .any(|edit| edit.new.keys().any(|key| key.contains('.')));
        let definitions = if touches_custom {
            self.definitions(kind, cache).await?
        } else {
            Vec::new()
        };

        let mutator = RestMutator::new(Arc::clone(&self.client));
        Ok(UpdateReconciler::new(&mutator)
            .run_update_batch(kind, edits, &definitions)
            .await)
    }

    /// Delete one record; an already deleted record counts as success
    pub async fn delete(&self, kind: ResourceKind, id: u64) -> Result<()> {
        let mutator = RestMutator::new(Arc::clone(&self.client));
        UpdateReconciler::new(&mutator).delete(kind, id).await
    }

    /// Standard columns plus one per custom-field definition
    pub async fn columns(
        &self,
        kind: ResourceKind,
        cache: &mut DefinitionCache,
    ) -> Result<Vec<Column>> {
        let definitions = if kind.capabilities().secondary_augmentation {
            self.definitions(kind, cache).await?
        } else {
            Vec::new()
        };
        info!("{kind}: {} custom field definitions", definitions.len());
        Ok(columns(kind, &definitions))
    }

    fn primary_fetcher(&self, kind: ResourceKind) -> Result<Box<dyn PrimaryFetcher>> {
        let client = Arc::clone(&self.client);
        Ok(match kind.descriptor().primary {
            PrimarySource::Rest(_) => Box::new(RestPrimaryFetcher::for_kind(client, kind)?),
            PrimarySource::GraphQl { .. } => {
                Box::new(GraphQlPrimaryFetcher::for_kind(client, kind)?)
            }
        })
    }
}

impl std::fmt::Debug for ShopConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopConnector")
            .field("base_url", &self.client.config().base_url)
            .finish_non_exhaustive()
    }
}
