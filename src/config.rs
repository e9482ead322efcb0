//! Configuration types for a store connection
//!
//! Loaded from YAML. Every section has defaults, so the smallest valid
//! file only names the shop.

use crate::budget::BudgetConfig;
use crate::engine::SyncConfig;
use crate::entity::{PrimarySource, ResourceKind};
use crate::error::{Error, Result};
use crate::types::OptionStringExt;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-Level Connector Config
// ============================================================================

/// Store connection loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Shop domain, e.g. `my-shop.myshopify.com`
    #[serde(default)]
    pub shop: String,

    /// Admin API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Access token sent with every request
    #[serde(default)]
    pub access_token: Option<String>,

    /// Versioned admin root; overrides the one derived from `shop`
    #[serde(default)]
    pub base_url: Option<String>,

    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Slice sizing
    #[serde(default)]
    pub sync: SyncSettings,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            shop: String::new(),
            api_version: default_api_version(),
            access_token: None,
            base_url: None,
            http: HttpConfig::default(),
            sync: SyncSettings::default(),
        }
    }
}

fn default_api_version() -> String {
    "2024-07".to_string()
}

impl ConnectorConfig {
    /// Load and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.access_token = config.access_token.none_if_empty();
        config.validate()?;
        Ok(config)
    }

    /// Versioned admin root all paths are resolved against
    pub fn admin_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "https://{}/admin/api/{}",
                self.shop.trim_end_matches('/'),
                self.api_version
            ),
        }
    }

    /// Check values serde cannot reject on its own
    pub fn validate(&self) -> Result<()> {
        if self.shop.trim().is_empty() && self.base_url.is_none() {
            return Err(Error::missing_field("shop"));
        }
        if self.shop.contains("://") {
            return Err(Error::invalid_config(
                "shop",
                "expected a bare domain without scheme",
            ));
        }
        if let Some(url) = &self.base_url {
            url::Url::parse(url).map_err(|e| Error::invalid_config("base_url", e.to_string()))?;
        }
        if self.api_version.trim().is_empty() {
            return Err(Error::invalid_config("api_version", "must not be empty"));
        }

        if self.http.requests_per_second == 0 {
            return Err(Error::invalid_config(
                "http.requests_per_second",
                "must be at least 1",
            ));
        }
        if self.http.burst == 0 {
            return Err(Error::invalid_config("http.burst", "must be at least 1"));
        }

        let sync = &self.sync;
        for (field, value) in [
            ("sync.rest_page_size", sync.rest_page_size),
            ("sync.secondary_batch_size", sync.secondary_batch_size),
            ("sync.graphql_page_size", sync.graphql_page_size),
            ("sync.graphql_max_entries", sync.graphql_max_entries),
        ] {
            if value == 0 {
                return Err(Error::invalid_config(field, "must be at least 1"));
            }
        }
        if sync.rest_page_size > MAX_REST_PAGE_SIZE {
            return Err(Error::invalid_config(
                "sync.rest_page_size",
                format!("must be at most {MAX_REST_PAGE_SIZE}"),
            ));
        }
        if sync.max_query_cost <= 0.0 {
            return Err(Error::invalid_config(
                "sync.max_query_cost",
                "must be positive",
            ));
        }

        Ok(())
    }

    /// Engine configuration for one resource
    pub fn sync_config_for(&self, kind: ResourceKind) -> SyncConfig {
        let sync = &self.sync;
        let page_size = match kind.descriptor().primary {
            PrimarySource::Rest(_) => sync.rest_page_size,
            PrimarySource::GraphQl { .. } => sync.graphql_page_size,
        };
        SyncConfig::new()
            .with_primary_page_size(non_zero(page_size))
            .with_secondary_batch_size(non_zero(sync.secondary_batch_size))
            .with_max_secondary_retries(sync.max_secondary_retries)
            .with_budget(BudgetConfig {
                max_query_cost: sync.max_query_cost,
                max_entries: sync.graphql_max_entries.max(1),
                fallback_defer: Duration::from_millis(sync.defer_fallback_ms),
            })
    }
}

/// The REST Admin API refuses larger pages
const MAX_REST_PAGE_SIZE: u32 = 250;

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Client-side request pacing
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,

    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            requests_per_second: default_rps(),
            burst: default_burst(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_rps() -> u32 {
    2
}

fn default_burst() -> u32 {
    4
}

// ============================================================================
// Sync Settings
// ============================================================================

/// Page, batch and budget sizing for slices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Records per REST listing page
    #[serde(default = "default_rest_page_size")]
    pub rest_page_size: u32,

    /// Most records augmented per slice; the rate budget may lower it
    #[serde(default = "default_secondary_batch_size")]
    pub secondary_batch_size: u32,

    /// Records per GraphQL listing page before rate-budget adjustment
    #[serde(default = "default_graphql_page_size")]
    pub graphql_page_size: u32,

    #[serde(default = "default_max_secondary_retries")]
    pub max_secondary_retries: u32,

    /// Most points a single GraphQL query may cost
    #[serde(default = "default_max_query_cost")]
    pub max_query_cost: f64,

    /// Most entries a single GraphQL query may ask for
    #[serde(default = "default_graphql_max_entries")]
    pub graphql_max_entries: u32,

    /// Deferral used when the throttle status reports no restore rate
    #[serde(default = "default_defer_fallback_ms")]
    pub defer_fallback_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            rest_page_size: default_rest_page_size(),
            secondary_batch_size: default_secondary_batch_size(),
            graphql_page_size: default_graphql_page_size(),
            max_secondary_retries: default_max_secondary_retries(),
            max_query_cost: default_max_query_cost(),
            graphql_max_entries: default_graphql_max_entries(),
            defer_fallback_ms: default_defer_fallback_ms(),
        }
    }
}

fn default_rest_page_size() -> u32 {
    250
}

fn default_secondary_batch_size() -> u32 {
    50
}

fn default_graphql_page_size() -> u32 {
    50
}

fn default_max_secondary_retries() -> u32 {
    3
}

fn default_max_query_cost() -> f64 {
    1000.0
}

fn default_graphql_max_entries() -> u32 {
    250
}

fn default_defer_fallback_ms() -> u64 {
    3000
}
