//! Custom-field definition cache
//!
//! Scoped to one logical sync: the caller owns it and passes it in, so a
//! fresh cache means fresh definitions.

use super::types::MetafieldDefinition;
use crate::error::Result;
use crate::fetch::DefinitionSource;
use std::collections::HashMap;
use tracing::debug;

/// Definitions keyed by owner type
#[derive(Debug, Default)]
pub struct DefinitionCache {
    entries: HashMap<String, Vec<MetafieldDefinition>>,
    hits: u64,
    misses: u64,
}

impl DefinitionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Definitions for `owner_type`, fetched from `source` on first use
    pub async fn definitions(
        &mut self,
        owner_type: &str,
        source: &dyn DefinitionSource,
    ) -> Result<&[MetafieldDefinition]> {
        if self.entries.contains_key(owner_type) {
            self.hits += 1;
        } else {
            self.misses += 1;
            debug!("Fetching metafield definitions for {owner_type}");
            let fetched = source.definitions(owner_type).await?;
            self.entries.insert(owner_type.to_string(), fetched);
        }
        Ok(self
            .entries
            .get(owner_type)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Cached definitions, without fetching
    pub fn get(&self, owner_type: &str) -> Option<&[MetafieldDefinition]> {
        self.entries.get(owner_type).map(Vec::as_slice)
    }

    /// Seed the cache
    pub fn insert(&mut self, owner_type: impl Into<String>, definitions: Vec<MetafieldDefinition>) {
        self.entries.insert(owner_type.into(), definitions);
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Drop every cached entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
