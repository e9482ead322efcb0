//! Schema types
//!
//! Custom-field definitions, the per-sync field selection and output columns.

use crate::entity::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// A custom-field (metafield) definition declared on the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetafieldDefinition {
    pub namespace: String,
    pub key: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Metafield type name (e.g. `single_line_text_field`)
    #[serde(rename = "type")]
    pub type_name: String,
    /// Owner type (e.g. `PRODUCT`)
    #[serde(default)]
    pub owner_type: String,
}

impl MetafieldDefinition {
    /// Create a definition
    pub fn new(
        namespace: impl Into<String>,
        key: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            name: String::new(),
            type_name: type_name.into(),
            owner_type: String::new(),
        }
    }

    /// `namespace.key`, the row key of the custom-field column
    pub fn full_key(&self) -> String {
        format!("{}.{}", self.namespace, self.key)
    }
}

/// Selected row keys split into standard and custom-field keys
///
/// Computed once per slice; everything downstream reads the two sets
/// instead of re-deriving them from key shapes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelection {
    standard: BTreeSet<String>,
    secondary: BTreeSet<String>,
}

impl FieldSelection {
    /// Every standard column and no custom fields
    pub fn all_standard(kind: ResourceKind) -> Self {
        Self {
            standard: kind
                .descriptor()
                .standard_keys()
                .map(ToString::to_string)
                .collect(),
            secondary: BTreeSet::new(),
        }
    }

    /// Split `selected` for `kind`
    ///
    /// An empty selection means every standard column. Custom-field keys
    /// use the `namespace.key` form; when `definitions` is given, keys
    /// without a definition are dropped. Unknown keys are logged and dropped.
    pub fn resolve<S: AsRef<str>>(
        kind: ResourceKind,
        selected: &[S],
        definitions: Option<&[MetafieldDefinition]>,
    ) -> Self {
        if selected.is_empty() {
            return Self::all_standard(kind);
        }

        let descriptor = kind.descriptor();
        let mut standard = BTreeSet::from(["id".to_string()]);
        let mut secondary = BTreeSet::new();

        for key in selected {
            let key = key.as_ref().trim();
            if key.is_empty() {
                continue;
            }
            if descriptor.is_standard(key) {
                standard.insert(key.to_string());
                continue;
            }
            if !key.contains('.') {
                warn!("Unknown {kind} field '{key}', ignoring");
                continue;
            }
            if !descriptor.capabilities.secondary_augmentation {
                warn!("{kind} does not support custom fields, ignoring '{key}'");
                continue;
            }
            if let Some(defs) = definitions {
                if !defs.iter().any(|d| d.full_key() == key) {
                    warn!("No custom field definition for {kind} '{key}', ignoring");
                    continue;
                }
            }
            secondary.insert(key.to_string());
        }

        Self {
            standard,
            secondary,
        }
    }

    pub fn standard(&self) -> &BTreeSet<String> {
        &self.standard
    }

    pub fn secondary(&self) -> &BTreeSet<String> {
        &self.secondary
    }

    /// Check if a standard column is selected
    pub fn includes_standard(&self, key: &str) -> bool {
        self.standard.contains(key)
    }

    /// Whether a second protocol has to be queried at all
    pub fn requires_secondary(&self) -> bool {
        !self.secondary.is_empty()
    }

    /// Custom-field keys as an ordered list
    pub fn secondary_keys(&self) -> Vec<String> {
        self.secondary.iter().cloned().collect()
    }
}

/// An output column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Row key
    pub key: String,
    /// Human-readable label
    pub label: String,
    /// Metafield type for custom-field columns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_type: Option<String>,
    pub writable: bool,
}

impl Column {
    /// Check if this is a custom-field column
    pub fn is_custom(&self) -> bool {
        self.custom_type.is_some()
    }
}
