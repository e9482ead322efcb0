//! Schema tests

use super::*;
use crate::entity::ResourceKind;
use crate::error::Result;
use crate::fetch::DefinitionSource;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

fn set(keys: &[&str]) -> BTreeSet<String> {
    keys.iter().map(ToString::to_string).collect()
}

fn product_definitions() -> Vec<MetafieldDefinition> {
    vec![
        MetafieldDefinition {
            name: "Color".to_string(),
            ..MetafieldDefinition::new("custom", "color", "single_line_text_field")
        },
        MetafieldDefinition::new("custom", "count", "number_integer"),
    ]
}

// ============================================================================
// Field selection
// ============================================================================

#[test]
fn test_empty_selection_means_all_standard() {
    let selection = FieldSelection::resolve::<&str>(ResourceKind::Page, &[], None);
    assert!(selection.includes_standard("id"));
    assert!(selection.includes_standard("title"));
    assert!(selection.includes_standard("body_html"));
    assert!(!selection.requires_secondary());
}

#[test]
fn test_selection_splits_standard_and_custom() {
    let selection = FieldSelection::resolve(
        ResourceKind::Product,
        &["title", "custom.color", "vendor"],
        None,
    );
    assert_eq!(selection.standard(), &set(&["id", "title", "vendor"]));
    assert_eq!(selection.secondary(), &set(&["custom.color"]));
    assert!(selection.requires_secondary());
    assert_eq!(selection.secondary_keys(), vec!["custom.color".to_string()]);
}

#[test]
fn test_selection_drops_unknown_keys() {
    let selection = FieldSelection::resolve(
        ResourceKind::Product,
        &["title", "no_such_field", "  "],
        None,
    );
    assert_eq!(selection.standard(), &set(&["id", "title"]));
    assert!(!selection.requires_secondary());
}

#[test]
fn test_selection_drops_undefined_custom_keys() {
    let definitions = product_definitions();
    let selection = FieldSelection::resolve(
        ResourceKind::Product,
        &["custom.color", "custom.missing"],
        Some(&definitions),
    );
    assert_eq!(selection.secondary(), &set(&["custom.color"]));
}

#[test]
fn test_selection_ignores_custom_keys_without_augmentation() {
    let selection = FieldSelection::resolve(
        ResourceKind::ProductVariant,
        &["sku", "custom.color"],
        None,
    );
    assert_eq!(selection.standard(), &set(&["id", "sku"]));
    assert!(!selection.requires_secondary());
}

// ============================================================================
// Columns
// ============================================================================

#[test]
fn test_columns_include_custom_fields() {
    let cols = columns(ResourceKind::Product, &product_definitions());

    assert_eq!(cols[0].key, "id");
    assert!(!cols[0].writable);

    let body = cols.iter().find(|c| c.key == "body_html").unwrap();
    assert_eq!(body.label, "Body html");
    assert!(body.writable);

    let created = cols.iter().find(|c| c.key == "created_at").unwrap();
    assert!(!created.writable);

    let custom: Vec<&Column> = cols.iter().filter(|c| c.is_custom()).collect();
    assert_eq!(custom.len(), 2);
    assert_eq!(custom[0].key, "custom.color");
    assert_eq!(custom[0].label, "Color");
    assert_eq!(custom[1].label, "custom.count");
    assert_eq!(custom[1].custom_type.as_deref(), Some("number_integer"));
}

#[test]
fn test_columns_of_read_only_resource() {
    let cols = columns(ResourceKind::Location, &[]);
    assert!(cols.iter().all(|c| !c.writable));
    assert!(cols.iter().all(|c| !c.is_custom()));
}

#[test]
fn test_columns_skip_definitions_without_augmentation() {
    let cols = columns(ResourceKind::ProductVariant, &product_definitions());
    assert!(cols.iter().all(|c| !c.is_custom()));
}

// ============================================================================
// Definition cache
// ============================================================================

struct CountingSource {
    calls: AtomicUsize,
}

#[async_trait]
impl DefinitionSource for CountingSource {
    async fn definitions(&self, owner_type: &str) -> Result<Vec<MetafieldDefinition>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match owner_type {
            "PRODUCT" => product_definitions(),
            _ => Vec::new(),
        })
    }
}

#[tokio::test]
async fn test_cache_fetches_once_per_owner_type() {
    let source = CountingSource {
        calls: AtomicUsize::new(0),
    };
    let mut cache = DefinitionCache::new();

    assert_eq!(cache.definitions("PRODUCT", &source).await.unwrap().len(), 2);
    assert_eq!(cache.definitions("PRODUCT", &source).await.unwrap().len(), 2);
    assert!(cache.definitions("ORDER", &source).await.unwrap().is_empty());

    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.hits(), 1);
    assert_eq!(cache.misses(), 2);
}

#[tokio::test]
async fn test_fresh_cache_refetches() {
    let source = CountingSource {
        calls: AtomicUsize::new(0),
    };
    let mut cache = DefinitionCache::new();
    cache.definitions("PRODUCT", &source).await.unwrap();
    cache.clear();
    assert!(cache.get("PRODUCT").is_none());
    cache.definitions("PRODUCT", &source).await.unwrap();
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_seeded_cache_skips_source() {
    let source = CountingSource {
        calls: AtomicUsize::new(0),
    };
    let mut cache = DefinitionCache::new();
    cache.insert("CUSTOMER", vec![MetafieldDefinition::new("loyalty", "tier", "single_line_text_field")]);

    let defs = cache.definitions("CUSTOMER", &source).await.unwrap();
    assert_eq!(defs[0].full_key(), "loyalty.tier");
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_definition_deserializes_type_name() {
    let definition: MetafieldDefinition = serde_json::from_value(serde_json::json!({
        "namespace": "custom",
        "key": "size",
        "name": "Size",
        "type": "list.single_line_text_field",
        "ownerType": "PRODUCT"
    }))
    .unwrap();
    assert_eq!(definition.type_name, "list.single_line_text_field");
    assert_eq!(definition.owner_type, "PRODUCT");
}
