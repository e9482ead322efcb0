//! Schema module
//!
//! Splits selected keys into standard and custom-field sets, caches
//! custom-field definitions per sync, and builds the column list of a
//! resource augmented with its custom fields.

mod cache;
mod types;

pub use cache::DefinitionCache;
pub use types::{Column, FieldSelection, MetafieldDefinition};

use crate::entity::ResourceKind;

/// Standard columns followed by one column per custom-field definition
pub fn columns(kind: ResourceKind, definitions: &[MetafieldDefinition]) -> Vec<Column> {
    let descriptor = kind.descriptor();
    let mut columns = vec![Column {
        key: "id".to_string(),
        label: "ID".to_string(),
        custom_type: None,
        writable: false,
    }];

    columns.extend(descriptor.fields.iter().map(|field| Column {
        key: field.key.to_string(),
        label: humanize(field.key),
        custom_type: None,
        writable: field.is_writable() && descriptor.capabilities.update,
    }));

    if descriptor.capabilities.secondary_augmentation {
        columns.extend(definitions.iter().map(|definition| Column {
            key: definition.full_key(),
            label: if definition.name.is_empty() {
                definition.full_key()
            } else {
                definition.name.clone()
            },
            custom_type: Some(definition.type_name.clone()),
            writable: descriptor.capabilities.update,
        }));
    }

    columns
}

/// `body_html` -> `Body html`
fn humanize(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests;
