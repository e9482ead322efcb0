//! Entity model
//!
//! Wraps one raw API record together with the custom-field values merged
//! into it, and projects it to a row or to a write payload.

use super::catalog::{ResourceDescriptor, ResourceKind};
use super::gid::{gid_for, is_gid, parse_gid, Gid};
use crate::error::{Error, Result};
use crate::schema::{FieldSelection, MetafieldDefinition};
use crate::types::{is_present, lookup_path, value_as_u64, JsonObject, Row};
use serde_json::Value;
use tracing::debug;

/// Metafield type used when no definition is known for a key
pub const DEFAULT_METAFIELD_TYPE: &str = "single_line_text_field";

/// A pending custom-field write, carried next to the record payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetafieldWrite {
    pub namespace: String,
    pub key: String,
    /// New value; `None` deletes the metafield
    pub value: Option<String>,
    pub type_name: String,
}

impl MetafieldWrite {
    /// `namespace.key`
    pub fn full_key(&self) -> String {
        format!("{}.{}", self.namespace, self.key)
    }

    /// Whether this write removes the value
    pub fn is_delete(&self) -> bool {
        self.value.is_none()
    }
}

/// Minimal write for a set of changed row fields
#[derive(Debug, Clone, PartialEq)]
pub enum MutationPayload {
    /// Nothing maps to a writable field
    NoOp,
    /// REST fields to send plus custom-field writes to apply afterwards
    Write {
        fields: JsonObject,
        metafields: Vec<MetafieldWrite>,
    },
}

impl MutationPayload {
    /// Check if there is nothing to write
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }
}

/// One record of a resource
#[derive(Debug, Clone, PartialEq)]
pub struct EntityModel {
    kind: ResourceKind,
    raw: JsonObject,
    secondary: JsonObject,
}

impl EntityModel {
    /// Wrap a raw record
    pub fn new(kind: ResourceKind, raw: JsonObject) -> Self {
        Self {
            kind,
            raw,
            secondary: JsonObject::new(),
        }
    }

    /// Wrap a raw record with already merged custom-field values
    pub fn with_secondary(kind: ResourceKind, raw: JsonObject, secondary: JsonObject) -> Self {
        Self {
            kind,
            raw,
            secondary,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        self.kind.descriptor()
    }

    pub fn raw(&self) -> &JsonObject {
        &self.raw
    }

    pub fn secondary(&self) -> &JsonObject {
        &self.secondary
    }

    /// Numeric identity, read from `id` whether it is a number or a gid
    pub fn id(&self) -> Option<u64> {
        match self.raw.get("id")? {
            Value::String(s) if is_gid(s) => parse_gid(s).ok().map(|gid| gid.id),
            other => value_as_u64(other),
        }
    }

    /// Global identity: taken from the record when present, computed otherwise
    pub fn gid(&self) -> Option<String> {
        if let Some(gid) = self.raw.get("admin_graphql_api_id").and_then(Value::as_str) {
            return Some(gid.to_string());
        }
        if let Some(Value::String(s)) = self.raw.get("id") {
            if is_gid(s) {
                return Some(s.clone());
            }
        }
        self.id()
            .map(|id| gid_for(self.descriptor().graphql_type, id))
    }

    /// Whether a parsed gid addresses this record
    pub fn matches_gid(&self, gid: &Gid) -> bool {
        gid.resource_type == self.descriptor().graphql_type && Some(gid.id) == self.id()
    }

    /// Merge custom-field values keyed by `namespace.key`
    pub fn merge_secondary(&mut self, values: JsonObject) {
        self.secondary.extend(values);
    }

    /// Project to an output row
    ///
    /// Absent or null source values are left out of the row. Custom-field
    /// keys are only emitted when selected and known for this record.
    pub fn project(&self, selection: &FieldSelection) -> Row {
        let descriptor = self.descriptor();
        let mut row = Row::new();

        if let Some(id) = self.id() {
            row.insert("id".to_string(), id.into());
        }

        for field in descriptor.fields {
            if !selection.includes_standard(field.key) {
                continue;
            }
            match lookup_path(&self.raw, field.source) {
                Some(Value::Null) | None => {}
                Some(value) => {
                    row.insert(field.key.to_string(), value.clone());
                }
            }
        }

        for key in selection.secondary() {
            if let Some(value) = self.secondary.get(key) {
                row.insert(key.clone(), value.clone());
            }
        }

        row
    }

    /// Rebuild a model from a row, placing writable values at their payload paths
    pub fn from_row(kind: ResourceKind, row: &Row) -> Self {
        let descriptor = kind.descriptor();
        let mut raw = JsonObject::new();
        let mut secondary = JsonObject::new();

        for (key, value) in row {
            if key == "id" {
                if !value.is_null() {
                    raw.insert("id".to_string(), value.clone());
                }
                continue;
            }
            if let Some(field) = descriptor.field(key) {
                set_path(&mut raw, field.write_as.unwrap_or(field.source), value.clone());
            } else if key.contains('.') {
                secondary.insert(key.clone(), value.clone());
            }
        }

        Self::with_secondary(kind, raw, secondary)
    }

    /// Cross-field completeness and allowed-value checks
    pub fn validate(&self) -> Result<()> {
        let descriptor = self.descriptor();

        for (left, right) in descriptor.required_together {
            let left_present = is_present(self.field_value(left));
            let right_present = is_present(self.field_value(right));
            if left_present != right_present {
                let missing = if left_present { right } else { left };
                let other = if left_present { left } else { right };
                return Err(Error::validation(
                    *missing,
                    format!("must be set together with '{other}'"),
                ));
            }
        }

        for field in descriptor.fields.iter().filter(|f| !f.choices.is_empty()) {
            let Some(value) = self.field_value(field.key) else {
                continue;
            };
            if !is_present(Some(value)) {
                continue;
            }
            let allowed = value
                .as_str()
                .is_some_and(|s| field.choices.contains(&s));
            if !allowed {
                return Err(Error::validation(
                    field.key,
                    format!("expected one of: {}", field.choices.join(", ")),
                ));
            }
        }

        Ok(())
    }

    /// Build the minimal write payload for the changed row fields
    pub fn to_mutation_input(
        &self,
        changed: &[String],
        definitions: &[MetafieldDefinition],
    ) -> MutationPayload {
        let descriptor = self.descriptor();
        let mut fields = JsonObject::new();
        let mut metafields = Vec::new();

        for key in changed {
            if key == "id" {
                continue;
            }
            if let Some(field) = descriptor.field(key) {
                match field.write_as {
                    Some(path) => {
                        let value = lookup_path(&self.raw, path)
                            .cloned()
                            .unwrap_or(Value::Null);
                        set_path(&mut fields, path, value);
                    }
                    None => debug!("{} field '{key}' is read-only, skipping", self.kind),
                }
                continue;
            }

            let Some(value) = self.secondary.get(key) else {
                continue;
            };
            if descriptor.owner_type.is_none() {
                continue;
            }
            let Some((namespace, metafield_key)) = key.split_once('.') else {
                continue;
            };
            let type_name = definitions
                .iter()
                .find(|d| d.namespace == namespace && d.key == metafield_key)
                .map_or(DEFAULT_METAFIELD_TYPE, |d| d.type_name.as_str());
            metafields.push(MetafieldWrite {
                namespace: namespace.to_string(),
                key: metafield_key.to_string(),
                value: metafield_value(value),
                type_name: type_name.to_string(),
            });
        }

        if fields.is_empty() && metafields.is_empty() {
            MutationPayload::NoOp
        } else {
            MutationPayload::Write { fields, metafields }
        }
    }

    /// Row value of a standard field as stored in this model
    fn field_value(&self, key: &str) -> Option<&Value> {
        let field = self.descriptor().field(key)?;
        lookup_path(&self.raw, field.write_as.unwrap_or(field.source))
    }
}

/// Metafield values travel as strings; null and empty mean "delete"
fn metafield_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Insert a value at a dot path, creating intermediate objects
pub(crate) fn set_path(object: &mut JsonObject, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            object.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = object
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(JsonObject::new()));
            if !entry.is_object() {
                *entry = Value::Object(JsonObject::new());
            }
            if let Value::Object(inner) = entry {
                set_path(inner, rest, value);
            }
        }
    }
}
