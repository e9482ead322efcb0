//! REST adapters
//!
//! Listings paginate with `page_info` tokens. Resources merged from several
//! listings walk them in order, the listing index living in the cursor.

use super::graphql::apply_metafield_writes;
use super::types::{
    Mutator, PrimaryFetcher, PrimaryPage, PrimaryRequest, SecondaryFetcher, SecondaryPage,
    SecondaryRecord, SecondaryRequest,
};
use crate::entity::{
    parse_gid, EntityModel, MetafieldWrite, PrimarySource, ResourceKind, RestPath,
};
use crate::error::{Error, Result};
use crate::http::AdminClient;
use crate::pagination::RestCursor;
use crate::types::{JsonObject, Method};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

// ============================================================================
// Primary listing
// ============================================================================

/// Pages through one or more REST listings
pub struct RestPrimaryFetcher {
    client: Arc<AdminClient>,
    kind: ResourceKind,
    paths: &'static [RestPath],
}

impl RestPrimaryFetcher {
    /// Fetcher for a REST-listed resource
    pub fn for_kind(client: Arc<AdminClient>, kind: ResourceKind) -> Result<Self> {
        match kind.descriptor().primary {
            PrimarySource::Rest(paths) if !paths.is_empty() => Ok(Self {
                client,
                kind,
                paths,
            }),
            _ => Err(Error::unsupported(kind.to_string(), "REST listing")),
        }
    }

    fn query_for(&self, request: &PrimaryRequest, page_info: Option<&str>) -> Vec<(String, String)> {
        let mut query = BTreeMap::new();
        query.insert("limit".to_string(), request.page_size.to_string());

        match page_info {
            // Filters are baked into page_info after the first page
            Some(page_info) => {
                query.insert("page_info".to_string(), page_info.to_string());
            }
            None => {
                for (k, v) in self.kind.descriptor().default_filters {
                    query.insert((*k).to_string(), (*v).to_string());
                }
                for (k, v) in &request.filters {
                    query.insert(k.clone(), v.clone());
                }
            }
        }

        query.into_iter().collect()
    }
}

#[async_trait]
impl PrimaryFetcher for RestPrimaryFetcher {
    async fn fetch_page(&self, request: &PrimaryRequest) -> Result<PrimaryPage> {
        let cursor = match request.cursor.as_deref() {
            Some(raw) => raw.parse::<RestCursor>()?,
            None => RestCursor::default(),
        };
        let path = self.paths.get(cursor.phase).ok_or_else(|| {
            Error::continuation(format!(
                "{} cursor phase {} out of range",
                self.kind, cursor.phase
            ))
        })?;

        let query = self.query_for(request, cursor.page_info.as_deref());
        let response = self.client.rest_get(path.path, &query).await?;

        let records = response
            .body
            .get(path.root_key)
            .and_then(Value::as_array)
            .ok_or_else(|| Error::decode(format!("missing '{}' array", path.root_key)))?
            .iter()
            .filter_map(|v| v.as_object().cloned())
            .map(|mut record| {
                if let Some((field, value)) = path.tag {
                    record.insert(field.to_string(), Value::from(value));
                }
                record
            })
            .collect::<Vec<_>>();

        let next_cursor = match response.next_page_info {
            Some(page_info) => Some(RestCursor::page(cursor.phase, page_info)),
            None if cursor.phase + 1 < self.paths.len() => {
                Some(RestCursor::start_of(cursor.phase + 1))
            }
            None => None,
        };

        debug!(
            "Fetched {} {} records from {}",
            records.len(),
            self.kind,
            path.path
        );

        Ok(PrimaryPage {
            records,
            next_cursor: next_cursor.map(|c| c.to_string()),
            cost: None,
            extra: None,
        })
    }
}

// ============================================================================
// Per-record metafields
// ============================================================================

/// Default number of records looked up per call
pub const DEFAULT_REST_METAFIELD_CALLS: usize = 10;

/// Reads metafields one record at a time through
/// `GET <resource>/<id>/metafields`
///
/// At most `max_calls` records are looked up per call; the secondary cursor
/// is the batch position to resume from.
pub struct RestMetafieldFetcher {
    client: Arc<AdminClient>,
    kind: ResourceKind,
    max_calls: usize,
}

impl RestMetafieldFetcher {
    pub fn new(client: Arc<AdminClient>, kind: ResourceKind) -> Self {
        Self {
            client,
            kind,
            max_calls: DEFAULT_REST_METAFIELD_CALLS,
        }
    }

    /// Bound the number of records looked up per call
    pub fn with_max_calls(mut self, max_calls: usize) -> Self {
        self.max_calls = max_calls.max(1);
        self
    }
}

#[async_trait]
impl SecondaryFetcher for RestMetafieldFetcher {
    async fn fetch(&self, request: &SecondaryRequest) -> Result<SecondaryPage> {
        let start = match request.cursor.as_deref() {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| Error::continuation(format!("Invalid metafield cursor '{raw}'")))?,
            None => 0,
        };
        let end = (start + self.max_calls).min(request.gids.len());
        let wanted: HashSet<&str> = request.keys.iter().map(String::as_str).collect();
        let plural = self.kind.descriptor().plural;

        let mut records = Vec::new();
        for gid in request.gids.get(start..end).unwrap_or_default() {
            let id = match parse_gid(gid) {
                Ok(parsed) => parsed.id,
                Err(e) => {
                    warn!("Skipping metafield lookup: {e}");
                    continue;
                }
            };
            let response = self
                .client
                .rest_get(&format!("{plural}/{id}/metafields"), &[])
                .await?;

            let mut values = JsonObject::new();
            for metafield in response
                .body
                .get("metafields")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                let namespace = metafield.get("namespace").and_then(Value::as_str);
                let key = metafield.get("key").and_then(Value::as_str);
                if let (Some(namespace), Some(key)) = (namespace, key) {
                    let full_key = format!("{namespace}.{key}");
                    if wanted.contains(full_key.as_str()) {
                        let value = metafield.get("value").cloned().unwrap_or(Value::Null);
                        values.insert(full_key, value);
                    }
                }
            }
            records.push(SecondaryRecord {
                owner_gid: gid.clone(),
                values,
            });
        }

        Ok(SecondaryPage {
            records,
            cost: None,
            next_cursor: (end < request.gids.len()).then(|| end.to_string()),
            retry: None,
        })
    }
}

// ============================================================================
// Writes
// ============================================================================

/// Writes records through REST and custom fields through GraphQL
pub struct RestMutator {
    client: Arc<AdminClient>,
}

impl RestMutator {
    pub fn new(client: Arc<AdminClient>) -> Self {
        Self { client }
    }

    fn write_path(model: &EntityModel, operation: &str) -> Result<&'static RestPath> {
        model
            .descriptor()
            .write_path_for(model.raw())
            .ok_or_else(|| Error::unsupported(model.kind().to_string(), operation))
    }

    fn unwrap_record(body: Option<Value>, singular: &str) -> Result<JsonObject> {
        body.as_ref()
            .and_then(|b| b.get(singular))
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| Error::decode(format!("missing '{singular}' in response")))
    }
}

#[async_trait]
impl Mutator for RestMutator {
    async fn create(&self, model: &EntityModel, fields: &JsonObject) -> Result<JsonObject> {
        let path = Self::write_path(model, "create")?;
        let body = json!({ path.singular: fields });
        let response = self.client.rest_send(Method::POST, path.path, Some(&body)).await?;
        Self::unwrap_record(response, path.singular)
    }

    async fn update(
        &self,
        model: &EntityModel,
        id: u64,
        fields: &JsonObject,
    ) -> Result<JsonObject> {
        let path = Self::write_path(model, "update")?;
        let mut payload = fields.clone();
        payload.insert("id".to_string(), id.into());
        let body = json!({ path.singular: payload });
        let response = self
            .client
            .rest_send(Method::PUT, &format!("{}/{id}", path.path), Some(&body))
            .await
            .map_err(|e| not_found_on_404(e, model.kind(), id))?;
        Self::unwrap_record(response, path.singular)
    }

    async fn set_metafields(
        &self,
        owner_gid: &str,
        writes: &[MetafieldWrite],
    ) -> Result<JsonObject> {
        apply_metafield_writes(&self.client, owner_gid, writes).await
    }

    /// Resources written through several endpoints are probed in order
    async fn delete(&self, kind: ResourceKind, id: u64) -> Result<()> {
        let descriptor = kind.descriptor();
        if descriptor.write_paths.is_empty() {
            return Err(Error::unsupported(kind.to_string(), "delete"));
        }
        for path in descriptor.write_paths {
            match self
                .client
                .rest_send(Method::DELETE, &format!("{}/{id}", path.path), None)
                .await
            {
                Ok(_) => return Ok(()),
                Err(Error::HttpStatus { status: 404, .. }) => {
                    debug!("{kind} {id} not found under {}", path.path);
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::not_found(kind.to_string(), id))
    }
}

fn not_found_on_404(error: Error, kind: ResourceKind, id: u64) -> Error {
    match error {
        Error::HttpStatus { status: 404, .. } => Error::not_found(kind.to_string(), id),
        other => other,
    }
}
