//! GraphQL adapters
//!
//! Connection paging for GraphQL-listed resources, keyed metafield lookups,
//! metafield writes and definition listing.

use super::types::{
    DefinitionSource, PrimaryFetcher, PrimaryPage, PrimaryRequest, SecondaryFetcher,
    SecondaryPage, SecondaryRecord, SecondaryRequest,
};
use crate::entity::{MetafieldWrite, PrimarySource, ResourceKind};
use crate::error::{Error, Result};
use crate::http::AdminClient;
use crate::pagination::PageInfo;
use crate::schema::MetafieldDefinition;
use crate::types::{lookup_path, JsonObject};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const METAFIELDS_BY_OWNER_QUERY: &str = r"query MetafieldsByOwner($ids: [ID!]!, $keys: [String!]) {
  nodes(ids: $ids) {
    id
    ... on HasMetafields {
      metafields(first: 250, keys: $keys) {
        nodes { namespace key value type }
      }
    }
  }
}";

const METAFIELDS_SET_MUTATION: &str = r"mutation MetafieldsSet($metafields: [MetafieldsSetInput!]!) {
  metafieldsSet(metafields: $metafields) {
    metafields { namespace key value }
    userErrors { field message }
  }
}";

const METAFIELDS_DELETE_MUTATION: &str = r"mutation MetafieldsDelete($metafields: [MetafieldIdentifierInput!]!) {
  metafieldsDelete(metafields: $metafields) {
    deletedMetafields { namespace key }
    userErrors { field message }
  }
}";

const DEFINITIONS_QUERY: &str = r"query MetafieldDefinitions($ownerType: MetafieldOwnerType!, $after: String) {
  metafieldDefinitions(first: 250, ownerType: $ownerType, after: $after) {
    nodes { namespace key name ownerType type { name } }
    pageInfo { hasNextPage endCursor }
  }
}";

// ============================================================================
// Primary connection
// ============================================================================

/// Pages through a GraphQL connection (`nodes` + `pageInfo`)
pub struct GraphQlPrimaryFetcher {
    client: Arc<AdminClient>,
    kind: ResourceKind,
    query: &'static str,
    connection: &'static str,
}

impl GraphQlPrimaryFetcher {
    /// Fetcher for a GraphQL-listed resource
    pub fn for_kind(client: Arc<AdminClient>, kind: ResourceKind) -> Result<Self> {
        match kind.descriptor().primary {
            PrimarySource::GraphQl { query, connection } => Ok(Self {
                client,
                kind,
                query,
                connection,
            }),
            PrimarySource::Rest(_) => Err(Error::unsupported(kind.to_string(), "GraphQL listing")),
        }
    }
}

#[async_trait]
impl PrimaryFetcher for GraphQlPrimaryFetcher {
    async fn fetch_page(&self, request: &PrimaryRequest) -> Result<PrimaryPage> {
        let mut variables = JsonObject::new();
        for (k, v) in &request.filters {
            variables.insert(k.clone(), Value::from(v.as_str()));
        }
        variables.insert("first".to_string(), request.page_size.into());
        variables.insert(
            "after".to_string(),
            request.cursor.clone().map_or(Value::Null, Value::from),
        );

        let response = self.client.graphql(self.query, Value::Object(variables)).await?;
        let cost = response.cost().copied();
        let data = response.into_data()?;

        let connection = data
            .get(self.connection)
            .ok_or_else(|| Error::decode(format!("missing '{}' connection", self.connection)))?;
        let records = connection
            .get("nodes")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|v| v.as_object().cloned())
            .collect::<Vec<_>>();
        let page_info: PageInfo = connection
            .get("pageInfo")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();

        debug!("Fetched {} {} records", records.len(), self.kind);

        Ok(PrimaryPage {
            records,
            next_cursor: page_info.next_cursor(),
            cost,
            extra: None,
        })
    }

    fn cost_metered(&self) -> bool {
        true
    }
}

// ============================================================================
// Keyed metafield lookup
// ============================================================================

/// Looks up metafields of a whole batch with one `nodes(ids:)` query
///
/// A throttled query, or ids the API does not resolve yet, ask for the
/// batch to be re-issued.
pub struct GraphQlMetafieldFetcher {
    client: Arc<AdminClient>,
}

impl GraphQlMetafieldFetcher {
    pub fn new(client: Arc<AdminClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecondaryFetcher for GraphQlMetafieldFetcher {
    async fn fetch(&self, request: &SecondaryRequest) -> Result<SecondaryPage> {
        if request.gids.is_empty() {
            return Ok(SecondaryPage::default());
        }

        let variables = json!({ "ids": request.gids, "keys": request.keys });
        let response = self
            .client
            .graphql(METAFIELDS_BY_OWNER_QUERY, variables)
            .await?;
        let cost = response.cost().copied();

        if response.is_throttled() {
            warn!("Metafield lookup throttled");
            return Ok(SecondaryPage::retry("throttled", cost));
        }

        let data = response.into_data()?;
        let nodes = data
            .get("nodes")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::decode("missing 'nodes' in metafield lookup"))?;

        let mut records = Vec::with_capacity(nodes.len());
        let mut unresolved = 0usize;
        for node in nodes {
            let Some(owner_gid) = node.get("id").and_then(Value::as_str) else {
                unresolved += 1;
                continue;
            };
            let values = node
                .get("metafields")
                .and_then(|m| m.get("nodes"))
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(|m| {
                    let namespace = m.get("namespace")?.as_str()?;
                    let key = m.get("key")?.as_str()?;
                    let value = m.get("value").cloned().unwrap_or(Value::Null);
                    Some((format!("{namespace}.{key}"), value))
                })
                .collect::<JsonObject>();
            records.push(SecondaryRecord {
                owner_gid: owner_gid.to_string(),
                values,
            });
        }

        let retry = (unresolved > 0).then(|| {
            format!(
                "{unresolved} of {} records not resolvable yet",
                request.gids.len()
            )
        });

        Ok(SecondaryPage {
            records,
            cost,
            next_cursor: None,
            retry,
        })
    }
}

// ============================================================================
// Metafield writes
// ============================================================================

/// Apply metafield writes for one owner through `metafieldsSet` and
/// `metafieldsDelete`
pub(crate) async fn apply_metafield_writes(
    client: &AdminClient,
    owner_gid: &str,
    writes: &[MetafieldWrite],
) -> Result<JsonObject> {
    let mut written = JsonObject::new();
    let (deletes, sets): (Vec<&MetafieldWrite>, Vec<&MetafieldWrite>) =
        writes.iter().partition(|w| w.is_delete());

    if !sets.is_empty() {
        let inputs = sets
            .iter()
            .map(|w| {
                json!({
                    "ownerId": owner_gid,
                    "namespace": w.namespace,
                    "key": w.key,
                    "value": w.value,
                    "type": w.type_name,
                })
            })
            .collect::<Vec<_>>();
        let data = client
            .graphql(METAFIELDS_SET_MUTATION, json!({ "metafields": inputs }))
            .await?
            .into_data()?;
        check_user_errors(&data, "metafieldsSet")?;
        for w in &sets {
            written.insert(w.full_key(), Value::from(w.value.clone()));
        }
    }

    if !deletes.is_empty() {
        let inputs = deletes
            .iter()
            .map(|w| json!({ "ownerId": owner_gid, "namespace": w.namespace, "key": w.key }))
            .collect::<Vec<_>>();
        let data = client
            .graphql(METAFIELDS_DELETE_MUTATION, json!({ "metafields": inputs }))
            .await?
            .into_data()?;
        check_user_errors(&data, "metafieldsDelete")?;
        for w in &deletes {
            written.insert(w.full_key(), Value::Null);
        }
    }

    Ok(written)
}

fn check_user_errors(data: &Value, mutation: &str) -> Result<()> {
    let messages = data
        .get(mutation)
        .and_then(|m| m.get("userErrors"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|e| e.get("message").and_then(Value::as_str))
        .collect::<Vec<_>>();
    if messages.is_empty() {
        Ok(())
    } else {
        Err(Error::UserErrors {
            message: messages.join("; "),
        })
    }
}

// ============================================================================
// Definitions
// ============================================================================

/// Lists metafield definitions per owner type
pub struct GraphQlDefinitionSource {
    client: Arc<AdminClient>,
}

impl GraphQlDefinitionSource {
    pub fn new(client: Arc<AdminClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DefinitionSource for GraphQlDefinitionSource {
    async fn definitions(&self, owner_type: &str) -> Result<Vec<MetafieldDefinition>> {
        let mut definitions = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let variables = json!({ "ownerType": owner_type, "after": after });
            let data = self
                .client
                .graphql(DEFINITIONS_QUERY, variables)
                .await?
                .into_data()?;
            let connection = data
                .get("metafieldDefinitions")
                .ok_or_else(|| Error::decode("missing 'metafieldDefinitions'"))?;

            for node in connection
                .get("nodes")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                let Some(object) = node.as_object() else {
                    continue;
                };
                let text = |path: &str| {
                    lookup_path(object, path)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                definitions.push(MetafieldDefinition {
                    namespace: text("namespace"),
                    key: text("key"),
                    name: text("name"),
                    type_name: text("type.name"),
                    owner_type: text("ownerType"),
                });
            }

            let page_info: PageInfo = connection
                .get("pageInfo")
                .cloned()
                .map(serde_json::from_value)
                .transpose()?
                .unwrap_or_default();
            match page_info.next_cursor() {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        debug!("Loaded {} metafield definitions for {owner_type}", definitions.len());
        Ok(definitions)
    }
}
