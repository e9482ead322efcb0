//! Tests for the fetch adapters

use super::*;
use crate::entity::{EntityModel, MetafieldWrite, ResourceKind};
use crate::error::Error;
use crate::http::{AdminClient, AdminClientConfig};
use crate::types::{BackoffType, JsonObject, StringMap};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API: &str = "/admin/api/2024-07";

fn client_for(server: &MockServer) -> Arc<AdminClient> {
    let config = AdminClientConfig::builder()
        .base_url(format!("{}{API}", server.uri()))
        .access_token("shpat_test")
        .max_retries(0)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(1),
            Duration::from_millis(1),
        )
        .no_rate_limit()
        .build();
    Arc::new(AdminClient::with_config(config).unwrap())
}

fn object(value: Value) -> JsonObject {
    value.as_object().unwrap().clone()
}

fn graphql_cost(requested: f64, available: f64) -> Value {
    json!({"cost": {
        "requestedQueryCost": requested,
        "actualQueryCost": requested,
        "throttleStatus": {
            "maximumAvailable": 1000.0,
            "currentlyAvailable": available,
            "restoreRate": 50.0
        }
    }})
}

// ============================================================================
// RestPrimaryFetcher Tests
// ============================================================================

#[tokio::test]
async fn test_rest_primary_first_page_applies_filters() {
    let server = MockServer::start().await;
    let link = format!(
        "<{}{API}/orders.json?limit=2&page_info=next2>; rel=\"next\"",
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path(format!("{API}/orders.json")))
        .and(query_param("limit", "2"))
        .and(query_param("status", "any"))
        .and(query_param("financial_status", "paid"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", link.as_str())
                .set_body_json(json!({"orders": [{"id": 1}, {"id": 2}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = RestPrimaryFetcher::for_kind(client_for(&server), ResourceKind::Order).unwrap();
    let mut filters = StringMap::new();
    filters.insert("financial_status".to_string(), "paid".to_string());
    let page = fetcher
        .fetch_page(&PrimaryRequest {
            page_size: 2,
            filters,
            ..PrimaryRequest::default()
        })
        .await
        .unwrap();

    assert_eq!(page.records.len(), 2);
    assert_eq!(page.next_cursor.as_deref(), Some("0|next2"));
    assert!(page.cost.is_none());
    assert!(!fetcher.cost_metered());
}

#[tokio::test]
async fn test_rest_primary_later_page_sends_only_page_info() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/orders.json")))
        .and(query_param("page_info", "next2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"orders": [{"id": 3}]})))
        .mount(&server)
        .await;

    let fetcher = RestPrimaryFetcher::for_kind(client_for(&server), ResourceKind::Order).unwrap();
    let page = fetcher
        .fetch_page(&PrimaryRequest {
            cursor: Some("0|next2".to_string()),
            page_size: 2,
            ..PrimaryRequest::default()
        })
        .await
        .unwrap();

    assert_eq!(page.records, vec![object(json!({"id": 3}))]);
    assert!(page.next_cursor.is_none());

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].url.query().unwrap_or_default().contains("status"));
}

#[tokio::test]
async fn test_rest_primary_walks_collection_listings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/custom_collections.json")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"custom_collections": [{"id": 10}]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/smart_collections.json")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"smart_collections": [{"id": 20}]})),
        )
        .mount(&server)
        .await;

    let fetcher =
        RestPrimaryFetcher::for_kind(client_for(&server), ResourceKind::Collection).unwrap();

    let first = fetcher
        .fetch_page(&PrimaryRequest {
            page_size: 50,
            ..PrimaryRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(first.records[0]["collection_type"], "custom");
    assert_eq!(first.next_cursor.as_deref(), Some("1|"));

    let second = fetcher
        .fetch_page(&PrimaryRequest {
            cursor: first.next_cursor,
            page_size: 50,
            ..PrimaryRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(second.records[0]["id"], 20);
    assert_eq!(second.records[0]["collection_type"], "smart");
    assert!(second.next_cursor.is_none());
}

#[tokio::test]
async fn test_rest_primary_rejects_bad_cursor_phase() {
    let server = MockServer::start().await;
    let fetcher = RestPrimaryFetcher::for_kind(client_for(&server), ResourceKind::Product).unwrap();
    let err = fetcher
        .fetch_page(&PrimaryRequest {
            cursor: Some("4|abc".to_string()),
            page_size: 10,
            ..PrimaryRequest::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Continuation { .. }));
}

#[test]
fn test_rest_primary_requires_rest_resource() {
    let config = AdminClientConfig::builder().base_url("http://localhost").build();
    let client = Arc::new(AdminClient::with_config(config).unwrap());
    assert!(RestPrimaryFetcher::for_kind(client.clone(), ResourceKind::Metaobject).is_err());
    assert!(GraphQlPrimaryFetcher::for_kind(client, ResourceKind::Product).is_err());
}

// ============================================================================
// GraphQlPrimaryFetcher Tests
// ============================================================================

#[tokio::test]
async fn test_graphql_primary_reads_connection_and_cost() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/graphql.json")))
        .and(body_partial_json(json!({"variables": {"first": 5, "type": "faq", "after": null}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"metaobjects": {
                "nodes": [{"id": "gid://shopify/Metaobject/1", "handle": "a"}],
                "pageInfo": {"hasNextPage": true, "endCursor": "cur1"}
            }},
            "extensions": graphql_cost(12.0, 900.0)
        })))
        .mount(&server)
        .await;

    let fetcher =
        GraphQlPrimaryFetcher::for_kind(client_for(&server), ResourceKind::Metaobject).unwrap();
    let mut filters = StringMap::new();
    filters.insert("type".to_string(), "faq".to_string());
    let page = fetcher
        .fetch_page(&PrimaryRequest {
            page_size: 5,
            filters,
            ..PrimaryRequest::default()
        })
        .await
        .unwrap();

    assert!(fetcher.cost_metered());
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.next_cursor.as_deref(), Some("cur1"));
    let cost = page.cost.unwrap();
    assert!((cost.throttle_status.currently_available - 900.0).abs() < f64::EPSILON);
}

// ============================================================================
// GraphQlMetafieldFetcher Tests
// ============================================================================

#[tokio::test]
async fn test_graphql_metafields_by_owner() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/graphql.json")))
        .and(body_string_contains("nodes(ids: $ids)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"nodes": [
                {"id": "gid://shopify/Product/1", "metafields": {"nodes": [
                    {"namespace": "custom", "key": "color", "value": "red", "type": "single_line_text_field"}
                ]}},
                {"id": "gid://shopify/Product/2", "metafields": {"nodes": []}}
            ]},
            "extensions": graphql_cost(4.0, 996.0)
        })))
        .mount(&server)
        .await;

    let fetcher = GraphQlMetafieldFetcher::new(client_for(&server));
    let page = fetcher
        .fetch(&SecondaryRequest {
            gids: vec![
                "gid://shopify/Product/1".to_string(),
                "gid://shopify/Product/2".to_string(),
            ],
            keys: vec!["custom.color".to_string()],
            cursor: None,
        })
        .await
        .unwrap();

    assert!(page.retry.is_none());
    assert!(page.cost.is_some());
    assert_eq!(page.records.len(), 2);
    assert_eq!(page.records[0].values["custom.color"], "red");
    assert!(page.records[1].values.is_empty());
}

#[tokio::test]
async fn test_graphql_metafields_unresolved_ids_ask_for_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/graphql.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"nodes": [
                {"id": "gid://shopify/Product/1", "metafields": {"nodes": []}},
                null
            ]}
        })))
        .mount(&server)
        .await;

    let page = GraphQlMetafieldFetcher::new(client_for(&server))
        .fetch(&SecondaryRequest {
            gids: vec![
                "gid://shopify/Product/1".to_string(),
                "gid://shopify/Product/2".to_string(),
            ],
            keys: vec!["custom.color".to_string()],
            cursor: None,
        })
        .await
        .unwrap();

    assert_eq!(page.records.len(), 1);
    assert_eq!(
        page.retry.as_deref(),
        Some("1 of 2 records not resolvable yet")
    );
}

#[tokio::test]
async fn test_graphql_metafields_throttled_is_retry_signal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/graphql.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"message": "Throttled", "extensions": {"code": "THROTTLED"}}],
            "extensions": graphql_cost(300.0, 10.0)
        })))
        .mount(&server)
        .await;

    let page = GraphQlMetafieldFetcher::new(client_for(&server))
        .fetch(&SecondaryRequest {
            gids: vec!["gid://shopify/Product/1".to_string()],
            keys: vec!["custom.color".to_string()],
            cursor: None,
        })
        .await
        .unwrap();

    assert_eq!(page.retry.as_deref(), Some("throttled"));
    assert!(page.records.is_empty());
    assert!(page.cost.is_some());
}

// ============================================================================
// RestMetafieldFetcher Tests
// ============================================================================

#[tokio::test]
async fn test_rest_metafields_positional_cursor() {
    let server = MockServer::start().await;
    for id in 1..=3 {
        Mock::given(method("GET"))
            .and(path(format!("{API}/products/{id}/metafields.json")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"metafields": [
                {"namespace": "custom", "key": "color", "value": format!("c{id}")},
                {"namespace": "custom", "key": "other", "value": "x"}
            ]})))
            .mount(&server)
            .await;
    }

    let fetcher = RestMetafieldFetcher::new(client_for(&server), ResourceKind::Product)
        .with_max_calls(2);
    let gids: Vec<String> = (1..=3).map(|id| format!("gid://shopify/Product/{id}")).collect();

    let first = fetcher
        .fetch(&SecondaryRequest {
            gids: gids.clone(),
            keys: vec!["custom.color".to_string()],
            cursor: None,
        })
        .await
        .unwrap();
    assert_eq!(first.records.len(), 2);
    assert_eq!(first.next_cursor.as_deref(), Some("2"));
    assert_eq!(first.records[1].values, object(json!({"custom.color": "c2"})));

    let second = fetcher
        .fetch(&SecondaryRequest {
            gids,
            keys: vec!["custom.color".to_string()],
            cursor: first.next_cursor,
        })
        .await
        .unwrap();
    assert_eq!(second.records.len(), 1);
    assert_eq!(second.records[0].owner_gid, "gid://shopify/Product/3");
    assert!(second.next_cursor.is_none());
}

// ============================================================================
// RestMutator Tests
// ============================================================================

#[tokio::test]
async fn test_rest_mutator_create_and_update() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/products.json")))
        .and(body_partial_json(json!({"product": {"title": "Hat"}})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"product": {"id": 5, "title": "Hat"}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{API}/products/5.json")))
        .and(body_partial_json(json!({"product": {"id": 5, "title": "Cap"}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"product": {"id": 5, "title": "Cap"}})),
        )
        .mount(&server)
        .await;

    let mutator = RestMutator::new(client_for(&server));
    let model = EntityModel::new(ResourceKind::Product, object(json!({"title": "Hat"})));

    let created = mutator
        .create(&model, &object(json!({"title": "Hat"})))
        .await
        .unwrap();
    assert_eq!(created["id"], 5);

    let updated = mutator
        .update(&model, 5, &object(json!({"title": "Cap"})))
        .await
        .unwrap();
    assert_eq!(updated["title"], "Cap");
}

#[tokio::test]
async fn test_rest_mutator_uses_tagged_collection_path() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{API}/smart_collections/9.json")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"smart_collection": {"id": 9, "title": "Sale"}})),
        )
        .mount(&server)
        .await;

    let model = EntityModel::new(
        ResourceKind::Collection,
        object(json!({"id": 9, "collection_type": "smart"})),
    );
    let updated = RestMutator::new(client_for(&server))
        .update(&model, 9, &object(json!({"title": "Sale"})))
        .await
        .unwrap();
    assert_eq!(updated["title"], "Sale");
}

#[tokio::test]
async fn test_rest_mutator_update_missing_record() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{API}/pages/404.json")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let model = EntityModel::new(ResourceKind::Page, object(json!({"id": 404})));
    let err = RestMutator::new(client_for(&server))
        .update(&model, 404, &object(json!({"title": "x"})))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_rest_mutator_delete_probes_collection_paths() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{API}/custom_collections/7.json")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{API}/smart_collections/7.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    RestMutator::new(client_for(&server))
        .delete(ResourceKind::Collection, 7)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rest_mutator_delete_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = RestMutator::new(client_for(&server))
        .delete(ResourceKind::Customer, 3)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Customer 3 not found");
}

#[tokio::test]
async fn test_rest_mutator_set_and_delete_metafields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/graphql.json")))
        .and(body_string_contains("metafieldsSet"))
        .and(body_partial_json(json!({"variables": {"metafields": [{
            "ownerId": "gid://shopify/Product/5",
            "namespace": "custom",
            "key": "color",
            "value": "blue",
            "type": "single_line_text_field"
        }]}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"metafieldsSet": {"metafields": [], "userErrors": []}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/graphql.json")))
        .and(body_string_contains("metafieldsDelete"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"metafieldsDelete": {"deletedMetafields": [], "userErrors": []}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let writes = vec![
        MetafieldWrite {
            namespace: "custom".to_string(),
            key: "color".to_string(),
            value: Some("blue".to_string()),
            type_name: "single_line_text_field".to_string(),
        },
        MetafieldWrite {
            namespace: "custom".to_string(),
            key: "size".to_string(),
            value: None,
            type_name: "single_line_text_field".to_string(),
        },
    ];
    let written = RestMutator::new(client_for(&server))
        .set_metafields("gid://shopify/Product/5", &writes)
        .await
        .unwrap();

    assert_eq!(written["custom.color"], "blue");
    assert_eq!(written["custom.size"], Value::Null);
}

#[tokio::test]
async fn test_rest_mutator_metafield_user_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/graphql.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"metafieldsSet": {"metafields": [], "userErrors": [
                {"field": ["metafields", "0", "value"], "message": "Value is invalid"}
            ]}}
        })))
        .mount(&server)
        .await;

    let writes = vec![MetafieldWrite {
        namespace: "custom".to_string(),
        key: "count".to_string(),
        value: Some("abc".to_string()),
        type_name: "number_integer".to_string(),
    }];
    let err = RestMutator::new(client_for(&server))
        .set_metafields("gid://shopify/Product/5", &writes)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UserErrors { ref message } if message == "Value is invalid"));
}

// ============================================================================
// GraphQlDefinitionSource Tests
// ============================================================================

#[tokio::test]
async fn test_definition_source_follows_pages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/graphql.json")))
        .and(body_partial_json(json!({"variables": {"ownerType": "PRODUCT", "after": null}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"metafieldDefinitions": {
                "nodes": [{"namespace": "custom", "key": "color", "name": "Color",
                           "ownerType": "PRODUCT", "type": {"name": "single_line_text_field"}}],
                "pageInfo": {"hasNextPage": true, "endCursor": "d1"}
            }}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/graphql.json")))
        .and(body_partial_json(json!({"variables": {"after": "d1"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"metafieldDefinitions": {
                "nodes": [{"namespace": "custom", "key": "weight_g", "name": "Weight",
                           "ownerType": "PRODUCT", "type": {"name": "number_integer"}}],
                "pageInfo": {"hasNextPage": false, "endCursor": "d2"}
            }}
        })))
        .mount(&server)
        .await;

    let definitions = GraphQlDefinitionSource::new(client_for(&server))
        .definitions("PRODUCT")
        .await
        .unwrap();

    assert_eq!(definitions.len(), 2);
    assert_eq!(definitions[0].full_key(), "custom.color");
    assert_eq!(definitions[0].name, "Color");
    assert_eq!(definitions[1].type_name, "number_integer");
    assert_eq!(definitions[1].owner_type, "PRODUCT");
}
