//! Tests for the sync orchestrator

use super::*;
use crate::config::{ConnectorConfig, EntityConfig};
use crate::http::{ApiClient, ApiClientConfig};
use crate::protocol::{EntityOutcome, SyncRequest};
use crate::state::{CursorValue, SyncState};
use crate::types::BackoffType;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_client() -> ApiClient {
    ApiClient::with_config(
        ApiClientConfig::builder()
            .max_retries(1)
            .backoff(
                BackoffType::Constant,
                Duration::from_millis(5),
                Duration::from_millis(20),
            )
            .no_rate_limit()
            .build(),
    )
}

fn config(server: &MockServer, entities: serde_json::Value) -> ConnectorConfig {
    ConnectorConfig::from_json_value(&json!({
        "client_id": "client",
        "client_secret": "secret",
        "auth_url": format!("{}/oauth/token", server.uri()),
        "base_url": server.uri(),
        "page_size": 10,
        "time_budget_secs": 0,
        "entities": entities
    }))
    .unwrap()
}

fn connector(server: &MockServer, entities: serde_json::Value) -> PosConnector {
    PosConnector::with_api_client(config(server, entities), fast_client())
}

async fn mount_auth(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "expires_in": 3600,
            "server_url": server.uri()
        })))
        .mount(server)
        .await;
}

fn sale(id: &str, article: &str, date: &str, quantity: i64, total: f64) -> serde_json::Value {
    json!({
        "sale_id": id,
        "shop_id": "shop1",
        "article_id": article,
        "quantity": quantity,
        "unit_price": total / quantity as f64,
        "total": total,
        "sale_date": date,
        "updated_at": date
    })
}

// ============================================================================
// test operation
// ============================================================================

#[tokio::test]
async fn test_operation_success() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok").await;

    let mut connector = connector(&server, json!([]));
    let response = connector.test().await;

    assert!(response.success);
    assert!(response.message.contains(&server.uri()));
}

#[tokio::test]
async fn test_operation_failure_reports_reason() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad client"))
        .mount(&server)
        .await;

    let mut connector = connector(&server, json!([]));
    let response = connector.test().await;

    assert!(!response.success);
    assert!(response.message.contains("401"));
}

// ============================================================================
// schema operation
// ============================================================================

#[tokio::test]
async fn test_schema_operation_static_and_inferred() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok").await;

    // voucher has no static schema; one sample page feeds inference
    Mock::given(method("GET"))
        .and(path("/api/v1/vouchers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "voucher_id": "v1", "amount": 10 },
            { "voucher_id": "v2", "amount": "N/A" }
        ])))
        .mount(&server)
        .await;

    let mut connector = connector(
        &server,
        json!([
            { "name": "shop", "endpoint": "/api/v1/shops" },
            { "name": "voucher", "endpoint": "/api/v1/vouchers" }
        ]),
    );

    let response = connector.schema(&[]).await.unwrap();

    let shop = &response.entities["shop"];
    assert_eq!(shop.primary_key, vec!["shop_id".to_string()]);

    let voucher = &response.entities["voucher"];
    assert_eq!(voucher.primary_key, vec!["voucher_id".to_string()]);
    // Mixed integer/string column resolves to string
    assert_eq!(
        voucher.columns["amount"],
        crate::schema::ColumnType::String
    );

    assert!(response.failures.is_empty());
}

#[tokio::test]
async fn test_schema_operation_reports_per_entity_failure() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok").await;

    // Records with no detectable primary key
    Mock::given(method("GET"))
        .and(path("/api/v1/mysteries"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "name": "x", "value": 1 }])),
        )
        .mount(&server)
        .await;

    let mut connector = connector(
        &server,
        json!([
            { "name": "shop", "endpoint": "/api/v1/shops" },
            { "name": "mystery", "endpoint": "/api/v1/mysteries" }
        ]),
    );

    let response = connector.schema(&[]).await.unwrap();

    // The failing entity is reported, the healthy one still resolves
    assert!(response.entities.contains_key("shop"));
    assert!(response.failures.contains_key("mystery"));
    assert!(response.failures["mystery"].contains("primary key"));
}

#[tokio::test]
async fn test_schema_operation_includes_aggregates() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok").await;

    let mut connector = connector(
        &server,
        json!([
            {
                "name": "sale",
                "endpoint": "/api/v1/sales",
                "aggregates": ["daily_sales", "article_sales"]
            }
        ]),
    );

    let response = connector.schema(&[]).await.unwrap();

    assert!(response.entities.contains_key("sale"));
    assert!(response.entities.contains_key("daily_sales"));
    assert!(response.entities.contains_key("article_sales"));
    assert_eq!(
        response.entities["daily_sales"].primary_key,
        vec!["sale_day".to_string()]
    );
}

#[tokio::test]
async fn test_schema_operation_auth_failure_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let mut connector = connector(&server, json!([]));
    let err = connector.schema(&[]).await.unwrap_err();
    assert!(err.is_fatal());
}

// ============================================================================
// sync operation
// ============================================================================

#[tokio::test]
async fn test_sync_zero_records_entity_succeeds() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/shops"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let mut connector = connector(&server, json!([{ "name": "shop", "endpoint": "/api/v1/shops" }]));
    let response = connector.sync(SyncRequest::default()).await.unwrap();

    match &response.entities["shop"] {
        EntityOutcome::Ok {
            records, has_more, ..
        } => {
            assert!(records.is_empty());
            assert!(!has_more);
        }
        other => panic!("expected Ok, got {other:?}"),
    }
    assert_eq!(response.stats.errors, 0);
}

#[tokio::test]
async fn test_sync_enhances_and_aggregates() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sales"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            sale("s1", "a1", "2024-03-01T09:00:00Z", 1, 10.0),
            sale("s2", "a1", "2024-03-01T15:00:00Z", 2, 30.0),
            sale("s3", "a2", "2024-03-02T10:00:00Z", 1, 12.0)
        ])))
        .mount(&server)
        .await;

    let mut connector = connector(
        &server,
        json!([
            {
                "name": "sale",
                "endpoint": "/api/v1/sales",
                "cursor_field": "updated_at",
                "aggregates": ["daily_sales"]
            }
        ]),
    );

    let response = connector.sync(SyncRequest::default()).await.unwrap();

    // Base entity: enhanced records with quality flags
    let EntityOutcome::Ok { records, .. } = &response.entities["sale"] else {
        panic!("expected Ok outcome for sale");
    };
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["is_negative_quantity"], json!(false));

    // Aggregate entity: one row per day, conformed to its schema
    let EntityOutcome::Ok { records: rows, .. } = &response.entities["daily_sales"] else {
        panic!("expected Ok outcome for daily_sales");
    };
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["sale_day"], json!("2024-03-01"));
    assert_eq!(rows[0]["total_revenue"], json!(40.0));
    assert_eq!(rows[0]["sale_count"], json!(2));

    // Merged cursor reflects the newest updated_at
    assert_eq!(
        response.state.cursor("sale"),
        Some(&CursorValue::Timestamp(
            "2024-03-02T10:00:00Z".parse().unwrap()
        ))
    );

    assert_eq!(response.stats.entities_synced, 2);
    assert_eq!(response.stats.records_synced, 5);
}

#[tokio::test]
async fn test_sync_partial_entity_failure_does_not_abort_siblings() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/shops"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sales"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([sale("s1", "a1", "2024-03-01T09:00:00Z", 1, 10.0)])),
        )
        .mount(&server)
        .await;

    let mut input = SyncState::new();
    input.advance(
        "shop",
        CursorValue::Timestamp("2024-02-01T00:00:00Z".parse().unwrap()),
    );

    let mut connector = connector(
        &server,
        json!([
            { "name": "shop", "endpoint": "/api/v1/shops" },
            { "name": "sale", "endpoint": "/api/v1/sales" }
        ]),
    );

    let response = connector
        .sync(SyncRequest {
            entities: vec![],
            state: input,
        })
        .await
        .unwrap();

    assert!(matches!(
        response.entities["shop"],
        EntityOutcome::ExtractionFailed { .. }
    ));
    assert!(response.entities["sale"].is_ok());

    // The failed entity's cursor never regressed or advanced
    assert_eq!(
        response.state.cursor("shop"),
        Some(&CursorValue::Timestamp(
            "2024-02-01T00:00:00Z".parse().unwrap()
        ))
    );
    assert_eq!(response.stats.errors, 1);
    assert_eq!(response.stats.entities_synced, 1);
}

#[tokio::test]
async fn test_sync_token_expiry_mid_sync_resumes_page() {
    let server = MockServer::start().await;

    // First auth hands out a token that dies after page 1
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok1",
            "expires_in": 3600,
            "server_url": server.uri()
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok2",
            "expires_in": 3600,
            "server_url": server.uri()
        })))
        .mount(&server)
        .await;

    // Page 1 succeeds with tok1
    Mock::given(method("GET"))
        .and(path("/api/v1/sales"))
        .and(query_param("offset", "0"))
        .and(header("Authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            sale("s1", "a1", "2024-03-01T09:00:00Z", 1, 10.0),
            sale("s2", "a1", "2024-03-01T10:00:00Z", 1, 11.0)
        ])))
        .mount(&server)
        .await;

    // Page 2 rejects tok1, accepts tok2
    Mock::given(method("GET"))
        .and(path("/api/v1/sales"))
        .and(query_param("offset", "2"))
        .and(header("Authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sales"))
        .and(query_param("offset", "2"))
        .and(header("Authorization", "Bearer tok2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([sale("s3", "a2", "2024-03-01T11:00:00Z", 1, 12.0)])),
        )
        .mount(&server)
        .await;

    let mut connector = PosConnector::with_api_client(
        ConnectorConfig::from_json_value(&json!({
            "client_id": "client",
            "client_secret": "secret",
            "auth_url": format!("{}/oauth/token", server.uri()),
            "base_url": server.uri(),
            "page_size": 2,
            "entities": [{ "name": "sale", "endpoint": "/api/v1/sales" }]
        }))
        .unwrap(),
        fast_client(),
    );

    let response = connector.sync(SyncRequest::default()).await.unwrap();

    // Re-authentication happened once and the full record count survived
    let EntityOutcome::Ok { records, .. } = &response.entities["sale"] else {
        panic!("expected Ok outcome");
    };
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn test_sync_unknown_entity_reported_not_fatal() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/shops"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let mut connector = connector(&server, json!([{ "name": "shop", "endpoint": "/api/v1/shops" }]));
    let response = connector
        .sync(SyncRequest {
            entities: vec!["shop".to_string(), "nonsense".to_string()],
            state: SyncState::new(),
        })
        .await
        .unwrap();

    assert!(response.entities["shop"].is_ok());
    assert!(matches!(
        response.entities["nonsense"],
        EntityOutcome::SchemaFailed { .. }
    ));
}

#[tokio::test]
async fn test_sync_auth_failure_aborts_invocation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut connector = connector(&server, json!([{ "name": "shop", "endpoint": "/api/v1/shops" }]));
    let err = connector.sync(SyncRequest::default()).await.unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_sync_time_budget_stops_at_page_boundary() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok").await;

    // The first page is full (so more pages exist) and slow enough to
    // exhaust the 1-second budget
    Mock::given(method("GET"))
        .and(path("/api/v1/sales"))
        .and(query_param("offset", "0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(1200))
                .set_body_json(json!([sale("s1", "a1", "2024-03-01T09:00:00Z", 1, 10.0)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut connector = PosConnector::with_api_client(
        ConnectorConfig::from_json_value(&json!({
            "client_id": "client",
            "client_secret": "secret",
            "auth_url": format!("{}/oauth/token", server.uri()),
            "base_url": server.uri(),
            "page_size": 1,
            "time_budget_secs": 1,
            "entities": [{ "name": "sale", "endpoint": "/api/v1/sales" }]
        }))
        .unwrap(),
        fast_client(),
    );

    let response = connector.sync(SyncRequest::default()).await.unwrap();

    // The committed page's cursor advance survives; the rest is deferred
    let EntityOutcome::Ok {
        records,
        has_more,
        state,
    } = &response.entities["sale"]
    else {
        panic!("expected Ok outcome");
    };
    assert_eq!(records.len(), 1);
    assert!(has_more);
    assert_eq!(
        state.cursor,
        Some(CursorValue::Timestamp(
            "2024-03-01T09:00:00Z".parse().unwrap()
        ))
    );
}

#[tokio::test]
async fn test_sync_incremental_cursor_passed_and_monotonic() {
    let server = MockServer::start().await;
    mount_auth(&server, "tok").await;

    // The source echoes only records at or after the cursor; here it
    // returns one record older than the cursor (late-arriving update)
    Mock::given(method("GET"))
        .and(path("/api/v1/sales"))
        .and(query_param("since", "2024-05-01T00:00:00+00:00"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([sale("s1", "a1", "2024-04-30T00:00:00Z", 1, 10.0)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut input = SyncState::new();
    input.advance(
        "sale",
        CursorValue::Timestamp("2024-05-01T00:00:00Z".parse().unwrap()),
    );

    let mut connector = connector(&server, json!([{ "name": "sale", "endpoint": "/api/v1/sales" }]));
    let response = connector
        .sync(SyncRequest {
            entities: vec![],
            state: input,
        })
        .await
        .unwrap();

    // Output cursor never regresses below the input cursor
    assert_eq!(
        response.state.cursor("sale"),
        Some(&CursorValue::Timestamp(
            "2024-05-01T00:00:00Z".parse().unwrap()
        ))
    );
}
