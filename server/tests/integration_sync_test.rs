//! Integration Test: 外部サービス連携の接続テストと同期
//!
//! 連携先をモックサーバーに向けて、ステータス遷移と件数を検証する。

use emma_api_common::config::RegistryConfig;
use emma_api_common::types::IntegrationStatus;
use emma_api_server::registry::ApiRegistry;
use serde_json::{json, Map, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("config must be an object"),
    }
}

async fn registry_pointing_at(server: &MockServer) -> ApiRegistry {
    let config = RegistryConfig {
        probe_timeout_secs: 1,
        ..RegistryConfig::default()
    };
    let registry = ApiRegistry::with_defaults(config).await.unwrap();
    registry
        .update_integration_config(
            "hubspot",
            config_map(json!({
                "base_url": server.uri(),
                "health_path": "/health",
                "sync_path": "/crm/v3/objects/contacts",
                "api_key": "pat-test",
            })),
        )
        .await;
    registry
}

#[tokio::test]
async fn test_successful_probe_connects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header("authorization", "Bearer pat-test"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_pointing_at(&server).await;
    let result = registry.test_integration("hubspot").await;

    assert!(result.success, "{}", result.message);
    assert!(result.message.contains("HubSpot"));

    let record = registry.get_integration("hubspot").await.unwrap();
    assert_eq!(record.status, IntegrationStatus::Connected);
    assert!(record.last_sync.is_some());
}

#[tokio::test]
async fn test_rejected_probe_marks_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let registry = registry_pointing_at(&server).await;
    let result = registry.test_integration("hubspot").await;

    assert!(!result.success);
    assert!(result.message.contains("401"));

    let record = registry.get_integration("hubspot").await.unwrap();
    assert_eq!(record.status, IntegrationStatus::Error);
    assert!(record.last_sync.is_none());
}

#[tokio::test]
async fn test_slow_probe_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let registry = registry_pointing_at(&server).await;
    let result = registry.test_integration("hubspot").await;

    assert!(!result.success);
    assert_eq!(
        registry.get_integration("hubspot").await.unwrap().status,
        IntegrationStatus::Error
    );
}

#[tokio::test]
async fn test_sync_counts_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/crm/v3/objects/contacts"))
        .and(header("authorization", "Bearer pat-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": "1"}, {"id": "2"}, {"id": "3"}],
            "paging": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_pointing_at(&server).await;
    assert!(registry.test_integration("hubspot").await.success);
    let connected_at = registry
        .get_integration("hubspot")
        .await
        .unwrap()
        .last_sync
        .unwrap();

    let result = registry.sync_integration("hubspot").await;
    assert!(result.success);
    assert_eq!(result.synced_records, 3);

    let record = registry.get_integration("hubspot").await.unwrap();
    assert_eq!(record.status, IntegrationStatus::Connected);
    assert!(record.last_sync.unwrap() >= connected_at);
}

#[tokio::test]
async fn test_sync_failure_marks_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crm/v3/objects/contacts"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let registry = registry_pointing_at(&server).await;
    registry
        .update_integration_status("hubspot", IntegrationStatus::Connected)
        .await;

    let result = registry.sync_integration("hubspot").await;
    assert!(!result.success);
    assert_eq!(result.synced_records, 0);
    assert_eq!(
        registry.get_integration("hubspot").await.unwrap().status,
        IntegrationStatus::Error
    );
}

#[tokio::test]
async fn test_sync_requires_connected_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
        .expect(0)
        .mount(&server)
        .await;

    let registry = registry_pointing_at(&server).await;
    let result = registry.sync_integration("hubspot").await;

    assert!(!result.success);
    assert_eq!(
        registry.get_integration("hubspot").await.unwrap().status,
        IntegrationStatus::Disconnected
    );
}
