//! Integration Test: Webhook配信
//!
//! エンベロープ・ヘッダー・署名・リトライをモックサーバーで検証する。

use emma_api_common::config::RegistryConfig;
use emma_api_common::types::{BackoffStrategy, RetryPolicy, WebhookSubscription};
use emma_api_server::registry::ApiRegistry;
use emma_api_server::webhook::{verify_signature, WebhookDispatcher, WEBHOOK_USER_AGENT};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        backoff: BackoffStrategy::Fixed,
        initial_delay_ms: 10,
    }
}

fn subscription(server: &MockServer, events: &[&str]) -> WebhookSubscription {
    let mut webhook = WebhookSubscription::new(
        "crm-hook",
        format!("{}/hook", server.uri()),
        events.iter().map(|e| e.to_string()).collect(),
    );
    webhook.retry_policy = fast_retry(0);
    webhook
}

async fn registry() -> ApiRegistry {
    ApiRegistry::new(RegistryConfig::default()).unwrap()
}

fn dispatcher() -> WebhookDispatcher {
    WebhookDispatcher::new(Duration::from_secs(5), Duration::from_millis(100)).unwrap()
}

#[tokio::test]
async fn test_delivers_signed_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("content-type", "application/json"))
        .and(header("user-agent", WEBHOOK_USER_AGENT))
        .and(header("x-tenant", "acme"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut webhook = subscription(&server, &["client.created"]);
    webhook.secret = Some("whsec-test".to_string());
    webhook
        .headers
        .insert("X-Tenant".to_string(), "acme".to_string());

    let registry = registry().await;
    registry.add_webhook(webhook).await;

    let delivered = registry
        .trigger_webhook("crm-hook", "client.created", json!({"clientId": "c-1"}))
        .await;
    assert!(delivered);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    let envelope: Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(envelope["event"], "client.created");
    assert_eq!(envelope["data"]["clientId"], "c-1");
    assert_eq!(envelope["webhookId"], "crm-hook");
    let timestamp = envelope["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());

    let signature = request
        .headers
        .get("x-webhook-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(signature.starts_with("sha256="));
    assert!(verify_signature("whsec-test", &request.body, signature));

    let analytics = registry.analytics().await;
    assert_eq!(analytics.webhooks.delivered, 1);
    assert_eq!(analytics.webhooks.failed, 0);
}

#[tokio::test]
async fn test_unsigned_when_no_secret() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry().await;
    registry
        .add_webhook(subscription(&server, &["client.updated"]))
        .await;

    assert!(
        registry
            .trigger_webhook("crm-hook", "client.updated", json!(null))
            .await
    );

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("x-webhook-signature").is_none());
}

#[tokio::test]
async fn test_inactive_webhook_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut webhook = subscription(&server, &["client.created"]);
    webhook.active = false;

    let registry = registry().await;
    registry.add_webhook(webhook).await;

    assert!(
        !registry
            .trigger_webhook("crm-hook", "client.created", json!({}))
            .await
    );
}

#[tokio::test]
async fn test_unsubscribed_event_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let registry = registry().await;
    registry
        .add_webhook(subscription(&server, &["client.created"]))
        .await;

    assert!(
        !registry
            .trigger_webhook("crm-hook", "invoice.paid", json!({}))
            .await
    );
    assert_eq!(registry.analytics().await.webhooks.failed, 0);
}

#[tokio::test]
async fn test_retries_server_errors_until_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut webhook = subscription(&server, &["client.created"]);
    webhook.retry_policy = fast_retry(2);

    let report = dispatcher()
        .deliver(&webhook, "client.created", json!({}))
        .await;
    assert!(!report.delivered);
    assert_eq!(report.attempts, 3);
    assert_eq!(report.last_status, Some(503));
}

#[tokio::test]
async fn test_recovers_after_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut webhook = subscription(&server, &["client.created"]);
    webhook.retry_policy = fast_retry(3);

    let report = dispatcher()
        .deliver(&webhook, "client.created", json!({}))
        .await;
    assert!(report.delivered);
    assert_eq!(report.attempts, 2);
    assert_eq!(report.last_status, Some(200));
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let mut webhook = subscription(&server, &["client.created"]);
    webhook.retry_policy = fast_retry(3);

    let registry = registry().await;
    registry.add_webhook(webhook).await;

    assert!(
        !registry
            .trigger_webhook("crm-hook", "client.created", json!({}))
            .await
    );
    assert_eq!(registry.analytics().await.webhooks.failed, 1);
}

#[tokio::test]
async fn test_unreachable_target_returns_false() {
    let mut webhook = WebhookSubscription::new(
        "gone",
        "http://127.0.0.1:1/hook",
        vec!["client.created".to_string()],
    );
    webhook.retry_policy = fast_retry(1);

    let report = dispatcher()
        .deliver(&webhook, "client.created", json!({}))
        .await;
    assert!(!report.delivered);
    assert_eq!(report.attempts, 2);
    assert_eq!(report.last_status, None);
}

#[tokio::test]
async fn test_broadcast_reaches_subscribed_active_webhooks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let registry = registry().await;
    for (id, events, active) in [
        ("a", vec!["client.created"], true),
        ("b", vec!["client.created", "client.deleted"], true),
        ("c", vec!["client.created"], false),
        ("d", vec!["client.deleted"], true),
    ] {
        let mut webhook = subscription(&server, &events);
        webhook.id = id.to_string();
        webhook.active = active;
        registry.add_webhook(webhook).await;
    }

    let delivered = registry
        .broadcast_event("client.created", json!({"clientId": "c-9"}))
        .await;
    assert_eq!(delivered, 2);
}
