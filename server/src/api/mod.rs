//! REST APIハンドラー
//!
//! レジストリの操作をHTTPで公開する

pub mod docs;
pub mod endpoints;
pub mod error;
pub mod integrations;
pub mod webhooks;

use crate::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// APIルーターを作成
pub fn create_router(state: AppState) -> Router {
    let registry_routes = Router::new()
        .route(
            "/endpoints",
            get(endpoints::list_endpoints).post(endpoints::create_endpoint),
        )
        .route(
            "/endpoints/:id",
            get(endpoints::get_endpoint)
                .patch(endpoints::update_endpoint)
                .delete(endpoints::delete_endpoint),
        )
        .route(
            "/endpoints/:id/rate-limit",
            post(endpoints::check_rate_limit),
        )
        .route(
            "/endpoints/:id/responses",
            post(endpoints::record_response),
        )
        .route(
            "/webhooks",
            get(webhooks::list_webhooks).post(webhooks::create_webhook),
        )
        .route(
            "/webhooks/:id",
            get(webhooks::get_webhook)
                .patch(webhooks::update_webhook)
                .delete(webhooks::delete_webhook),
        )
        .route("/webhooks/:id/trigger", post(webhooks::trigger_webhook))
        .route("/integrations", get(integrations::list_integrations))
        .route("/integrations/:id", get(integrations::get_integration))
        .route("/integrations/:id/status", put(integrations::update_status))
        .route(
            "/integrations/:id/config",
            axum::routing::patch(integrations::update_config),
        )
        .route(
            "/integrations/:id/test",
            post(integrations::test_integration),
        )
        .route(
            "/integrations/:id/sync",
            post(integrations::sync_integration),
        );

    Router::new()
        .route("/health", get(docs::health))
        .route("/api/docs/openapi.json", get(docs::openapi_document))
        .route("/api/analytics", get(docs::analytics))
        .nest("/api/registry", registry_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ApiRegistry;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use emma_api_common::config::RegistryConfig;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn app() -> Router {
        let config = RegistryConfig::default();
        let registry = ApiRegistry::with_defaults(config.clone()).await.unwrap();
        create_router(AppState {
            registry,
            config: Arc::new(config),
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(request).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_endpoint_crud() {
        let app = app().await;

        let (status, body) = send(&app, "GET", "/api/registry/endpoints", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 9);

        let descriptor = json!({
            "id": "list-invoices",
            "method": "GET",
            "path": "/api/invoices",
            "description": "List invoices",
            "authentication": "bearer",
            "rate_limit": {"requests": 10, "window_ms": 60000}
        });
        let (status, body) = send(&app, "POST", "/api/registry/endpoints", Some(descriptor)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], "list-invoices");

        let (status, body) = send(
            &app,
            "PATCH",
            "/api/registry/endpoints/list-invoices",
            Some(json!({"description": "Invoices", "rate_limit": null})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["description"], "Invoices");
        assert!(body.get("rate_limit").is_none());

        let (status, _) = send(&app, "DELETE", "/api/registry/endpoints/list-invoices", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, "GET", "/api/registry/endpoints/list-invoices", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Endpoint not found");
    }

    #[tokio::test]
    async fn test_create_endpoint_rejects_relative_path() {
        let app = app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/registry/endpoints",
            Some(json!({"id": "bad", "method": "GET", "path": "api/bad"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request");
    }

    #[tokio::test]
    async fn test_patch_rejects_zero_window() {
        let app = app().await;
        let (status, body) = send(
            &app,
            "PATCH",
            "/api/registry/endpoints/get-clients",
            Some(json!({"rate_limit": {"requests": 1, "window_ms": 0}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request");

        // 既存のポリシーは変わらない
        let (_, endpoint) = send(&app, "GET", "/api/registry/endpoints/get-clients", None).await;
        assert_eq!(endpoint["rate_limit"]["requests"], 100);
        assert_eq!(endpoint["rate_limit"]["window_ms"], 60000);

        let uri = "/api/registry/endpoints/get-clients/rate-limit";
        let (status, body) = send(&app, "POST", uri, Some(json!({"caller_id": "c"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"]["remaining"], 99);
    }

    #[tokio::test]
    async fn test_recorded_responses_feed_analytics() {
        let app = app().await;
        let uri = "/api/registry/endpoints/get-clients/responses";

        for (code, latency_ms) in [(200, 100), (200, 200), (201, 300), (502, 400)] {
            let (status, _) = send(
                &app,
                "POST",
                uri,
                Some(json!({"status": code, "latency_ms": latency_ms})),
            )
            .await;
            assert_eq!(status, StatusCode::NO_CONTENT);
        }

        let (_, analytics) = send(&app, "GET", "/api/analytics", None).await;
        assert_eq!(analytics["success_rate"], 0.75);
        assert_eq!(analytics["error_rate"], 0.25);
        assert_eq!(analytics["average_response_time_ms"], 250.0);

        let (status, _) = send(
            &app,
            "POST",
            "/api/registry/endpoints/missing/responses",
            Some(json!({"status": 200, "latency_ms": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "POST", uri, Some(json!({"status": 42}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rate_limit_route() {
        let app = app().await;
        let uri = "/api/registry/endpoints/submit-contact/rate-limit";
        let caller = json!({"caller_id": "visitor-1"});

        for expected_remaining in (0..5).rev() {
            let (status, body) = send(&app, "POST", uri, Some(caller.clone())).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["allowed"], true);
            assert_eq!(body["status"]["remaining"], expected_remaining);
        }

        let (status, body) = send(&app, "POST", uri, Some(caller)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["allowed"], false);
        assert_eq!(body["status"]["limit"], 5);

        let (status, _) = send(
            &app,
            "POST",
            "/api/registry/endpoints/missing/rate-limit",
            Some(json!({"caller_id": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, analytics) = send(&app, "GET", "/api/analytics", None).await;
        assert_eq!(analytics["total_requests"], 5);
        assert_eq!(analytics["rate_limited_requests"], 1);
    }

    #[tokio::test]
    async fn test_webhook_lifecycle_without_delivery() {
        let app = app().await;

        let (status, created) = send(
            &app,
            "POST",
            "/api/registry/webhooks",
            Some(json!({
                "url": "https://hooks.example.com/emma",
                "events": ["client.created"],
                "secret": "s3cret"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["has_secret"], true);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            "PATCH",
            &format!("/api/registry/webhooks/{id}"),
            Some(json!({"active": false})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active"], false);

        // 無効なWebhookは送信せずに false
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/registry/webhooks/{id}/trigger"),
            Some(json!({"event": "client.created", "data": {"id": 1}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["delivered"], false);

        let (status, body) = send(
            &app,
            "POST",
            "/api/registry/webhooks/missing/trigger",
            Some(json!({"event": "client.created"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["delivered"], false);

        let (status, _) = send(&app, "DELETE", &format!("/api/registry/webhooks/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &format!("/api/registry/webhooks/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_webhook_rejects_bad_url() {
        let app = app().await;
        let (status, _) = send(
            &app,
            "POST",
            "/api/registry/webhooks",
            Some(json!({"url": "mailto:ops@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_integration_routes() {
        let app = app().await;

        let (status, body) = send(&app, "GET", "/api/registry/integrations", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 5);

        let (status, body) = send(
            &app,
            "PATCH",
            "/api/registry/integrations/hubspot/config",
            Some(json!({"api_key": "pat-123", "portal_id": 42})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["config"]["api_key"], "********");
        assert_eq!(body["config"]["portal_id"], 42);
        assert_eq!(body["config"]["base_url"], "https://api.hubapi.com");

        let (status, body) = send(
            &app,
            "PUT",
            "/api/registry/integrations/hubspot/status",
            Some(json!({"status": "connected"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "connected");
        assert!(body["last_sync"].is_string());

        let (status, _) = send(
            &app,
            "PUT",
            "/api/registry/integrations/missing/status",
            Some(json!({"status": "connected"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // 未登録の連携でもテスト結果は200で返す
        let (status, body) = send(&app, "POST", "/api/registry/integrations/missing/test", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);

        let (status, body) = send(&app, "POST", "/api/registry/integrations/stripe/sync", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": false, "synced_records": 0}));
    }

    #[tokio::test]
    async fn test_openapi_document() {
        let app = app().await;
        let (status, body) = send(&app, "GET", "/api/docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["openapi"], "3.0.3");
        assert!(body["paths"]["/api/clients/{id}"]["delete"].is_object());
    }
}
