//! ドキュメント・アナリティクス・ヘルスチェックAPI

use crate::analytics::AnalyticsSnapshot;
use crate::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// GET /health - 稼働確認
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/docs/openapi.json - OpenAPIドキュメント
pub async fn openapi_document(State(state): State<AppState>) -> Json<Value> {
    Json(state.registry.generate_spec().await)
}

/// GET /api/analytics - 利用統計
pub async fn analytics(State(state): State<AppState>) -> Json<AnalyticsSnapshot> {
    Json(state.registry.analytics().await)
}
