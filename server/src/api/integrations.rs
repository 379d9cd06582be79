//! 外部サービス連携API

use super::error::AppError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use emma_api_common::error::RegistryError;
use emma_api_common::protocol::{SyncResult, TestResult, UpdateIntegrationStatusRequest};
use emma_api_common::types::{
    IntegrationCategory, IntegrationRecord, IntegrationStatus, SyncFrequency,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 値を伏せて返す設定キー
const REDACTED_KEYS: [&str; 4] = ["api_key", "secret", "token", "password"];

/// 連携レスポンス（認証情報は伏せる）
#[derive(Debug, Serialize, Deserialize)]
pub struct IntegrationResponse {
    /// ID
    pub id: String,
    /// 表示名
    pub name: String,
    /// カテゴリ
    pub category: IntegrationCategory,
    /// プロバイダー
    pub provider: String,
    /// ステータス
    pub status: IntegrationStatus,
    /// 設定
    pub config: Map<String, Value>,
    /// 同期対象のパス
    pub endpoints: Vec<String>,
    /// 最終同期時刻
    pub last_sync: Option<DateTime<Utc>>,
    /// 同期頻度
    pub sync_frequency: SyncFrequency,
}

impl From<IntegrationRecord> for IntegrationResponse {
    fn from(record: IntegrationRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            category: record.category,
            provider: record.provider,
            status: record.status,
            config: redact_config(record.config),
            endpoints: record.endpoints,
            last_sync: record.last_sync,
            sync_frequency: record.sync_frequency,
        }
    }
}

fn redact_config(mut config: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in config.iter_mut() {
        let key = key.to_ascii_lowercase();
        if REDACTED_KEYS.iter().any(|k| key.contains(k)) && !value.is_null() {
            *value = Value::String("********".to_string());
        }
    }
    config
}

/// GET /api/registry/integrations - 連携一覧
pub async fn list_integrations(State(state): State<AppState>) -> Json<Vec<IntegrationResponse>> {
    let records = state.registry.list_integrations().await;
    Json(records.into_iter().map(IntegrationResponse::from).collect())
}

/// GET /api/registry/integrations/:id - 連携取得
pub async fn get_integration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IntegrationResponse>, AppError> {
    state
        .registry
        .get_integration(&id)
        .await
        .map(|r| Json(IntegrationResponse::from(r)))
        .ok_or_else(|| AppError(RegistryError::IntegrationNotFound(id)))
}

/// PUT /api/registry/integrations/:id/status - ステータス更新
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateIntegrationStatusRequest>,
) -> Result<Json<IntegrationResponse>, AppError> {
    if !state
        .registry
        .update_integration_status(&id, req.status)
        .await
    {
        return Err(AppError(RegistryError::IntegrationNotFound(id)));
    }
    get_integration(State(state), Path(id)).await
}

/// PATCH /api/registry/integrations/:id/config - 設定マージ
pub async fn update_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(config): Json<Map<String, Value>>,
) -> Result<Json<IntegrationResponse>, AppError> {
    let keys: Vec<String> = config.keys().cloned().collect();
    if !state.registry.update_integration_config(&id, config).await {
        return Err(AppError(RegistryError::IntegrationNotFound(id)));
    }
    tracing::info!(integration_id = %id, keys = ?keys, "Integration config updated");
    get_integration(State(state), Path(id)).await
}

/// POST /api/registry/integrations/:id/test - 接続テスト
pub async fn test_integration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<TestResult> {
    Json(state.registry.test_integration(&id).await)
}

/// POST /api/registry/integrations/:id/sync - レコード同期
pub async fn sync_integration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<SyncResult> {
    Json(state.registry.sync_integration(&id).await)
}
