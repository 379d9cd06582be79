//! Webhook管理API
//!
//! 購読のCRUDと手動トリガー

use super::error::AppError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use emma_api_common::error::{CommonError, RegistryError};
use emma_api_common::protocol::{TriggerWebhookRequest, TriggerWebhookResponse, WebhookPatch};
use emma_api_common::types::{RetryPolicy, WebhookSubscription};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Webhook登録リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateWebhookRequest {
    /// ID（省略時はUUIDを採番）
    #[serde(default)]
    pub id: Option<String>,
    /// 配信先URL
    pub url: String,
    /// 購読イベント
    #[serde(default)]
    pub events: Vec<String>,
    /// 有効フラグ
    #[serde(default = "default_active")]
    pub active: bool,
    /// 署名用シークレット
    #[serde(default)]
    pub secret: Option<String>,
    /// 追加ヘッダー
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// リトライポリシー
    #[serde(default)]
    pub retry_policy: RetryPolicy,
}

fn default_active() -> bool {
    true
}

impl CreateWebhookRequest {
    fn into_subscription(self) -> WebhookSubscription {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        WebhookSubscription {
            id,
            url: self.url,
            events: self.events,
            active: self.active,
            secret: self.secret,
            headers: self.headers,
            retry_policy: self.retry_policy,
        }
    }
}

/// Webhookレスポンス（シークレットは返さない）
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct WebhookResponse {
    /// ID
    pub id: String,
    /// 配信先URL
    pub url: String,
    /// 購読イベント
    pub events: Vec<String>,
    /// 有効フラグ
    pub active: bool,
    /// シークレットが設定されているか
    pub has_secret: bool,
    /// 追加ヘッダー
    pub headers: BTreeMap<String, String>,
    /// リトライポリシー
    pub retry_policy: RetryPolicy,
}

impl From<WebhookSubscription> for WebhookResponse {
    fn from(webhook: WebhookSubscription) -> Self {
        Self {
            id: webhook.id,
            url: webhook.url,
            events: webhook.events,
            active: webhook.active,
            has_secret: webhook.secret.is_some(),
            headers: webhook.headers,
            retry_policy: webhook.retry_policy,
        }
    }
}

fn validate_url(url: &str) -> Result<(), CommonError> {
    let parsed = Url::parse(url)
        .map_err(|e| CommonError::Validation(format!("invalid webhook url '{}': {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(CommonError::Validation(format!(
            "unsupported webhook url scheme: {}",
            scheme
        ))),
    }
}

/// GET /api/registry/webhooks - 購読一覧
pub async fn list_webhooks(State(state): State<AppState>) -> Json<Vec<WebhookResponse>> {
    let webhooks = state.registry.list_webhooks().await;
    Json(webhooks.into_iter().map(WebhookResponse::from).collect())
}

/// POST /api/registry/webhooks - 購読登録
pub async fn create_webhook(
    State(state): State<AppState>,
    Json(req): Json<CreateWebhookRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_url(&req.url)?;

    let webhook = req.into_subscription();
    tracing::info!(
        webhook_id = %webhook.id,
        url = %webhook.url,
        events = ?webhook.events,
        "Webhook created via API"
    );
    state.registry.add_webhook(webhook.clone()).await;
    Ok((StatusCode::CREATED, Json(WebhookResponse::from(webhook))))
}

/// GET /api/registry/webhooks/:id - 購読取得
pub async fn get_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WebhookResponse>, AppError> {
    state
        .registry
        .get_webhook(&id)
        .await
        .map(|w| Json(WebhookResponse::from(w)))
        .ok_or_else(|| AppError(RegistryError::WebhookNotFound(id)))
}

/// PATCH /api/registry/webhooks/:id - 購読の部分更新
pub async fn update_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<WebhookPatch>,
) -> Result<Json<WebhookResponse>, AppError> {
    if let Some(url) = &patch.url {
        validate_url(url)?;
    }

    if !state.registry.update_webhook(&id, patch).await {
        return Err(AppError(RegistryError::WebhookNotFound(id)));
    }
    state
        .registry
        .get_webhook(&id)
        .await
        .map(|w| Json(WebhookResponse::from(w)))
        .ok_or_else(|| AppError(RegistryError::WebhookNotFound(id)))
}

/// DELETE /api/registry/webhooks/:id - 購読削除
pub async fn delete_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.registry.delete_webhook(&id).await {
        tracing::info!(webhook_id = %id, "Webhook removed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError(RegistryError::WebhookNotFound(id)))
    }
}

/// POST /api/registry/webhooks/:id/trigger - イベントを手動配信
///
/// 未登録・無効・未購読でも200で`delivered: false`を返す。
pub async fn trigger_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TriggerWebhookRequest>,
) -> Json<TriggerWebhookResponse> {
    let delivered = state
        .registry
        .trigger_webhook(&id, &req.event, req.data)
        .await;
    Json(TriggerWebhookResponse { delivered })
}
