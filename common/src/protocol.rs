//! 通信プロトコル定義
//!
//! レジストリ操作の入出力メッセージとWebhookエンベロープ

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::types::{
    AuthMode, EndpointDescriptor, EndpointParameter, EndpointResponse, HttpMethod,
    IntegrationStatus, RateLimitPolicy, RetryPolicy, WebhookSubscription,
};

/// Option<Option<T>>のデシリアライズヘルパー
/// - フィールドなし → None
/// - フィールドがnull → Some(None)
/// - フィールドに値あり → Some(Some(value))
fn deserialize_optional_field<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// エンドポイント部分更新
///
/// 指定されたフィールドのみ上書きする。
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct EndpointPatch {
    /// HTTPメソッド
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    /// パス
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// 説明
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// パラメータ一覧
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<EndpointParameter>>,
    /// レスポンス一覧
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<EndpointResponse>>,
    /// 認証方式
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AuthMode>,
    /// レート制限（nullで解除）
    #[serde(
        default,
        deserialize_with = "deserialize_optional_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub rate_limit: Option<Option<RateLimitPolicy>>,
    /// タグ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl EndpointPatch {
    /// 記述子にパッチを適用する（idは変更しない）
    pub fn apply_to(self, endpoint: &mut EndpointDescriptor) {
        if let Some(method) = self.method {
            endpoint.method = method;
        }
        if let Some(path) = self.path {
            endpoint.path = path;
        }
        if let Some(description) = self.description {
            endpoint.description = description;
        }
        if let Some(parameters) = self.parameters {
            endpoint.parameters = parameters;
        }
        if let Some(responses) = self.responses {
            endpoint.responses = responses;
        }
        if let Some(authentication) = self.authentication {
            endpoint.authentication = authentication;
        }
        if let Some(rate_limit) = self.rate_limit {
            endpoint.rate_limit = rate_limit;
        }
        if let Some(tags) = self.tags {
            endpoint.tags = tags;
        }
    }
}

/// Webhook部分更新
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct WebhookPatch {
    /// 配信先URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// 購読イベント
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<String>>,
    /// 有効フラグ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// シークレット（nullで削除）
    #[serde(
        default,
        deserialize_with = "deserialize_optional_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub secret: Option<Option<String>>,
    /// 追加ヘッダー（丸ごと置き換え）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    /// リトライポリシー
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,
}

impl WebhookPatch {
    /// 購読にパッチを適用する（idは変更しない）
    pub fn apply_to(self, webhook: &mut WebhookSubscription) {
        if let Some(url) = self.url {
            webhook.url = url;
        }
        if let Some(events) = self.events {
            webhook.events = events;
        }
        if let Some(active) = self.active {
            webhook.active = active;
        }
        if let Some(secret) = self.secret {
            webhook.secret = secret;
        }
        if let Some(headers) = self.headers {
            webhook.headers = headers;
        }
        if let Some(retry_policy) = self.retry_policy {
            webhook.retry_policy = retry_policy;
        }
    }
}

/// Webhook配信エンベロープ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookEnvelope {
    /// イベント名
    pub event: String,
    /// イベントデータ
    pub data: serde_json::Value,
    /// 送信時刻（RFC 3339）
    pub timestamp: String,
    /// 送信元Webhook ID
    #[serde(rename = "webhookId")]
    pub webhook_id: String,
}

/// 連携の接続テスト結果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestResult {
    /// 成功フラグ
    pub success: bool,
    /// 結果メッセージ
    pub message: String,
}

impl TestResult {
    /// 成功結果
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// 失敗結果
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// 連携の同期結果
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncResult {
    /// 成功フラグ
    pub success: bool,
    /// 同期したレコード数
    pub synced_records: u64,
}

impl SyncResult {
    /// 同期失敗
    pub fn failed() -> Self {
        Self {
            success: false,
            synced_records: 0,
        }
    }
}

/// レート制限チェックリクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitCheckRequest {
    /// 呼び出し元ID（APIキーやユーザーID）
    pub caller_id: String,
}

/// レート制限チェックレスポンス
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitCheckResponse {
    /// 許可されたか
    pub allowed: bool,
    /// 現在のウィンドウ状態（ポリシーがない場合はNone）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RateLimitStatus>,
}

/// (エンドポイント, 呼び出し元) ごとのレート制限状態
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitStatus {
    /// ウィンドウ内の上限
    pub limit: u32,
    /// 残りリクエスト数
    pub remaining: u32,
    /// ウィンドウがリセットされるまでのミリ秒数
    pub reset_in_ms: u64,
}

/// レスポンス記録リクエスト
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordResponseRequest {
    /// HTTPステータスコード
    pub status: u16,
    /// 応答時間（ミリ秒）
    #[serde(default)]
    pub latency_ms: u64,
}

/// Webhookトリガーリクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerWebhookRequest {
    /// イベント名
    pub event: String,
    /// イベントデータ
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Webhookトリガーレスポンス
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerWebhookResponse {
    /// 配信に成功したか
    pub delivered: bool,
}

/// 連携ステータス更新リクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateIntegrationStatusRequest {
    /// 新しいステータス
    pub status: IntegrationStatus,
}
