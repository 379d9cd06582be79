//! 共通型定義
//!
//! EndpointDescriptor, WebhookSubscription, IntegrationRecord等のコアデータ型

use crate::error::{CommonError, CommonResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// HTTPメソッド
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// 大文字表記（`GET`等）
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// OpenAPIのオペレーションキー（小文字）
    pub fn operation_key(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unsupported HTTP method: {}", other)),
        }
    }
}

/// エンドポイントの認証方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// 認証不要
    #[default]
    None,
    /// Bearerトークン
    Bearer,
    /// APIキー（`X-API-Key`ヘッダー）
    ApiKey,
}

impl AuthMode {
    /// OpenAPIのsecuritySchemes名（認証不要の場合はNone）
    pub fn security_scheme(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Bearer => Some("bearer"),
            Self::ApiKey => Some("api-key"),
        }
    }
}

/// パラメータの位置
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// パスパラメータ（`:id`）
    Path,
    /// クエリ文字列
    Query,
    /// リクエストヘッダー
    Header,
    /// JSONボディのフィールド
    Body,
}

impl ParameterLocation {
    /// OpenAPIの`in`値
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Body => "body",
        }
    }
}

/// エンドポイントのパラメータ定義
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointParameter {
    /// パラメータ名
    pub name: String,
    /// 位置
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    /// JSONスキーマ型（"string", "integer"等）
    #[serde(rename = "type", default = "default_parameter_type")]
    pub param_type: String,
    /// 必須フラグ
    #[serde(default)]
    pub required: bool,
    /// 説明
    #[serde(default)]
    pub description: String,
}

fn default_parameter_type() -> String {
    "string".to_string()
}

impl EndpointParameter {
    /// パラメータを作成
    pub fn new(
        name: impl Into<String>,
        location: ParameterLocation,
        param_type: impl Into<String>,
        required: bool,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            param_type: param_type.into(),
            required,
            description: description.into(),
        }
    }
}

/// エンドポイントのレスポンス定義
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointResponse {
    /// HTTPステータスコード
    pub status: u16,
    /// 説明
    pub description: String,
    /// レスポンスボディのJSONスキーマ（任意）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
}

impl EndpointResponse {
    /// スキーマなしのレスポンスを作成
    pub fn new(status: u16, description: impl Into<String>) -> Self {
        Self {
            status,
            description: description.into(),
            schema: None,
        }
    }

    /// スキーマを設定
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// レート制限ポリシー（固定ウィンドウ）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// ウィンドウ内の最大リクエスト数
    pub requests: u32,
    /// ウィンドウ長（ミリ秒）
    pub window_ms: u64,
}

impl RateLimitPolicy {
    /// ポリシーを作成
    pub fn new(requests: u32, window_ms: u64) -> Self {
        Self {
            requests,
            window_ms,
        }
    }

    /// ポリシーを検証する
    ///
    /// `window_ms == 0`ではウィンドウが即座に失効し、上限が効かなくなるため拒否する。
    /// `requests == 0`は常に拒否するポリシーとして受け付ける。
    pub fn validate(&self) -> CommonResult<()> {
        if self.window_ms == 0 {
            return Err(CommonError::Validation(
                "rate_limit.window_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// APIエンドポイント記述子
///
/// 実行可能なハンドラーではなく、ドキュメント用のメタデータ。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointDescriptor {
    /// 一意識別子
    pub id: String,
    /// HTTPメソッド
    pub method: HttpMethod,
    /// パス（`/api/clients/:id`形式）
    pub path: String,
    /// 説明
    #[serde(default)]
    pub description: String,
    /// パラメータ一覧
    #[serde(default)]
    pub parameters: Vec<EndpointParameter>,
    /// レスポンス一覧
    #[serde(default)]
    pub responses: Vec<EndpointResponse>,
    /// 認証方式
    #[serde(default)]
    pub authentication: AuthMode,
    /// レート制限（任意）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitPolicy>,
    /// OpenAPIタグ
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl EndpointDescriptor {
    /// 最小限の記述子を作成
    pub fn new(id: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method,
            path: path.into(),
            description: String::new(),
            parameters: Vec::new(),
            responses: Vec::new(),
            authentication: AuthMode::None,
            rate_limit: None,
            tags: Vec::new(),
        }
    }
}

/// リトライ時の待機時間の伸ばし方
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// 常に初期遅延
    Fixed,
    /// 初期遅延 × 試行回数
    Linear,
    /// 初期遅延 × 2^(試行回数-1)
    #[default]
    Exponential,
}

/// Webhook配信のリトライポリシー
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大リトライ回数（初回送信を含まない）
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// バックオフ方式
    #[serde(default)]
    pub backoff: BackoffStrategy,
    /// 初期遅延（ミリ秒）
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff: BackoffStrategy::default(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// リトライしないポリシー
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: BackoffStrategy::Fixed,
            initial_delay_ms: 0,
        }
    }

    /// `retry`回目（1始まり）のリトライ前に待つミリ秒数
    pub fn delay_ms(&self, retry: u32) -> u64 {
        let retry = retry.max(1);
        match self.backoff {
            BackoffStrategy::Fixed => self.initial_delay_ms,
            BackoffStrategy::Linear => self.initial_delay_ms.saturating_mul(retry as u64),
            BackoffStrategy::Exponential => {
                let factor = 1u64.checked_shl(retry - 1).unwrap_or(u64::MAX);
                self.initial_delay_ms.saturating_mul(factor)
            }
        }
    }
}

/// Webhook購読
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookSubscription {
    /// 一意識別子
    pub id: String,
    /// 配信先URL
    pub url: String,
    /// 購読イベント名（集合として扱う）
    #[serde(default)]
    pub events: Vec<String>,
    /// 有効フラグ
    #[serde(default = "default_active")]
    pub active: bool,
    /// 署名用の共有シークレット
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// 追加ヘッダー
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// リトライポリシー
    #[serde(default)]
    pub retry_policy: RetryPolicy,
}

fn default_active() -> bool {
    true
}

impl WebhookSubscription {
    /// 有効な購読を作成
    pub fn new(id: impl Into<String>, url: impl Into<String>, events: Vec<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            events,
            active: true,
            secret: None,
            headers: BTreeMap::new(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// 指定イベントを購読しているか
    pub fn subscribes_to(&self, event: &str) -> bool {
        self.events.iter().any(|e| e == event)
    }
}

/// 連携カテゴリ
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationCategory {
    /// CRM
    Crm,
    /// マーケティングオートメーション
    Marketing,
    /// コミュニケーション
    Communication,
    /// アクセス解析
    Analytics,
    /// 決済
    Payments,
}

/// 連携の接続状態
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStatus {
    /// 接続済み
    Connected,
    /// 未接続
    #[default]
    Disconnected,
    /// エラー
    Error,
}

impl IntegrationStatus {
    /// 文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 同期頻度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncFrequency {
    /// リアルタイム
    Realtime,
    /// 毎時
    Hourly,
    /// 毎日
    #[default]
    Daily,
    /// 毎週
    Weekly,
    /// 手動のみ
    Manual,
}

/// 外部サービス連携レコード
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrationRecord {
    /// 一意識別子
    pub id: String,
    /// 表示名
    pub name: String,
    /// カテゴリ
    pub category: IntegrationCategory,
    /// プロバイダー名
    pub provider: String,
    /// 接続状態
    #[serde(default)]
    pub status: IntegrationStatus,
    /// 自由形式の設定（`base_url`, `health_path`, `sync_path`, `api_key`を解釈する）
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
    /// 連携先のパス一覧
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// 最終同期時刻
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    /// 同期頻度
    #[serde(default)]
    pub sync_frequency: SyncFrequency,
}

impl IntegrationRecord {
    /// 設定値を文字列として取得
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
