//! APIレジストリ
//!
//! エンドポイントカタログ、Webhookストア、連携ストア、レート制限カウンタを
//! 1つの値として所有する。ホストプロセスが明示的に生成し、`AppState`経由で共有する。

pub mod endpoints;
pub mod integrations;
pub mod seed;
pub mod webhooks;

pub use endpoints::EndpointCatalog;
pub use integrations::IntegrationStore;
pub use webhooks::WebhookStore;

use crate::analytics::{Analytics, AnalyticsSnapshot};
use crate::health::IntegrationChecker;
use crate::openapi::{self, SpecInfo};
use crate::rate_limit::FixedWindowLimiter;
use crate::webhook::WebhookDispatcher;
use emma_api_common::config::RegistryConfig;
use emma_api_common::error::RegistryResult;
use emma_api_common::protocol::{
    EndpointPatch, RateLimitCheckResponse, RateLimitStatus, SyncResult, TestResult,
    WebhookPatch,
};
use emma_api_common::types::{
    EndpointDescriptor, IntegrationRecord, IntegrationStatus, WebhookSubscription,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// APIレジストリ
///
/// クローンしても同じ状態を共有する。
#[derive(Clone)]
pub struct ApiRegistry {
    endpoints: EndpointCatalog,
    webhooks: WebhookStore,
    integrations: IntegrationStore,
    limiter: FixedWindowLimiter,
    analytics: Analytics,
    dispatcher: WebhookDispatcher,
    checker: IntegrationChecker,
    config: Arc<RegistryConfig>,
}

impl ApiRegistry {
    /// 空のレジストリを作成
    pub fn new(config: RegistryConfig) -> RegistryResult<Self> {
        let integrations = IntegrationStore::new();
        let dispatcher = WebhookDispatcher::new(
            Duration::from_secs(config.webhook_timeout_secs),
            Duration::from_millis(config.max_retry_delay_ms),
        )?;
        let checker = IntegrationChecker::new(
            integrations.clone(),
            Duration::from_secs(config.probe_timeout_secs),
        )?;

        Ok(Self {
            endpoints: EndpointCatalog::new(),
            webhooks: WebhookStore::new(),
            integrations,
            limiter: FixedWindowLimiter::new(),
            analytics: Analytics::new(),
            dispatcher,
            checker,
            config: Arc::new(config),
        })
    }

    /// 既定のエンドポイントと連携を投入したレジストリを作成
    pub async fn with_defaults(config: RegistryConfig) -> RegistryResult<Self> {
        let registry = Self::new(config)?;
        registry.seed_defaults().await;
        Ok(registry)
    }

    /// 既定データを投入
    pub async fn seed_defaults(&self) {
        let endpoints = seed::default_endpoints();
        let integrations = seed::default_integrations();
        let (endpoint_count, integration_count) = (endpoints.len(), integrations.len());

        for endpoint in endpoints {
            self.endpoints.add(endpoint).await;
        }
        for record in integrations {
            self.integrations.add(record).await;
        }

        info!(
            endpoints = endpoint_count,
            integrations = integration_count,
            "Registry seeded with defaults"
        );
    }

    /// 設定
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // --- エンドポイント ---

    /// すべてのエンドポイント記述子
    pub async fn list_endpoints(&self) -> Vec<EndpointDescriptor> {
        self.endpoints.list().await
    }

    /// エンドポイント記述子を取得
    pub async fn get_endpoint(&self, id: &str) -> Option<EndpointDescriptor> {
        self.endpoints.get(id).await
    }

    /// エンドポイント記述子を追加（同じIDは置き換える）
    pub async fn add_endpoint(&self, endpoint: EndpointDescriptor) {
        self.endpoints.add(endpoint).await;
    }

    /// エンドポイント記述子を部分更新
    pub async fn update_endpoint(&self, id: &str, patch: EndpointPatch) -> bool {
        self.endpoints.update(id, patch).await
    }

    /// エンドポイント記述子を削除
    pub async fn delete_endpoint(&self, id: &str) -> bool {
        self.endpoints.remove(id).await
    }

    // --- レート制限 ---

    /// レート制限をチェックし、許可した場合はカウントを進める
    ///
    /// ポリシーのないエンドポイント（未登録を含む）は常に許可する。
    pub async fn check_rate_limit(&self, endpoint_id: &str, caller_id: &str) -> bool {
        self.admit(endpoint_id, caller_id).await.allowed
    }

    /// レート制限の判定と、判定直後のウィンドウ状態を返す
    ///
    /// 状態は判定と同じロック区間で取得する。ポリシーがなければ`status`はNone。
    pub async fn admit(&self, endpoint_id: &str, caller_id: &str) -> RateLimitCheckResponse {
        let Some(endpoint) = self.endpoints.get(endpoint_id).await else {
            return RateLimitCheckResponse {
                allowed: true,
                status: None,
            };
        };

        let (allowed, status) = match endpoint.rate_limit {
            Some(policy) => {
                let (allowed, status) = self
                    .limiter
                    .check_with_status(endpoint_id, caller_id, policy)
                    .await;
                (allowed, Some(status))
            }
            None => (true, None),
        };
        self.analytics.record_admission(endpoint_id, allowed).await;
        RateLimitCheckResponse { allowed, status }
    }

    /// 現在のレート制限状態（ポリシーがない場合はNone）
    pub async fn rate_limit_status(
        &self,
        endpoint_id: &str,
        caller_id: &str,
    ) -> Option<RateLimitStatus> {
        let policy = self.endpoints.get(endpoint_id).await?.rate_limit?;
        Some(self.limiter.status(endpoint_id, caller_id, policy).await)
    }

    /// ウィンドウが終わったカウンタを削除
    pub async fn purge_expired_counters(&self) -> usize {
        let purged = self.limiter.purge_expired().await;
        if purged > 0 {
            debug!(purged = purged, "Expired rate limit counters purged");
        }
        purged
    }

    // --- Webhook ---

    /// すべてのWebhook
    pub async fn list_webhooks(&self) -> Vec<WebhookSubscription> {
        self.webhooks.list().await
    }

    /// Webhookを取得
    pub async fn get_webhook(&self, id: &str) -> Option<WebhookSubscription> {
        self.webhooks.get(id).await
    }

    /// Webhookを追加（同じIDは置き換える）
    pub async fn add_webhook(&self, webhook: WebhookSubscription) {
        self.webhooks.add(webhook).await;
    }

    /// Webhookを部分更新
    pub async fn update_webhook(&self, id: &str, patch: WebhookPatch) -> bool {
        self.webhooks.update(id, patch).await
    }

    /// Webhookを削除
    pub async fn delete_webhook(&self, id: &str) -> bool {
        self.webhooks.remove(id).await
    }

    /// Webhookへイベントを配信
    ///
    /// 未登録・無効・未購読のイベントは送信せずにfalseを返す。
    pub async fn trigger_webhook(&self, id: &str, event: &str, data: serde_json::Value) -> bool {
        let Some(webhook) = self.webhooks.get(id).await else {
            debug!(webhook_id = %id, "Webhook not found");
            return false;
        };
        if !webhook.active {
            debug!(webhook_id = %id, "Webhook is inactive");
            return false;
        }
        if !webhook.subscribes_to(event) {
            debug!(webhook_id = %id, event = %event, "Webhook is not subscribed to event");
            return false;
        }

        let report = self.dispatcher.deliver(&webhook, event, data).await;
        self.analytics.record_webhook(report.delivered).await;
        report.delivered
    }

    /// イベントを購読しているすべての有効なWebhookへ配信し、成功数を返す
    pub async fn broadcast_event(&self, event: &str, data: serde_json::Value) -> usize {
        let targets = self.webhooks.active_for_event(event).await;
        let mut delivered = 0;
        for webhook in targets {
            let report = self.dispatcher.deliver(&webhook, event, data.clone()).await;
            self.analytics.record_webhook(report.delivered).await;
            if report.delivered {
                delivered += 1;
            }
        }
        delivered
    }

    // --- 連携 ---

    /// すべての連携
    pub async fn list_integrations(&self) -> Vec<IntegrationRecord> {
        self.integrations.list().await
    }

    /// 連携を取得
    pub async fn get_integration(&self, id: &str) -> Option<IntegrationRecord> {
        self.integrations.get(id).await
    }

    /// 連携ステータスを更新（`connected`の場合は`last_sync`も更新）
    pub async fn update_integration_status(&self, id: &str, status: IntegrationStatus) -> bool {
        self.integrations.update_status(id, status).await
    }

    /// 連携設定をキー単位でマージ
    pub async fn update_integration_config(
        &self,
        id: &str,
        config: serde_json::Map<String, serde_json::Value>,
    ) -> bool {
        self.integrations.update_config(id, config).await
    }

    /// 連携の接続テスト
    pub async fn test_integration(&self, id: &str) -> TestResult {
        self.checker.test_integration(id).await
    }

    /// 連携のレコード同期
    pub async fn sync_integration(&self, id: &str) -> SyncResult {
        self.checker.sync_integration(id).await
    }

    /// 定期同期用のチェッカー
    pub fn integration_checker(&self) -> IntegrationChecker {
        self.checker.clone()
    }

    // --- ドキュメント・アナリティクス ---

    /// OpenAPIドキュメントを生成
    pub async fn generate_spec(&self) -> serde_json::Value {
        let endpoints = self.endpoints.list().await;
        let info = SpecInfo {
            title: self.config.api_title.clone(),
            version: self.config.api_version.clone(),
            description: "Emma AI platform API".to_string(),
            server_url: self.config.public_base_url.clone(),
        };
        openapi::generate_spec(&endpoints, &info)
    }

    /// レスポンスを記録（未登録のエンドポイントは無視してfalse）
    pub async fn record_response(&self, endpoint_id: &str, status: u16, latency_ms: u64) -> bool {
        if self.endpoints.get(endpoint_id).await.is_none() {
            return false;
        }
        self.analytics
            .record_response(endpoint_id, status, latency_ms)
            .await;
        true
    }

    /// アナリティクスのスナップショット
    pub async fn analytics(&self) -> AnalyticsSnapshot {
        self.analytics.snapshot().await
    }
}
