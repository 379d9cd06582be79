//! APIアナリティクス
//!
//! レート制限チェック、記録されたレスポンス、Webhook配信結果から集計する。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// `top_endpoints`に含める最大件数
const TOP_ENDPOINTS_LIMIT: usize = 5;

#[derive(Debug, Default, Clone)]
struct EndpointCounters {
    requests: u64,
    rate_limited: u64,
    responses: u64,
    errors: u64,
    total_latency_ms: u64,
}

#[derive(Debug, Default)]
struct AnalyticsState {
    endpoints: HashMap<String, EndpointCounters>,
    webhooks_delivered: u64,
    webhooks_failed: u64,
}

/// エンドポイント別の利用状況
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointUsage {
    /// エンドポイントID
    pub endpoint_id: String,
    /// 許可されたリクエスト数
    pub requests: u64,
    /// レート制限で拒否された数
    pub rate_limited: u64,
    /// エラーレスポンス数（4xx/5xx）
    pub errors: u64,
}

/// Webhook配信統計
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WebhookStats {
    /// 配信成功数
    pub delivered: u64,
    /// 配信失敗数
    pub failed: u64,
}

/// アナリティクスのスナップショット
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsSnapshot {
    /// 許可されたリクエスト総数
    pub total_requests: u64,
    /// レート制限で拒否された総数
    pub rate_limited_requests: u64,
    /// 記録されたレスポンスのうち成功（1xx-3xx）の割合
    pub success_rate: f64,
    /// 記録されたレスポンスのうちエラー（4xx/5xx）の割合
    pub error_rate: f64,
    /// 平均レスポンス時間（ミリ秒）
    pub average_response_time_ms: f64,
    /// リクエスト数上位のエンドポイント
    pub top_endpoints: Vec<EndpointUsage>,
    /// Webhook配信統計
    pub webhooks: WebhookStats,
}

/// アナリティクス集計器
#[derive(Clone, Default)]
pub struct Analytics {
    state: Arc<RwLock<AnalyticsState>>,
}

impl Analytics {
    /// 空の集計器を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// レート制限チェックの結果を記録
    pub async fn record_admission(&self, endpoint_id: &str, allowed: bool) {
        let mut state = self.state.write().await;
        let counters = state.endpoints.entry(endpoint_id.to_string()).or_default();
        if allowed {
            counters.requests += 1;
        } else {
            counters.rate_limited += 1;
        }
    }

    /// レスポンスを記録
    pub async fn record_response(&self, endpoint_id: &str, status: u16, latency_ms: u64) {
        let mut state = self.state.write().await;
        let counters = state.endpoints.entry(endpoint_id.to_string()).or_default();
        counters.responses += 1;
        counters.total_latency_ms = counters.total_latency_ms.saturating_add(latency_ms);
        if status >= 400 {
            counters.errors += 1;
        }
    }

    /// Webhook配信結果を記録
    pub async fn record_webhook(&self, delivered: bool) {
        let mut state = self.state.write().await;
        if delivered {
            state.webhooks_delivered += 1;
        } else {
            state.webhooks_failed += 1;
        }
    }

    /// 現在の集計値を返す
    pub async fn snapshot(&self) -> AnalyticsSnapshot {
        let state = self.state.read().await;

        let mut total_requests = 0u64;
        let mut rate_limited_requests = 0u64;
        let mut responses = 0u64;
        let mut errors = 0u64;
        let mut total_latency_ms = 0u64;

        for counters in state.endpoints.values() {
            total_requests += counters.requests;
            rate_limited_requests += counters.rate_limited;
            responses += counters.responses;
            errors += counters.errors;
            total_latency_ms = total_latency_ms.saturating_add(counters.total_latency_ms);
        }

        let (success_rate, error_rate, average_response_time_ms) = if responses == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let responses_f = responses as f64;
            (
                (responses - errors) as f64 / responses_f,
                errors as f64 / responses_f,
                total_latency_ms as f64 / responses_f,
            )
        };

        let mut top_endpoints: Vec<EndpointUsage> = state
            .endpoints
            .iter()
            .filter(|(_, c)| c.requests > 0)
            .map(|(id, c)| EndpointUsage {
                endpoint_id: id.clone(),
                requests: c.requests,
                rate_limited: c.rate_limited,
                errors: c.errors,
            })
            .collect();
        top_endpoints.sort_by(|a, b| {
            b.requests
                .cmp(&a.requests)
                .then_with(|| a.endpoint_id.cmp(&b.endpoint_id))
        });
        top_endpoints.truncate(TOP_ENDPOINTS_LIMIT);

        AnalyticsSnapshot {
            total_requests,
            rate_limited_requests,
            success_rate,
            error_rate,
            average_response_time_ms,
            top_endpoints,
            webhooks: WebhookStats {
                delivered: state.webhooks_delivered,
                failed: state.webhooks_failed,
            },
        }
    }
}
