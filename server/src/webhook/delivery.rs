//! Webhook配信
//!
//! エンベロープを組み立てて1件のWebhookへPOSTする。
//! リトライポリシーに従い、一時的な失敗のみ再送する。

use crate::webhook::signature::{sign_payload, SIGNATURE_HEADER};
use chrono::{SecondsFormat, Utc};
use emma_api_common::error::{RegistryError, RegistryResult};
use emma_api_common::protocol::WebhookEnvelope;
use emma_api_common::types::WebhookSubscription;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 送信時のUser-Agent
pub const WEBHOOK_USER_AGENT: &str = "Emma-AI-Webhook/1.0";

/// 配信結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    /// 2xxを受け取ったか
    pub delivered: bool,
    /// 送信試行回数
    pub attempts: u32,
    /// 最後に受け取ったHTTPステータス（通信失敗時はNone）
    pub last_status: Option<u16>,
}

/// Webhook送信クライアント
#[derive(Clone)]
pub struct WebhookDispatcher {
    client: Client,
    max_retry_delay: Duration,
}

impl WebhookDispatcher {
    /// タイムアウトとリトライ待機上限を指定して作成
    pub fn new(timeout: Duration, max_retry_delay: Duration) -> RegistryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_retry_delay,
        })
    }

    /// エンベロープを作成
    pub fn build_envelope(
        webhook: &WebhookSubscription,
        event: &str,
        data: serde_json::Value,
    ) -> WebhookEnvelope {
        WebhookEnvelope {
            event: event.to_string(),
            data,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            webhook_id: webhook.id.clone(),
        }
    }

    /// 送信ヘッダーを作成
    ///
    /// 標準ヘッダー、追加ヘッダー、署名の順に設定する。
    /// 不正な追加ヘッダーは警告を出して無視する。
    pub fn build_headers(webhook: &WebhookSubscription, body: &[u8]) -> RegistryResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(WEBHOOK_USER_AGENT));

        for (name, value) in &webhook.headers {
            let parsed = HeaderName::from_bytes(name.as_bytes())
                .ok()
                .zip(HeaderValue::from_str(value).ok());
            match parsed {
                Some((name, value)) => {
                    headers.insert(name, value);
                }
                None => warn!(
                    webhook_id = %webhook.id,
                    header = %name,
                    "Skipping invalid custom webhook header"
                ),
            }
        }

        if let Some(secret) = webhook.secret.as_deref() {
            let signature = sign_payload(secret, body)?;
            let value = HeaderValue::from_str(&signature)
                .map_err(|e| RegistryError::InvalidHeader(e.to_string()))?;
            headers.insert(SIGNATURE_HEADER, value);
        }

        Ok(headers)
    }

    /// Webhookを配信する
    ///
    /// 通信失敗・5xx・408・429はリトライ対象、それ以外の非2xxは即失敗とする。
    pub async fn deliver(
        &self,
        webhook: &WebhookSubscription,
        event: &str,
        data: serde_json::Value,
    ) -> DeliveryReport {
        let envelope = Self::build_envelope(webhook, event, data);
        let prepared = serde_json::to_vec(&envelope)
            .map_err(|e| RegistryError::Internal(format!("Failed to encode envelope: {}", e)))
            .and_then(|body| Self::build_headers(webhook, &body).map(|headers| (body, headers)));

        let (body, headers) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(webhook_id = %webhook.id, error = %e, "Failed to prepare webhook");
                return DeliveryReport {
                    delivered: false,
                    attempts: 0,
                    last_status: None,
                };
            }
        };

        let policy = webhook.retry_policy;
        let max_attempts = policy.max_retries.saturating_add(1);
        let mut last_status = None;
        let mut attempts = 0;

        while attempts < max_attempts {
            if attempts > 0 {
                let delay = Duration::from_millis(policy.delay_ms(attempts)).min(self.max_retry_delay);
                debug!(
                    webhook_id = %webhook.id,
                    retry = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying webhook delivery"
                );
                tokio::time::sleep(delay).await;
            }
            attempts += 1;

            match self.send_once(&webhook.url, headers.clone(), body.clone()).await {
                Ok(status) if status.is_success() => {
                    info!(
                        webhook_id = %webhook.id,
                        event = %event,
                        status = status.as_u16(),
                        attempts = attempts,
                        "Webhook delivered"
                    );
                    return DeliveryReport {
                        delivered: true,
                        attempts,
                        last_status: Some(status.as_u16()),
                    };
                }
                Ok(status) => {
                    last_status = Some(status.as_u16());
                    warn!(
                        webhook_id = %webhook.id,
                        event = %event,
                        status = status.as_u16(),
                        attempt = attempts,
                        "Webhook endpoint returned non-success status"
                    );
                    if !is_retryable_status(status) {
                        break;
                    }
                }
                Err(e) => {
                    last_status = None;
                    warn!(
                        webhook_id = %webhook.id,
                        event = %event,
                        attempt = attempts,
                        error = %e,
                        "Webhook delivery failed"
                    );
                }
            }
        }

        DeliveryReport {
            delivered: false,
            attempts,
            last_status,
        }
    }

    async fn send_once(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> RegistryResult<StatusCode> {
        let response = self
            .client
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RegistryError::Timeout(e.to_string())
                } else {
                    RegistryError::Http(e.to_string())
                }
            })?;
        Ok(response.status())
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}
