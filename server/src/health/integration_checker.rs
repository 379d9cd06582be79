//! 連携チェッカー
//!
//! 外部サービス連携の接続テストとレコード同期を実際のHTTP通信で行う。
//!
//! 連携レコードの`config`から次のキーを読む:
//! - `base_url`: 接続先（必須）
//! - `health_path`: 接続テストのパス（省略時は`base_url`そのもの）
//! - `sync_path`: 同期対象のパス（省略時は`endpoints`の先頭）
//! - `api_key`: Bearerトークン

use crate::registry::integrations::IntegrationStore;
use chrono::{DateTime, Utc};
use emma_api_common::error::{RegistryError, RegistryResult};
use emma_api_common::protocol::{SyncResult, TestResult};
use emma_api_common::types::{IntegrationRecord, IntegrationStatus, SyncFrequency};
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// デフォルトのチェック間隔（秒）
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;

/// 件数として数える配列フィールド（先に見つかったものを使う）
const RECORD_ARRAY_KEYS: [&str; 4] = ["data", "results", "records", "items"];

/// 連携チェッカー
#[derive(Clone)]
pub struct IntegrationChecker {
    /// 連携ストア
    store: IntegrationStore,
    /// HTTPクライアント
    client: Client,
    /// 定期同期のチェック間隔（秒）
    check_interval_secs: u64,
}

impl IntegrationChecker {
    /// 新しいチェッカーを作成
    pub fn new(store: IntegrationStore, timeout: Duration) -> RegistryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            store,
            client,
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
        })
    }

    /// チェック間隔を設定
    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.check_interval_secs = interval_secs;
        self
    }

    /// バックグラウンドで定期同期を開始
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.sync_loop().await;
        })
    }

    async fn sync_loop(&self) {
        let mut timer = interval(Duration::from_secs(self.check_interval_secs));

        info!(
            interval_secs = self.check_interval_secs,
            "Integration sync scheduler started"
        );

        loop {
            timer.tick().await;
            let synced = self.sync_due_integrations().await;
            if synced > 0 {
                debug!(synced = synced, "Scheduled integration sync completed");
            }
        }
    }

    /// 接続テスト
    ///
    /// 成功時は`connected`、失敗時は`error`にステータスを更新する。
    pub async fn test_integration(&self, id: &str) -> TestResult {
        let Some(record) = self.store.get(id).await else {
            return TestResult::failed("Integration not found");
        };

        let start = Instant::now();
        match self.probe(&record).await {
            Ok(()) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                self.store
                    .update_status(id, IntegrationStatus::Connected)
                    .await;
                info!(
                    integration_id = %id,
                    latency_ms = latency_ms,
                    "Integration connection test succeeded"
                );
                TestResult::ok(format!(
                    "Successfully connected to {} ({} ms)",
                    record.name, latency_ms
                ))
            }
            Err(e) => {
                self.store.update_status(id, IntegrationStatus::Error).await;
                warn!(
                    integration_id = %id,
                    error = %e,
                    "Integration connection test failed"
                );
                TestResult::failed(format!("Failed to connect to {}: {}", record.name, e))
            }
        }
    }

    /// レコード同期
    ///
    /// `connected`でない連携は何もせず失敗を返す。
    pub async fn sync_integration(&self, id: &str) -> SyncResult {
        let Some(record) = self.store.get(id).await else {
            return SyncResult::failed();
        };

        if record.status != IntegrationStatus::Connected {
            debug!(
                integration_id = %id,
                status = %record.status,
                "Skipping sync for integration that is not connected"
            );
            return SyncResult::failed();
        }

        match self.fetch_record_count(&record).await {
            Ok(synced_records) => {
                self.store.mark_synced(id, Utc::now()).await;
                info!(
                    integration_id = %id,
                    synced_records = synced_records,
                    "Integration sync completed"
                );
                SyncResult {
                    success: true,
                    synced_records,
                }
            }
            Err(e) => {
                self.store.update_status(id, IntegrationStatus::Error).await;
                warn!(integration_id = %id, error = %e, "Integration sync failed");
                SyncResult::failed()
            }
        }
    }

    /// 同期期限を過ぎた`connected`の連携をすべて同期し、成功数を返す
    pub async fn sync_due_integrations(&self) -> usize {
        let now = Utc::now();
        let due: Vec<_> = self
            .store
            .list_by_status(IntegrationStatus::Connected)
            .await
            .into_iter()
            .filter(|r| is_sync_due(r, now))
            .collect();

        let mut synced = 0;
        for record in due {
            if self.sync_integration(&record.id).await.success {
                synced += 1;
            }
        }
        synced
    }

    async fn probe(&self, record: &IntegrationRecord) -> RegistryResult<()> {
        let base_url = record
            .config_str("base_url")
            .ok_or_else(|| RegistryError::MissingConfig("base_url".to_string()))?;
        let url = join_url(base_url, record.config_str("health_path").unwrap_or(""));

        let response = self.get(record, &url).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(RegistryError::Http(format!("HTTP {}", response.status())))
        }
    }

    async fn fetch_record_count(&self, record: &IntegrationRecord) -> RegistryResult<u64> {
        let base_url = record
            .config_str("base_url")
            .ok_or_else(|| RegistryError::MissingConfig("base_url".to_string()))?;
        let sync_path = record
            .config_str("sync_path")
            .or_else(|| record.endpoints.first().map(String::as_str))
            .ok_or_else(|| RegistryError::MissingConfig("sync_path".to_string()))?;
        let url = join_url(base_url, sync_path);

        let response = self.get(record, &url).await?;
        if !response.status().is_success() {
            return Err(RegistryError::Http(format!("HTTP {}", response.status())));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RegistryError::Http(format!("Invalid JSON response: {}", e)))?;
        Ok(count_records(&body))
    }

    async fn get(&self, record: &IntegrationRecord, url: &str) -> RegistryResult<reqwest::Response> {
        let mut request = self.client.get(url);
        if let Some(api_key) = record.config_str("api_key") {
            request = request.bearer_auth(api_key);
        }

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                RegistryError::Timeout(e.to_string())
            } else {
                RegistryError::Http(e.to_string())
            }
        })
    }
}

fn join_url(base: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), path)
    }
}

/// レスポンスからレコード数を数える
///
/// トップレベル配列か、`data`/`results`/`records`/`items`の配列を対象とする。
fn count_records(body: &serde_json::Value) -> u64 {
    if let Some(items) = body.as_array() {
        return items.len() as u64;
    }
    RECORD_ARRAY_KEYS
        .iter()
        .find_map(|key| body.get(key).and_then(|v| v.as_array()))
        .map(|items| items.len() as u64)
        .unwrap_or(0)
}

/// 同期頻度に対応する間隔（手動は定期同期しない）
fn sync_interval(frequency: SyncFrequency) -> Option<chrono::Duration> {
    match frequency {
        SyncFrequency::Realtime => Some(chrono::Duration::minutes(1)),
        SyncFrequency::Hourly => Some(chrono::Duration::hours(1)),
        SyncFrequency::Daily => Some(chrono::Duration::days(1)),
        SyncFrequency::Weekly => Some(chrono::Duration::weeks(1)),
        SyncFrequency::Manual => None,
    }
}

fn is_sync_due(record: &IntegrationRecord, now: DateTime<Utc>) -> bool {
    let Some(period) = sync_interval(record.sync_frequency) else {
        return false;
    };
    match record.last_sync {
        Some(last) => now - last >= period,
        None => true,
    }
}
