//! 連携ストア
//!
//! 外部サービス連携レコードの状態・設定を管理する

use chrono::{DateTime, Utc};
use emma_api_common::types::{IntegrationRecord, IntegrationStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// 連携ストア
#[derive(Clone, Default)]
pub struct IntegrationStore {
    integrations: Arc<RwLock<HashMap<String, IntegrationRecord>>>,
}

impl IntegrationStore {
    /// 空のストアを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// レコードを取得
    pub async fn get(&self, id: &str) -> Option<IntegrationRecord> {
        self.integrations.read().await.get(id).cloned()
    }

    /// すべてのレコードを取得（ID順）
    pub async fn list(&self) -> Vec<IntegrationRecord> {
        let mut records: Vec<_> = self.integrations.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// 特定ステータスのレコードを取得
    pub async fn list_by_status(&self, status: IntegrationStatus) -> Vec<IntegrationRecord> {
        let mut records: Vec<_> = self
            .integrations
            .read()
            .await
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// レコードを追加（同じIDは置き換える）
    pub async fn add(&self, record: IntegrationRecord) {
        self.integrations
            .write()
            .await
            .insert(record.id.clone(), record);
    }

    /// ステータスを更新
    ///
    /// `connected`に遷移した場合のみ`last_sync`を現在時刻にする。
    pub async fn update_status(&self, id: &str, status: IntegrationStatus) -> bool {
        let mut integrations = self.integrations.write().await;
        let Some(record) = integrations.get_mut(id) else {
            return false;
        };

        let previous = record.status;
        record.status = status;
        if status == IntegrationStatus::Connected {
            record.last_sync = Some(Utc::now());
        }

        if previous != status {
            info!(
                integration_id = %id,
                from = %previous,
                to = %status,
                "Integration status changed"
            );
        }
        true
    }

    /// 設定をキー単位でマージ
    pub async fn update_config(
        &self,
        id: &str,
        config: serde_json::Map<String, serde_json::Value>,
    ) -> bool {
        let mut integrations = self.integrations.write().await;
        match integrations.get_mut(id) {
            Some(record) => {
                record.config.extend(config);
                true
            }
            None => false,
        }
    }

    /// 同期成功を記録
    pub async fn mark_synced(&self, id: &str, at: DateTime<Utc>) -> bool {
        let mut integrations = self.integrations.write().await;
        match integrations.get_mut(id) {
            Some(record) => {
                record.last_sync = Some(at);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::seed::default_integrations;
    use serde_json::json;

    async fn seeded() -> IntegrationStore {
        let store = IntegrationStore::new();
        for record in default_integrations() {
            store.add(record).await;
        }
        store
    }

    #[tokio::test]
    async fn test_connected_stamps_last_sync() {
        let store = seeded().await;

        assert!(store.update_status("hubspot", IntegrationStatus::Connected).await);
        let record = store.get("hubspot").await.unwrap();
        assert_eq!(record.status, IntegrationStatus::Connected);
        assert!(record.last_sync.is_some());
    }

    #[tokio::test]
    async fn test_error_does_not_stamp_last_sync() {
        let store = seeded().await;

        assert!(store.update_status("stripe", IntegrationStatus::Error).await);
        let record = store.get("stripe").await.unwrap();
        assert_eq!(record.status, IntegrationStatus::Error);
        assert!(record.last_sync.is_none());
    }

    #[tokio::test]
    async fn test_update_status_unknown() {
        let store = seeded().await;
        assert!(!store.update_status("missing", IntegrationStatus::Connected).await);
    }

    #[tokio::test]
    async fn test_update_config_merges_keys() {
        let store = seeded().await;

        let mut first = serde_json::Map::new();
        first.insert("api_key".to_string(), json!("key-1"));
        assert!(store.update_config("hubspot", first).await);

        let mut second = serde_json::Map::new();
        second.insert("portal_id".to_string(), json!(42));
        assert!(store.update_config("hubspot", second).await);

        let record = store.get("hubspot").await.unwrap();
        assert_eq!(record.config["api_key"], "key-1");
        assert_eq!(record.config["portal_id"], 42);
        assert_eq!(record.config["base_url"], "https://api.hubapi.com");

        assert!(!store.update_config("missing", serde_json::Map::new()).await);
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let store = seeded().await;
        store.update_status("slack", IntegrationStatus::Connected).await;

        let connected = store.list_by_status(IntegrationStatus::Connected).await;
        assert_eq!(connected.len(), 1);
        assert_eq!(connected[0].id, "slack");
        assert_eq!(
            store.list_by_status(IntegrationStatus::Disconnected).await.len(),
            4
        );
    }
}
