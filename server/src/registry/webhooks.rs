//! Webhookストア

use emma_api_common::protocol::WebhookPatch;
use emma_api_common::types::WebhookSubscription;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Webhook購読ストア
#[derive(Clone, Default)]
pub struct WebhookStore {
    webhooks: Arc<RwLock<HashMap<String, WebhookSubscription>>>,
}

impl WebhookStore {
    /// 空のストアを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 購読を取得
    pub async fn get(&self, id: &str) -> Option<WebhookSubscription> {
        self.webhooks.read().await.get(id).cloned()
    }

    /// すべての購読を取得（ID順）
    pub async fn list(&self) -> Vec<WebhookSubscription> {
        let mut webhooks: Vec<_> = self.webhooks.read().await.values().cloned().collect();
        webhooks.sort_by(|a, b| a.id.cmp(&b.id));
        webhooks
    }

    /// 購読を追加（同じIDは置き換える）
    pub async fn add(&self, webhook: WebhookSubscription) {
        debug!(webhook_id = %webhook.id, url = %webhook.url, "Webhook registered");
        self.webhooks
            .write()
            .await
            .insert(webhook.id.clone(), webhook);
    }

    /// 購読を部分更新
    pub async fn update(&self, id: &str, patch: WebhookPatch) -> bool {
        let mut webhooks = self.webhooks.write().await;
        match webhooks.get_mut(id) {
            Some(webhook) => {
                patch.apply_to(webhook);
                true
            }
            None => false,
        }
    }

    /// 購読を削除
    pub async fn remove(&self, id: &str) -> bool {
        self.webhooks.write().await.remove(id).is_some()
    }

    /// 指定イベントを購読している有効なWebhookを取得
    pub async fn active_for_event(&self, event: &str) -> Vec<WebhookSubscription> {
        self.webhooks
            .read()
            .await
            .values()
            .filter(|w| w.active && w.subscribes_to(event))
            .cloned()
            .collect()
    }
}
