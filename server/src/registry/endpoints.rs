//! エンドポイントカタログ
//!
//! エンドポイント記述子をメモリ内で管理する

use emma_api_common::protocol::EndpointPatch;
use emma_api_common::types::EndpointDescriptor;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// エンドポイントカタログ
#[derive(Clone, Default)]
pub struct EndpointCatalog {
    endpoints: Arc<RwLock<HashMap<String, EndpointDescriptor>>>,
}

impl EndpointCatalog {
    /// 空のカタログを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 記述子を取得
    pub async fn get(&self, id: &str) -> Option<EndpointDescriptor> {
        self.endpoints.read().await.get(id).cloned()
    }

    /// すべての記述子を取得（パス、メソッド順）
    pub async fn list(&self) -> Vec<EndpointDescriptor> {
        let mut endpoints: Vec<_> = self.endpoints.read().await.values().cloned().collect();
        endpoints.sort_by(|a, b| a.path.cmp(&b.path).then(a.method.cmp(&b.method)));
        endpoints
    }

    /// 記述子を追加（同じIDは丸ごと置き換える）
    pub async fn add(&self, endpoint: EndpointDescriptor) {
        debug!(endpoint_id = %endpoint.id, path = %endpoint.path, "Endpoint registered");
        self.endpoints
            .write()
            .await
            .insert(endpoint.id.clone(), endpoint);
    }

    /// 記述子を部分更新（存在しない場合はfalse）
    pub async fn update(&self, id: &str, patch: EndpointPatch) -> bool {
        let mut endpoints = self.endpoints.write().await;
        match endpoints.get_mut(id) {
            Some(endpoint) => {
                patch.apply_to(endpoint);
                true
            }
            None => false,
        }
    }

    /// 記述子を削除（存在しない場合はfalse）
    pub async fn remove(&self, id: &str) -> bool {
        self.endpoints.write().await.remove(id).is_some()
    }

    /// 登録数
    pub async fn len(&self) -> usize {
        self.endpoints.read().await.len()
    }

    /// 空か
    pub async fn is_empty(&self) -> bool {
        self.endpoints.read().await.is_empty()
    }
}
