//! 固定ウィンドウ型レート制限
//!
//! (エンドポイントID, 呼び出し元ID) ごとにカウンタを持つ。
//! ウィンドウ境界をまたぐと最大で上限の2倍まで連続で通る点は既知の性質。

use emma_api_common::protocol::RateLimitStatus;
use emma_api_common::types::RateLimitPolicy;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// カウンタのキー（エンドポイントID, 呼び出し元ID）
type CounterKey = (String, String);

/// 1ウィンドウ分のカウンタ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateCounter {
    /// ウィンドウ内のリクエスト数
    pub count: u32,
    /// ウィンドウがリセットされる時刻
    pub reset_at: Instant,
}

impl RateCounter {
    fn fresh(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            reset_at: now + window,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.reset_at
    }
}

/// 固定ウィンドウカウンタ
///
/// チェックとインクリメントは1つのクリティカルセクションで行う。
#[derive(Clone, Default)]
pub struct FixedWindowLimiter {
    counters: Arc<Mutex<HashMap<CounterKey, RateCounter>>>,
}

impl FixedWindowLimiter {
    /// 空のリミッターを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// リクエストを許可するか判定し、許可した場合はカウントを進める
    ///
    /// 上限に達している場合は状態を変更せずに拒否する。
    /// `requests == 0`または`window_ms == 0`のポリシーは常に拒否する。
    pub async fn check(&self, endpoint_id: &str, caller_id: &str, policy: RateLimitPolicy) -> bool {
        self.check_with_status(endpoint_id, caller_id, policy)
            .await
            .0
    }

    /// 判定結果と判定直後のウィンドウ状態を同じクリティカルセクションで返す
    pub async fn check_with_status(
        &self,
        endpoint_id: &str,
        caller_id: &str,
        policy: RateLimitPolicy,
    ) -> (bool, RateLimitStatus) {
        if policy.requests == 0 || policy.window_ms == 0 {
            let status = RateLimitStatus {
                limit: policy.requests,
                remaining: 0,
                reset_in_ms: 0,
            };
            return (false, status);
        }

        let now = Instant::now();
        let window = Duration::from_millis(policy.window_ms);
        let key = (endpoint_id.to_string(), caller_id.to_string());

        let mut counters = self.counters.lock().await;
        let allowed = match counters.get_mut(&key) {
            Some(counter) if !counter.is_expired(now) => {
                if counter.count >= policy.requests {
                    debug!(
                        endpoint_id = %endpoint_id,
                        caller_id = %caller_id,
                        limit = policy.requests,
                        "Rate limit exceeded"
                    );
                    false
                } else {
                    counter.count += 1;
                    true
                }
            }
            _ => {
                counters.insert(key.clone(), RateCounter::fresh(now, window));
                true
            }
        };

        (allowed, window_status(counters.get(&key), policy, now))
    }

    /// 現在のウィンドウ状態を返す（カウンタは変更しない）
    pub async fn status(
        &self,
        endpoint_id: &str,
        caller_id: &str,
        policy: RateLimitPolicy,
    ) -> RateLimitStatus {
        let now = Instant::now();
        let key = (endpoint_id.to_string(), caller_id.to_string());
        let counters = self.counters.lock().await;
        window_status(counters.get(&key), policy, now)
    }

    /// 指定キーのカウンタを取得
    pub async fn counter(&self, endpoint_id: &str, caller_id: &str) -> Option<RateCounter> {
        let key = (endpoint_id.to_string(), caller_id.to_string());
        self.counters.lock().await.get(&key).copied()
    }

    /// ウィンドウが終わったカウンタを削除し、削除数を返す
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut counters = self.counters.lock().await;
        let before = counters.len();
        counters.retain(|_, counter| !counter.is_expired(now));
        before - counters.len()
    }

    /// 保持しているカウンタ数
    pub async fn len(&self) -> usize {
        self.counters.lock().await.len()
    }

    /// カウンタが空か
    pub async fn is_empty(&self) -> bool {
        self.counters.lock().await.is_empty()
    }
}

fn window_status(
    counter: Option<&RateCounter>,
    policy: RateLimitPolicy,
    now: Instant,
) -> RateLimitStatus {
    match counter {
        Some(counter) if !counter.is_expired(now) => RateLimitStatus {
            limit: policy.requests,
            remaining: policy.requests.saturating_sub(counter.count),
            reset_in_ms: counter.reset_at.duration_since(now).as_millis() as u64,
        },
        _ => RateLimitStatus {
            limit: policy.requests,
            remaining: policy.requests,
            reset_in_ms: 0,
        },
    }
}
