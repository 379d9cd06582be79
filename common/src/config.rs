//! 設定管理
//!
//! RegistryConfig等の設定構造体

use serde::{Deserialize, Serialize};

/// レジストリサーバー設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistryConfig {
    /// ホストアドレス (デフォルト: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// ポート番号 (デフォルト: 3100)
    #[serde(default = "default_port")]
    pub port: u16,

    /// 公開URL。OpenAPIの`servers`に使う (デフォルト: "http://localhost:3100")
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// OpenAPIのタイトル (デフォルト: "Emma AI API")
    #[serde(default = "default_api_title")]
    pub api_title: String,

    /// OpenAPIのバージョン (デフォルト: "1.0.0")
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Webhook送信タイムアウト（秒）(デフォルト: 10)
    #[serde(default = "default_webhook_timeout")]
    pub webhook_timeout_secs: u64,

    /// 連携の接続テスト・同期タイムアウト（秒）(デフォルト: 5)
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// リトライ待機時間の上限（ミリ秒）(デフォルト: 60000)
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3100
}

fn default_public_base_url() -> String {
    "http://localhost:3100".to_string()
}

fn default_api_title() -> String {
    "Emma AI API".to_string()
}

fn default_api_version() -> String {
    "1.0.0".to_string()
}

fn default_webhook_timeout() -> u64 {
    10
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_max_retry_delay() -> u64 {
    60_000
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: default_public_base_url(),
            api_title: default_api_title(),
            api_version: default_api_version(),
            webhook_timeout_secs: default_webhook_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            max_retry_delay_ms: default_max_retry_delay(),
        }
    }
}

impl RegistryConfig {
    /// バインドアドレス（`host:port`）
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
