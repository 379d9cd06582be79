//! Emma AI API Registry Server
//!
//! エンドポイントカタログ、レート制限、Webhook、外部サービス連携を管理するサーバー

#![warn(missing_docs)]

/// REST APIハンドラー
pub mod api;

/// 利用統計
pub mod analytics;

/// CLIインターフェース
pub mod cli;

/// 環境変数からの設定読み込み
pub mod config;

/// 連携ヘルスチェック・定期同期
pub mod health;

/// ロギング初期化ユーティリティ
pub mod logging;

/// OpenAPIドキュメント生成
pub mod openapi;

/// レート制限
pub mod rate_limit;

/// レジストリ本体
pub mod registry;

/// Webhook配信
pub mod webhook;

use emma_api_common::config::RegistryConfig;
use std::sync::Arc;

/// アプリケーション状態
#[derive(Clone)]
pub struct AppState {
    /// APIレジストリ
    pub registry: registry::ApiRegistry,
    /// 起動時の設定
    pub config: Arc<RegistryConfig>,
}
