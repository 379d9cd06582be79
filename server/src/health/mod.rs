//! 連携ヘルスチェック
//!
//! 外部サービス連携の接続テストと定期同期

pub mod integration_checker;

pub use integration_checker::IntegrationChecker;
