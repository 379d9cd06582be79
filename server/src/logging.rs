//! ロギング初期化
//!
//! `EMMA_LOG_LEVEL`（旧: `RUST_LOG`）でフィルタを決め、標準出力へ出力する。
//! `EMMA_LOG_DIR`が設定されている場合は日次ローテーションのファイルにも書き出す。

use crate::config::{get_env_with_fallback, get_env_with_fallback_or};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_FILE_PREFIX: &str = "emma-api.log";

/// ロギングを初期化する
///
/// ファイル出力を有効にした場合は`WorkerGuard`を返す。
/// 呼び出し側はプロセス終了まで保持すること（ドロップ時にバッファがフラッシュされる）。
pub fn init() -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let level = get_env_with_fallback_or("EMMA_LOG_LEVEL", "RUST_LOG", DEFAULT_LOG_LEVEL);
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let stdout_layer = fmt::layer().with_target(true);

    match get_env_with_fallback("EMMA_LOG_DIR", "LOG_DIR") {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().with_ansi(false).with_writer(writer);

            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .with(file_layer)
                .try_init()?;

            tracing::info!(log_dir = %dir, "File logging enabled");
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .try_init()?;
            Ok(None)
        }
    }
}
