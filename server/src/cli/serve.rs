//! serve サブコマンド
//!
//! レジストリサーバーを起動します。

use clap::Args;
use emma_api_common::config::RegistryConfig;

/// serve サブコマンドの引数
///
/// 指定しない項目は環境変数（`EMMA_HOST`/`EMMA_PORT`）の値を使う。
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Listen port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Bind address
    #[arg(short = 'H', long)]
    pub host: Option<String>,
}

impl ServeArgs {
    /// 引数で設定を上書きする
    pub fn apply_to(&self, config: &mut RegistryConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
    }
}
