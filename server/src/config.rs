//! Configuration management via environment variables
//!
//! Provides helper functions for reading environment variables with fallback
//! to deprecated variable names with warning logs.

use emma_api_common::config::RegistryConfig;

/// Get an environment variable with fallback to a deprecated name
///
/// If the new variable name is set, returns its value.
/// If only the old (deprecated) variable name is set, returns its value
/// and logs a deprecation warning.
///
/// # Example
/// ```
/// use emma_api_server::config::get_env_with_fallback;
///
/// let port = get_env_with_fallback("EMMA_PORT", "PORT");
/// ```
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

/// Get an environment variable with fallback and default value
pub fn get_env_with_fallback_or(new_name: &str, old_name: &str, default: &str) -> String {
    get_env_with_fallback(new_name, old_name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable with fallback, parsing to a specific type
///
/// Falls back to `default` when neither variable is set or parsing fails.
pub fn get_env_with_fallback_parse<T: std::str::FromStr>(
    new_name: &str,
    old_name: &str,
    default: T,
) -> T {
    get_env_with_fallback(new_name, old_name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// 環境変数からレジストリ設定を構築
///
/// 未設定の項目は`RegistryConfig::default()`の値を使う。
pub fn registry_config_from_env() -> RegistryConfig {
    let defaults = RegistryConfig::default();

    RegistryConfig {
        host: get_env_with_fallback_or("EMMA_HOST", "HOST", &defaults.host),
        port: get_env_with_fallback_parse("EMMA_PORT", "PORT", defaults.port),
        public_base_url: get_env_with_fallback_or(
            "EMMA_PUBLIC_BASE_URL",
            "NEXT_PUBLIC_APP_URL",
            &defaults.public_base_url,
        ),
        api_title: get_env_with_fallback_or("EMMA_API_TITLE", "API_TITLE", &defaults.api_title),
        api_version: get_env_with_fallback_or(
            "EMMA_API_VERSION",
            "API_VERSION",
            &defaults.api_version,
        ),
        webhook_timeout_secs: get_env_with_fallback_parse(
            "EMMA_WEBHOOK_TIMEOUT_SECS",
            "WEBHOOK_TIMEOUT_SECS",
            defaults.webhook_timeout_secs,
        ),
        probe_timeout_secs: get_env_with_fallback_parse(
            "EMMA_PROBE_TIMEOUT_SECS",
            "PROBE_TIMEOUT_SECS",
            defaults.probe_timeout_secs,
        ),
        max_retry_delay_ms: get_env_with_fallback_parse(
            "EMMA_MAX_RETRY_DELAY_MS",
            "MAX_RETRY_DELAY_MS",
            defaults.max_retry_delay_ms,
        ),
    }
}
