//! エラー型定義
//!
//! 統一エラー型（thiserror使用）

use thiserror::Error;

/// Common layer error type
#[derive(Debug, Error)]
pub enum CommonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Registry error type
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Common layer error
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Endpoint descriptor not found
    #[error("Endpoint not found: {0}")]
    EndpointNotFound(String),

    /// Webhook not found
    #[error("Webhook not found: {0}")]
    WebhookNotFound(String),

    /// Integration not found
    #[error("Integration not found: {0}")]
    IntegrationNotFound(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(String),

    /// Timeout error
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Invalid outbound header
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Required configuration key is missing
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    /// Returns a safe error message for external clients.
    ///
    /// Full details (URLs, upstream responses) stay in server logs via `Display`.
    pub fn external_message(&self) -> &'static str {
        match self {
            Self::Common(CommonError::Validation(_)) => "Invalid request",
            Self::Common(_) => "Request error",
            Self::EndpointNotFound(_) => "Endpoint not found",
            Self::WebhookNotFound(_) => "Webhook not found",
            Self::IntegrationNotFound(_) => "Integration not found",
            Self::Http(_) => "Upstream service unavailable",
            Self::Timeout(_) => "Upstream request timeout",
            Self::InvalidHeader(_) => "Invalid header",
            Self::MissingConfig(_) => "Integration is not configured",
            Self::Internal(_) => "Internal server error",
        }
    }

    /// Whether this error means the addressed resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EndpointNotFound(_) | Self::WebhookNotFound(_) | Self::IntegrationNotFound(_)
        )
    }
}

/// Result type alias (Common)
pub type CommonResult<T> = Result<T, CommonError>;

/// Result type alias (Registry)
pub type RegistryResult<T> = Result<T, RegistryError>;
