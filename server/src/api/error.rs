//! APIエラーレスポンス型
//!
//! axum用の共通エラーハンドリング

use axum::{http::StatusCode, response::IntoResponse, Json};
use emma_api_common::error::{CommonError, RegistryError};
use serde_json::json;

/// Axum用のエラーレスポンス型
#[derive(Debug)]
pub struct AppError(pub RegistryError);

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        AppError(err)
    }
}

impl From<CommonError> for AppError {
    fn from(err: CommonError) -> Self {
        AppError(RegistryError::Common(err))
    }
}

impl AppError {
    /// レスポンスのステータスコード
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            RegistryError::EndpointNotFound(_)
            | RegistryError::WebhookNotFound(_)
            | RegistryError::IntegrationNotFound(_) => StatusCode::NOT_FOUND,
            RegistryError::Common(_) | RegistryError::InvalidHeader(_) => StatusCode::BAD_REQUEST,
            RegistryError::MissingConfig(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RegistryError::Http(_) => StatusCode::BAD_GATEWAY,
            RegistryError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            RegistryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        // 詳細はログにのみ出し、クライアントには external_message() を返す
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
        }

        let payload = json!({
            "error": self.0.external_message()
        });

        (status, Json(payload)).into_response()
    }
}
