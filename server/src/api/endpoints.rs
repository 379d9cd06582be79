//! エンドポイントカタログAPI
//!
//! 記述子のCRUDとレート制限チェック

use super::error::AppError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use emma_api_common::error::{CommonError, RegistryError};
use emma_api_common::protocol::{EndpointPatch, RateLimitCheckRequest, RecordResponseRequest};
use emma_api_common::types::EndpointDescriptor;

fn validate_descriptor(endpoint: &EndpointDescriptor) -> Result<(), CommonError> {
    if endpoint.id.trim().is_empty() {
        return Err(CommonError::Validation("id must not be empty".to_string()));
    }
    if !endpoint.path.starts_with('/') {
        return Err(CommonError::Validation(format!(
            "path must start with '/': {}",
            endpoint.path
        )));
    }
    if let Some(policy) = &endpoint.rate_limit {
        policy.validate()?;
    }
    Ok(())
}

fn validate_patch(patch: &EndpointPatch) -> Result<(), CommonError> {
    if let Some(path) = &patch.path {
        if !path.starts_with('/') {
            return Err(CommonError::Validation(format!(
                "path must start with '/': {}",
                path
            )));
        }
    }
    if let Some(Some(policy)) = &patch.rate_limit {
        policy.validate()?;
    }
    Ok(())
}

/// GET /api/registry/endpoints - 記述子一覧
pub async fn list_endpoints(State(state): State<AppState>) -> Json<Vec<EndpointDescriptor>> {
    Json(state.registry.list_endpoints().await)
}

/// POST /api/registry/endpoints - 記述子登録（同じIDは置き換え）
pub async fn create_endpoint(
    State(state): State<AppState>,
    Json(endpoint): Json<EndpointDescriptor>,
) -> Result<impl IntoResponse, AppError> {
    validate_descriptor(&endpoint)?;

    tracing::info!(
        endpoint_id = %endpoint.id,
        method = %endpoint.method,
        path = %endpoint.path,
        "Endpoint created via API"
    );
    state.registry.add_endpoint(endpoint.clone()).await;
    Ok((StatusCode::CREATED, Json(endpoint)))
}

/// GET /api/registry/endpoints/:id - 記述子取得
pub async fn get_endpoint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EndpointDescriptor>, AppError> {
    state
        .registry
        .get_endpoint(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError(RegistryError::EndpointNotFound(id)))
}

/// PATCH /api/registry/endpoints/:id - 記述子の部分更新
pub async fn update_endpoint(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<EndpointPatch>,
) -> Result<Json<EndpointDescriptor>, AppError> {
    validate_patch(&patch)?;

    if !state.registry.update_endpoint(&id, patch).await {
        return Err(AppError(RegistryError::EndpointNotFound(id)));
    }
    state
        .registry
        .get_endpoint(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError(RegistryError::EndpointNotFound(id)))
}

/// DELETE /api/registry/endpoints/:id - 記述子削除
pub async fn delete_endpoint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.registry.delete_endpoint(&id).await {
        tracing::info!(endpoint_id = %id, "Endpoint removed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError(RegistryError::EndpointNotFound(id)))
    }
}

/// POST /api/registry/endpoints/:id/rate-limit - レート制限チェック
///
/// 許可時は200、拒否時は429を返す。どちらもボディは同じ形式。
pub async fn check_rate_limit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RateLimitCheckRequest>,
) -> Result<impl IntoResponse, AppError> {
    if state.registry.get_endpoint(&id).await.is_none() {
        return Err(AppError(RegistryError::EndpointNotFound(id)));
    }

    let decision = state.registry.admit(&id, &req.caller_id).await;
    let code = if decision.allowed {
        StatusCode::OK
    } else {
        StatusCode::TOO_MANY_REQUESTS
    };
    Ok((code, Json(decision)))
}

/// POST /api/registry/endpoints/:id/responses - レスポンス結果を記録
///
/// 成功率・エラー率・平均応答時間の集計に使う。
pub async fn record_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RecordResponseRequest>,
) -> Result<StatusCode, AppError> {
    if !(100..=599).contains(&req.status) {
        return Err(CommonError::Validation(format!(
            "status must be a valid HTTP status code: {}",
            req.status
        ))
        .into());
    }

    if state
        .registry
        .record_response(&id, req.status, req.latency_ms)
        .await
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError(RegistryError::EndpointNotFound(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emma_api_common::types::{HttpMethod, RateLimitPolicy};

    #[test]
    fn test_validate_descriptor() {
        let ok = EndpointDescriptor::new("ping", HttpMethod::Get, "/api/ping");
        assert!(validate_descriptor(&ok).is_ok());

        let no_id = EndpointDescriptor::new(" ", HttpMethod::Get, "/api/ping");
        assert!(validate_descriptor(&no_id).is_err());

        let relative = EndpointDescriptor::new("ping", HttpMethod::Get, "api/ping");
        assert!(validate_descriptor(&relative).is_err());

        let mut zero_window = ok.clone();
        zero_window.rate_limit = Some(RateLimitPolicy::new(10, 0));
        assert!(validate_descriptor(&zero_window).is_err());

        // requests=0は常に拒否するポリシーとして受け付ける
        let mut deny_all = ok;
        deny_all.rate_limit = Some(RateLimitPolicy::new(0, 1_000));
        assert!(validate_descriptor(&deny_all).is_ok());
    }
}
