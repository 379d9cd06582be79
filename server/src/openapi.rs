//! OpenAPIドキュメント生成
//!
//! エンドポイントカタログをOpenAPI 3.0形式のJSONに変換する。

use emma_api_common::types::{EndpointDescriptor, EndpointParameter, ParameterLocation};
use serde_json::{json, Map, Value};

/// 出力するOpenAPIバージョン
pub const OPENAPI_VERSION: &str = "3.0.3";

/// ドキュメントのメタ情報
#[derive(Debug, Clone)]
pub struct SpecInfo {
    /// タイトル
    pub title: String,
    /// APIバージョン
    pub version: String,
    /// 説明
    pub description: String,
    /// サーバーURL
    pub server_url: String,
}

/// `:id`形式のパスパラメータを`{id}`形式に変換
pub fn to_openapi_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{}}}", name),
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// OpenAPIドキュメントを生成
pub fn generate_spec(endpoints: &[EndpointDescriptor], info: &SpecInfo) -> Value {
    let mut paths = Map::new();

    for endpoint in endpoints {
        let path_item = paths
            .entry(to_openapi_path(&endpoint.path))
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(operations) = path_item {
            operations.insert(
                endpoint.method.operation_key().to_string(),
                operation(endpoint),
            );
        }
    }

    json!({
        "openapi": OPENAPI_VERSION,
        "info": {
            "title": info.title,
            "version": info.version,
            "description": info.description,
        },
        "servers": [
            {"url": info.server_url, "description": "API server"}
        ],
        "paths": paths,
        "components": {
            "securitySchemes": {
                "bearer": {
                    "type": "http",
                    "scheme": "bearer",
                    "bearerFormat": "JWT"
                },
                "api-key": {
                    "type": "apiKey",
                    "in": "header",
                    "name": "X-API-Key"
                }
            }
        }
    })
}

fn operation(endpoint: &EndpointDescriptor) -> Value {
    let mut op = Map::new();
    op.insert("operationId".to_string(), json!(endpoint.id));
    op.insert("summary".to_string(), json!(endpoint.description));
    if !endpoint.tags.is_empty() {
        op.insert("tags".to_string(), json!(endpoint.tags));
    }

    let parameters: Vec<Value> = endpoint
        .parameters
        .iter()
        .filter(|p| p.location != ParameterLocation::Body)
        .map(parameter)
        .collect();
    if !parameters.is_empty() {
        op.insert("parameters".to_string(), Value::Array(parameters));
    }

    let body_params: Vec<&EndpointParameter> = endpoint
        .parameters
        .iter()
        .filter(|p| p.location == ParameterLocation::Body)
        .collect();
    if !body_params.is_empty() {
        op.insert("requestBody".to_string(), request_body(&body_params));
    }

    op.insert("responses".to_string(), responses(endpoint));

    // 認証不要の場合も空配列を明示し、グローバル設定を打ち消す
    let security = match endpoint.authentication.security_scheme() {
        Some(scheme) => {
            let mut requirement = Map::new();
            requirement.insert(scheme.to_string(), json!([]));
            json!([requirement])
        }
        None => json!([]),
    };
    op.insert("security".to_string(), security);

    Value::Object(op)
}

fn parameter(param: &EndpointParameter) -> Value {
    json!({
        "name": param.name,
        "in": param.location.as_str(),
        // パスパラメータは常に必須
        "required": param.required || param.location == ParameterLocation::Path,
        "description": param.description,
        "schema": {"type": param.param_type},
    })
}

fn request_body(params: &[&EndpointParameter]) -> Value {
    let mut properties = Map::new();
    for param in params {
        properties.insert(
            param.name.clone(),
            json!({"type": param.param_type, "description": param.description}),
        );
    }
    let required: Vec<&str> = params
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name.as_str())
        .collect();

    let mut schema = json!({"type": "object", "properties": properties});
    if !required.is_empty() {
        schema["required"] = json!(required);
    }

    json!({
        "required": !required.is_empty(),
        "content": {
            "application/json": {"schema": schema}
        }
    })
}

fn responses(endpoint: &EndpointDescriptor) -> Value {
    let mut responses = Map::new();
    for response in &endpoint.responses {
        let mut entry = json!({"description": response.description});
        if let Some(schema) = &response.schema {
            entry["content"] = json!({"application/json": {"schema": schema}});
        }
        responses.insert(response.status.to_string(), entry);
    }
    if responses.is_empty() {
        responses.insert(
            "200".to_string(),
            json!({"description": "Successful response"}),
        );
    }
    Value::Object(responses)
}
