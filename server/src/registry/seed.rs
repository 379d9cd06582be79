//! 初期データ
//!
//! 起動時にレジストリへ投入するエンドポイント記述子と連携プレースホルダー

use emma_api_common::types::{
    AuthMode, EndpointDescriptor, EndpointParameter, EndpointResponse, HttpMethod,
    IntegrationCategory, IntegrationRecord, IntegrationStatus, ParameterLocation,
    RateLimitPolicy, SyncFrequency,
};
use serde_json::json;

const MINUTE_MS: u64 = 60_000;
const HOUR_MS: u64 = 60 * MINUTE_MS;

fn client_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "string"},
            "name": {"type": "string"},
            "email": {"type": "string", "format": "email"},
            "company": {"type": "string"},
            "status": {"type": "string", "enum": ["lead", "active", "churned"]},
            "createdAt": {"type": "string", "format": "date-time"}
        }
    })
}

fn client_id_param() -> EndpointParameter {
    EndpointParameter::new("id", ParameterLocation::Path, "string", true, "Client ID")
}

fn client_body_params(required: bool) -> Vec<EndpointParameter> {
    vec![
        EndpointParameter::new("name", ParameterLocation::Body, "string", required, "Client name"),
        EndpointParameter::new("email", ParameterLocation::Body, "string", required, "Contact email"),
        EndpointParameter::new("company", ParameterLocation::Body, "string", false, "Company name"),
    ]
}

/// 既定のエンドポイント記述子
pub fn default_endpoints() -> Vec<EndpointDescriptor> {
    vec![
        EndpointDescriptor {
            id: "get-clients".to_string(),
            method: HttpMethod::Get,
            path: "/api/clients".to_string(),
            description: "List clients for the authenticated account".to_string(),
            parameters: vec![
                EndpointParameter::new("page", ParameterLocation::Query, "integer", false, "Page number"),
                EndpointParameter::new("limit", ParameterLocation::Query, "integer", false, "Page size"),
                EndpointParameter::new("search", ParameterLocation::Query, "string", false, "Filter by name or email"),
            ],
            responses: vec![
                EndpointResponse::new(200, "Client list")
                    .with_schema(json!({"type": "array", "items": client_schema()})),
                EndpointResponse::new(401, "Unauthorized"),
            ],
            authentication: AuthMode::Bearer,
            rate_limit: Some(RateLimitPolicy::new(100, MINUTE_MS)),
            tags: vec!["clients".to_string()],
        },
        EndpointDescriptor {
            id: "create-client".to_string(),
            method: HttpMethod::Post,
            path: "/api/clients".to_string(),
            description: "Create a client".to_string(),
            parameters: client_body_params(true),
            responses: vec![
                EndpointResponse::new(201, "Client created").with_schema(client_schema()),
                EndpointResponse::new(400, "Invalid client data"),
                EndpointResponse::new(401, "Unauthorized"),
            ],
            authentication: AuthMode::Bearer,
            rate_limit: Some(RateLimitPolicy::new(50, MINUTE_MS)),
            tags: vec!["clients".to_string()],
        },
        EndpointDescriptor {
            id: "get-client".to_string(),
            method: HttpMethod::Get,
            path: "/api/clients/:id".to_string(),
            description: "Get a client by ID".to_string(),
            parameters: vec![client_id_param()],
            responses: vec![
                EndpointResponse::new(200, "Client").with_schema(client_schema()),
                EndpointResponse::new(404, "Client not found"),
            ],
            authentication: AuthMode::Bearer,
            rate_limit: None,
            tags: vec!["clients".to_string()],
        },
        EndpointDescriptor {
            id: "update-client".to_string(),
            method: HttpMethod::Put,
            path: "/api/clients/:id".to_string(),
            description: "Update a client".to_string(),
            parameters: {
                let mut params = vec![client_id_param()];
                params.extend(client_body_params(false));
                params
            },
            responses: vec![
                EndpointResponse::new(200, "Client updated").with_schema(client_schema()),
                EndpointResponse::new(404, "Client not found"),
            ],
            authentication: AuthMode::Bearer,
            rate_limit: Some(RateLimitPolicy::new(50, MINUTE_MS)),
            tags: vec!["clients".to_string()],
        },
        EndpointDescriptor {
            id: "delete-client".to_string(),
            method: HttpMethod::Delete,
            path: "/api/clients/:id".to_string(),
            description: "Delete a client".to_string(),
            parameters: vec![client_id_param()],
            responses: vec![
                EndpointResponse::new(204, "Client deleted"),
                EndpointResponse::new(404, "Client not found"),
            ],
            authentication: AuthMode::Bearer,
            rate_limit: Some(RateLimitPolicy::new(20, MINUTE_MS)),
            tags: vec!["clients".to_string()],
        },
        EndpointDescriptor {
            id: "get-analytics".to_string(),
            method: HttpMethod::Get,
            path: "/api/analytics".to_string(),
            description: "Aggregated API usage analytics".to_string(),
            parameters: vec![EndpointParameter::new(
                "period",
                ParameterLocation::Query,
                "string",
                false,
                "Reporting period (day, week, month)",
            )],
            responses: vec![EndpointResponse::new(200, "Analytics snapshot")],
            authentication: AuthMode::ApiKey,
            rate_limit: Some(RateLimitPolicy::new(30, MINUTE_MS)),
            tags: vec!["analytics".to_string()],
        },
        EndpointDescriptor {
            id: "get-performance-metrics".to_string(),
            method: HttpMethod::Get,
            path: "/api/metrics/performance".to_string(),
            description: "Page performance metrics reported by the web vitals widget".to_string(),
            parameters: vec![],
            responses: vec![EndpointResponse::new(200, "Performance metrics").with_schema(json!({
                "type": "object",
                "properties": {
                    "lcp": {"type": "number"},
                    "fid": {"type": "number"},
                    "cls": {"type": "number"},
                    "ttfb": {"type": "number"}
                }
            }))],
            authentication: AuthMode::ApiKey,
            rate_limit: Some(RateLimitPolicy::new(60, MINUTE_MS)),
            tags: vec!["analytics".to_string()],
        },
        EndpointDescriptor {
            id: "submit-contact".to_string(),
            method: HttpMethod::Post,
            path: "/api/contact".to_string(),
            description: "Submit the public contact form".to_string(),
            parameters: vec![
                EndpointParameter::new("name", ParameterLocation::Body, "string", true, "Sender name"),
                EndpointParameter::new("email", ParameterLocation::Body, "string", true, "Sender email"),
                EndpointParameter::new("message", ParameterLocation::Body, "string", true, "Message body"),
            ],
            responses: vec![
                EndpointResponse::new(200, "Message accepted"),
                EndpointResponse::new(429, "Too many submissions"),
            ],
            authentication: AuthMode::None,
            rate_limit: Some(RateLimitPolicy::new(5, HOUR_MS)),
            tags: vec!["contact".to_string()],
        },
        EndpointDescriptor {
            id: "list-integrations".to_string(),
            method: HttpMethod::Get,
            path: "/api/integrations".to_string(),
            description: "List third-party integrations and their status".to_string(),
            parameters: vec![],
            responses: vec![EndpointResponse::new(200, "Integration list")],
            authentication: AuthMode::Bearer,
            rate_limit: None,
            tags: vec!["integrations".to_string()],
        },
    ]
}

fn placeholder(
    id: &str,
    name: &str,
    category: IntegrationCategory,
    provider: &str,
    base_url: Option<&str>,
    endpoints: &[&str],
    sync_frequency: SyncFrequency,
) -> IntegrationRecord {
    let mut config = serde_json::Map::new();
    if let Some(base_url) = base_url {
        config.insert("base_url".to_string(), json!(base_url));
    }

    IntegrationRecord {
        id: id.to_string(),
        name: name.to_string(),
        category,
        provider: provider.to_string(),
        status: IntegrationStatus::Disconnected,
        config,
        endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
        last_sync: None,
        sync_frequency,
    }
}

/// 既定の連携プレースホルダー（すべて未接続）
pub fn default_integrations() -> Vec<IntegrationRecord> {
    vec![
        // インスタンスURLはテナントごとに異なるため未設定
        placeholder(
            "salesforce",
            "Salesforce",
            IntegrationCategory::Crm,
            "Salesforce",
            None,
            &["/services/data/v58.0/sobjects/Contact", "/services/data/v58.0/sobjects/Lead"],
            SyncFrequency::Hourly,
        ),
        placeholder(
            "hubspot",
            "HubSpot",
            IntegrationCategory::Marketing,
            "HubSpot",
            Some("https://api.hubapi.com"),
            &["/crm/v3/objects/contacts", "/crm/v3/objects/companies"],
            SyncFrequency::Hourly,
        ),
        placeholder(
            "slack",
            "Slack",
            IntegrationCategory::Communication,
            "Slack",
            Some("https://slack.com/api"),
            &["/conversations.list", "/chat.postMessage"],
            SyncFrequency::Realtime,
        ),
        placeholder(
            "google-analytics",
            "Google Analytics",
            IntegrationCategory::Analytics,
            "Google",
            Some("https://analyticsdata.googleapis.com"),
            &["/v1beta/properties"],
            SyncFrequency::Daily,
        ),
        placeholder(
            "stripe",
            "Stripe",
            IntegrationCategory::Payments,
            "Stripe",
            Some("https://api.stripe.com"),
            &["/v1/customers", "/v1/charges"],
            SyncFrequency::Hourly,
        ),
    ]
}
