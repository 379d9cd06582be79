//! CLI module for emma-api
//!
//! Provides command-line interface for the registry server.

pub mod serve;

use clap::{Parser, Subcommand};

/// Emma AI API registry - endpoint catalog, webhooks and integrations
#[derive(Parser, Debug)]
#[command(name = "emma-api")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    EMMA_HOST                  Bind address (default: 0.0.0.0)
    EMMA_PORT                  Listen port (default: 3100)
    EMMA_PUBLIC_BASE_URL       Server URL in the OpenAPI document
    EMMA_API_TITLE             OpenAPI title (default: Emma AI API)
    EMMA_API_VERSION           OpenAPI version (default: 1.0.0)
    EMMA_WEBHOOK_TIMEOUT_SECS  Webhook delivery timeout (default: 10)
    EMMA_PROBE_TIMEOUT_SECS    Integration probe timeout (default: 5)
    EMMA_MAX_RETRY_DELAY_MS    Upper bound for webhook retry delay (default: 60000)
    EMMA_LOG_LEVEL             Log level (default: info)
    EMMA_LOG_DIR               Directory for daily rolling log files
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the registry server
    Serve(serve::ServeArgs),
}
