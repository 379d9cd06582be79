//! Emma AI API Registry Server Entry Point

use clap::Parser;
use emma_api_server::cli::{serve::ServeArgs, Cli, Commands};
use emma_api_server::config::registry_config_from_env;
use emma_api_server::registry::ApiRegistry;
use emma_api_server::{api, logging, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// レート制限カウンタの掃除間隔
const COUNTER_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let args = match cli.command {
        Some(Commands::Serve(args)) => args,
        None => ServeArgs::default(),
    };

    let _log_guard = match logging::init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(args).await {
        error!(error = %e, "Server terminated with error");
        std::process::exit(1);
    }
}

async fn run(args: ServeArgs) -> Result<(), BoxError> {
    let mut config = registry_config_from_env();
    args.apply_to(&mut config);

    info!(
        host = %config.host,
        port = config.port,
        public_base_url = %config.public_base_url,
        "Starting Emma API registry"
    );

    let registry = ApiRegistry::with_defaults(config.clone()).await?;

    let _sync_task = registry.integration_checker().start();
    let _purge_task = spawn_counter_purge(registry.clone());

    let bind_addr = config.bind_addr();
    let state = AppState {
        registry,
        config: Arc::new(config),
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Emma API registry listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn spawn_counter_purge(registry: ApiRegistry) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(COUNTER_PURGE_INTERVAL);
        loop {
            timer.tick().await;
            registry.purge_expired_counters().await;
        }
    })
}

/// シャットダウンシグナルを待機
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
