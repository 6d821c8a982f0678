use anyhow::Result;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use telemon_collector::SystemResources;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use telemon_server::app;
use telemon_server::config::ServerConfig;
use telemon_server::state::AppState;
use telemon_server::tasks;

const DEFAULT_CONFIG_PATH: &str = "config/telemon.toml";

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  telemon-server [config.toml]    Start the server (default: {DEFAULT_CONFIG_PATH})");
    eprintln!("  telemon-server --help           Show this message");
}

#[tokio::main]
async fn main() -> Result<()> {
    telemon_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("telemon=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("-h") | Some("--help") => {
            print_usage();
            Ok(())
        }
        other => run_server(other.unwrap_or(DEFAULT_CONFIG_PATH)).await,
    }
}

fn load_config(path: &str) -> Result<ServerConfig> {
    if Path::new(path).exists() {
        ServerConfig::load(path)
    } else {
        tracing::warn!(path, "Config file not found, using defaults");
        Ok(ServerConfig::default())
    }
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let http_addr: SocketAddr = format!("{}:{}", config.bind_addr, config.http_port).parse()?;

    tracing::info!(
        http_port = config.http_port,
        collector = config.collector.enabled,
        database = config.database.address.as_deref().unwrap_or("none"),
        "telemon-server starting"
    );

    let state = AppState::build(config, Arc::new(SystemResources::new()), None);
    tracing::info!(
        rules = state.alerts.rules().len(),
        policies = state.alerts.policies().len(),
        "Alert engine ready"
    );

    let handles = tasks::spawn_background_tasks(&state);

    let app = app::build_http_app(state.clone());
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    tracing::info!(http = %http_addr, "Server started");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        })
        .await
    {
        tracing::error!(error = %e, "HTTP server error");
    }

    for handle in handles {
        handle.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}
