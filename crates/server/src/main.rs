mod bootstrap;
mod health;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use partsdesk_core::config::{AppConfig, LoadOptions};
use tokio::sync::Notify;

fn init_logging(config: &AppConfig) {
    use partsdesk_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging must be up before bootstrap emits anything.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let server = &app.config.server;
    let address = format!("{}:{}", server.bind_address, server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let router = routes::router(Arc::clone(&app.runtime), &server.cors_origins);

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        agent_mode = app.config.agent.mode.as_str(),
        "partsdesk-server listening"
    );

    let shutdown = Arc::new(Notify::new());
    let signal = Arc::clone(&shutdown);
    let mut serving = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { signal.notified().await })
            .await
    });

    tokio::select! {
        result = &mut serving => {
            result??;
            return Ok(());
        }
        signal = wait_for_shutdown() => signal?,
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "partsdesk-server draining in-flight requests"
    );
    shutdown.notify_one();

    let grace = Duration::from_secs(server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, &mut serving).await {
        Ok(result) => result??,
        Err(_) => {
            tracing::warn!(
                event_name = "system.server.shutdown_timeout",
                correlation_id = "shutdown",
                grace_secs = grace.as_secs(),
                "graceful shutdown window elapsed, aborting"
            );
            serving.abort();
        }
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
