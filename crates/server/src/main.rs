mod app;
mod bootstrap;
mod health;
mod properties;
mod webhook;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use intake_core::config::{AppConfig, LoadOptions};
use tokio::net::TcpListener;
use tokio::sync::Notify;

fn init_logging(config: &AppConfig) {
    use intake_core::config::LogFormat::*;
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
    // Logging must be up before bootstrap emits its events.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let server_config = app.config.server.clone();
    let router = app::router(app.state, app.db_pool.clone(), &server_config.media_root);

    let address = format!("{}:{}", server_config.bind_address, server_config.port);
    let listener = TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        address = %address,
        media_root = %server_config.media_root.display(),
        "intake-server listening"
    );

    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router).with_graceful_shutdown(async move { signal.notified().await }).await
    });

    tokio::select! {
        finished = &mut server => {
            finished??;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => signal?,
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = server_config.graceful_shutdown_secs,
        "intake-server stopping"
    );
    shutdown.notify_one();

    match tokio::time::timeout(Duration::from_secs(server_config.graceful_shutdown_secs), server)
        .await
    {
        Ok(finished) => finished??,
        Err(_) => tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            "in-flight requests did not drain before the grace period elapsed"
        ),
    }

    app.db_pool.close().await;
    Ok(())
}
