mod bootstrap;
mod health;
pub mod routes;

use std::time::Duration;

use anyhow::Result;
use bookly_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use bookly_core::config::LogFormat::*;
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
    // Config must be valid before anything logs or binds.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let state = routes::AppState {
        sessions: app.sessions.clone(),
        agent: app.agent.clone(),
        calendar: app.calendar.clone(),
        events_window_days: app.config.calendar.events_window_days,
        default_duration_minutes: app.config.agent.default_duration_minutes,
    };
    let router = routes::router(state).merge(health::router(app.sessions.clone()));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        "bookly-server listening"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let server = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal());

    // A second ctrl_c listener enforces the drain deadline; both listeners
    // are woken by the same signal.
    let drain_deadline = async {
        let _ = tokio::signal::ctrl_c().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => result?,
        _ = drain_deadline => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                grace_secs = grace.as_secs(),
                "in-flight requests exceeded the shutdown grace period"
            );
        }
    }

    tracing::info!(event_name = "system.server.stopped", "bookly-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!(
        event_name = "system.server.stopping",
        "shutdown signal received; draining in-flight requests"
    );
}
