//! Diabetes Risk Dashboard - Main Entry Point
//!
//! Loads the dataset and the ONNX model, then serves the dashboard over HTTP.
//! Nothing is served unless both load successfully.

use anyhow::{Context, Result};
use diabetes_risk_dashboard::{
    config::{AppConfig, LoggingConfig},
    dashboard::Dashboard,
    metrics::{DashboardMetrics, MetricsReporter},
    server::{router, AppState},
    session::SessionStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    init_logging(&config.logging)?;
    info!("Starting Diabetes Risk Dashboard");
    info!(
        model = %config.model.path,
        dataset = %config.dataset.path,
        bind = %config.server.bind,
        "Configuration loaded successfully"
    );

    let metrics = Arc::new(DashboardMetrics::new());

    // Startup preconditions: either failure aborts before anything is served
    let dashboard = Arc::new(Dashboard::load(&config, metrics.clone())?);

    let sessions = Arc::new(SessionStore::new(
        config.server.session_idle_timeout_secs,
        metrics.clone(),
    ));
    tokio::spawn(
        sessions
            .clone()
            .run_sweeper(config.server.sweep_interval_secs),
    );

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let app = router(AppState::new(dashboard, sessions));

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .context(format!("Failed to bind {}", config.server.bind))?;
    info!("Dashboard listening on http://{}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Dashboard shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!(
            "diabetes_risk_dashboard={level},tower_http={level}",
            level = logging.level
        ))
        .context("Invalid logging level")?,
    };

    match logging.format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
