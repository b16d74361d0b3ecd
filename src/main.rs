// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use axum::{
    Router,
    routing::{delete, get, post},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::plot_data_source::PlotDataSource;
use crate::application::synchronizer::IntervalSynchronizer;
use crate::domain::telemetry::{ValueRange, Window};
use crate::infrastructure::config::load_settings;
use crate::infrastructure::yamcs_archive::YamcsArchive;
use crate::infrastructure::yamcs_websocket::YamcsLiveSource;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    add_parameter, get_snapshot, health_check, list_parameters, remove_parameter, stream_plot,
    update_window,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let settings = load_settings().context("Failed to load config/plot")?;

    // Create collaborators (infrastructure layer)
    let archive = Arc::new(YamcsArchive::new(
        settings.yamcs.url.clone(),
        settings.yamcs.instance.clone(),
    ));
    let live = Arc::new(YamcsLiveSource::new(
        &settings.yamcs.url,
        settings.yamcs.instance.clone(),
        settings.yamcs.processor.clone(),
    ));
    let synchronizer = IntervalSynchronizer::new(Duration::from_millis(settings.plot.sync_interval_ms));

    // Create the plot engine (application layer)
    let options = settings.plot.options();
    let plot = PlotDataSource::new(archive, live, &synchronizer, options.clone());

    let initial = settings.plot.initial_parameters();
    if !initial.is_empty() {
        plot.add_parameters(initial)?;
        let plot = plot.clone();
        tokio::spawn(async move {
            let window = Window::trailing(options.default_window);
            if let Err(e) = plot.update_window(window, ValueRange::unset()).await {
                tracing::warn!(error = %e, "Initial window load failed");
            }
        });
    }

    let state = Arc::new(AppState { plot: plot.clone() });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/plot", get(get_snapshot))
        .route("/plot/stream", get(stream_plot))
        .route("/plot/window", post(update_window))
        .route("/plot/parameters", get(list_parameters).post(add_parameter))
        .route("/plot/parameters/*name", delete(remove_parameter))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = settings
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", settings.server.bind))?;
    tracing::info!("Starting plot-feed service on {}", addr);

    // Disposing ends the snapshot streams so open event streams let the server stop
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            plot.dispose();
        })
        .await?;

    Ok(())
}
