// HTTP request handlers
use crate::application::errors::PlotError;
use crate::application::plot_data_source::WindowOutcome;
use crate::domain::parameter::Parameter;
use crate::domain::plot::PlotData;
use crate::domain::telemetry::{ValueRange, Window};
use crate::presentation::app_state::AppState;
use crate::presentation::snapshot_stream::plot_events;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct WindowRequest {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

fn error_response(error: PlotError) -> Response {
    let status = match &error {
        PlotError::Fetch(_) | PlotError::Subscription(_) => StatusCode::BAD_GATEWAY,
        PlotError::LengthMismatch { .. } | PlotError::UnknownParameterId(_) => StatusCode::INTERNAL_SERVER_ERROR,
        PlotError::Disposed => StatusCode::GONE,
    };
    (status, Json(serde_json::json!({ "error": error.to_string() }))).into_response()
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current buffer contents
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> Json<PlotData> {
    Json(state.plot.snapshot())
}

pub async fn list_parameters(State(state): State<Arc<AppState>>) -> Json<Vec<Parameter>> {
    Json(state.plot.current_parameters())
}

pub async fn add_parameter(State(state): State<Arc<AppState>>, Json(parameter): Json<Parameter>) -> Response {
    match state.plot.add_parameters(vec![parameter]) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// Remove by qualified name; the leading '/' is part of the route
pub async fn remove_parameter(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> StatusCode {
    state.plot.remove_parameter(&format!("/{}", name.trim_start_matches('/')));
    StatusCode::NO_CONTENT
}

/// Change the visible window
pub async fn update_window(State(state): State<Arc<AppState>>, Json(request): Json<WindowRequest>) -> Response {
    if request.start >= request.stop {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "window start must precede stop" })),
        )
            .into_response();
    }

    let window = Window::new(request.start, request.stop);
    let value_range = ValueRange::new(request.min, request.max);

    // Runs detached so a dropped client cannot leave the plot loading
    let plot = state.plot.clone();
    let task = tokio::spawn(async move { plot.update_window(window, value_range).await });

    match task.await {
        Ok(Ok(outcome)) => {
            let outcome = match outcome {
                WindowOutcome::Applied => "applied",
                WindowOutcome::Superseded => "superseded",
            };
            Json(serde_json::json!({ "outcome": outcome })).into_response()
        }
        Ok(Err(e)) => error_response(e),
        Err(e) => {
            tracing::error!(error = %e, "Window update task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Server-sent events: published snapshots and error notices
pub async fn stream_plot(State(state): State<Arc<AppState>>) -> Response {
    match plot_events(&state.plot) {
        Some(sse) => sse.into_response(),
        None => error_response(PlotError::Disposed),
    }
}
