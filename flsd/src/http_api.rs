//! HTTP API for the stress controller.
//!
//! Provides:
//! - `POST /stress/start` - spawn the worker pool
//! - `POST /stress/stop` - tear the pool down
//! - `GET /stress/status` - point-in-time instance status
//! - `GET /stress/instances` - best-effort fleet discovery
//! - `GET /health` - basic daemon health check

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tracing::warn;

use crate::discovery::FleetDiscovery;
use crate::report::StatusReporter;
use crate::stress::{StartOutcome, StressPool};
use fls_common::types::{InstancesResponse, StartRequest, StartResponse, StopResponse};

/// Shared state for HTTP handlers.
pub struct HttpState {
    /// Worker pool mutated by start/stop.
    pub pool: Arc<StressPool>,
    /// Status composition for `GET /stress/status`.
    pub reporter: StatusReporter,
    /// Discovery client; `None` serves the advisory error shape.
    pub discovery: Option<FleetDiscovery>,
    /// Worker count used when a start request does not specify one.
    pub default_workers: usize,
    /// Daemon version.
    pub version: &'static str,
    /// Daemon start time.
    pub started_at: Instant,
    /// Daemon PID.
    pub pid: u32,
}

/// Create the HTTP router for the stress API.
pub fn create_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/stress/start", post(start_handler))
        .route("/stress/stop", post(stop_handler))
        .route("/stress/status", get(status_handler))
        .route("/stress/instances", get(instances_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Handler for `POST /stress/start`.
///
/// The body is optional; an absent or empty body means "default worker
/// count". A zero worker count is rejected before any state changes.
async fn start_handler(State(state): State<Arc<HttpState>>, body: Bytes) -> impl IntoResponse {
    let request: StartRequest = if body.is_empty() {
        StartRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("invalid request body: {e}") })),
                )
                    .into_response();
            }
        }
    };

    let requested = match request.workers {
        Some(0) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "workers must be at least 1" })),
            )
                .into_response();
        }
        Some(n) => n as usize,
        None => state.default_workers,
    };

    match state.pool.start(requested).await {
        Ok(StartOutcome::Started(workers)) => Json(StartResponse {
            message: "Stress test started".to_string(),
            workers,
        })
        .into_response(),
        Ok(StartOutcome::AlreadyRunning(workers)) => Json(StartResponse {
            message: "Stress test already running".to_string(),
            workers,
        })
        .into_response(),
        Err(e) => {
            warn!("failed to start stress pool: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Handler for `POST /stress/stop`. Safe to call on a stopped pool.
async fn stop_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    state.pool.stop().await;
    Json(StopResponse {
        message: "Stress test stopped".to_string(),
    })
}

/// Handler for `GET /stress/status`. Always succeeds.
async fn status_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(state.reporter.report().await)
}

/// Handler for `GET /stress/instances`.
///
/// Best-effort: an inventory failure yields an empty list with an error
/// indicator, never a failed request.
async fn instances_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let Some(discovery) = &state.discovery else {
        return Json(InstancesResponse {
            instances: vec![],
            error: Some("fleet discovery is disabled".to_string()),
        });
    };

    match discovery.discover().await {
        Ok(instances) => Json(InstancesResponse {
            instances,
            error: None,
        }),
        Err(e) => {
            warn!("fleet discovery failed: {}", e);
            Json(InstancesResponse {
                instances: vec![],
                error: Some(e.to_string()),
            })
        }
    }
}

/// Handler for `GET /health`.
async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": state.version,
        "pid": state.pid,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}
