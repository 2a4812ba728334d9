//! Health check endpoints

use crate::metrics::{self as waiter_metrics, WaiterMetrics};
use crate::shard::{TopicStatusBoard, TopicStatusView};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub topics_total: usize,
    pub topics_ready: usize,
    pub topics: Vec<TopicStatusView>,
}

impl ReadyResponse {
    pub fn from_board(board: &TopicStatusBoard) -> Self {
        Self {
            ready: board.all_ready(),
            topics_total: board.topic_count(),
            topics_ready: board.ready_topics(),
            topics: board.views(),
        }
    }
}

/// Application state for health endpoints
#[derive(Clone)]
pub struct AppState {
    pub status: TopicStatusBoard,
    pub metrics: Option<WaiterMetrics>,
}

/// Create the health check router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Health endpoint - always returns 200 if process is running
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness endpoint - returns 200 once every topic's shards have settled
async fn ready_handler(State(state): State<AppState>) -> impl IntoResponse {
    let response = ReadyResponse::from_board(&state.status);

    if response.ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Metrics endpoint - returns Prometheus format metrics
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    waiter_metrics::set_topics_ready(state.status.ready_topics());

    let body = state
        .metrics
        .as_ref()
        .map(WaiterMetrics::render)
        .unwrap_or_default();

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
}
