//! Health checks, metrics, and monitoring endpoints.

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

use crate::metrics::MetricsSnapshot;
use crate::state::AppState;

// ============================================================================
// Health Checks
// ============================================================================

/// GET /health - Basic health check
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ============================================================================
// Prometheus Metrics
// ============================================================================

/// GET /metrics - Prometheus metrics endpoint
#[instrument(skip_all)]
pub async fn metrics_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(handle): Extension<PrometheusHandle>,
) -> Response {
    // Cache counters live in the cache; publish them before rendering
    state.metrics.record_tile_cache_stats(state.cache.stats());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response()
}

// ============================================================================
// JSON Metrics API
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiMetricsResponse {
    #[serde(flatten)]
    pub requests: MetricsSnapshot,
    pub tile_cache_entries: u64,
    pub tile_cache_hit_rate: f64,
    pub tile_cache_wipes: u64,
    /// Seconds since the epoch of the last cache wipe.
    pub tile_cache_last_wiped: f64,
}

/// GET /api/metrics - Application metrics as JSON
#[instrument(skip_all)]
pub async fn api_metrics_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<ApiMetricsResponse> {
    let stats = state.cache.stats();
    Json(ApiMetricsResponse {
        requests: state.metrics.snapshot().await,
        tile_cache_entries: stats.entry_count(),
        tile_cache_hit_rate: stats.hit_rate(),
        tile_cache_wipes: stats.wipes(),
        tile_cache_last_wiped: state.cache.time_last_wiped(),
    })
}
