//! REST API handlers for data discovery.
//!
//! Provides endpoints for:
//! - Finding the timestep of a variable nearest to a given time

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use wms_common::time::{parse_iso8601_seconds, seconds_to_iso8601};
use wms_protocol::nearest_time_index;

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct NearestTimestepResponse {
    pub dataset: String,
    pub variable: String,
    pub nearest_index: usize,
    pub nearest_time: String,
    pub timesteps: usize,
}

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct NearestTimestepQuery {
    /// Focus time (ISO 8601). Defaults to now.
    #[serde(rename = "dateTime", alias = "datetime")]
    pub date_time: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/timesteps/:dataset/:variable - Timestep closest to a focus time
#[instrument(skip(state))]
pub async fn nearest_timestep_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((dataset_id, variable_id)): Path<(String, String)>,
    Query(query): Query<NearestTimestepQuery>,
) -> Result<Json<NearestTimestepResponse>, StatusCode> {
    let variable = state
        .pipeline
        .registry()
        .get(&dataset_id)
        .filter(|d| d.ready)
        .and_then(|d| d.variable(&variable_id))
        .ok_or(StatusCode::NOT_FOUND)?;

    let focus = match query.date_time.as_deref() {
        Some(value) => parse_iso8601_seconds(value).map_err(|_| StatusCode::BAD_REQUEST)?,
        None => chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
    };

    // No time axis: nothing to report
    let nearest_index =
        nearest_time_index(&variable.tvalues, focus).ok_or(StatusCode::NO_CONTENT)?;

    info!(
        dataset = %dataset_id,
        variable = %variable_id,
        nearest_index,
        "Nearest timestep request"
    );

    Ok(Json(NearestTimestepResponse {
        dataset: dataset_id,
        variable: variable_id,
        nearest_index,
        nearest_time: seconds_to_iso8601(variable.time_at(nearest_index)),
        timesteps: variable.tvalues.len(),
    }))
}
