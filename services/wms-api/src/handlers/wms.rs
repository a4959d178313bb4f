//! WMS (Web Map Service) request handlers.
//!
//! This module handles WMS 1.3.0 protocol requests:
//! - GetCapabilities: Returns service metadata and available layers
//! - GetMap: Renders gridded data as map images
//! - GetFeatureInfo: Returns the data value at a specific point

use axum::{
    extract::{Extension, RawQuery},
    http::StatusCode,
    response::Response,
};
use std::sync::Arc;
use tracing::{info, instrument};

use wms_common::{WmsError, WmsResult};
use wms_protocol::{check_update_sequence, CapabilitiesBuilder, ParameterStore};

use super::common::{bytes_response, wms_error_response, xml_response};
use crate::state::AppState;

// ============================================================================
// WMS Handler Entry Point
// ============================================================================

/// GET /wms - dispatch on the REQUEST parameter.
#[instrument(skip(state))]
pub async fn wms_handler(
    Extension(state): Extension<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Response {
    let params = ParameterStore::parse(query.as_deref().unwrap_or(""));
    let request = params.get_or("request", "").to_string();
    state.metrics.record_wms_request(&request);

    let result = match request.to_uppercase().as_str() {
        "GETCAPABILITIES" => wms_get_capabilities(&state, &params),
        "GETMAP" => wms_get_map(&state, &params).await,
        "GETFEATUREINFO" => wms_get_feature_info(&state, &params).await,
        "" => Err(WmsError::MissingParameter("request".to_string())),
        other => Err(WmsError::UnsupportedFeature(format!("request {}", other))),
    };

    result.unwrap_or_else(|err| {
        if let Some(code) = err.wms_exception_code() {
            state.metrics.record_request_error(code);
        }
        wms_error_response(&err)
    })
}

// ============================================================================
// GetCapabilities
// ============================================================================

fn wms_get_capabilities(state: &AppState, params: &ParameterStore) -> WmsResult<Response> {
    let service = params.get("service")?;
    if service != "WMS" {
        return Err(WmsError::invalid_parameter(
            "service",
            "The value of the SERVICE parameter must be \"WMS\"",
        ));
    }

    let last_update = state.last_update_secs();
    check_update_sequence(params.get_or("updatesequence", ""), last_update)?;

    let service_info = state.config.service_info();
    let policy = state.pipeline.policy();
    let xml = CapabilitiesBuilder {
        service: &service_info,
        policy,
        registry: state.pipeline.registry(),
        endpoint_url: state.endpoint_url(),
        last_update_secs: last_update,
    }
    .build();

    info!(
        datasets = state.pipeline.registry().len(),
        bytes = xml.len(),
        "Served capabilities"
    );
    Ok(xml_response(StatusCode::OK, xml))
}

// ============================================================================
// GetMap
// ============================================================================

async fn wms_get_map(state: &AppState, params: &ParameterStore) -> WmsResult<Response> {
    let image = state.pipeline.get_map(params).await?;
    Ok(bytes_response(image.mime, image.bytes))
}

// ============================================================================
// GetFeatureInfo
// ============================================================================

async fn wms_get_feature_info(state: &AppState, params: &ParameterStore) -> WmsResult<Response> {
    let info = state.pipeline.get_feature_info(params).await?;
    Ok(xml_response(StatusCode::OK, info.to_xml()))
}
