//! HTTP request handlers for WMS and API endpoints.
//!
//! This module is organized into submodules:
//! - `wms`: WMS GetCapabilities, GetMap, GetFeatureInfo handlers
//! - `api`: REST API handlers (nearest timestep lookup)
//! - `metrics`: Health checks, Prometheus metrics, and monitoring
//! - `common`: Shared response helpers

pub mod api;
pub mod common;
pub mod metrics;
pub mod wms;

pub use api::{nearest_timestep_handler, NearestTimestepResponse};
pub use common::{bytes_response, wms_error_response, xml_response};
pub use metrics::{api_metrics_handler, health_handler, metrics_handler};
pub use wms::wms_handler;
