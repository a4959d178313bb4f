//! Response helpers shared by the handlers.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use wms_common::WmsError;
use wms_protocol::{exception_report, EXCEPTION_MIME};

/// Turn a request error into a ServiceExceptionReport response.
///
/// Client errors are logged at `warn`, server errors at `error`.
pub fn wms_error_response(err: &WmsError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if err.is_client_error() {
        warn!(code = ?err.wms_exception_code(), error = %err, "WMS request rejected");
    } else {
        error!(error = %err, "WMS request failed");
    }
    xml_response(status, exception_report(err))
}

/// An XML body with the protocol's XML content type.
pub fn xml_response(status: StatusCode, xml: String) -> Response {
    (status, [(header::CONTENT_TYPE, EXCEPTION_MIME)], xml).into_response()
}

/// A binary body with the given content type.
pub fn bytes_response(mime: String, bytes: Vec<u8>) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, mime)], bytes).into_response()
}
