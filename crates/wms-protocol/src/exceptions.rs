//! WMS ServiceExceptionReport documents.

use quick_xml::escape::escape;

use wms_common::WmsError;

/// MIME type of exception documents.
pub const EXCEPTION_MIME: &str = "text/xml";

/// Generate a WMS 1.3.0 exception report for a code and message.
///
/// A `None` code omits the `code` attribute.
pub fn wms_exception(code: Option<&str>, message: &str) -> String {
    let code_attr = code
        .map(|c| format!(r#" code="{}""#, escape(c)))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><ServiceExceptionReport version="1.3.0" xmlns="http://www.opengis.net/ogc"><ServiceException{}>{}</ServiceException></ServiceExceptionReport>"#,
        code_attr,
        escape(message)
    )
}

/// Exception report for a request error.
pub fn exception_report(err: &WmsError) -> String {
    wms_exception(err.wms_exception_code(), &err.to_string())
}
