//! Error types for gridded-wms services.

use thiserror::Error;

/// Result type alias using WmsError.
pub type WmsResult<T> = Result<T, WmsError>;

/// Primary error type for WMS operations.
///
/// Every variant is request-scoped: it aborts the current request only and is
/// turned into a protocol exception document at the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WmsError {
    // === Parameter Errors ===
    #[error("Must provide a {} argument", .0.to_uppercase())]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    // === Grid Errors ===
    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("Invalid image dimension: {0}")]
    InvalidDimension(String),

    #[error("CRS {0} is not supported by this server")]
    UnsupportedCrs(String),

    // === Dimension Errors ===
    #[error("Invalid value '{value}' for dimension {dimension}")]
    InvalidDimensionValue { dimension: String, value: String },

    #[error("Invalid time value: {0}")]
    InvalidTimeValue(String),

    #[error("You may only request a single value of {}", .0.to_uppercase())]
    MultiValueNotSupported(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    // === Request Shape Errors ===
    #[error("Layer not defined: {0}")]
    LayerNotDefined(String),

    #[error("You may only request a maximum of {limit} layer(s) simultaneously (got {requested})")]
    TooManyLayers { requested: usize, limit: usize },

    #[error("Style not defined: {0}")]
    StyleNotDefined(String),

    #[error("Format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("VERSION must be {expected} (got '{found}')")]
    WrongVersion { expected: String, found: String },

    // === Feature Info Errors ===
    #[error("Layer is not queryable: {0}")]
    LayerNotQueryable(String),

    #[error("Invalid point: {0}")]
    InvalidPoint(String),

    // === Capabilities Consistency Signals ===
    #[error("Update sequence {0} is current")]
    CurrentUpdateSequence(String),

    #[error("Update sequence {0} is newer than the server's")]
    InvalidUpdateSequence(String),

    // === Infrastructure Errors ===
    #[error("Failed to read data: {0}")]
    DataReadError(String),

    #[error("Rendering failed: {0}")]
    RenderError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl WmsError {
    /// Build an `InvalidDimensionValue` error.
    pub fn invalid_dimension_value(dimension: impl Into<String>, value: impl Into<String>) -> Self {
        WmsError::InvalidDimensionValue {
            dimension: dimension.into(),
            value: value.into(),
        }
    }

    /// Build an `InvalidParameter` error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        WmsError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Get the OGC WMS exception code for this error.
    ///
    /// `None` means the exception is reported without a code attribute.
    pub fn wms_exception_code(&self) -> Option<&'static str> {
        match self {
            WmsError::MissingParameter(_) => Some("MissingParameterValue"),
            WmsError::InvalidParameter { .. } => Some("InvalidParameterValue"),
            WmsError::InvalidBoundingBox(_) => Some("InvalidBBox"),
            WmsError::InvalidDimension(_) => Some("InvalidParameterValue"),
            WmsError::UnsupportedCrs(_) => Some("InvalidCRS"),
            WmsError::InvalidDimensionValue { .. } | WmsError::InvalidTimeValue(_) => {
                Some("InvalidDimensionValue")
            }
            WmsError::MultiValueNotSupported(_) => Some("InvalidDimensionValue"),
            WmsError::UnsupportedFeature(_) => Some("OperationNotSupported"),
            WmsError::LayerNotDefined(_) => Some("LayerNotDefined"),
            WmsError::TooManyLayers { .. } => None,
            WmsError::StyleNotDefined(_) => Some("StyleNotDefined"),
            WmsError::UnsupportedFormat(_) => Some("InvalidFormat"),
            WmsError::WrongVersion { .. } => None,
            WmsError::LayerNotQueryable(_) => Some("LayerNotQueryable"),
            WmsError::InvalidPoint(_) => Some("InvalidPoint"),
            WmsError::CurrentUpdateSequence(_) => Some("CurrentUpdateSequence"),
            WmsError::InvalidUpdateSequence(_) => Some("InvalidUpdateSequence"),
            _ => Some("NoApplicableCode"),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            WmsError::CurrentUpdateSequence(_) => 200,

            WmsError::DataReadError(_)
            | WmsError::RenderError(_)
            | WmsError::ConfigError(_)
            | WmsError::InternalError(_) => 500,

            WmsError::LayerNotDefined(_) | WmsError::StyleNotDefined(_) => 404,

            _ => 400,
        }
    }

    /// True for errors caused by the client's request rather than the server.
    pub fn is_client_error(&self) -> bool {
        self.http_status_code() < 500
    }
}

impl From<std::io::Error> for WmsError {
    fn from(err: std::io::Error) -> Self {
        WmsError::DataReadError(err.to_string())
    }
}

impl From<serde_json::Error> for WmsError {
    fn from(err: serde_json::Error) -> Self {
        WmsError::InternalError(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for WmsError {
    fn from(err: serde_yaml::Error) -> Self {
        WmsError::ConfigError(format!("YAML error: {}", err))
    }
}
