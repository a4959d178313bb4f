//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

use crate::WmsError;

/// A geographic or projected bounding box.
///
/// For geographic CRS (CRS:84), coordinates are in degrees.
/// For Mercator CRS (EPSG:41001 etc.), coordinates are in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Parse a WMS BBOX parameter string: "minx,miny,maxx,maxy"
    ///
    /// Requires exactly four finite numbers with `minx < maxx` and `miny < maxy`.
    pub fn from_wms_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| BboxParseError::InvalidNumber(part.to_string()))?;
        }

        let [min_x, min_y, max_x, max_y] = values;
        if min_x >= max_x || min_y >= max_y {
            return Err(BboxParseError::InvalidOrder(s.to_string()));
        }

        Ok(Self::new(min_x, min_y, max_x, max_y))
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Corners as `[minx, miny, maxx, maxy]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid bounding box format: need four elements, got '{0}'")]
    InvalidFormat(String),

    #[error("Invalid bounding box format: all elements must be numeric ('{0}')")]
    InvalidNumber(String),

    #[error("Invalid bounding box format: min must be less than max ('{0}')")]
    InvalidOrder(String),
}

impl From<BboxParseError> for WmsError {
    fn from(err: BboxParseError) -> Self {
        WmsError::InvalidBoundingBox(err.to_string())
    }
}
