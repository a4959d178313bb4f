//! Coordinate Reference System types and utilities.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::WmsError;

/// CRS codes accepted in the CRS parameter of map requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 longitude/latitude
    Crs84,
    /// WGS84 geographic; treated with lon/lat axis order like CRS:84
    Epsg4326,
    /// World Mercator
    Epsg41001,
    /// Web Mercator (meters)
    Epsg3857,
    /// Legacy Google code for Web Mercator
    Epsg900913,
}

/// Map projections that a [`crate::Grid`] can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Projection {
    /// Longitude and latitude vary linearly with pixel position.
    PlateCarree,
    /// Spherical Mercator; bbox in meters.
    Mercator,
}

impl CrsCode {
    /// Every code in the supported-CRS table, in capabilities order.
    pub const ALL: [CrsCode; 5] = [
        CrsCode::Crs84,
        CrsCode::Epsg4326,
        CrsCode::Epsg41001,
        CrsCode::Epsg3857,
        CrsCode::Epsg900913,
    ];

    /// Look up a CRS string from a request against the supported-CRS table.
    ///
    /// The comparison is case-insensitive on the code ("crs:84" == "CRS:84").
    pub fn from_wms_string(s: &str) -> Result<Self, CrsParseError> {
        let normalized = s.trim().to_uppercase();

        match normalized.as_str() {
            "CRS:84" => Ok(CrsCode::Crs84),
            "EPSG:4326" => Ok(CrsCode::Epsg4326),
            "EPSG:41001" => Ok(CrsCode::Epsg41001),
            "EPSG:3857" => Ok(CrsCode::Epsg3857),
            "EPSG:900913" => Ok(CrsCode::Epsg900913),
            _ => Err(CrsParseError::UnsupportedCrs(s.to_string())),
        }
    }

    /// The projection used to build grids for this CRS.
    pub fn projection(&self) -> Projection {
        match self {
            CrsCode::Crs84 | CrsCode::Epsg4326 => Projection::PlateCarree,
            CrsCode::Epsg41001 | CrsCode::Epsg3857 | CrsCode::Epsg900913 => Projection::Mercator,
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            CrsCode::Crs84 => "CRS:84",
            CrsCode::Epsg4326 => "EPSG:4326",
            CrsCode::Epsg41001 => "EPSG:41001",
            CrsCode::Epsg3857 => "EPSG:3857",
            CrsCode::Epsg900913 => "EPSG:900913",
        };
        write!(f, "{}", code)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}

impl From<CrsParseError> for WmsError {
    fn from(err: CrsParseError) -> Self {
        match err {
            CrsParseError::UnsupportedCrs(crs) => WmsError::UnsupportedCrs(crs),
        }
    }
}
