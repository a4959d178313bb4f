//! Output grids: the pixel lattice of a requested map image.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::crs::{CrsCode, Projection};
use crate::{BoundingBox, WmsError, WmsResult};

/// Sphere radius used by the spherical Mercator projection, in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Marker for pixels without data. Readers return it and renderers draw it
/// as the background.
pub const FILL_VALUE: f32 = f32::NAN;

/// True for [`FILL_VALUE`] (any NaN).
#[inline]
pub fn is_fill(value: f32) -> bool {
    value.is_nan()
}

/// Upper bounds on requested image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLimits {
    pub max_width: usize,
    pub max_height: usize,
}

impl Default for GridLimits {
    fn default() -> Self {
        Self {
            max_width: 1000,
            max_height: 1000,
        }
    }
}

/// A validated output grid.
///
/// Pixel `(i, j)` has column `i` counted from the west edge and row `j`
/// counted from the north edge. Coordinates are taken at pixel centres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub crs: CrsCode,
    pub bbox: BoundingBox,
    pub width: usize,
    pub height: usize,
    pub projection: Projection,
}

impl Grid {
    /// Build a grid from already-parsed parts, checking the size limits.
    pub fn from_parts(
        crs: CrsCode,
        bbox: BoundingBox,
        width: usize,
        height: usize,
        limits: GridLimits,
    ) -> WmsResult<Self> {
        if bbox.min_x >= bbox.max_x || bbox.min_y >= bbox.max_y {
            return Err(WmsError::InvalidBoundingBox(format!(
                "min must be less than max: {:?}",
                bbox.to_array()
            )));
        }
        check_dimension("width", width, limits.max_width)?;
        check_dimension("height", height, limits.max_height)?;

        Ok(Self {
            crs,
            bbox,
            width,
            height,
            projection: crs.projection(),
        })
    }

    /// Build a grid from the raw `bbox`, `width`, `height` and `crs` request values.
    ///
    /// Validation happens in that order, so a request with both a bad bbox
    /// and a bad CRS reports the bbox.
    pub fn from_params(
        bbox: &str,
        width: &str,
        height: &str,
        crs: &str,
        limits: GridLimits,
    ) -> WmsResult<Self> {
        let bbox = BoundingBox::from_wms_string(bbox)?;
        let width = parse_dimension("width", width, limits.max_width)?;
        let height = parse_dimension("height", height, limits.max_height)?;
        let crs = CrsCode::from_wms_string(crs)?;

        Self::from_parts(crs, bbox, width, height, limits)
    }

    /// Longitude of every pixel column, west to east.
    pub fn lon_values(&self) -> Vec<f64> {
        (0..self.width).map(|i| self.x_to_lon(self.x_at(i))).collect()
    }

    /// Latitude of every pixel row, north to south.
    pub fn lat_values(&self) -> Vec<f64> {
        (0..self.height).map(|j| self.y_to_lat(self.y_at(j))).collect()
    }

    /// Longitude and latitude of pixel `(i, j)`, or `None` outside the grid.
    pub fn lon_lat(&self, i: usize, j: usize) -> Option<(f64, f64)> {
        if i >= self.width || j >= self.height {
            return None;
        }
        Some((self.x_to_lon(self.x_at(i)), self.y_to_lat(self.y_at(j))))
    }

    /// Projected x coordinate of the centre of column `i`.
    fn x_at(&self, i: usize) -> f64 {
        let dx = self.bbox.width() / self.width as f64;
        self.bbox.min_x + (i as f64 + 0.5) * dx
    }

    /// Projected y coordinate of the centre of row `j`; row 0 is the north edge.
    fn y_at(&self, j: usize) -> f64 {
        let dy = self.bbox.height() / self.height as f64;
        self.bbox.max_y - (j as f64 + 0.5) * dy
    }

    fn x_to_lon(&self, x: f64) -> f64 {
        match self.projection {
            Projection::PlateCarree => x,
            Projection::Mercator => (x / EARTH_RADIUS_M).to_degrees(),
        }
    }

    fn y_to_lat(&self, y: f64) -> f64 {
        match self.projection {
            Projection::PlateCarree => y,
            Projection::Mercator => {
                (2.0 * (y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees()
            }
        }
    }
}

fn parse_dimension(name: &str, value: &str, max: usize) -> WmsResult<usize> {
    let parsed = value.trim().parse::<i64>().map_err(|_| {
        WmsError::InvalidDimension(format!("{} must be an integer (got '{}')", name, value))
    })?;
    if parsed < 1 {
        return Err(WmsError::InvalidDimension(format!(
            "{} must be between 1 and {} (got {})",
            name, max, parsed
        )));
    }
    let parsed = parsed as usize;
    check_dimension(name, parsed, max)?;
    Ok(parsed)
}

fn check_dimension(name: &str, value: usize, max: usize) -> WmsResult<()> {
    if value < 1 || value > max {
        return Err(WmsError::InvalidDimension(format!(
            "{} must be between 1 and {} (got {})",
            name, max, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(bbox: &str, w: &str, h: &str, crs: &str) -> WmsResult<Grid> {
        Grid::from_params(bbox, w, h, crs, GridLimits::default())
    }

    #[test]
    fn test_grid_bbox_matches_parsed_values() {
        let grid = build("-180,-90,180,90", "360", "180", "CRS:84").unwrap();
        assert_eq!(grid.bbox.to_array(), [-180.0, -90.0, 180.0, 90.0]);
        assert_eq!(grid.width, 360);
        assert_eq!(grid.height, 180);
        assert_eq!(grid.projection, Projection::PlateCarree);
    }

    #[test]
    fn test_plate_carree_pixel_centres() {
        let grid = build("0,0,4,2", "4", "2", "CRS:84").unwrap();
        assert_eq!(grid.lon_values(), vec![0.5, 1.5, 2.5, 3.5]);
        // Row 0 is the northern row
        assert_eq!(grid.lat_values(), vec![1.5, 0.5]);
        assert_eq!(grid.lon_lat(3, 1), Some((3.5, 0.5)));
        assert_eq!(grid.lon_lat(4, 0), None);
    }

    #[test]
    fn test_mercator_inverse() {
        let half = PI * EARTH_RADIUS_M;
        let bbox = format!("{},{},{},{}", -half, -half, half, half);
        let grid = build(&bbox, "2", "2", "EPSG:41001").unwrap();
        let lons = grid.lon_values();
        assert!((lons[0] + 90.0).abs() < 1e-9);
        assert!((lons[1] - 90.0).abs() < 1e-9);
        let lats = grid.lat_values();
        assert!(lats[0] > 0.0 && lats[0] < 85.06);
        assert!((lats[0] + lats[1]).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(matches!(
            build("0,0,1,1", "0", "10", "CRS:84"),
            Err(WmsError::InvalidDimension(_))
        ));
        assert!(matches!(
            build("0,0,1,1", "10", "1001", "CRS:84"),
            Err(WmsError::InvalidDimension(_))
        ));
        assert!(matches!(
            build("0,0,1,1", "ten", "10", "CRS:84"),
            Err(WmsError::InvalidDimension(_))
        ));
        assert!(matches!(
            build("0,0,1,1", "-5", "10", "CRS:84"),
            Err(WmsError::InvalidDimension(_))
        ));
    }

    #[test]
    fn test_unsupported_crs() {
        assert_eq!(
            build("0,0,1,1", "10", "10", "EPSG:27700"),
            Err(WmsError::UnsupportedCrs("EPSG:27700".to_string()))
        );
    }

    #[test]
    fn test_bbox_checked_before_crs() {
        assert!(matches!(
            build("0,0,1", "10", "10", "EPSG:27700"),
            Err(WmsError::InvalidBoundingBox(_))
        ));
    }
}
