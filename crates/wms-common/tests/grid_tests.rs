//! Grid construction from raw request values.

use wms_common::bbox::{BboxParseError, BoundingBox};
use wms_common::{CrsCode, Grid, GridLimits, Projection, WmsError};

fn build(bbox: &str) -> Result<Grid, WmsError> {
    Grid::from_params(bbox, "100", "50", "CRS:84", GridLimits::default())
}

// ============================================================================
// Bounding box parsing
// ============================================================================

#[test]
fn test_parse_wms_bbox_floating() {
    let bbox = BoundingBox::from_wms_string("-125.5,24.75,-66.25,50.125").unwrap();
    assert_eq!(bbox.to_array(), [-125.5, 24.75, -66.25, 50.125]);
}

#[test]
fn test_parse_wms_bbox_scientific_notation() {
    let bbox = BoundingBox::from_wms_string("1e-6,2e-6,1e6,2e6").unwrap();
    assert_eq!(bbox.min_x, 1e-6);
    assert_eq!(bbox.max_y, 2e6);
}

#[test]
fn test_parse_wms_bbox_whitespace() {
    let bbox = BoundingBox::from_wms_string(" -10 , -5 , 10 , 5 ").unwrap();
    assert_eq!(bbox.to_array(), [-10.0, -5.0, 10.0, 5.0]);
}

#[test]
fn test_parse_wms_bbox_wrong_count() {
    for s in ["", "0,0,1", "0,0,1,1,2"] {
        assert!(
            matches!(BoundingBox::from_wms_string(s), Err(BboxParseError::InvalidFormat(_))),
            "{}",
            s
        );
    }
}

#[test]
fn test_parse_wms_bbox_non_numeric() {
    for s in ["a,0,1,1", "0,0,1,NaN", "0,0,inf,1"] {
        assert!(
            matches!(BoundingBox::from_wms_string(s), Err(BboxParseError::InvalidNumber(_))),
            "{}",
            s
        );
    }
}

// ============================================================================
// Grid building
// ============================================================================

#[test]
fn test_grid_bbox_equals_parsed_floats() {
    for s in ["-180,-90,180,90", "0.1,0.2,0.3,0.4", "-1e-3,-2e-3,3e-3,4e-3"] {
        let parsed = BoundingBox::from_wms_string(s).unwrap();
        let grid = build(s).unwrap();
        assert_eq!(grid.bbox, parsed);
    }
}

#[test]
fn test_grid_malformed_bbox() {
    for s in ["0,0,1", "a,b,c,d", "10,0,0,10", "0,10,10,0", "5,5,5,6"] {
        assert!(
            matches!(build(s), Err(WmsError::InvalidBoundingBox(_))),
            "{}",
            s
        );
    }
}

#[test]
fn test_grid_crs_lookup_is_case_insensitive() {
    let grid = Grid::from_params("0,0,1,1", "1", "1", "epsg:3857", GridLimits::default()).unwrap();
    assert_eq!(grid.crs, CrsCode::Epsg3857);
    assert_eq!(grid.projection, Projection::Mercator);
}

#[test]
fn test_grid_respects_configured_limits() {
    let limits = GridLimits {
        max_width: 256,
        max_height: 128,
    };
    assert!(Grid::from_params("0,0,1,1", "256", "128", "CRS:84", limits).is_ok());
    assert!(matches!(
        Grid::from_params("0,0,1,1", "257", "128", "CRS:84", limits),
        Err(WmsError::InvalidDimension(_))
    ));
    assert!(matches!(
        Grid::from_params("0,0,1,1", "256", "129", "CRS:84", limits),
        Err(WmsError::InvalidDimension(_))
    ));
}

#[test]
fn test_grid_axis_lengths() {
    let grid = build("-180,-90,180,90").unwrap();
    assert_eq!(grid.lon_values().len(), 100);
    assert_eq!(grid.lat_values().len(), 50);
    let lats = grid.lat_values();
    assert!(lats.windows(2).all(|w| w[0] > w[1]));
}
