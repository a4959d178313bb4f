//! Request resolution from raw query strings through to validated requests.

use wms_common::{DatasetRegistry, WmsError};
use wms_protocol::{GetMapRequest, ParameterStore, RequestPolicy};

const REGISTRY: &str = r#"
datasets:
  - id: ocean
    title: Ocean
    location: /data/ocean
    variables:
      - id: sst
        bbox: { min_x: -180, min_y: -90, max_x: 180, max_y: 90 }
        tvalues: [0, 3600, 7200, 10800]
      - id: depth
        bbox: { min_x: -180, min_y: -90, max_x: 180, max_y: 90 }
        zvalues: [0, 10, 100]
"#;

fn get_map(extra: &str) -> Result<(Vec<usize>, String), WmsError> {
    get_map_layer("sst", extra)
}

fn get_map_layer(variable: &str, extra: &str) -> Result<(Vec<usize>, String), WmsError> {
    let registry = DatasetRegistry::from_yaml_str(REGISTRY).unwrap();
    let query = format!(
        "SERVICE=WMS&REQUEST=GetMap&VERSION=1.3.0&LAYERS=ocean%2F{}&STYLES=&FORMAT=image%2Fpng\
         &CRS=CRS:84&BBOX=-180,-90,180,90&WIDTH=64&HEIGHT=32{}",
        variable, extra
    );
    let params = ParameterStore::parse(&query);
    let req = GetMapRequest::parse(&params, &registry, &RequestPolicy::default())?;
    Ok((req.dimensions.time_indices, req.dimensions.elevation))
}

#[test]
fn test_time_defaults_to_latest() {
    assert_eq!(get_map("").unwrap().0, vec![3]);
    assert_eq!(get_map("&TIME=").unwrap().0, vec![3]);
}

#[test]
fn test_time_single_value() {
    assert_eq!(get_map("&TIME=1970-01-01T01:00:00Z").unwrap().0, vec![1]);
    assert_eq!(get_map("&time=1970-01-01T01%3A00%3A00.000Z").unwrap().0, vec![1]);
}

#[test]
fn test_time_range_is_inclusive() {
    assert_eq!(
        get_map("&TIME=1970-01-01T00:00:00Z/1970-01-01T02:00:00Z").unwrap().0,
        vec![0, 1, 2]
    );
}

#[test]
fn test_time_periodic_is_unsupported() {
    assert_eq!(
        get_map("&TIME=1970-01-01T00:00:00Z/1970-01-01T02:00:00Z/PT1H").unwrap_err(),
        WmsError::UnsupportedFeature("periodic time animation".to_string())
    );
}

#[test]
fn test_elevation_single_value_only() {
    for value in ["10,20", "10/20"] {
        assert_eq!(
            get_map(&format!("&ELEVATION={}", value)).unwrap_err(),
            WmsError::MultiValueNotSupported("elevation".to_string())
        );
    }
    assert_eq!(get_map_layer("depth", "&ELEVATION=100.0").unwrap().1, "100.0");
}

#[test]
fn test_elevation_must_match_a_level() {
    assert_eq!(
        get_map_layer("depth", "&ELEVATION=50").unwrap_err(),
        WmsError::invalid_dimension_value("elevation", "50")
    );
    // sst has no z axis
    assert_eq!(
        get_map("&ELEVATION=0").unwrap_err(),
        WmsError::invalid_dimension_value("elevation", "0")
    );
    assert_eq!(get_map("&ELEVATION=").unwrap().1, "");
}

#[test]
fn test_validation_order_reports_version_first() {
    let registry = DatasetRegistry::from_yaml_str(REGISTRY).unwrap();
    let params = ParameterStore::parse("VERSION=1.1.1&LAYERS=nope/nope&BBOX=bad");
    assert!(matches!(
        GetMapRequest::parse(&params, &registry, &RequestPolicy::default()),
        Err(WmsError::WrongVersion { .. })
    ));
}
