//! WMS GetFeatureInfo handling
//!
//! Implements the GetFeatureInfo operation for querying the data value under
//! a single map pixel. Only `text/xml` responses are produced.

use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use tracing::debug;

use wms_common::{WmsError, WmsResult};

use crate::dimension::{elevation_index, resolve_elevation, resolve_time_indices};
use crate::getmap::{
    check_exception_format, check_version, grid_from_params, parse_layer_list, resolve_layer,
    LayerRef, RequestPolicy,
};
use crate::ParameterStore;

/// Supported GetFeatureInfo response formats.
pub const FEATURE_INFO_FORMATS: &[&str] = &["text/xml"];

/// A validated GetFeatureInfo request.
#[derive(Debug, Clone)]
pub struct GetFeatureInfoRequest<'a> {
    pub layer: LayerRef<'a>,
    pub elevation: String,
    pub time_index: usize,
    /// Centre of the queried pixel
    pub longitude: f64,
    pub latitude: f64,
}

impl<'a> GetFeatureInfoRequest<'a> {
    pub fn parse(
        params: &'a ParameterStore,
        registry: &'a wms_common::DatasetRegistry,
        policy: &RequestPolicy,
    ) -> WmsResult<Self> {
        check_version(params)?;
        let grid = grid_from_params(params, policy.grid_limits)?;

        let query_layers = parse_layer_list(params.get("query_layers")?, 1)?;

        let info_format = params.get("info_format")?;
        if !FEATURE_INFO_FORMATS.contains(&info_format) {
            return Err(WmsError::UnsupportedFormat(info_format.to_string()));
        }
        check_exception_format(params)?;

        let elevation = resolve_elevation(params)?;
        let time = params.get_or("time", "");
        if time.contains(',') || time.contains('/') {
            return Err(WmsError::MultiValueNotSupported("time".to_string()));
        }

        let i = parse_pixel(params.get("i")?, grid.width)?;
        let j = parse_pixel(params.get("j")?, grid.height)?;

        let feature_count = params.get_or("feature_count", "1");
        match feature_count.parse::<i64>() {
            Ok(1) => {}
            Ok(_) => {
                return Err(WmsError::invalid_parameter(
                    "feature_count",
                    "Can only provide FeatureInfo for 1 feature per layer",
                ))
            }
            Err(_) => {
                return Err(WmsError::invalid_parameter(
                    "feature_count",
                    format!("Invalid integer for FEATURE_COUNT: {}", feature_count),
                ))
            }
        }

        let layer = resolve_layer(registry, query_layers[0], &policy.layer_separator)?;
        if !policy.allow_feature_info || !layer.dataset.queryable {
            return Err(WmsError::LayerNotQueryable(layer.name.to_string()));
        }
        elevation_index(layer.variable, &elevation)?;

        let time_index = match resolve_time_indices(layer.variable, params)?.as_slice() {
            [index] => *index,
            _ => return Err(WmsError::MultiValueNotSupported("time".to_string())),
        };

        let (longitude, latitude) = grid
            .lon_lat(i, j)
            .ok_or_else(|| WmsError::InvalidPoint(format!("({}, {})", i, j)))?;

        debug!(layer = %layer.name, i, j, longitude, latitude, "Validated GetFeatureInfo request");

        Ok(Self {
            layer,
            elevation,
            time_index,
            longitude,
            latitude,
        })
    }
}

fn parse_pixel(value: &str, size: usize) -> WmsResult<usize> {
    value
        .parse::<i64>()
        .ok()
        .filter(|&p| p >= 0 && (p as usize) < size)
        .map(|p| p as usize)
        .ok_or_else(|| WmsError::InvalidPoint(value.to_string()))
}

/// The value found at a queried point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureInfoResponse {
    pub longitude: f64,
    pub latitude: f64,
    /// `None` when the point has no data.
    pub value: Option<f32>,
}

impl FeatureInfoResponse {
    /// Format as XML
    pub fn to_xml(&self) -> String {
        let value = match self.value {
            Some(v) => escape(&v.to_string()).into_owned(),
            None => "none".to_string(),
        };
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <FeatureInfoResponse>\
             <longitude>{:.6}</longitude>\
             <latitude>{:.6}</latitude>\
             <value>{}</value>\
             </FeatureInfoResponse>",
            self.longitude, self.latitude, value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wms_common::DatasetRegistry;

    const YAML: &str = r#"
datasets:
  - id: ocean
    location: /data/ocean
    queryable: true
    variables:
      - id: sst
        bbox: { min_x: -180, min_y: -90, max_x: 180, max_y: 90 }
        tvalues: [0, 3600]
      - id: temp
        bbox: { min_x: -180, min_y: -90, max_x: 180, max_y: 90 }
        zvalues: [5, 50]
  - id: private
    location: /data/private
    variables:
      - id: sst
        bbox: { min_x: -180, min_y: -90, max_x: 180, max_y: 90 }
"#;

    const BASE: &str = "request=GetFeatureInfo&version=1.3.0&query_layers=ocean/sst\
        &info_format=text/xml&crs=CRS:84&bbox=0,0,10,10&width=10&height=10&i=2&j=3";

    fn parse(query: &str) -> WmsResult<(f64, f64, usize)> {
        let registry = DatasetRegistry::from_yaml_str(YAML).unwrap();
        let params = ParameterStore::parse(query);
        let req = GetFeatureInfoRequest::parse(&params, &registry, &RequestPolicy::default())?;
        Ok((req.longitude, req.latitude, req.time_index))
    }

    #[test]
    fn test_valid_request() {
        let (lon, lat, t) = parse(BASE).unwrap();
        assert_eq!(lon, 2.5);
        assert_eq!(lat, 6.5);
        assert_eq!(t, 1);
    }

    #[test]
    fn test_point_outside_grid() {
        for (from, to) in [("i=2", "i=10"), ("j=3", "j=-1"), ("i=2", "i=two")] {
            let query = BASE.replace(from, to);
            assert!(matches!(parse(&query), Err(WmsError::InvalidPoint(_))), "{}", to);
        }
    }

    #[test]
    fn test_not_queryable() {
        let query = BASE.replace("ocean/sst", "private/sst");
        assert_eq!(
            parse(&query).unwrap_err(),
            WmsError::LayerNotQueryable("private/sst".to_string())
        );

        let registry = DatasetRegistry::from_yaml_str(YAML).unwrap();
        let params = ParameterStore::parse(BASE);
        let policy = RequestPolicy {
            allow_feature_info: false,
            ..Default::default()
        };
        assert!(matches!(
            GetFeatureInfoRequest::parse(&params, &registry, &policy),
            Err(WmsError::LayerNotQueryable(_))
        ));
    }

    #[test]
    fn test_single_values_only() {
        let query = format!("{}&time=1970-01-01T00:00:00Z,1970-01-01T01:00:00Z", BASE);
        assert_eq!(
            parse(&query).unwrap_err(),
            WmsError::MultiValueNotSupported("time".to_string())
        );
        let query = format!("{}&feature_count=5", BASE);
        assert!(matches!(parse(&query), Err(WmsError::InvalidParameter { .. })));
        let query = BASE.replace("text/xml", "text/html");
        assert!(matches!(parse(&query), Err(WmsError::UnsupportedFormat(_))));
        let query = BASE.replace("ocean/sst", "ocean/sst,ocean/sst");
        assert!(matches!(parse(&query), Err(WmsError::TooManyLayers { .. })));
    }

    #[test]
    fn test_elevation_checked_against_layer_levels() {
        let temp = BASE.replace("ocean/sst", "ocean/temp");
        assert!(parse(&format!("{}&elevation=50", temp)).is_ok());
        assert_eq!(
            parse(&format!("{}&elevation=60", temp)).unwrap_err(),
            WmsError::invalid_dimension_value("elevation", "60")
        );
        assert_eq!(
            parse(&format!("{}&elevation=5", BASE)).unwrap_err(),
            WmsError::invalid_dimension_value("elevation", "5")
        );
    }

    #[test]
    fn test_response_xml() {
        let response = FeatureInfoResponse {
            longitude: -95.0,
            latitude: 40.0,
            value: Some(288.5),
        };
        let xml = response.to_xml();
        assert!(xml.contains("<longitude>-95.000000</longitude>"));
        assert!(xml.contains("<value>288.5</value>"));

        let empty = FeatureInfoResponse {
            value: None,
            ..response
        };
        assert!(empty.to_xml().contains("<value>none</value>"));
    }
}
