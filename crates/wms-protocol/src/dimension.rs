//! Resolution of the ELEVATION and TIME dimension parameters.
//!
//! TIME accepts a single timestamp, `current`, a comma-separated list, and
//! inclusive `start/stop` ranges (or any mix of them). Periodic
//! `start/stop/period` specs are rejected. ELEVATION is single-valued and
//! must name one of the variable's levels.

use serde::{Deserialize, Serialize};
use tracing::debug;

use wms_common::time::parse_iso8601_seconds;
use wms_common::{Variable, WmsError, WmsResult};

use crate::ParameterStore;

/// Two axis values closer than this (in seconds) are the same timestep.
pub const TIME_TOLERANCE_SECS: f64 = 0.001;

/// Elevations closer than this are the same level.
pub const ELEVATION_TOLERANCE: f64 = 1e-6;

/// The resolved dimensions of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSelection {
    /// Trimmed elevation value, or empty when none was requested.
    pub elevation: String,
    /// Time-axis indices, in request order. `[0]` when the variable has no time axis.
    pub time_indices: Vec<usize>,
}

impl DimensionSelection {
    pub fn resolve(variable: &Variable, params: &ParameterStore) -> WmsResult<Self> {
        let elevation = resolve_elevation(params)?;
        elevation_index(variable, &elevation)?;
        let time_indices = resolve_time_indices(variable, params)?;
        debug!(
            variable = %variable.id,
            elevation = %elevation,
            frames = time_indices.len(),
            "Resolved dimensions"
        );
        Ok(Self {
            elevation,
            time_indices,
        })
    }
}

/// Read the single ELEVATION value (empty when absent).
pub fn resolve_elevation(params: &ParameterStore) -> WmsResult<String> {
    let value = params.get_or("elevation", "").trim();
    if value.contains(',') || value.contains('/') {
        return Err(WmsError::MultiValueNotSupported("elevation".to_string()));
    }
    if !value.is_empty() && !value.parse::<f64>().is_ok_and(f64::is_finite) {
        return Err(WmsError::invalid_dimension_value("elevation", value));
    }
    Ok(value.to_string())
}

/// Index of `elevation` on the variable's z axis.
///
/// An empty value selects the first level (or the only one when there is no
/// z axis). A non-empty value must match a level within
/// [`ELEVATION_TOLERANCE`], so it is rejected outright for variables without
/// a z axis.
pub fn elevation_index(variable: &Variable, elevation: &str) -> WmsResult<usize> {
    if elevation.is_empty() {
        return Ok(0);
    }
    let invalid = || WmsError::invalid_dimension_value("elevation", elevation);
    let target: f64 = elevation.parse().map_err(|_| invalid())?;
    variable
        .zvalues
        .as_deref()
        .unwrap_or_default()
        .iter()
        .position(|&z| (z - target).abs() <= ELEVATION_TOLERANCE)
        .ok_or_else(invalid)
}

/// Resolve the TIME parameter into indices on the variable's time axis.
pub fn resolve_time_indices(variable: &Variable, params: &ParameterStore) -> WmsResult<Vec<usize>> {
    let tvalues = &variable.tvalues;
    let Some(last) = tvalues.len().checked_sub(1) else {
        // No time axis: one nominal frame
        return Ok(vec![0]);
    };

    let value = params.get_or("time", "").trim();
    if value.is_empty() {
        return Ok(vec![last]);
    }

    let mut indices = Vec::new();
    for spec in value.split(',') {
        let spec = spec.trim();
        let parts: Vec<&str> = spec.split('/').collect();
        match parts.as_slice() {
            [single] => indices.push(find_time_index(tvalues, single)?),
            [start, stop] => {
                let start = find_time_index(tvalues, start)?;
                let stop = find_time_index(tvalues, stop)?;
                // A reversed range selects nothing
                indices.extend(start..=stop);
            }
            [_, _, _] => {
                return Err(WmsError::UnsupportedFeature(
                    "periodic time animation".to_string(),
                ))
            }
            _ => return Err(WmsError::invalid_dimension_value("time", spec)),
        }
    }
    Ok(indices)
}

/// Index of the timestep exactly matching `spec` (`current` is the last one).
pub fn find_time_index(tvalues: &[f64], spec: &str) -> WmsResult<usize> {
    let spec = spec.trim();
    if spec.eq_ignore_ascii_case("current") {
        return tvalues
            .len()
            .checked_sub(1)
            .ok_or_else(|| WmsError::InvalidTimeValue(spec.to_string()));
    }

    let seconds =
        parse_iso8601_seconds(spec).map_err(|_| WmsError::InvalidTimeValue(spec.to_string()))?;
    exact_time_index(tvalues, seconds).ok_or_else(|| WmsError::InvalidTimeValue(spec.to_string()))
}

/// Binary search an ascending axis for a value within [`TIME_TOLERANCE_SECS`].
pub fn exact_time_index(tvalues: &[f64], seconds: f64) -> Option<usize> {
    let idx = tvalues.partition_point(|&t| t < seconds - TIME_TOLERANCE_SECS);
    tvalues
        .get(idx)
        .filter(|&&t| (t - seconds).abs() <= TIME_TOLERANCE_SECS)
        .map(|_| idx)
}

/// Index of the timestep closest to `seconds` on an ascending axis.
///
/// When two timesteps are equally close the earlier one wins.
pub fn nearest_time_index(tvalues: &[f64], seconds: f64) -> Option<usize> {
    if tvalues.is_empty() || seconds.is_nan() {
        return None;
    }
    let idx = tvalues.partition_point(|&t| t < seconds);
    if idx == 0 {
        return Some(0);
    }
    if idx == tvalues.len() {
        return Some(idx - 1);
    }
    let before = seconds - tvalues[idx - 1];
    let after = tvalues[idx] - seconds;
    if after < before {
        Some(idx)
    } else {
        Some(idx - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wms_common::BoundingBox;

    fn params(key: &str, value: &str) -> ParameterStore {
        ParameterStore::parse(&format!("{}={}", key, urlencoding::encode(value)))
    }

    fn variable(tvalues: Vec<f64>) -> Variable {
        Variable {
            id: "sst".to_string(),
            title: String::new(),
            abstract_text: String::new(),
            units: String::new(),
            bbox: BoundingBox::new(-180.0, -90.0, 180.0, 90.0),
            zvalues: None,
            zunits: String::new(),
            z_positive: true,
            tvalues,
            east_component: None,
            north_component: None,
            nx: 0,
            ny: 0,
        }
    }

    fn hourly() -> Variable {
        variable(vec![0.0, 3600.0, 7200.0, 10800.0])
    }

    fn times(var: &Variable, time: &str) -> WmsResult<Vec<usize>> {
        resolve_time_indices(var, &params("time", time))
    }

    #[test]
    fn test_default_time_is_last_index() {
        let var = hourly();
        assert_eq!(times(&var, "").unwrap(), vec![3]);
        assert_eq!(
            resolve_time_indices(&var, &ParameterStore::default()).unwrap(),
            vec![3]
        );
        assert_eq!(times(&var, "current").unwrap(), vec![3]);
    }

    #[test]
    fn test_single_and_range() {
        let var = hourly();
        assert_eq!(times(&var, "1970-01-01T01:00:00Z").unwrap(), vec![1]);
        assert_eq!(
            times(&var, "1970-01-01T00:00:00Z/1970-01-01T02:00:00Z").unwrap(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_list_preserves_request_order() {
        let var = hourly();
        assert_eq!(
            times(
                &var,
                "1970-01-01T03:00:00Z,1970-01-01T00:00:00Z/1970-01-01T01:00:00Z"
            )
            .unwrap(),
            vec![3, 0, 1]
        );
    }

    #[test]
    fn test_reversed_range_is_empty() {
        let var = hourly();
        assert!(times(&var, "1970-01-01T02:00:00Z/1970-01-01T00:00:00Z")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_no_time_axis_yields_nominal_frame() {
        let var = variable(vec![]);
        assert_eq!(times(&var, "").unwrap(), vec![0]);
        assert_eq!(times(&var, "2024-01-01T00:00:00Z").unwrap(), vec![0]);
    }

    #[test]
    fn test_time_errors() {
        let var = hourly();
        assert_eq!(
            times(&var, "1970-01-01T00:30:00Z"),
            Err(WmsError::InvalidTimeValue("1970-01-01T00:30:00Z".to_string()))
        );
        assert!(matches!(
            times(&var, "garbage"),
            Err(WmsError::InvalidTimeValue(_))
        ));
        assert_eq!(
            times(&var, "1970-01-01T00:00:00Z/1970-01-01T02:00:00Z/PT1H"),
            Err(WmsError::UnsupportedFeature(
                "periodic time animation".to_string()
            ))
        );
        assert!(matches!(
            times(&var, "a/b/c/d"),
            Err(WmsError::InvalidDimensionValue { .. })
        ));
    }

    #[test]
    fn test_elevation() {
        let elevation = |v: &str| resolve_elevation(&params("elevation", v));
        assert_eq!(elevation("").unwrap(), "");
        assert_eq!(elevation("100.0").unwrap(), "100.0");
        assert_eq!(
            elevation("10,20"),
            Err(WmsError::MultiValueNotSupported("elevation".to_string()))
        );
        assert_eq!(
            elevation("10/20"),
            Err(WmsError::MultiValueNotSupported("elevation".to_string()))
        );
        assert!(matches!(
            elevation("deep"),
            Err(WmsError::InvalidDimensionValue { .. })
        ));
    }

    #[test]
    fn test_elevation_must_be_on_the_z_axis() {
        let mut var = hourly();
        var.zvalues = Some(vec![0.0, 10.0, 100.0]);
        let resolve = |var: &Variable, v: &str| {
            DimensionSelection::resolve(var, &params("elevation", v)).map(|d| d.elevation)
        };

        assert_eq!(resolve(&var, "1e2").unwrap(), "1e2");
        assert_eq!(elevation_index(&var, "100.0000001"), Ok(2));
        assert_eq!(elevation_index(&var, ""), Ok(0));
        assert_eq!(
            resolve(&var, "999"),
            Err(WmsError::invalid_dimension_value("elevation", "999"))
        );

        let flat = hourly();
        assert_eq!(resolve(&flat, "").unwrap(), "");
        assert_eq!(
            resolve(&flat, "5"),
            Err(WmsError::invalid_dimension_value("elevation", "5"))
        );
        var.zvalues = Some(vec![]);
        assert_eq!(
            resolve(&var, "0"),
            Err(WmsError::invalid_dimension_value("elevation", "0"))
        );
    }

    #[test]
    fn test_exact_index_tolerance() {
        let axis = [0.0, 3600.0, 7200.0];
        assert_eq!(exact_time_index(&axis, 3600.0005), Some(1));
        assert_eq!(exact_time_index(&axis, 3600.01), None);
        assert_eq!(exact_time_index(&axis, 9000.0), None);
    }

    #[test]
    fn test_nearest_index_ties_go_to_earlier() {
        let axis = [0.0, 3600.0, 7200.0];
        assert_eq!(nearest_time_index(&axis, 1800.0), Some(0));
        assert_eq!(nearest_time_index(&axis, 1801.0), Some(1));
        assert_eq!(nearest_time_index(&axis, -50.0), Some(0));
        assert_eq!(nearest_time_index(&axis, 1e9), Some(2));
        assert_eq!(nearest_time_index(&[], 0.0), None);
    }
}
