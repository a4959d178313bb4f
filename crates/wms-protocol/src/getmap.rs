//! WMS GetMap request validation.
//!
//! Turns a [`ParameterStore`] into a fully validated [`GetMapRequest`]:
//! version, layer, style, formats, rendering options, dimensions and grid.
//! Reading data and rendering are left to the caller.

use serde::{Deserialize, Serialize};
use tracing::debug;

use wms_common::{
    Dataset, DatasetRegistry, Grid, GridLimits, RenderOptions, Variable, WmsError, WmsResult,
};

use crate::{DimensionSelection, ParameterStore};

/// The only protocol version served.
pub const WMS_VERSION: &str = "1.3.0";

/// Image formats GetMap can produce.
pub const SUPPORTED_IMAGE_FORMATS: &[&str] = &["image/png"];

/// Exception formats understood by GetMap and GetFeatureInfo.
pub const SUPPORTED_EXCEPTION_FORMATS: &[&str] = &["XML"];

/// Server-side limits and conventions applied while validating requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPolicy {
    /// Maximum number of layers per GetMap request.
    pub layer_limit: usize,
    /// Separator between dataset and variable ids in a layer name.
    pub layer_separator: String,
    pub grid_limits: GridLimits,
    pub allow_feature_info: bool,
    /// Maximum number of animation frames one GetMap request may select.
    pub max_frames: usize,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            layer_limit: 1,
            layer_separator: "/".to_string(),
            grid_limits: GridLimits::default(),
            allow_feature_info: true,
            max_frames: 100,
        }
    }
}

/// A layer name resolved against the registry.
#[derive(Debug, Clone, Copy)]
pub struct LayerRef<'a> {
    pub name: &'a str,
    pub dataset: &'a Dataset,
    pub variable: &'a Variable,
}

/// Fail with `WrongVersion` unless VERSION is exactly 1.3.0.
pub fn check_version(params: &ParameterStore) -> WmsResult<()> {
    let version = params.get("version")?;
    if version != WMS_VERSION {
        return Err(WmsError::WrongVersion {
            expected: WMS_VERSION.to_string(),
            found: version.to_string(),
        });
    }
    Ok(())
}

/// Split a LAYERS (or QUERY_LAYERS) value and enforce the layer limit.
pub fn parse_layer_list(value: &str, limit: usize) -> WmsResult<Vec<&str>> {
    let layers: Vec<&str> = value.split(',').collect();
    if layers.len() > limit {
        return Err(WmsError::TooManyLayers {
            requested: layers.len(),
            limit,
        });
    }
    Ok(layers)
}

/// Find the dataset and variable named by `layer` (`dataset{sep}variable`).
///
/// Datasets that are not ready are treated as undefined.
pub fn resolve_layer<'a>(
    registry: &'a DatasetRegistry,
    layer: &'a str,
    separator: &str,
) -> WmsResult<LayerRef<'a>> {
    let not_defined = || WmsError::LayerNotDefined(layer.to_string());

    let (dataset_id, variable_id) = layer.split_once(separator).ok_or_else(not_defined)?;
    if variable_id.contains(separator) {
        return Err(not_defined());
    }
    let dataset = registry
        .get(dataset_id)
        .filter(|d| d.ready)
        .ok_or_else(not_defined)?;
    let variable = dataset.variable(variable_id).ok_or_else(not_defined)?;

    Ok(LayerRef {
        name: layer,
        dataset,
        variable,
    })
}

/// Check the exception format (default `XML`).
pub fn check_exception_format(params: &ParameterStore) -> WmsResult<()> {
    let format = params.get_or("exceptions", "XML");
    if !SUPPORTED_EXCEPTION_FORMATS.contains(&format) {
        return Err(WmsError::UnsupportedFormat(format.to_string()));
    }
    Ok(())
}

/// Build the output grid from BBOX, WIDTH, HEIGHT and CRS.
pub fn grid_from_params(params: &ParameterStore, limits: GridLimits) -> WmsResult<Grid> {
    Grid::from_params(
        params.get("bbox")?,
        params.get("width")?,
        params.get("height")?,
        params.get("crs")?,
        limits,
    )
}

/// A validated GetMap request.
#[derive(Debug, Clone)]
pub struct GetMapRequest<'a> {
    pub layer: LayerRef<'a>,
    /// Output MIME type.
    pub format: String,
    pub options: RenderOptions,
    pub dimensions: DimensionSelection,
    pub grid: Grid,
}

impl<'a> GetMapRequest<'a> {
    pub fn parse(
        params: &'a ParameterStore,
        registry: &'a DatasetRegistry,
        policy: &RequestPolicy,
    ) -> WmsResult<Self> {
        check_version(params)?;

        let layers = parse_layer_list(params.get("layers")?, policy.layer_limit)?;
        let layer = resolve_layer(registry, layers[0], &policy.layer_separator)?;

        check_styles(params.get("styles")?, layers.len())?;

        // '+' in MIME types arrives decoded as a space
        let format = params.get("format")?.replace(' ', "+");
        if !SUPPORTED_IMAGE_FORMATS.contains(&format.as_str()) {
            return Err(WmsError::UnsupportedFormat(format));
        }
        check_exception_format(params)?;

        let options = RenderOptions::parse(
            params.get_or("transparent", "false"),
            params.get_or("bgcolor", "0xFFFFFF"),
            params.get_or("scale", "0,0"),
            params.get_or("opacity", "100"),
        )?;

        let dimensions = DimensionSelection::resolve(layer.variable, params)?;
        let frames = dimensions.time_indices.len();
        if frames > policy.max_frames {
            return Err(WmsError::invalid_parameter(
                "time",
                format!(
                    "{} animation frames requested, at most {} are allowed",
                    frames, policy.max_frames
                ),
            ));
        }
        let grid = grid_from_params(params, policy.grid_limits)?;

        debug!(
            layer = %layer.name,
            crs = %grid.crs,
            width = grid.width,
            height = grid.height,
            frames = dimensions.time_indices.len(),
            "Validated GetMap request"
        );

        Ok(Self {
            layer,
            format,
            options,
            dimensions,
            grid,
        })
    }
}

/// One style per layer, or `STYLES=` for all defaults. Named styles are not
/// available.
fn check_styles(value: &str, layer_count: usize) -> WmsResult<()> {
    let styles: Vec<&str> = value.split(',').collect();
    if styles.len() != layer_count && styles != [""] {
        return Err(WmsError::StyleNotDefined(value.to_string()));
    }
    if let Some(style) = styles.iter().find(|s| !s.is_empty()) {
        return Err(WmsError::StyleNotDefined(style.to_string()));
    }
    Ok(())
}
