//! GetMap and GetFeatureInfo orchestration.
//!
//! The pipeline validates a request, fetches every data tile it needs
//! (through the [`TileCache`], falling back to the [`DataReader`]) and hands
//! the frames to a [`FrameRenderer`]. It never sees HTTP types.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use renderer::{BoxFillRenderer, RenderedImage};
use storage::{TileCache, TileCacheKey};
use wms_common::time::seconds_to_iso8601;
use wms_common::{
    is_fill, Dataset, DatasetRegistry, Grid, RenderOptions, Variable, WmsError, WmsResult,
    FILL_VALUE,
};
use wms_protocol::{
    FeatureInfoResponse, GetFeatureInfoRequest, GetMapRequest, ParameterStore, RequestPolicy,
};

use crate::metrics::{MetricsCollector, Timer};

/// Source of data arrays.
#[async_trait]
pub trait DataReader: Send + Sync {
    /// Read one variable at one time index and elevation onto a lat/lon
    /// lattice.
    ///
    /// Returns `lat_values.len() * lon_values.len()` values in row-major
    /// order (one row per latitude), with `fill_value` where there is no data.
    #[allow(clippy::too_many_arguments)]
    async fn read(
        &self,
        dataset: &Dataset,
        variable_id: &str,
        time_index: usize,
        elevation: &str,
        lat_values: &[f64],
        lon_values: &[f64],
        fill_value: f32,
    ) -> WmsResult<Vec<f32>>;
}

/// Turns data frames into an encoded image.
///
/// Frames are shared: a timestep repeated in the request, or a scalar tile
/// still held by the cache, is passed without copying.
pub trait FrameRenderer: Send + Sync {
    fn render(
        &self,
        frames: &[Arc<Vec<f32>>],
        labels: &[String],
        width: usize,
        height: usize,
        options: &RenderOptions,
        mime: &str,
    ) -> WmsResult<RenderedImage>;
}

impl FrameRenderer for BoxFillRenderer {
    fn render(
        &self,
        frames: &[Arc<Vec<f32>>],
        _labels: &[String],
        width: usize,
        height: usize,
        options: &RenderOptions,
        mime: &str,
    ) -> WmsResult<RenderedImage> {
        BoxFillRenderer::render(self, frames, width, height, options, mime)
            .map_err(|e| WmsError::RenderError(e.to_string()))
    }
}

/// Request orchestrator shared by all handlers.
pub struct MapRequestPipeline {
    registry: Arc<DatasetRegistry>,
    policy: RequestPolicy,
    cache: Arc<TileCache>,
    reader: Arc<dyn DataReader>,
    renderer: Arc<dyn FrameRenderer>,
    metrics: Arc<MetricsCollector>,
}

/// Where one tile is read from and how it is keyed.
struct TileSource<'a> {
    dataset: &'a Dataset,
    /// Variable whose time axis `time_index` refers to.
    variable: &'a Variable,
    /// Array actually read (the variable itself or a vector component).
    component: &'a str,
    time_index: usize,
    elevation: &'a str,
}

impl MapRequestPipeline {
    pub fn new(
        registry: Arc<DatasetRegistry>,
        policy: RequestPolicy,
        cache: Arc<TileCache>,
        reader: Arc<dyn DataReader>,
        renderer: Arc<dyn FrameRenderer>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            registry,
            policy,
            cache,
            reader,
            renderer,
            metrics,
        }
    }

    pub fn registry(&self) -> &DatasetRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &RequestPolicy {
        &self.policy
    }

    /// Handle a GetMap request.
    #[instrument(skip_all)]
    pub async fn get_map(&self, params: &ParameterStore) -> WmsResult<RenderedImage> {
        let request = GetMapRequest::parse(params, &self.registry, &self.policy)?;
        let layer = request.layer;
        let variable = layer.variable;

        if request.dimensions.time_indices.is_empty() {
            return Err(WmsError::invalid_dimension_value(
                "time",
                params.get_or("time", ""),
            ));
        }

        let grid = &request.grid;
        let lat_values = grid.lat_values();
        let lon_values = grid.lon_values();
        let components = variable.components();

        let mut frames = Vec::with_capacity(request.dimensions.time_indices.len());
        let mut labels = Vec::with_capacity(frames.capacity());
        for &time_index in &request.dimensions.time_indices {
            let mut parts = Vec::with_capacity(components.len());
            for &component in &components {
                let source = TileSource {
                    dataset: layer.dataset,
                    variable,
                    component,
                    time_index,
                    elevation: &request.dimensions.elevation,
                };
                parts.push(self.fetch_tile(&source, grid, &lat_values, &lon_values).await?);
            }
            frames.push(combine_components(&parts));
            labels.push(frame_label(variable, time_index));
        }
        self.metrics.record_tile_cache_stats(self.cache.stats());

        debug!(
            layer = %layer.name,
            frames = frames.len(),
            "Rendering frames"
        );
        let timer = Timer::start();
        let result = self.renderer.render(
            &frames,
            &labels,
            grid.width,
            grid.height,
            &request.options,
            &request.format,
        );
        self.metrics
            .record_render(timer.elapsed_us(), result.is_ok())
            .await;
        result
    }

    /// Handle a GetFeatureInfo request.
    #[instrument(skip_all)]
    pub async fn get_feature_info(&self, params: &ParameterStore) -> WmsResult<FeatureInfoResponse> {
        let request = GetFeatureInfoRequest::parse(params, &self.registry, &self.policy)?;
        let variable = request.layer.variable;

        let mut parts = Vec::new();
        for component in variable.components() {
            let timer = Timer::start();
            let data = self
                .reader
                .read(
                    request.layer.dataset,
                    component,
                    request.time_index,
                    &request.elevation,
                    &[request.latitude],
                    &[request.longitude],
                    FILL_VALUE,
                )
                .await?;
            self.metrics.record_data_read(timer.elapsed_us()).await;
            check_length(&data, 1, component)?;
            parts.push(Arc::new(data));
        }

        let value = combine_components(&parts)
            .first()
            .copied()
            .filter(|v| !is_fill(*v));
        Ok(FeatureInfoResponse {
            longitude: request.longitude,
            latitude: request.latitude,
            value,
        })
    }

    /// Cached tile for one component, reading it on a miss.
    ///
    /// No cache lock is held while the reader runs.
    async fn fetch_tile(
        &self,
        source: &TileSource<'_>,
        grid: &Grid,
        lat_values: &[f64],
        lon_values: &[f64],
    ) -> WmsResult<Arc<Vec<f32>>> {
        let layer_name = format!(
            "{}{}{}",
            source.dataset.id, self.policy.layer_separator, source.component
        );
        let key = TileCacheKey::new(
            &layer_name,
            grid,
            source.elevation,
            source.variable,
            source.time_index,
        );
        if let Some(data) = self.cache.get(&key).await {
            debug!(key = %key, "Tile cache hit");
            return Ok(data);
        }

        let timer = Timer::start();
        let data = self
            .reader
            .read(
                source.dataset,
                source.component,
                source.time_index,
                source.elevation,
                lat_values,
                lon_values,
                FILL_VALUE,
            )
            .await
            .inspect_err(|e| warn!(key = %key, error = %e, "Data read failed"))?;
        self.metrics.record_data_read(timer.elapsed_us()).await;
        check_length(&data, grid.width * grid.height, source.component)?;

        let data = Arc::new(data);
        self.cache.put(key, Arc::clone(&data)).await;
        Ok(data)
    }
}

fn check_length(data: &[f32], expected: usize, component: &str) -> WmsResult<()> {
    if data.len() != expected {
        return Err(WmsError::DataReadError(format!(
            "reader returned {} values for {}, expected {}",
            data.len(),
            component,
            expected
        )));
    }
    Ok(())
}

/// One frame from its component tiles: the tile itself for scalars, the
/// magnitude for east/north pairs.
fn combine_components(parts: &[Arc<Vec<f32>>]) -> Arc<Vec<f32>> {
    match parts {
        [scalar] => Arc::clone(scalar),
        [east, north] => Arc::new(
            east.iter()
                .zip(north.iter())
                .map(|(&u, &v)| {
                    if is_fill(u) || is_fill(v) {
                        FILL_VALUE
                    } else {
                        u.hypot(v)
                    }
                })
                .collect(),
        ),
        _ => Arc::new(Vec::new()),
    }
}

/// Timestamp label of a frame, empty when the variable has no time axis.
fn frame_label(variable: &Variable, time_index: usize) -> String {
    if variable.has_time_axis() {
        seconds_to_iso8601(variable.time_at(time_index))
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_magnitude() {
        let east = Arc::new(vec![3.0, FILL_VALUE, -6.0]);
        let north = Arc::new(vec![4.0, 1.0, 8.0]);
        let frame = combine_components(&[east, north]);
        assert_eq!(frame[0], 5.0);
        assert!(is_fill(frame[1]));
        assert_eq!(frame[2], 10.0);
    }

    #[test]
    fn test_scalar_frame_shares_the_tile() {
        let tile = Arc::new(vec![1.0, 2.0]);
        let frame = combine_components(&[Arc::clone(&tile)]);
        assert!(Arc::ptr_eq(&frame, &tile));
    }
}
