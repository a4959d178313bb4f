//! Application state and shared resources.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use renderer::BoxFillRenderer;
use storage::TileCache;
use wms_common::DatasetRegistry;

use crate::config::ServerConfig;
use crate::metrics::MetricsCollector;
use crate::pipeline::{DataReader, FrameRenderer, MapRequestPipeline};
use crate::reader::RawGridReader;

/// Shared application state.
///
/// The tile cache is owned here and shared with the wipe task; there is no
/// global cache.
pub struct AppState {
    pub config: ServerConfig,
    pub cache: Arc<TileCache>,
    pub pipeline: MapRequestPipeline,
    pub metrics: Arc<MetricsCollector>,
}

impl AppState {
    /// Build state from explicit collaborators.
    pub fn new(
        config: ServerConfig,
        registry: DatasetRegistry,
        reader: Arc<dyn DataReader>,
        renderer: Arc<dyn FrameRenderer>,
    ) -> Self {
        let cache = Arc::new(TileCache::new());
        let metrics = Arc::new(MetricsCollector::new());
        let pipeline = MapRequestPipeline::new(
            Arc::new(registry),
            config.request_policy(),
            Arc::clone(&cache),
            reader,
            renderer,
            Arc::clone(&metrics),
        );
        Self {
            config,
            cache,
            pipeline,
            metrics,
        }
    }

    /// Load the dataset registry named by the config and wire up the raw
    /// grid reader and box-fill renderer.
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let registry = DatasetRegistry::from_yaml_file(&config.datasets_config).with_context(|| {
            format!(
                "loading dataset registry from {}",
                config.datasets_config.display()
            )
        })?;
        info!(
            datasets = registry.len(),
            path = %config.datasets_config.display(),
            "Loaded dataset registry"
        );
        Ok(Self::new(
            config,
            registry,
            Arc::new(RawGridReader::new()),
            Arc::new(BoxFillRenderer::new()),
        ))
    }

    /// The capabilities update sequence: time of the last cache wipe.
    pub fn last_update_secs(&self) -> f64 {
        self.cache.time_last_wiped()
    }

    /// URL advertised for every operation in the capabilities document.
    pub fn endpoint_url(&self) -> String {
        format!("{}/wms", self.config.url.trim_end_matches('/'))
    }
}
