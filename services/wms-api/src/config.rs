//! Server configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use storage::CacheWiperConfig;
use wms_common::GridLimits;
use wms_protocol::{RequestPolicy, ServiceInfo};

/// Default location of the dataset registry.
pub const DEFAULT_DATASETS_CONFIG: &str = "config/datasets.yaml";

/// Settings for one server process.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub title: String,
    pub abstract_text: String,
    /// Comma-separated keywords for the capabilities document.
    pub keywords: String,
    /// Public URL of the service provider.
    pub url: String,
    pub max_image_width: usize,
    pub max_image_height: usize,
    pub allow_feature_info: bool,
    pub layer_limit: usize,
    pub layer_separator: String,
    /// Most animation frames a single GetMap may select.
    pub max_frames: usize,
    pub cache_wipe_interval: Duration,
    pub datasets_config: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            title: "Gridded data WMS".to_string(),
            abstract_text: "Web Map Service for gridded environmental data".to_string(),
            keywords: "WMS,gridded data".to_string(),
            url: "http://localhost:8080".to_string(),
            max_image_width: 1000,
            max_image_height: 1000,
            allow_feature_info: true,
            layer_limit: 1,
            layer_separator: "/".to_string(),
            max_frames: 100,
            cache_wipe_interval: CacheWiperConfig::default().interval,
            datasets_config: PathBuf::from(DEFAULT_DATASETS_CONFIG),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            title: env::var("WMS_TITLE").unwrap_or(defaults.title),
            abstract_text: env::var("WMS_ABSTRACT").unwrap_or(defaults.abstract_text),
            keywords: env::var("WMS_KEYWORDS").unwrap_or(defaults.keywords),
            url: env::var("WMS_URL").unwrap_or(defaults.url),
            max_image_width: parse_var("WMS_MAX_IMAGE_WIDTH").unwrap_or(defaults.max_image_width),
            max_image_height: parse_var("WMS_MAX_IMAGE_HEIGHT")
                .unwrap_or(defaults.max_image_height),
            allow_feature_info: parse_var("WMS_ALLOW_FEATURE_INFO")
                .unwrap_or(defaults.allow_feature_info),
            layer_limit: parse_var::<usize>("WMS_LAYER_LIMIT")
                .filter(|&n| n > 0)
                .unwrap_or(defaults.layer_limit),
            layer_separator: env::var("WMS_LAYER_SEPARATOR")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.layer_separator),
            max_frames: parse_var::<usize>("WMS_MAX_FRAMES")
                .filter(|&n| n > 0)
                .unwrap_or(defaults.max_frames),
            cache_wipe_interval: CacheWiperConfig::from_env().interval,
            datasets_config: env::var("DATASETS_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.datasets_config),
        }
    }

    pub fn request_policy(&self) -> RequestPolicy {
        RequestPolicy {
            layer_limit: self.layer_limit,
            layer_separator: self.layer_separator.clone(),
            grid_limits: GridLimits {
                max_width: self.max_image_width,
                max_height: self.max_image_height,
            },
            allow_feature_info: self.allow_feature_info,
            max_frames: self.max_frames,
        }
    }

    pub fn service_info(&self) -> ServiceInfo {
        ServiceInfo {
            title: self.title.clone(),
            abstract_text: self.abstract_text.clone(),
            keywords: self.keywords.clone(),
            url: self.url.clone(),
        }
    }

    pub fn wiper_config(&self) -> CacheWiperConfig {
        CacheWiperConfig {
            interval: self.cache_wipe_interval,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
