//! Dataset and variable metadata, and the registry that serves it.
//!
//! A layer is addressed as `{dataset_id}{separator}{variable_id}`, e.g.
//! `ocean/sst`. Metadata is loaded once from YAML and is read-only afterwards.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::time::parse_iso8601_seconds;
use crate::{BoundingBox, WmsError, WmsResult};

/// Metadata for one variable of a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, rename = "abstract")]
    pub abstract_text: String,

    #[serde(default)]
    pub units: String,

    /// Geographic extent (lon/lat degrees).
    pub bbox: BoundingBox,

    /// Vertical axis values, in `zunits`.
    #[serde(default)]
    pub zvalues: Option<Vec<f64>>,

    #[serde(default)]
    pub zunits: String,

    /// True when z increases upwards.
    #[serde(default = "default_true")]
    pub z_positive: bool,

    /// Time axis, seconds since the epoch, strictly ascending.
    ///
    /// YAML may give each entry as a number of seconds or an ISO 8601 string.
    #[serde(default, deserialize_with = "deserialize_tvalues")]
    pub tvalues: Vec<f64>,

    /// Eastward component variable id, for vector quantities.
    #[serde(default)]
    pub east_component: Option<String>,

    /// Northward component variable id, for vector quantities.
    #[serde(default)]
    pub north_component: Option<String>,

    /// Columns of the stored lattice (raw grid reader).
    #[serde(default)]
    pub nx: usize,

    /// Rows of the stored lattice (raw grid reader).
    #[serde(default)]
    pub ny: usize,
}

fn default_true() -> bool {
    true
}

impl Variable {
    pub fn is_vector(&self) -> bool {
        self.east_component.is_some() && self.north_component.is_some()
    }

    pub fn has_time_axis(&self) -> bool {
        !self.tvalues.is_empty()
    }

    /// Ids of the arrays that make up one frame of this variable:
    /// the variable itself for scalars, east then north for vectors.
    pub fn components(&self) -> Vec<&str> {
        match (&self.east_component, &self.north_component) {
            (Some(east), Some(north)) => vec![east.as_str(), north.as_str()],
            _ => vec![self.id.as_str()],
        }
    }

    /// Timestamp of a time index, or `0.0` when the variable has no time axis.
    pub fn time_at(&self, index: usize) -> f64 {
        self.tvalues.get(index).copied().unwrap_or(0.0)
    }
}

/// A dataset: a set of variables stored at one location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Where the reader finds the data (a directory for the raw grid reader).
    pub location: String,

    /// True if GetFeatureInfo is enabled for this dataset.
    #[serde(default)]
    pub queryable: bool,

    /// Datasets that are not ready are hidden from requests and capabilities.
    #[serde(default = "default_true")]
    pub ready: bool,

    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl Dataset {
    pub fn variable(&self, id: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.id == id)
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    datasets: Vec<Dataset>,
}

/// All datasets known to the server, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct DatasetRegistry {
    datasets: HashMap<String, Dataset>,
    order: Vec<String>,
}

impl DatasetRegistry {
    pub fn new(datasets: Vec<Dataset>) -> WmsResult<Self> {
        let mut registry = Self::default();
        for dataset in datasets {
            validate_dataset(&dataset)?;
            if registry.datasets.contains_key(&dataset.id) {
                return Err(WmsError::ConfigError(format!(
                    "duplicate dataset id '{}'",
                    dataset.id
                )));
            }
            debug!(
                dataset = %dataset.id,
                variables = dataset.variables.len(),
                ready = dataset.ready,
                "Registered dataset"
            );
            registry.order.push(dataset.id.clone());
            registry.datasets.insert(dataset.id.clone(), dataset);
        }
        Ok(registry)
    }

    pub fn from_yaml_str(yaml: &str) -> WmsResult<Self> {
        let file: RegistryFile = serde_yaml::from_str(yaml)?;
        Self::new(file.datasets)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> WmsResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            WmsError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let registry = Self::from_yaml_str(&yaml)?;
        info!(
            path = %path.display(),
            datasets = registry.len(),
            "Loaded dataset registry"
        );
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&Dataset> {
        self.datasets.get(id)
    }

    /// Datasets in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &Dataset> {
        self.order.iter().filter_map(|id| self.datasets.get(id))
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

fn validate_dataset(dataset: &Dataset) -> WmsResult<()> {
    for var in &dataset.variables {
        if var.tvalues.windows(2).any(|w| w[0] >= w[1]) {
            return Err(WmsError::ConfigError(format!(
                "{}/{}: tvalues must be strictly ascending",
                dataset.id, var.id
            )));
        }
        if var.east_component.is_some() != var.north_component.is_some() {
            return Err(WmsError::ConfigError(format!(
                "{}/{}: vector variables need both east_component and north_component",
                dataset.id, var.id
            )));
        }
        for component in var.components() {
            if component != var.id && dataset.variable(component).is_none() {
                return Err(WmsError::ConfigError(format!(
                    "{}/{}: unknown component variable '{}'",
                    dataset.id, var.id, component
                )));
            }
        }
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimeValue {
    Seconds(f64),
    Iso(String),
}

fn deserialize_tvalues<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<TimeValue> = Vec::deserialize(deserializer)?;
    raw.into_iter()
        .map(|value| match value {
            TimeValue::Seconds(s) => Ok(s),
            TimeValue::Iso(s) => parse_iso8601_seconds(&s).map_err(serde::de::Error::custom),
        })
        .collect()
}
