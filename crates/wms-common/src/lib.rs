//! Common types and utilities shared across the gridded-wms crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod grid;
pub mod layer;
pub mod style;
pub mod time;

pub use bbox::BoundingBox;
pub use crs::{CrsCode, Projection};
pub use error::{WmsError, WmsResult};
pub use grid::{is_fill, Grid, GridLimits, FILL_VALUE};
pub use layer::{Dataset, DatasetRegistry, Variable};
pub use style::RenderOptions;
