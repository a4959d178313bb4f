//! OGC WMS 1.3.0 protocol layer.
//!
//! Parses query parameters, resolves layer names and dimension selectors
//! against the dataset registry, and produces the XML documents of the
//! protocol (capabilities, feature info, exception reports).

pub mod capabilities;
pub mod dimension;
pub mod exceptions;
pub mod getfeatureinfo;
pub mod getmap;
pub mod params;

pub use capabilities::{check_update_sequence, CapabilitiesBuilder, ServiceInfo};
pub use dimension::{nearest_time_index, DimensionSelection};
pub use exceptions::{exception_report, wms_exception, EXCEPTION_MIME};
pub use getfeatureinfo::{FeatureInfoResponse, GetFeatureInfoRequest};
pub use getmap::{GetMapRequest, LayerRef, RequestPolicy, WMS_VERSION};
pub use params::ParameterStore;
