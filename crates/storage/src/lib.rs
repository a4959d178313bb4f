//! Tile storage for the gridded-wms services.
//!
//! Provides:
//! - [`TileCache`]: shared in-memory store of data tiles keyed by [`TileCacheKey`]
//! - [`CacheWiper`]: background task that wipes the cache on a fixed period

pub mod cache_wiper;
pub mod tile_cache;

pub use cache_wiper::{CacheWiper, CacheWiperConfig};
pub use tile_cache::{canonical_elevation, TileCache, TileCacheKey, TileCacheStats};
