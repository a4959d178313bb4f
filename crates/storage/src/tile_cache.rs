//! In-memory cache of data tiles.
//!
//! A tile is the array of values read for one layer component, output grid,
//! elevation and timestep, before any colouring. Entries have no individual
//! expiry: the whole cache is discarded at once by [`TileCache::wipe`], which
//! the [`crate::CacheWiper`] calls on a fixed period.
//!
//! ## Metrics
//!
//! The cache tracks hits, misses, inserts, wipes and the current entry
//! count in atomics that can be read without taking the map lock.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use wms_common::{Grid, Variable};

/// Identity of one cached data tile.
///
/// Floats are compared and hashed by bit pattern with `-0.0` folded into
/// `0.0`, so equality is reflexive and consistent with hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileCacheKey {
    pub crs: String,
    pub layer: String,
    pub bbox: [f64; 4],
    pub width: usize,
    pub height: usize,
    /// Canonical elevation string, empty when none was requested.
    pub elevation: String,
    /// Timestep in seconds since the epoch, `0.0` without a time axis.
    pub time: f64,
}

impl TileCacheKey {
    /// Build the key for one component of one frame.
    ///
    /// `layer` names the array actually read (`dataset/component`), while
    /// `variable` supplies the time axis the frame index refers to.
    pub fn new(
        layer: &str,
        grid: &Grid,
        elevation: &str,
        variable: &Variable,
        time_index: usize,
    ) -> Self {
        Self {
            crs: grid.crs.to_string(),
            layer: layer.to_string(),
            bbox: grid.bbox.to_array(),
            width: grid.width,
            height: grid.height,
            elevation: canonical_elevation(elevation),
            time: variable.time_at(time_index),
        }
    }

    fn float_bits(&self) -> [u64; 5] {
        [
            canonical_bits(self.bbox[0]),
            canonical_bits(self.bbox[1]),
            canonical_bits(self.bbox[2]),
            canonical_bits(self.bbox[3]),
            canonical_bits(self.time),
        ]
    }
}

impl PartialEq for TileCacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.crs == other.crs
            && self.layer == other.layer
            && self.width == other.width
            && self.height == other.height
            && self.elevation == other.elevation
            && self.float_bits() == other.float_bits()
    }
}

impl Eq for TileCacheKey {}

impl Hash for TileCacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.crs.hash(state);
        self.layer.hash(state);
        self.float_bits().hash(state);
        self.width.hash(state);
        self.height.hash(state);
        self.elevation.hash(state);
    }
}

impl fmt::Display for TileCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [min_x, min_y, max_x, max_y] = self.bbox;
        write!(
            f,
            "{}:{}:{},{},{},{}:{}x{}:{}:{}",
            self.crs,
            self.layer,
            min_x,
            min_y,
            max_x,
            max_y,
            self.width,
            self.height,
            self.elevation,
            self.time
        )
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// Canonical text form of an elevation value.
///
/// `"100"`, `"100.0"` and `"1.0e2"` all become `"100"`; `"-0"` becomes `"0"`.
/// Empty input stays empty, and text that is not a number is kept trimmed.
pub fn canonical_elevation(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    match raw.parse::<f64>() {
        Ok(v) if v == 0.0 => "0".to_string(),
        Ok(v) => v.to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Statistics for the tile cache.
///
/// All fields are atomic for lock-free reads from metrics endpoints.
#[derive(Debug, Default)]
pub struct TileCacheStats {
    /// Total cache hits
    pub hits: AtomicU64,
    /// Total cache misses
    pub misses: AtomicU64,
    /// Total entries stored
    pub inserts: AtomicU64,
    /// Number of full wipes
    pub wipes: AtomicU64,
    /// Current number of entries in cache
    pub entry_count: AtomicU64,
}

impl TileCacheStats {
    /// Calculate cache hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    pub fn wipes(&self) -> u64 {
        self.wipes.load(Ordering::Relaxed)
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count.load(Ordering::Relaxed)
    }
}

/// Shared tile store.
///
/// One `RwLock` guards the whole map. A wipe swaps in an empty map under the
/// write lock, so readers see either every entry or none. The lock cannot be
/// poisoned, so lookups never fail; an absent entry is simply a miss.
pub struct TileCache {
    entries: RwLock<HashMap<TileCacheKey, Arc<Vec<f32>>>>,
    stats: TileCacheStats,
    /// Seconds since the epoch of the last wipe (f64 bits).
    last_wiped: AtomicU64,
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TileCache {
    /// Create an empty cache. The wipe time starts at the creation time.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stats: TileCacheStats::default(),
            last_wiped: AtomicU64::new(now_secs().to_bits()),
        }
    }

    /// Look up a tile, counting the hit or miss.
    pub async fn get(&self, key: &TileCacheKey) -> Option<Arc<Vec<f32>>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(data) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(data))
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a tile. A later `put` for an equal key replaces it.
    pub async fn put(&self, key: TileCacheKey, data: Arc<Vec<f32>>) {
        let mut entries = self.entries.write().await;
        debug!(key = %key, values = data.len(), "Caching tile");
        entries.insert(key, data);
        self.stats.inserts.fetch_add(1, Ordering::Relaxed);
        self.stats
            .entry_count
            .store(entries.len() as u64, Ordering::Relaxed);
    }

    /// Discard every entry atomically. Returns how many were dropped.
    pub async fn wipe(&self) -> usize {
        let old = {
            let mut entries = self.entries.write().await;
            self.stats.entry_count.store(0, Ordering::Relaxed);
            std::mem::take(&mut *entries)
        };
        self.stats.wipes.fetch_add(1, Ordering::Relaxed);
        self.mark_wiped(now_secs());

        let dropped = old.len();
        info!(entries = dropped, "Wiped tile cache");
        dropped
    }

    /// Number of cached tiles.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn stats(&self) -> &TileCacheStats {
        &self.stats
    }

    /// Seconds since the epoch of the last wipe (or of creation).
    ///
    /// Never decreases, even if the wall clock steps backwards.
    pub fn time_last_wiped(&self) -> f64 {
        f64::from_bits(self.last_wiped.load(Ordering::Acquire))
    }

    fn mark_wiped(&self, secs: f64) {
        // Bit patterns of non-negative floats order like the floats themselves
        self.last_wiped
            .fetch_max(secs.max(0.0).to_bits(), Ordering::AcqRel);
    }
}

fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use wms_common::{BoundingBox, CrsCode, GridLimits};

    fn grid() -> Grid {
        Grid::from_parts(
            CrsCode::Crs84,
            BoundingBox::new(-180.0, -90.0, 180.0, 90.0),
            256,
            128,
            GridLimits::default(),
        )
        .unwrap()
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

    fn key(elevation: &str, time_index: usize) -> TileCacheKey {
        let var = variable(vec![0.0, 3600.0]);
        TileCacheKey::new("ocean/sst", &grid(), elevation, &var, time_index)
    }

    fn hash_of(key: &TileCacheKey) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_canonical_elevation() {
        assert_eq!(canonical_elevation(""), "");
        assert_eq!(canonical_elevation("100"), "100");
        assert_eq!(canonical_elevation("100.0"), "100");
        assert_eq!(canonical_elevation("1.0e2"), "100");
        assert_eq!(canonical_elevation("-0"), "0");
        assert_eq!(canonical_elevation("-5.50"), "-5.5");
    }

    #[test]
    fn test_equivalent_elevations_give_equal_keys() {
        let a = key("100", 1);
        let b = key("100.0", 1);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(key("100", 1), key("101", 1));
    }

    #[test]
    fn test_key_time_field() {
        assert_eq!(key("", 1).time, 3600.0);
        assert_ne!(key("", 0), key("", 1));

        let no_axis = variable(vec![]);
        let k = TileCacheKey::new("ocean/sst", &grid(), "", &no_axis, 0);
        assert_eq!(k.time, 0.0);
    }

    #[test]
    fn test_negative_zero_matches_zero() {
        let mut a = key("", 0);
        let mut b = key("", 0);
        a.bbox[0] = 0.0;
        b.bbox[0] = -0.0;
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(
            key("10.0", 1).to_string(),
            "CRS:84:ocean/sst:-180,-90,180,90:256x128:10:3600"
        );
    }

    #[tokio::test]
    async fn test_cache_basic_operations() {
        let cache = TileCache::new();
        let k = key("", 1);
        let data = Arc::new(vec![1.0, 2.0, 3.0]);

        assert!(cache.get(&k).await.is_none());
        cache.put(k.clone(), Arc::clone(&data)).await;
        assert_eq!(cache.get(&k).await, Some(data));

        let stats = cache.stats();
        assert_eq!(stats.hits(), 1);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.inserts(), 1);
        assert_eq!(stats.entry_count(), 1);
        assert!((stats.hit_rate() - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_wipe_discards_everything() {
        let cache = TileCache::new();
        cache.put(key("", 0), Arc::new(vec![0.0])).await;
        cache.put(key("", 1), Arc::new(vec![1.0])).await;
        assert_eq!(cache.len().await, 2);

        let before = cache.time_last_wiped();
        assert_eq!(cache.wipe().await, 2);
        assert!(cache.is_empty().await);
        assert!(cache.get(&key("", 0)).await.is_none());
        assert_eq!(cache.stats().wipes(), 1);
        assert_eq!(cache.stats().entry_count(), 0);
        assert!(cache.time_last_wiped() >= before);
    }

    #[tokio::test]
    async fn test_put_after_wipe_repopulates() {
        let cache = TileCache::new();
        let k = key("", 0);
        assert!(cache.get(&k).await.is_none());
        cache.wipe().await;
        cache.put(k.clone(), Arc::new(vec![4.0])).await;
        assert_eq!(cache.get(&k).await.as_deref(), Some(&vec![4.0]));
    }

    #[test]
    fn test_time_last_wiped_never_decreases() {
        let cache = TileCache::new();
        let start = cache.time_last_wiped();
        cache.mark_wiped(start - 1000.0);
        assert_eq!(cache.time_last_wiped(), start);
        cache.mark_wiped(start + 1.0);
        assert_eq!(cache.time_last_wiped(), start + 1.0);
    }
}
