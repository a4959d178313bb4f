//! Application metrics collection and reporting.

use metrics::{counter, gauge, histogram};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::RwLock;

use storage::TileCacheStats;

/// Metrics collector for the WMS API.
///
/// Counters are mirrored into atomics so a snapshot can be taken without a
/// Prometheus recorder installed.
#[derive(Debug)]
pub struct MetricsCollector {
    /// Request counts
    pub wms_requests: AtomicU64,
    pub request_errors: AtomicU64,
    pub data_reads: AtomicU64,

    /// Render stats
    pub renders_total: AtomicU64,
    pub render_errors: AtomicU64,

    /// Timing stats
    read_times: RwLock<TimingStats>,
    render_times: RwLock<TimingStats>,

    /// Start time for uptime calculation
    start_time: Instant,
}

#[derive(Debug, Default)]
struct TimingStats {
    count: u64,
    total_us: u64,
    min_us: u64,
    max_us: u64,
    last_us: u64,
}

impl TimingStats {
    fn record(&mut self, duration_us: u64) {
        self.count += 1;
        self.total_us += duration_us;
        self.last_us = duration_us;
        if self.min_us == 0 || duration_us < self.min_us {
            self.min_us = duration_us;
        }
        if duration_us > self.max_us {
            self.max_us = duration_us;
        }
    }

    fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.total_us as f64 / self.count as f64) / 1000.0
        }
    }

    fn last_ms(&self) -> f64 {
        self.last_us as f64 / 1000.0
    }

    fn max_ms(&self) -> f64 {
        self.max_us as f64 / 1000.0
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            wms_requests: AtomicU64::new(0),
            request_errors: AtomicU64::new(0),
            data_reads: AtomicU64::new(0),
            renders_total: AtomicU64::new(0),
            render_errors: AtomicU64::new(0),
            read_times: RwLock::new(TimingStats::default()),
            render_times: RwLock::new(TimingStats::default()),
            start_time: Instant::now(),
        }
    }

    /// Record a WMS request
    pub fn record_wms_request(&self, request: &str) {
        self.wms_requests.fetch_add(1, Ordering::Relaxed);
        counter!("wms_requests_total", "request" => request.to_string()).increment(1);
    }

    /// Record a request that ended in an exception report
    pub fn record_request_error(&self, code: &'static str) {
        self.request_errors.fetch_add(1, Ordering::Relaxed);
        counter!("wms_request_errors_total", "code" => code).increment(1);
    }

    /// Record one call into the data reader
    pub async fn record_data_read(&self, duration_us: u64) {
        self.data_reads.fetch_add(1, Ordering::Relaxed);
        counter!("data_reads_total").increment(1);
        histogram!("data_read_duration_ms").record(duration_us as f64 / 1000.0);
        self.read_times.write().await.record(duration_us);
    }

    /// Record a render
    pub async fn record_render(&self, duration_us: u64, success: bool) {
        self.renders_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.render_errors.fetch_add(1, Ordering::Relaxed);
        }
        counter!("renders_total").increment(1);
        histogram!("render_duration_ms").record(duration_us as f64 / 1000.0);
        self.render_times.write().await.record(duration_us);
    }

    /// Publish tile cache statistics.
    ///
    /// The cache keeps its own counters, so they are published as absolute
    /// values rather than increments.
    pub fn record_tile_cache_stats(&self, stats: &TileCacheStats) {
        counter!("tile_cache_hits_total").absolute(stats.hits());
        counter!("tile_cache_misses_total").absolute(stats.misses());
        counter!("tile_cache_inserts_total").absolute(stats.inserts());
        counter!("tile_cache_wipes_total").absolute(stats.wipes());
        gauge!("tile_cache_entries").set(stats.entry_count() as f64);
        gauge!("tile_cache_hit_rate_percent").set(stats.hit_rate());
    }

    /// Get current metrics snapshot
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let read_times = self.read_times.read().await;
        let render_times = self.render_times.read().await;

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            wms_requests: self.wms_requests.load(Ordering::Relaxed),
            request_errors: self.request_errors.load(Ordering::Relaxed),
            data_reads: self.data_reads.load(Ordering::Relaxed),
            read_avg_ms: read_times.avg_ms(),
            read_last_ms: read_times.last_ms(),
            renders_total: self.renders_total.load(Ordering::Relaxed),
            render_errors: self.render_errors.load(Ordering::Relaxed),
            render_avg_ms: render_times.avg_ms(),
            render_max_ms: render_times.max_ms(),
        }
    }
}

/// Point-in-time copy of the collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub wms_requests: u64,
    pub request_errors: u64,
    pub data_reads: u64,
    pub read_avg_ms: f64,
    pub read_last_ms: f64,
    pub renders_total: u64,
    pub render_errors: u64,
    pub render_avg_ms: f64,
    pub render_max_ms: f64,
}

/// Timer guard for measuring operation duration.
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}
