//! Tick timing, event counters and logging setup.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Ticks between summary log lines.
pub const SUMMARY_INTERVAL: u64 = 1000;

/// Runtime counters for one universe.
pub struct Metrics {
    tick_count: AtomicU64,
    particle_count: AtomicU64,
    cluster_count: AtomicU64,
    total_tick_micros: AtomicU64,
    counters: Mutex<BTreeMap<String, u64>>,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("tick_count", &self.tick_count())
            .field("particle_count", &self.particle_count())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tick_count: AtomicU64::new(0),
            particle_count: AtomicU64::new(0),
            cluster_count: AtomicU64::new(0),
            total_tick_micros: AtomicU64::new(0),
            counters: Mutex::new(BTreeMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Records a completed tick. Logs a summary every [`SUMMARY_INTERVAL`] ticks.
    pub fn record_tick(&self, duration: Duration, particles: usize, clusters: usize) {
        let tick = self.tick_count.fetch_add(1, Ordering::Relaxed) + 1;
        self.particle_count.store(particles as u64, Ordering::Relaxed);
        self.cluster_count.store(clusters as u64, Ordering::Relaxed);
        self.total_tick_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);

        if tick % SUMMARY_INTERVAL == 0 {
            tracing::info!(
                tick,
                particles,
                clusters,
                duration_us = duration.as_micros() as u64,
                mean_tick_us = self.mean_tick_micros(),
                "Simulation tick"
            );
        }
    }

    /// Adds `amount` to a named counter.
    pub fn add(&self, name: &str, amount: u64) {
        if amount == 0 {
            return;
        }
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        *counters.entry(name.to_string()).or_insert(0) += amount;
    }

    pub fn increment_counter(&self, name: &str) {
        self.add(name, 1);
    }

    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.get(name).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn particle_count(&self) -> u64 {
        self.particle_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn cluster_count(&self) -> u64 {
        self.cluster_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn mean_tick_micros(&self) -> u64 {
        let ticks = self.tick_count();
        if ticks == 0 {
            0
        } else {
            self.total_tick_micros.load(Ordering::Relaxed) / ticks
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Installs a global fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .finish(),
    )
    .ok();
}
