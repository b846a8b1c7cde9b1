//! The simulation clock.
//!
//! A [`Universe`] owns every piece of mutable engine state: the intent field,
//! the particle store, the RNG and the detector/controller state carried from
//! one tick to the next. Components never talk to each other directly; each
//! pass in [`Universe::tick`] hands them what they need and stores what they
//! return.

use crate::config::{Domain, SimulationConfig};
use crate::field::IntentField;
use crate::lifecycle::SpawnOptions;
use crate::spatial_hash::{SpatialHash, INDEX_CELL_SIZE};
use crate::store::ParticleStore;
use crate::systems::anomaly::AnomalyDetector;
use crate::systems::cluster::{Cluster, ClusterDetection};
use crate::systems::inflation::InflationController;
use crate::telemetry::Metrics;
use intentsim_data::{AnomalyEvent, InflationEvent, Particle, SimulationSnapshot};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashSet, VecDeque};

pub mod init;
pub mod persist;
pub mod update;

/// Per-tick RNG seed for deterministic mode, a SHA-256 of seed and frame.
pub(crate) fn tick_seed(seed: u64, frame: u64) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(frame.to_le_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

#[derive(Debug)]
pub struct Universe {
    pub(crate) config: SimulationConfig,
    /// Domain as configured; `domain` differs from it only while inflated.
    pub(crate) base_domain: Domain,
    pub(crate) domain: Domain,
    pub(crate) field: IntentField,
    pub(crate) store: ParticleStore,
    pub(crate) rng: ChaCha8Rng,

    pub(crate) frame: u64,
    pub(crate) simulation_time: f64,
    pub(crate) interactions_count: u64,
    pub(crate) running: bool,

    pub(crate) snapshot: SimulationSnapshot,
    pub(crate) detection: ClusterDetection,
    pub(crate) anomaly_detector: AnomalyDetector,
    pub(crate) inflation: InflationController,
    pub(crate) anomalies: VecDeque<AnomalyEvent>,
    pub(crate) inflation_events: Vec<InflationEvent>,
    /// Entity ids already announced, so each emerges once.
    pub(crate) promoted: HashSet<String>,

    pub(crate) spatial_hash: SpatialHash,
    pub(crate) metrics: Metrics,
}

impl Universe {
    fn assemble(config: SimulationConfig, field: IntentField, store: ParticleStore, rng: ChaCha8Rng) -> Self {
        let domain = config.domain;
        Self {
            base_domain: domain,
            domain,
            field,
            store,
            rng,
            frame: 0,
            simulation_time: 0.0,
            interactions_count: 0,
            running: true,
            snapshot: SimulationSnapshot::default(),
            detection: ClusterDetection::default(),
            anomaly_detector: AnomalyDetector::new(),
            inflation: InflationController::new(),
            anomalies: VecDeque::new(),
            inflation_events: Vec::new(),
            promoted: HashSet::new(),
            spatial_hash: SpatialHash::new(INDEX_CELL_SIZE, domain.width, domain.height, domain.depth),
            metrics: Metrics::new(),
            config,
        }
    }

    pub(crate) fn spawn_options(&self, post_inflation: bool) -> SpawnOptions {
        SpawnOptions {
            tuning: self.config.tuning.spawn.clone(),
            energy_conservation: self.config.energy_conservation,
            adaptive: self.config.use_adaptive_particles,
            post_inflation,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current domain, expanded while an inflation is active.
    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    #[must_use]
    pub fn field(&self) -> &IntentField {
        &self.field
    }

    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        self.store.as_slice()
    }

    /// Clusters found on the most recent tick.
    #[must_use]
    pub fn clusters(&self) -> &[Cluster] {
        &self.detection.clusters
    }

    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[must_use]
    pub fn interactions_count(&self) -> u64 {
        self.interactions_count
    }

    #[must_use]
    pub fn is_inflated(&self) -> bool {
        self.inflation.is_inflated()
    }

    /// Inflations that have started and since expired.
    #[must_use]
    pub fn inflations_completed(&self) -> u64 {
        self.inflation.completed()
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
