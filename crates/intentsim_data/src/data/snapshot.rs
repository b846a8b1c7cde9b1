use super::event::{AnomalyEvent, InflationEvent};
use super::particle::{Charge, Particle, ParticleType};
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Particle counts per charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChargeCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl ChargeCounts {
    pub fn record(&mut self, charge: Charge) {
        match charge {
            Charge::Positive => self.positive += 1,
            Charge::Negative => self.negative += 1,
            Charge::Neutral => self.neutral += 1,
        }
    }

    #[must_use]
    pub fn get(&self, charge: Charge) -> usize {
        match charge {
            Charge::Positive => self.positive,
            Charge::Negative => self.negative,
            Charge::Neutral => self.neutral,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

/// Particle counts per species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TypeCounts {
    pub standard: usize,
    pub high_energy: usize,
    pub quantum: usize,
    pub composite: usize,
    pub adaptive: usize,
}

impl TypeCounts {
    pub fn record(&mut self, kind: ParticleType) {
        match kind {
            ParticleType::Standard => self.standard += 1,
            ParticleType::HighEnergy => self.high_energy += 1,
            ParticleType::Quantum => self.quantum += 1,
            ParticleType::Composite => self.composite += 1,
            ParticleType::Adaptive => self.adaptive += 1,
        }
    }
}

/// Per-tick statistics handed to external collaborators.
///
/// Field names are a stable contract; new fields may be appended but existing
/// ones must not be renamed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSnapshot {
    pub frame: u64,
    pub particle_count: usize,
    pub counts_by_charge: ChargeCounts,
    pub counts_by_type: TypeCounts,
    pub average_knowledge: f64,
    pub max_complexity: f64,
    pub average_intent_magnitude: f64,
    pub total_interactions: u64,
    pub complexity_index: f64,
    pub shannon_entropy: f64,
    pub spatial_entropy: f64,
    pub field_order_parameter: f64,
    pub cluster_entropy_delta: f64,
    pub information_density: f64,
    /// Heuristic compressibility proxy; not true Kolmogorov complexity.
    pub kolmogorov_complexity: f64,
    pub cluster_count: usize,
    pub average_cluster_size: f64,
    pub anomalies: Vec<AnomalyEvent>,
    pub inflation_events: Vec<InflationEvent>,
}

/// Persisted and exported engine state.
///
/// This exact shape is the round-trip contract for save/restore.
#[derive(
    Debug, Clone, PartialEq, Default, Serialize, Deserialize, Archive, RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    pub particles: Vec<Particle>,
    /// Field values indexed `[z][y][x]`.
    pub intent_field: Vec<Vec<Vec<f64>>>,
    pub interactions_count: u64,
    pub frame_count: u64,
    pub simulation_time: f64,
}
