//! Configuration management for simulation parameters.
//!
//! [`SimulationConfig`] maps to a `config.toml` file. The top level carries the
//! knobs an operator is expected to touch; every "personality" constant of the
//! model (probabilities, multipliers, thresholds) lives in [`Tuning`] so that
//! tests can force them and nothing is buried in the systems.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! max_particles = 200
//! fluctuation_rate = 0.01
//! learning_rate = 0.1
//! particle_creation_rate = 0.3
//! energy_conservation = false
//! probabilistic_intent = true
//! boundary_mode = "bounce"
//! seed = 42
//! deterministic = true
//!
//! [field]
//! width = 30
//! height = 20
//! depth = 5
//!
//! [tuning.field]
//! wave_probability = 0.0
//! ```

use crate::error::{Result, SimError};
use crate::spatial_hash::{SpatialHash, INDEX_CELL_SIZE, MAX_INDEX_CELLS};
use serde::{Deserialize, Serialize};

macro_rules! ensure_config {
    ($cond:expr, $($msg:tt)+) => {
        if !($cond) {
            return Err(SimError::invalid_config(format!($($msg)+)));
        }
    };
}

/// What happens to a particle that leaves the domain.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    /// Toroidal: re-enter on the opposite face.
    #[default]
    Wrap,
    /// Reflect the offending velocity component and clamp the position.
    Bounce,
    /// Remove the particle.
    Disappear,
}

/// Continuous simulation domain in world units.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Domain {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl Default for Domain {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 400.0,
            depth: 10.0,
        }
    }
}

impl Domain {
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            width: self.width * factor,
            height: self.height * factor,
            depth: self.depth * factor,
        }
    }
}

/// Intent field grid dimensions in cells.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct FieldDimensions {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl Default for FieldDimensions {
    fn default() -> Self {
        Self {
            width: 30,
            height: 20,
            depth: 5,
        }
    }
}

/// Stochastic field update constants.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FieldTuning {
    /// Per-cell chance of receiving noise on an update.
    pub activation_probability: f64,
    /// Scale applied to Gaussian deltas in probabilistic mode.
    pub gaussian_scale: f64,
    pub wave_probability: f64,
    /// Upper bound of the wave amplitude, multiplied by the fluctuation rate.
    pub wave_strength: f64,
    pub wavelength_min: f64,
    pub wavelength_max: f64,
    pub hotspot_probability: f64,
    pub hotspot_radius_min: usize,
    pub hotspot_radius_max: usize,
    pub hotspot_intensity: f64,
    /// Let particles write their charge back into the field each tick.
    pub particle_imprint: bool,
    pub imprint_strength: f64,
    /// Multiplier applied to the cell under a neutral particle.
    pub neutral_relaxation: f64,
}

impl Default for FieldTuning {
    fn default() -> Self {
        Self {
            activation_probability: 0.3,
            gaussian_scale: 0.3,
            wave_probability: 0.05,
            wave_strength: 0.5,
            wavelength_min: 5.0,
            wavelength_max: 10.0,
            hotspot_probability: 0.02,
            hotspot_radius_min: 2,
            hotspot_radius_max: 4,
            hotspot_intensity: 0.7,
            particle_imprint: true,
            imprint_strength: 0.002,
            neutral_relaxation: 0.999,
        }
    }
}

/// Particle creation constants.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SpawnTuning {
    pub quantum_probability: f64,
    pub composite_probability: f64,
    pub adaptive_probability: f64,
    pub high_energy_base: f64,
    /// Extra high-energy probability per unit of |field value|.
    pub high_energy_field_weight: f64,
    pub base_knowledge: f64,
    pub knowledge_jitter: f64,
    pub intent_scale: f64,
    pub positive_intent_weight: f64,
    pub negative_intent_weight: f64,
    /// Hard cap on particles created by the standard path in one tick.
    pub max_per_tick: usize,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            quantum_probability: 0.03,
            composite_probability: 0.03,
            adaptive_probability: 0.1,
            high_energy_base: 0.05,
            high_energy_field_weight: 0.4,
            base_knowledge: 0.1,
            knowledge_jitter: 0.05,
            intent_scale: 10.0,
            positive_intent_weight: 1.5,
            negative_intent_weight: 0.5,
            max_per_tick: 3,
        }
    }
}

/// Motion, aging and decay constants.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MotionTuning {
    pub damping: f64,
    pub bounce_damping: f64,
    /// Width of the uniform jitter added to each velocity component.
    pub jitter: f64,
    pub field_force: f64,
    pub positive_multiplier: f64,
    pub neutral_multiplier: f64,
    pub negative_multiplier: f64,
    /// Share of the field push applied along the depth axis.
    pub depth_response: f64,
    pub energy_decay: f64,
    pub knowledge_decay_rate: f64,
    pub cull_energy: f64,
}

impl Default for MotionTuning {
    fn default() -> Self {
        Self {
            damping: 0.98,
            bounce_damping: 0.8,
            jitter: 0.1,
            field_force: 0.01,
            positive_multiplier: 1.0,
            neutral_multiplier: 0.5,
            negative_multiplier: 0.25,
            depth_response: 0.5,
            energy_decay: 0.01,
            knowledge_decay_rate: 0.0005,
            cull_energy: 0.1,
        }
    }
}

/// Pairwise interaction constants.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct InteractionTuning {
    /// `k` in `interaction radius = k * (r1 + r2)`.
    pub radius_factor: f64,
    pub force_scale: f64,
    /// Distance floor for the inverse-square law.
    pub distance_epsilon: f64,
    /// Largest velocity change a single pair may impart.
    pub max_impulse: f64,
    pub complexity_growth: f64,
    pub max_complexity: f64,
    /// Population at which candidate pairs come from the spatial hash.
    pub spatial_index_min_particles: usize,
}

impl Default for InteractionTuning {
    fn default() -> Self {
        Self {
            radius_factor: 4.0,
            force_scale: 0.05,
            distance_epsilon: 0.5,
            max_impulse: 0.5,
            complexity_growth: 0.01,
            max_complexity: 10.0,
            spatial_index_min_particles: 64,
        }
    }
}

/// How cluster stability is scored.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StabilityMetric {
    /// Mean pairwise relative speed of the members.
    #[default]
    RelativeVelocity,
    /// Mean distance of the members from the centroid.
    Dispersion,
}

/// Clustering, intelligence and promotion constants.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClusterTuning {
    /// Share of the interaction radius within which same-charge particles link.
    pub proximity_factor: f64,
    pub stability_metric: StabilityMetric,
    pub velocity_scale: f64,
    pub dispersion_scale: f64,
    pub narrative_intelligence_bar: f64,
    pub narrative_probability: f64,
    pub emergence_threshold: f64,
}

impl Default for ClusterTuning {
    fn default() -> Self {
        Self {
            proximity_factor: 0.5,
            stability_metric: StabilityMetric::RelativeVelocity,
            velocity_scale: 1.0,
            dispersion_scale: 20.0,
            narrative_intelligence_bar: 3.0,
            narrative_probability: 0.3,
            emergence_threshold: 25.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnomalyTuning {
    /// Ticks between two detector runs.
    pub cadence: u64,
    pub entropy_spike_threshold: f64,
    pub cluster_growth_ratio: f64,
    pub min_particles: usize,
    pub sample_size: usize,
    /// Anomalies retained for the snapshot.
    pub history: usize,
}

impl Default for AnomalyTuning {
    fn default() -> Self {
        Self {
            cadence: 30,
            entropy_spike_threshold: 0.2,
            cluster_growth_ratio: 1.5,
            min_particles: 5,
            sample_size: 5,
            history: 50,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct InflationTuning {
    pub threshold: f64,
    pub spontaneous_probability: f64,
    pub spontaneous_min_particles: usize,
    pub duration_ticks: u64,
    pub burst_cap: usize,
    pub expansion_factor: f64,
}

impl Default for InflationTuning {
    fn default() -> Self {
        Self {
            threshold: 1.0e6,
            spontaneous_probability: 0.0005,
            spontaneous_min_particles: 50,
            duration_ticks: 150,
            burst_cap: 100,
            expansion_factor: 2.0,
        }
    }
}

/// All model constants, grouped per system.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Tuning {
    pub field: FieldTuning,
    pub spawn: SpawnTuning,
    pub motion: MotionTuning,
    pub interaction: InteractionTuning,
    pub cluster: ClusterTuning,
    pub anomaly: AnomalyTuning,
    pub inflation: InflationTuning,
}

/// Top-level engine configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub max_particles: usize,
    pub fluctuation_rate: f64,
    pub learning_rate: f64,
    /// Expected number of new particles per tick.
    pub particle_creation_rate: f64,
    pub energy_conservation: bool,
    pub probabilistic_intent: bool,
    pub boundary_mode: BoundaryMode,
    pub use_adaptive_particles: bool,
    pub initial_particles: usize,
    pub stability_threshold: f64,
    pub time_step: f64,
    pub seed: Option<u64>,
    /// Re-seed the RNG every tick from `seed + frame`.
    pub deterministic: bool,
    pub domain: Domain,
    pub field: FieldDimensions,
    pub tuning: Tuning,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_particles: 200,
            fluctuation_rate: 0.01,
            learning_rate: 0.1,
            particle_creation_rate: 0.3,
            energy_conservation: false,
            probabilistic_intent: false,
            boundary_mode: BoundaryMode::Wrap,
            use_adaptive_particles: false,
            initial_particles: 100,
            stability_threshold: 0.5,
            time_step: 1.0,
            seed: None,
            deterministic: false,
            domain: Domain::default(),
            field: FieldDimensions::default(),
            tuning: Tuning::default(),
        }
    }
}

fn is_probability(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}

impl SimulationConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or the first violation as
    /// [`SimError::InvalidConfig`].
    pub fn validate(&self) -> Result<()> {
        ensure_config!(self.max_particles > 0, "max_particles must be positive");
        ensure_config!(
            is_probability(self.fluctuation_rate),
            "fluctuation_rate must be in [0.0, 1.0], got {}",
            self.fluctuation_rate
        );
        ensure_config!(
            self.learning_rate > 0.0 && self.learning_rate.is_finite(),
            "learning_rate must be positive"
        );
        ensure_config!(
            self.particle_creation_rate > 0.0 && self.particle_creation_rate.is_finite(),
            "particle_creation_rate must be positive"
        );
        ensure_config!(
            self.initial_particles <= self.max_particles,
            "initial_particles ({}) exceeds max_particles ({})",
            self.initial_particles,
            self.max_particles
        );
        ensure_config!(
            is_probability(self.stability_threshold),
            "stability_threshold must be in [0.0, 1.0]"
        );
        ensure_config!(
            self.time_step > 0.0 && self.time_step.is_finite(),
            "time_step must be positive"
        );

        let domain = &self.domain;
        ensure_config!(
            [domain.width, domain.height, domain.depth]
                .iter()
                .all(|d| *d > 0.0 && d.is_finite()),
            "domain dimensions must be positive and finite"
        );
        ensure_config!(
            self.field.width > 0 && self.field.height > 0 && self.field.depth > 0,
            "field dimensions must be positive"
        );
        ensure_config!(
            self.field
                .width
                .checked_mul(self.field.height)
                .and_then(|n| n.checked_mul(self.field.depth))
                .is_some_and(|n| n <= 1_000_000),
            "field too large (max 1,000,000 cells)"
        );

        let field = &self.tuning.field;
        ensure_config!(
            is_probability(field.activation_probability),
            "activation_probability must be in [0.0, 1.0]"
        );
        ensure_config!(
            is_probability(field.wave_probability),
            "wave_probability must be in [0.0, 1.0]"
        );
        ensure_config!(
            is_probability(field.hotspot_probability),
            "hotspot_probability must be in [0.0, 1.0]"
        );
        ensure_config!(
            field.wavelength_min > 0.0 && field.wavelength_min < field.wavelength_max,
            "wavelength range must be positive and non-empty"
        );
        ensure_config!(
            field.hotspot_radius_min > 0 && field.hotspot_radius_min <= field.hotspot_radius_max,
            "hotspot radius range must be positive and ordered"
        );

        let spawn = &self.tuning.spawn;
        ensure_config!(
            spawn.quantum_probability
                + spawn.composite_probability
                + spawn.adaptive_probability
                + spawn.high_energy_base
                + spawn.high_energy_field_weight
                <= 1.0,
            "particle type probabilities must sum to at most 1.0"
        );
        ensure_config!(spawn.max_per_tick > 0, "max_per_tick must be positive");

        let motion = &self.tuning.motion;
        ensure_config!(
            motion.damping > 0.0 && motion.damping <= 1.0,
            "damping must be in (0.0, 1.0]"
        );
        ensure_config!(
            is_probability(motion.bounce_damping),
            "bounce_damping must be in [0.0, 1.0]"
        );
        ensure_config!(
            motion.positive_multiplier > motion.neutral_multiplier
                && motion.neutral_multiplier > motion.negative_multiplier,
            "charge multipliers must be ordered positive > neutral > negative"
        );
        ensure_config!(
            motion.energy_decay >= 0.0 && motion.knowledge_decay_rate >= 0.0,
            "decay rates must be non-negative"
        );
        ensure_config!(
            motion.field_force.is_finite() && motion.field_force >= 0.0,
            "field_force must be finite and non-negative"
        );
        ensure_config!(
            motion.cull_energy.is_finite(),
            "cull_energy must be finite"
        );

        let interaction = &self.tuning.interaction;
        ensure_config!(
            interaction.radius_factor > 0.0,
            "interaction radius_factor must be positive"
        );
        ensure_config!(
            interaction.distance_epsilon > 0.0,
            "distance_epsilon must be positive"
        );
        ensure_config!(
            interaction.max_complexity >= 1.0,
            "max_complexity must be at least 1.0"
        );

        let cluster = &self.tuning.cluster;
        ensure_config!(
            cluster.proximity_factor > 0.0,
            "proximity_factor must be positive"
        );
        ensure_config!(
            cluster.velocity_scale > 0.0 && cluster.dispersion_scale > 0.0,
            "stability scales must be positive"
        );
        ensure_config!(
            is_probability(cluster.narrative_probability),
            "narrative_probability must be in [0.0, 1.0]"
        );

        ensure_config!(self.tuning.anomaly.cadence > 0, "anomaly cadence must be positive");

        let inflation = &self.tuning.inflation;
        ensure_config!(
            is_probability(inflation.spontaneous_probability),
            "spontaneous_probability must be in [0.0, 1.0]"
        );
        ensure_config!(
            inflation.duration_ticks > 0,
            "inflation duration must be positive"
        );
        ensure_config!(
            inflation.expansion_factor >= 1.0 && inflation.expansion_factor.is_finite(),
            "expansion_factor must be finite and at least 1.0"
        );
        let inflated = self.domain.scaled(inflation.expansion_factor);
        ensure_config!(
            SpatialHash::cell_count(INDEX_CELL_SIZE, inflated.width, inflated.height, inflated.depth)
                .is_some_and(|n| n <= MAX_INDEX_CELLS),
            "inflated domain too large for the neighbour index (max {} cells)",
            MAX_INDEX_CELLS
        );

        Ok(())
    }

    /// Parses and validates a configuration from TOML.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// SHA-256 digest of the model-relevant parameters, hex encoded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(
            format!(
                "{}|{}|{}|{}|{}|{}|{:?}|{}",
                self.max_particles,
                self.fluctuation_rate,
                self.learning_rate,
                self.particle_creation_rate,
                self.energy_conservation,
                self.probabilistic_intent,
                self.boundary_mode,
                self.use_adaptive_particles
            )
            .as_bytes(),
        );
        hasher.update(format!("{:?}", self.domain).as_bytes());
        hasher.update(format!("{:?}", self.field).as_bytes());
        hasher.update(format!("{:?}", self.tuning).as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_max_particles_rejected() {
        let config = SimulationConfig {
            max_particles: 0,
            initial_particles: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[test]
    fn test_fluctuation_rate_out_of_range() {
        let config = SimulationConfig {
            fluctuation_rate: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_rates_rejected() {
        let config = SimulationConfig {
            learning_rate: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            particle_creation_rate: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unordered_charge_multipliers_rejected() {
        let config = SimulationConfig {
            tuning: Tuning {
                motion: MotionTuning {
                    negative_multiplier: 2.0,
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_overrides_nested_sections() {
        let config = SimulationConfig::from_toml(
            r#"
            max_particles = 50
            initial_particles = 10
            boundary_mode = "disappear"
            seed = 7

            [tuning.field]
            wave_probability = 0.0
            "#,
        )
        .unwrap();
        assert_eq!(config.max_particles, 50);
        assert_eq!(config.boundary_mode, BoundaryMode::Disappear);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.tuning.field.wave_probability, 0.0);
        assert_eq!(config.tuning.field.hotspot_probability, 0.02);
    }

    #[test]
    fn test_from_toml_rejects_invalid_values() {
        let result = SimulationConfig::from_toml("max_particles = 0\ninitial_particles = 0");
        assert!(result.is_err());
    }

    #[test]
    fn test_fingerprint_consistency() {
        let config1 = SimulationConfig::default();
        let config2 = SimulationConfig::default();
        assert_eq!(config1.fingerprint(), config2.fingerprint());

        let config3 = SimulationConfig {
            learning_rate: 0.2,
            ..Default::default()
        };
        assert_ne!(config1.fingerprint(), config3.fingerprint());
    }

    #[test]
    fn test_unbounded_domain_rejected() {
        let config = SimulationConfig {
            domain: Domain {
                width: f64::INFINITY,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let config = SimulationConfig {
            domain: Domain {
                width: 1e12,
                height: 1e12,
                depth: 1e6,
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_inflated_domain_must_fit_index() {
        let config = SimulationConfig {
            domain: Domain {
                width: 4000.0,
                height: 4000.0,
                depth: 100.0,
            },
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let mut config = config;
        config.tuning.inflation.expansion_factor = 10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_tuning_rejected() {
        let mut config = SimulationConfig::default();
        config.tuning.inflation.expansion_factor = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.tuning.motion.field_force = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.tuning.motion.cull_energy = f64::NAN;
        assert!(config.validate().is_err());
    }
}
