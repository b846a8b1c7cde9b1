use super::{seeded_rng, Universe};
use crate::config::SimulationConfig;
use crate::error::{Result, SimError};
use crate::field::IntentField;
use crate::lifecycle::spawn_from_field;
use crate::store::ParticleStore;
use crate::systems::cluster::detection_from_assignments;
use intentsim_data::SimulationState;
use tracing::{info, warn};

impl Universe {
    /// Builds a fresh universe: random field plus `initial_particles` particles.
    ///
    /// # Errors
    /// Returns [`SimError::InvalidConfig`] if the configuration fails validation.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = seeded_rng(config.seed);
        let dims = config.field;
        let field = IntentField::new_random(dims.width, dims.height, dims.depth, &mut rng);

        let mut universe = Self::assemble(config, field, ParticleStore::new(), rng);
        let options = universe.spawn_options(false);
        for _ in 0..universe.config.initial_particles {
            let particle = spawn_from_field(
                &universe.field,
                &universe.domain,
                0,
                &options,
                &mut universe.rng,
            );
            universe
                .store
                .push_bounded(particle, universe.config.max_particles);
        }
        universe.refresh_snapshot();

        info!(
            particles = universe.store.len(),
            field = ?(dims.width, dims.height, dims.depth),
            fingerprint = %universe.config.fingerprint(),
            "Universe initialized"
        );
        Ok(universe)
    }

    /// Rebuilds a universe from an exported state.
    ///
    /// The field dimensions come from the state. Malformed particles are
    /// dropped with a warning rather than rejected. Clusters are rebuilt from
    /// the persisted `cluster_id`s so the snapshot matches the exporting run.
    ///
    /// # Errors
    /// Fails on an invalid configuration or an empty/ragged field array.
    pub fn restore(config: SimulationConfig, state: SimulationState) -> Result<Self> {
        config.validate()?;

        let field = IntentField::from_nested(&state.intent_field)?;
        let (w, h, d) = field.dimensions();
        if (w, h, d) != (config.field.width, config.field.height, config.field.depth) {
            warn!(
                state = ?(w, h, d),
                config = ?(config.field.width, config.field.height, config.field.depth),
                "Restored field dimensions differ from configuration"
            );
        }
        if !state.simulation_time.is_finite() {
            return Err(SimError::invalid_state("simulation_time is not finite"));
        }

        let rng = seeded_rng(config.seed);
        let mut universe = Self::assemble(config, field, ParticleStore::from_vec(state.particles), rng);
        universe.store.sanitize();
        universe.frame = state.frame_count;
        universe.simulation_time = state.simulation_time;
        universe.interactions_count = state.interactions_count;
        universe.detection =
            detection_from_assignments(universe.store.as_slice(), &universe.config.tuning.cluster);
        universe.refresh_snapshot();

        info!(
            particles = universe.store.len(),
            clusters = universe.detection.clusters.len(),
            frame = universe.frame,
            "Universe restored"
        );
        Ok(universe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimulationConfig {
        SimulationConfig {
            seed: Some(7),
            initial_particles: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_seeds_initial_population() {
        let universe = Universe::new(config()).expect("valid config");
        assert_eq!(universe.particles().len(), 20);
        assert_eq!(universe.snapshot().particle_count, 20);
        assert_eq!(universe.field().dimensions(), (30, 20, 5));
        assert!(universe.is_running());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let bad = SimulationConfig {
            fluctuation_rate: 2.0,
            ..Default::default()
        };
        assert!(matches!(Universe::new(bad), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_same_seed_same_universe() {
        let a = Universe::new(config()).expect("valid config");
        let b = Universe::new(config()).expect("valid config");
        assert_eq!(a.particles(), b.particles());
        assert_eq!(a.field(), b.field());
    }

    #[test]
    fn test_restore_rejects_ragged_field() {
        let state = SimulationState {
            intent_field: vec![vec![vec![0.0, 0.0], vec![0.0]]],
            ..Default::default()
        };
        assert!(matches!(
            Universe::restore(config(), state),
            Err(SimError::InvalidState(_))
        ));
    }

    #[test]
    fn test_restore_drops_malformed_particles() {
        let universe = Universe::new(config()).expect("valid config");
        let mut state = universe.export_state();
        state.particles[0].position.x = f64::NAN;
        let restored = Universe::restore(config(), state).expect("restorable");
        assert_eq!(restored.particles().len(), 19);
    }

    #[test]
    fn test_unbounded_domain_is_an_error() {
        let bad = SimulationConfig {
            domain: crate::config::Domain {
                width: f64::INFINITY,
                ..Default::default()
            },
            ..config()
        };
        assert!(matches!(Universe::new(bad.clone()), Err(SimError::InvalidConfig(_))));
        assert!(matches!(
            Universe::restore(bad, SimulationState::default()),
            Err(SimError::InvalidConfig(_))
        ));
    }
}
