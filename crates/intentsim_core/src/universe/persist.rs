use super::Universe;
use crate::field::FieldAnalysis;
use intentsim_data::{SimulationSnapshot, SimulationState};
use tracing::info;

impl Universe {
    /// Statistics from the most recent tick.
    #[must_use]
    pub fn snapshot(&self) -> &SimulationSnapshot {
        &self.snapshot
    }

    /// Exports the round-trippable state: particles, field and counters.
    #[must_use]
    pub fn export_state(&self) -> SimulationState {
        SimulationState {
            particles: self.store.as_slice().to_vec(),
            intent_field: self.field.to_nested(),
            interactions_count: self.interactions_count,
            frame_count: self.frame,
            simulation_time: self.simulation_time,
        }
    }

    /// On-demand structural analysis of the intent field.
    #[must_use]
    pub fn analyze_field(&self) -> FieldAnalysis {
        self.field.analyze()
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        self.running = true;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stops the universe and releases its population and history.
    ///
    /// Counters and the field are kept so a final `export_state` still
    /// reports where the run ended.
    pub fn dispose(&mut self) {
        self.running = false;
        let particles = self.store.len();
        self.store = Default::default();
        self.detection = Default::default();
        self.anomalies.clear();
        self.inflation_events.clear();
        self.promoted.clear();
        self.refresh_snapshot();
        info!(frame = self.frame, particles, "Universe disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    fn universe() -> Universe {
        Universe::new(SimulationConfig {
            seed: Some(3),
            initial_particles: 25,
            ..Default::default()
        })
        .expect("valid config")
    }

    #[test]
    fn test_export_restore_round_trip() {
        let mut original = universe();
        for _ in 0..10 {
            original.tick();
        }
        let state = original.export_state();
        let restored = Universe::restore(original.config().clone(), state.clone())
            .expect("restorable");
        assert_eq!(restored.particles().len(), original.particles().len());
        assert_eq!(restored.field().dimensions(), original.field().dimensions());
        assert_eq!(restored.frame(), 10);
        assert_eq!(restored.interactions_count(), original.interactions_count());
        assert_eq!(restored.export_state(), state);
    }

    #[test]
    fn test_analyze_field_fractions_sum_to_one() {
        let analysis = universe().analyze_field();
        let total = analysis.positive_fraction + analysis.negative_fraction + analysis.neutral_fraction;
        assert!((total - 1.0).abs() < 1e-9);
        assert!(analysis.largest_region >= 1);
    }

    #[test]
    fn test_dispose_stops_and_empties() {
        let mut u = universe();
        u.tick();
        u.dispose();
        assert!(!u.is_running());
        assert!(u.particles().is_empty());
        assert_eq!(u.snapshot().particle_count, 0);
        assert!(u.tick().is_empty());
        assert_eq!(u.frame(), 1);
    }
}
