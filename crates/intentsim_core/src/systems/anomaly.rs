use crate::config::AnomalyTuning;
use intentsim_data::{AnomalyEvent, AnomalyKind, Particle, SimulationSnapshot};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Baseline {
    shannon_entropy: f64,
    cluster_count: usize,
}

/// Compares each sampled snapshot against the previous sample.
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    baseline: Option<Baseline>,
}

impl AnomalyDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs on ticks that are a multiple of `tuning.cadence`; other ticks return
    /// nothing and leave the baseline alone.
    pub fn detect<R: Rng>(
        &mut self,
        tick: u64,
        snapshot: &SimulationSnapshot,
        particles: &[Particle],
        tuning: &AnomalyTuning,
        rng: &mut R,
    ) -> Vec<AnomalyEvent> {
        if tuning.cadence == 0 || tick % tuning.cadence != 0 {
            return Vec::new();
        }

        let current = Baseline {
            shannon_entropy: snapshot.shannon_entropy,
            cluster_count: snapshot.cluster_count,
        };
        let previous = self.baseline.replace(current);

        let Some(previous) = previous else {
            return Vec::new();
        };
        if particles.len() < tuning.min_particles {
            return Vec::new();
        }

        let mut events = Vec::new();

        let delta = current.shannon_entropy - previous.shannon_entropy;
        if delta.abs() > tuning.entropy_spike_threshold {
            events.push(AnomalyEvent {
                kind: AnomalyKind::EntropySpike,
                severity: delta.abs().clamp(0.0, 1.0),
                timestamp: tick,
                affected_particles: sample_ids(particles, tuning.sample_size, rng),
                description: format!(
                    "Charge entropy {} by {:.3}",
                    if delta > 0.0 { "rose" } else { "fell" },
                    delta.abs()
                ),
            });
        }

        let now = current.cluster_count as f64;
        let before = previous.cluster_count as f64;
        if current.cluster_count > 0 && now > tuning.cluster_growth_ratio * before {
            events.push(AnomalyEvent {
                kind: AnomalyKind::ClusterFormation,
                severity: (1.0 - before / now).clamp(0.0, 1.0),
                timestamp: tick,
                affected_particles: sample_ids(particles, tuning.sample_size, rng),
                description: format!(
                    "Cluster count grew from {} to {}",
                    previous.cluster_count, current.cluster_count
                ),
            });
        }

        if !events.is_empty() {
            debug!(tick, count = events.len(), "Anomalies detected");
        }
        events
    }
}

fn sample_ids<R: Rng>(particles: &[Particle], amount: usize, rng: &mut R) -> Vec<uuid::Uuid> {
    particles
        .choose_multiple(rng, amount)
        .map(|p| p.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{create_from_field, SpawnOptions};
    use intentsim_data::Position;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn population(n: usize, rng: &mut ChaCha8Rng) -> Vec<Particle> {
        (0..n)
            .map(|_| create_from_field(0.5, Position::default(), 0, &SpawnOptions::default(), rng))
            .collect()
    }

    fn snap(entropy: f64, clusters: usize) -> SimulationSnapshot {
        SimulationSnapshot {
            shannon_entropy: entropy,
            cluster_count: clusters,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_sample_only_sets_baseline() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let particles = population(10, &mut rng);
        let tuning = AnomalyTuning::default();
        let mut detector = AnomalyDetector::new();
        assert!(detector.detect(30, &snap(0.9, 5), &particles, &tuning, &mut rng).is_empty());
    }

    #[test]
    fn test_off_cadence_ticks_are_ignored() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let particles = population(10, &mut rng);
        let tuning = AnomalyTuning::default();
        let mut detector = AnomalyDetector::new();
        detector.detect(30, &snap(0.0, 0), &particles, &tuning, &mut rng);
        assert!(detector.detect(31, &snap(1.0, 10), &particles, &tuning, &mut rng).is_empty());
        let events = detector.detect(60, &snap(1.0, 10), &particles, &tuning, &mut rng);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_entropy_spike_and_cluster_formation() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let particles = population(10, &mut rng);
        let tuning = AnomalyTuning::default();
        let mut detector = AnomalyDetector::new();
        detector.detect(30, &snap(0.2, 2), &particles, &tuning, &mut rng);
        let events = detector.detect(60, &snap(0.7, 4), &particles, &tuning, &mut rng);

        let spike = events
            .iter()
            .find(|e| e.kind == AnomalyKind::EntropySpike)
            .expect("spike");
        assert!((spike.severity - 0.5).abs() < 1e-12);
        assert_eq!(spike.affected_particles.len(), 5);
        assert_eq!(spike.timestamp, 60);

        let formation = events
            .iter()
            .find(|e| e.kind == AnomalyKind::ClusterFormation)
            .expect("formation");
        assert!((formation.severity - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_small_population_emits_nothing_but_refreshes_baseline() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let few = population(3, &mut rng);
        let many = population(10, &mut rng);
        let tuning = AnomalyTuning::default();
        let mut detector = AnomalyDetector::new();
        detector.detect(30, &snap(0.0, 0), &few, &tuning, &mut rng);
        assert!(detector.detect(60, &snap(1.0, 5), &few, &tuning, &mut rng).is_empty());
        // Baseline moved to (1.0, 5), so an unchanged sample is quiet.
        assert!(detector.detect(90, &snap(1.0, 5), &many, &tuning, &mut rng).is_empty());
    }
}
