//! Scalar statistics over the particle population and the field.

use crate::config::Domain;
use crate::field::{normalized_entropy, IntentField};
use crate::systems::cluster::ClusterDetection;
use intentsim_data::{Charge, ChargeCounts, Particle, SimulationSnapshot, TypeCounts};

const SPATIAL_BINS: usize = 4;

pub struct StatsInput<'a> {
    pub particles: &'a [Particle],
    pub field: &'a IntentField,
    pub domain: &'a Domain,
    pub detection: &'a ClusterDetection,
    pub total_interactions: u64,
    pub frame: u64,
}

/// Normalised Shannon entropy of the charge mix. Zero for an empty set.
#[must_use]
pub fn charge_entropy(counts: &ChargeCounts) -> f64 {
    let total = counts.total();
    if total == 0 {
        return 0.0;
    }
    let probabilities: Vec<f64> = Charge::ALL
        .iter()
        .map(|&c| counts.get(c) as f64 / total as f64)
        .collect();
    normalized_entropy(&probabilities)
}

/// Entropy in bits of a 4x4 x/y occupancy histogram.
#[must_use]
pub fn spatial_entropy(particles: &[Particle], domain: &Domain) -> f64 {
    if particles.is_empty() {
        return 0.0;
    }
    let mut bins = [0usize; SPATIAL_BINS * SPATIAL_BINS];
    let bin = |coord: f64, extent: f64| {
        let b = (coord / extent * SPATIAL_BINS as f64).floor();
        if b.is_nan() {
            0
        } else {
            b.clamp(0.0, (SPATIAL_BINS - 1) as f64) as usize
        }
    };
    for p in particles {
        let bx = bin(p.position.x, domain.width);
        let by = bin(p.position.y, domain.height);
        bins[by * SPATIAL_BINS + bx] += 1;
    }
    let n = particles.len() as f64;
    bins.iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.log2()
        })
        .sum()
}

/// `|mean| / (|mean| + std)` over the field; 0 for a flat zero field.
#[must_use]
pub fn field_order_parameter(field: &IntentField) -> f64 {
    let mean = field.mean().abs();
    let sigma = field.variance().sqrt();
    if mean + sigma == 0.0 {
        0.0
    } else {
        mean / (mean + sigma)
    }
}

/// Heterogeneity term of the complexity index.
fn variety_factor(charges: &ChargeCounts, types: &TypeCounts, n: usize) -> f64 {
    let numerator = (charges.positive * charges.negative * charges.neutral) as f64
        * (types.high_energy + 1) as f64
        * (types.quantum + 1) as f64
        * (types.composite + 1) as f64
        * (types.adaptive + 1) as f64;
    numerator / ((n * n) as f64).max(1.0)
}

fn mean_knowledge<'a>(particles: impl Iterator<Item = &'a Particle>) -> f64 {
    let (sum, count) = particles.fold((0.0, 0usize), |(s, c), p| (s + p.knowledge, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Builds the per-tick snapshot. Anomalies and inflation events are left
/// empty; the universe fills them from its own history.
pub fn compute_stats(input: &StatsInput) -> SimulationSnapshot {
    let particles = input.particles;
    let n = particles.len();

    let mut by_charge = ChargeCounts::default();
    let mut by_type = TypeCounts::default();
    let mut total_knowledge = 0.0;
    let mut max_complexity: f64 = 0.0;
    let mut total_intent = 0.0;
    for p in particles {
        by_charge.record(p.charge);
        by_type.record(p.kind);
        total_knowledge += p.knowledge;
        max_complexity = max_complexity.max(p.complexity);
        total_intent += p.intent.abs();
    }
    let (average_knowledge, average_intent_magnitude) = if n == 0 {
        (0.0, 0.0)
    } else {
        (total_knowledge / n as f64, total_intent / n as f64)
    };

    let complexity_index = total_knowledge * variety_factor(&by_charge, &by_type, n)
        + input.total_interactions as f64 / 1000.0
        + by_type.composite as f64 * max_complexity
        + 2.0 * by_type.adaptive as f64;

    let mut in_cluster = vec![false; n];
    for cluster in &input.detection.clusters {
        for &i in &cluster.members {
            if let Some(flag) = in_cluster.get_mut(i) {
                *flag = true;
            }
        }
    }
    let mut clustered_charges = ChargeCounts::default();
    let mut free_charges = ChargeCounts::default();
    for (p, &flag) in particles.iter().zip(&in_cluster) {
        if flag {
            clustered_charges.record(p.charge);
        } else {
            free_charges.record(p.charge);
        }
    }
    let cluster_entropy_delta = charge_entropy(&clustered_charges) - charge_entropy(&free_charges);

    let information_density = if input.detection.clusters.is_empty() {
        0.0
    } else {
        let clustered = mean_knowledge(
            particles
                .iter()
                .zip(&in_cluster)
                .filter_map(|(p, &f)| f.then_some(p)),
        );
        let free = mean_knowledge(
            particles
                .iter()
                .zip(&in_cluster)
                .filter_map(|(p, &f)| (!f).then_some(p)),
        );
        clustered / free.max(0.01)
    };

    SimulationSnapshot {
        frame: input.frame,
        particle_count: n,
        counts_by_charge: by_charge,
        counts_by_type: by_type,
        average_knowledge,
        max_complexity,
        average_intent_magnitude,
        total_interactions: input.total_interactions,
        complexity_index,
        shannon_entropy: charge_entropy(&by_charge),
        spatial_entropy: spatial_entropy(particles, input.domain),
        field_order_parameter: field_order_parameter(input.field),
        cluster_entropy_delta,
        information_density,
        kolmogorov_complexity: input.field.edge_transition_ratio(),
        cluster_count: input.detection.clusters.len(),
        average_cluster_size: input.detection.average_size(),
        anomalies: Vec::new(),
        inflation_events: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClusterTuning;
    use crate::lifecycle::{create_from_field, SpawnOptions};
    use crate::systems::cluster::{detect_stable_clusters, ClusterParams};
    use intentsim_data::{ParticleType, Position};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn domain() -> Domain {
        Domain {
            width: 100.0,
            height: 100.0,
            depth: 10.0,
        }
    }

    fn stats(particles: &[Particle], field: &IntentField, detection: &ClusterDetection) -> SimulationSnapshot {
        let domain = domain();
        compute_stats(&StatsInput {
            particles,
            field,
            domain: &domain,
            detection,
            total_interactions: 0,
            frame: 1,
        })
    }

    #[test]
    fn test_empty_population() {
        let field = IntentField::filled(4, 4, 1, 0.0);
        let snap = stats(&[], &field, &ClusterDetection::default());
        assert_eq!(snap.particle_count, 0);
        assert_eq!(snap.shannon_entropy, 0.0);
        assert_eq!(snap.spatial_entropy, 0.0);
        assert_eq!(snap.field_order_parameter, 0.0);
        assert_eq!(snap.complexity_index, 0.0);
        assert_eq!(snap.information_density, 0.0);
        assert_eq!(snap.kolmogorov_complexity, 0.0);
    }

    #[test]
    fn test_balanced_charges_maximise_entropy() {
        let mut counts = ChargeCounts::default();
        for c in Charge::ALL {
            counts.record(c);
        }
        assert!((charge_entropy(&counts) - 1.0).abs() < 1e-12);
        counts = ChargeCounts {
            positive: 5,
            ..Default::default()
        };
        assert_eq!(charge_entropy(&counts), 0.0);
    }

    #[test]
    fn test_spatial_entropy_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let opts = SpawnOptions::default();
        let corner: Vec<Particle> = (0..8)
            .map(|_| create_from_field(0.5, Position::new(1.0, 1.0, 1.0), 0, &opts, &mut rng))
            .collect();
        assert_eq!(spatial_entropy(&corner, &domain()), 0.0);

        let spread: Vec<Particle> = (0..16)
            .map(|i| {
                let pos = Position::new((i % 4) as f64 * 25.0 + 1.0, (i / 4) as f64 * 25.0 + 1.0, 1.0);
                create_from_field(0.5, pos, 0, &opts, &mut rng)
            })
            .collect();
        assert!((spatial_entropy(&spread, &domain()) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_order_parameter() {
        assert_eq!(field_order_parameter(&IntentField::filled(3, 3, 1, 0.5)), 1.0);
        let mut field = IntentField::filled(2, 1, 1, 0.5);
        field.set(1, 0, 0, -0.5);
        assert_eq!(field_order_parameter(&field), 0.0);
    }

    #[test]
    fn test_complexity_index_terms() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let opts = SpawnOptions::default();
        let mut particles: Vec<Particle> = [0.9, -0.9, 0.0]
            .iter()
            .enumerate()
            .map(|(i, &v)| create_from_field(v, Position::new(10.0 + 40.0 * i as f64, 10.0, 1.0), 0, &opts, &mut rng))
            .collect();
        for p in &mut particles {
            p.kind = ParticleType::Standard;
            p.knowledge = 1.0;
            p.complexity = 2.0;
        }
        particles[0].kind = ParticleType::Composite;

        let field = IntentField::filled(2, 2, 1, 0.0);
        let domain = domain();
        let snap = compute_stats(&StatsInput {
            particles: &particles,
            field: &field,
            domain: &domain,
            detection: &ClusterDetection::default(),
            total_interactions: 500,
            frame: 3,
        });
        // variety = 1*1*1 * (0+1)(0+1)(1+1)(0+1) / 9
        let expected = 3.0 * (2.0 / 9.0) + 0.5 + 1.0 * 2.0;
        assert!((snap.complexity_index - expected).abs() < 1e-12);
        assert_eq!(snap.frame, 3);
        assert_eq!(snap.counts_by_type.composite, 1);
        assert!((snap.shannon_entropy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cluster_metrics() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let opts = SpawnOptions::default();
        let mut particles: Vec<Particle> = (0..3)
            .map(|i| {
                let mut p = create_from_field(0.9, Position::new(10.0 + i as f64, 10.0, 1.0), 0, &opts, &mut rng);
                p.velocity = Default::default();
                p.knowledge = 2.0;
                p
            })
            .collect();
        let mut loner = create_from_field(-0.9, Position::new(90.0, 90.0, 1.0), 0, &opts, &mut rng);
        loner.knowledge = 0.5;
        particles.push(loner);

        let tuning = ClusterTuning::default();
        let detection = detect_stable_clusters(
            &particles,
            &ClusterParams {
                tuning: &tuning,
                radius_factor: 4.0,
                stability_threshold: 0.5,
            },
        );
        let field = IntentField::filled(2, 2, 1, 0.0);
        let snap = stats(&particles, &field, &detection);
        assert_eq!(snap.cluster_count, 1);
        assert_eq!(snap.average_cluster_size, 3.0);
        assert!((snap.information_density - 4.0).abs() < 1e-12);
        assert_eq!(snap.cluster_entropy_delta, 0.0);
    }
}
