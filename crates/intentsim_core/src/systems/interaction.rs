//! Pairwise particle interactions.
//!
//! Pairs are always processed in ascending `(i, j)` order with `i < j`. The
//! spatial-hash path gathers the same candidate set as the brute-force scan and
//! sorts it, so both paths mutate particles in the same sequence and produce
//! identical results.

use crate::config::InteractionTuning;
use crate::spatial_hash::SpatialHash;
use intentsim_data::{Charge, Particle, Position};

/// Force sign and magnitude plus knowledge exchange coefficient for a charge pairing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairRule {
    /// Positive attracts, negative repels.
    pub factor: f64,
    pub exchange: f64,
}

/// The fixed charge-pair table.
#[must_use]
pub fn pair_rule(a: Charge, b: Charge) -> PairRule {
    match (a, b) {
        (Charge::Positive, Charge::Positive) => PairRule {
            factor: 0.5,
            exchange: 0.3,
        },
        (Charge::Negative, Charge::Negative) => PairRule {
            factor: -0.2,
            exchange: 0.05,
        },
        (Charge::Positive, Charge::Negative) | (Charge::Negative, Charge::Positive) => PairRule {
            factor: 1.0,
            exchange: 0.15,
        },
        _ => PairRule {
            factor: 0.1,
            exchange: 0.1,
        },
    }
}

#[inline]
#[must_use]
pub fn interaction_radius(a: &Particle, b: &Particle, radius_factor: f64) -> f64 {
    radius_factor * (a.radius + b.radius)
}

pub struct InteractionContext<'a> {
    pub tuning: &'a InteractionTuning,
    pub learning_rate: f64,
    pub tick: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionReport {
    pub pairs: u64,
    pub used_spatial_index: bool,
}

fn split_pair(particles: &mut [Particle], i: usize, j: usize) -> (&mut Particle, &mut Particle) {
    debug_assert!(i < j);
    let (left, right) = particles.split_at_mut(j);
    (&mut left[i], &mut right[0])
}

/// Applies one interaction between `a` and `b`, already known to be in range.
pub fn interact(a: &mut Particle, b: &mut Particle, ctx: &InteractionContext) {
    let t = ctx.tuning;
    let rule = pair_rule(a.charge, b.charge);

    let dx = b.position.x - a.position.x;
    let dy = b.position.y - a.position.y;
    let dz = b.position.z - a.position.z;
    let distance = (dx * dx + dy * dy + dz * dz).sqrt();

    if distance > 0.0 {
        let floored = distance.max(t.distance_epsilon);
        let force = (rule.factor * t.force_scale / (floored * floored))
            .clamp(-t.max_impulse, t.max_impulse);
        let (ux, uy, uz) = (dx / distance, dy / distance, dz / distance);

        a.velocity.vx += ux * force / a.mass;
        a.velocity.vy += uy * force / a.mass;
        a.velocity.vz += uz * force / a.mass;
        b.velocity.vx -= ux * force / b.mass;
        b.velocity.vy -= uy * force / b.mass;
        b.velocity.vz -= uz * force / b.mass;
    }

    let strength = rule.factor.abs() * ctx.learning_rate;
    let gain = a.knowledge.min(b.knowledge) * strength * rule.exchange;
    a.knowledge += gain;
    b.knowledge += gain;

    let growth = 1.0 + t.complexity_growth;
    a.complexity = (a.complexity * growth).min(t.max_complexity);
    b.complexity = (b.complexity * growth).min(t.max_complexity);

    for p in [a, b] {
        p.interaction_count += 1;
        p.last_interaction_tick = ctx.tick;
    }
}

fn in_range(a: &Particle, b: &Particle, radius_factor: f64) -> bool {
    let r = interaction_radius(a, b, radius_factor);
    a.position.distance_squared(&b.position) < r * r
}

/// All in-range pairs via exhaustive scan, in canonical order.
pub fn candidate_pairs_brute(particles: &[Particle], radius_factor: f64) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..particles.len() {
        for j in (i + 1)..particles.len() {
            if in_range(&particles[i], &particles[j], radius_factor) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// All in-range pairs via a spatial hash, in canonical order.
pub fn candidate_pairs_indexed(
    particles: &[Particle],
    radius_factor: f64,
    hash: &mut SpatialHash,
) -> Vec<(usize, usize)> {
    let positions: Vec<Position> = particles.iter().map(|p| p.position).collect();
    hash.build(&positions);
    let max_radius = particles.iter().map(|p| p.radius).fold(0.0, f64::max);

    let mut pairs = Vec::new();
    let mut nearby = Vec::new();
    for (i, a) in particles.iter().enumerate() {
        let reach = radius_factor * (a.radius + max_radius);
        hash.query_into(&a.position, reach, &mut nearby);
        pairs.extend(
            nearby
                .iter()
                .copied()
                .filter(|&j| j > i && in_range(a, &particles[j], radius_factor))
                .map(|j| (i, j)),
        );
    }
    pairs.sort_unstable();
    pairs
}

/// Runs the interaction pass over every in-range pair.
///
/// `hash` is used once the population reaches
/// `tuning.spatial_index_min_particles`; observable results are identical
/// either way.
pub fn interact_all(
    particles: &mut [Particle],
    ctx: &InteractionContext,
    hash: Option<&mut SpatialHash>,
) -> InteractionReport {
    let k = ctx.tuning.radius_factor;
    let (pairs, used_spatial_index) = match hash {
        Some(hash) if particles.len() >= ctx.tuning.spatial_index_min_particles => {
            (candidate_pairs_indexed(particles, k, hash), true)
        }
        _ => (candidate_pairs_brute(particles, k), false),
    };

    for &(i, j) in &pairs {
        let (a, b) = split_pair(particles, i, j);
        interact(a, b, ctx);
    }

    InteractionReport {
        pairs: pairs.len() as u64,
        used_spatial_index,
    }
}
