//! Particle creation.
//!
//! [`create_from_field`] is the only place particle attributes are derived.
//! Initial seeding, per-tick creation and inflation bursts all go through it.

use crate::config::{Domain, SpawnTuning};
use crate::field::{clamp_unit, IntentField};
use intentsim_data::{Charge, Particle, ParticleType, Position, Velocity};
use rand::Rng;
use uuid::Uuid;

/// Inputs to particle creation that do not come from the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnOptions {
    pub tuning: SpawnTuning,
    pub energy_conservation: bool,
    /// Allow the adaptive species.
    pub adaptive: bool,
    /// Tag the particle as part of an inflation burst.
    pub post_inflation: bool,
}

fn choose_kind<R: Rng>(magnitude: f64, options: &SpawnOptions, rng: &mut R) -> ParticleType {
    let t = &options.tuning;
    let roll = rng.gen::<f64>();
    let mut threshold = t.quantum_probability;
    if roll < threshold {
        return ParticleType::Quantum;
    }
    threshold += t.composite_probability;
    if roll < threshold {
        return ParticleType::Composite;
    }
    if options.adaptive {
        threshold += t.adaptive_probability;
        if roll < threshold {
            return ParticleType::Adaptive;
        }
    }
    threshold += t.high_energy_base + t.high_energy_field_weight * magnitude;
    if roll < threshold {
        ParticleType::HighEnergy
    } else {
        ParticleType::Standard
    }
}

/// Builds a fully populated particle from a field sample.
///
/// Deterministic given `(field_value, position, tick, options)` and the RNG
/// state: the same seed always yields the same particle, id included.
pub fn create_from_field<R: Rng>(
    field_value: f64,
    position: Position,
    tick: u64,
    options: &SpawnOptions,
    rng: &mut R,
) -> Particle {
    let value = clamp_unit(field_value);
    let magnitude = value.abs();
    let charge = Charge::from_field(value);
    let t = &options.tuning;

    let id = Uuid::from_u128(rng.gen::<u128>());

    let velocity_factor = magnitude * 2.0;
    let velocity = Velocity {
        vx: (rng.gen::<f64>() - 0.5) * velocity_factor,
        vy: (rng.gen::<f64>() - 0.5) * velocity_factor,
        vz: (rng.gen::<f64>() - 0.5) * velocity_factor * 0.5,
    };

    let kind = choose_kind(magnitude, options, rng);

    let charge_weight = match charge {
        Charge::Positive => t.positive_intent_weight,
        Charge::Negative => t.negative_intent_weight,
        Charge::Neutral => 1.0,
    };
    let intent = value * t.intent_scale * charge_weight;

    let knowledge = t.base_knowledge + rng.gen::<f64>() * t.knowledge_jitter;
    let energy = 1.0 + magnitude * rng.gen::<f64>() * 3.0;
    let mass = 1.0 + rng.gen::<f64>() * 4.0;

    let (energy_capacity, intent_decay_rate) = if options.energy_conservation {
        (
            1.0 + rng.gen::<f64>() * 0.5,
            0.0002 + rng.gen::<f64>() * 0.0002,
        )
    } else {
        (100.0, 0.00001)
    };

    Particle {
        id,
        position,
        velocity,
        charge,
        kind,
        radius: 2.0 + energy * 0.7,
        mass,
        intent,
        intent_decay_rate,
        energy,
        energy_capacity,
        knowledge,
        complexity: 1.0,
        age: 0,
        interaction_count: 0,
        last_interaction_tick: tick,
        cluster_id: None,
        is_post_inflation: options.post_inflation,
        created_tick: tick,
    }
}

/// Uniformly random position inside the domain.
pub fn random_position<R: Rng>(domain: &Domain, rng: &mut R) -> Position {
    Position {
        x: rng.gen::<f64>() * domain.width,
        y: rng.gen::<f64>() * domain.height,
        z: rng.gen::<f64>() * domain.depth,
    }
}

/// Samples the field at a random domain location and creates a particle there.
pub fn spawn_from_field<R: Rng>(
    field: &IntentField,
    domain: &Domain,
    tick: u64,
    options: &SpawnOptions,
    rng: &mut R,
) -> Particle {
    let position = random_position(domain, rng);
    let value = field.sample_world(&position, domain);
    create_from_field(value, position, tick, options, rng)
}

/// Number of particles the standard path may create this tick.
///
/// The integer part of the rate is guaranteed, the fractional part is a
/// probability. The result never exceeds the per-tick cap or the free capacity.
pub fn creation_budget<R: Rng>(
    rate: f64,
    current: usize,
    max_particles: usize,
    max_per_tick: usize,
    rng: &mut R,
) -> usize {
    let free = max_particles.saturating_sub(current);
    if free == 0 || rate.is_nan() || rate <= 0.0 {
        return 0;
    }
    let whole = rate.trunc();
    let fraction = rate - whole;
    let mut count = whole.min(max_per_tick as f64) as usize;
    if rng.gen::<f64>() < fraction {
        count += 1;
    }
    count.min(max_per_tick).min(free)
}
