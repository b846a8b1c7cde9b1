use crate::config::{BoundaryMode, Domain, MotionTuning};
use crate::field::IntentField;
use crate::store::ParticleStore;
use intentsim_data::{Charge, Particle};
use rand::Rng;

/// Everything a motion step reads besides the particles themselves.
pub struct MotionContext<'a> {
    pub field: &'a IntentField,
    pub domain: &'a Domain,
    pub boundary: BoundaryMode,
    pub tuning: &'a MotionTuning,
    pub energy_conservation: bool,
    pub dt: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionReport {
    /// Removed by the `disappear` boundary policy.
    pub escaped: usize,
    /// Removed for running out of energy.
    pub exhausted: usize,
}

impl MotionReport {
    #[must_use]
    pub fn removed(&self) -> usize {
        self.escaped + self.exhausted
    }
}

#[must_use]
pub fn charge_multiplier(charge: Charge, tuning: &MotionTuning) -> f64 {
    match charge {
        Charge::Positive => tuning.positive_multiplier,
        Charge::Neutral => tuning.neutral_multiplier,
        Charge::Negative => tuning.negative_multiplier,
    }
}

/// Applies the boundary policy on one axis. Returns `false` if the particle left
/// the domain under `disappear`.
fn handle_axis(pos: &mut f64, vel: &mut f64, extent: f64, mode: BoundaryMode, damping: f64) -> bool {
    match mode {
        BoundaryMode::Wrap => {
            *pos = pos.rem_euclid(extent);
            // rem_euclid can round up to `extent` for tiny negatives.
            if *pos >= extent {
                *pos = 0.0;
            }
            true
        }
        BoundaryMode::Bounce => {
            if *pos < 0.0 {
                *pos = 0.0;
                *vel = vel.abs() * damping;
            } else if *pos > extent {
                *pos = extent;
                *vel = -vel.abs() * damping;
            }
            true
        }
        BoundaryMode::Disappear => (0.0..=extent).contains(pos),
    }
}

/// Moves one particle. Returns `(inside, alive)`.
fn step_particle<R: Rng>(p: &mut Particle, ctx: &MotionContext, rng: &mut R) -> (bool, bool) {
    let t = ctx.tuning;

    p.position.x += p.velocity.vx * ctx.dt;
    p.position.y += p.velocity.vy * ctx.dt;
    p.position.z += p.velocity.vz * ctx.dt;

    let inside = handle_axis(
        &mut p.position.x,
        &mut p.velocity.vx,
        ctx.domain.width,
        ctx.boundary,
        t.bounce_damping,
    ) & handle_axis(
        &mut p.position.y,
        &mut p.velocity.vy,
        ctx.domain.height,
        ctx.boundary,
        t.bounce_damping,
    ) & handle_axis(
        &mut p.position.z,
        &mut p.velocity.vz,
        ctx.domain.depth,
        ctx.boundary,
        t.bounce_damping,
    );
    if !inside {
        return (false, false);
    }

    let value = ctx.field.sample_world(&p.position, ctx.domain);
    let push = value * t.field_force * charge_multiplier(p.charge, t);
    p.velocity.vx += push;
    p.velocity.vy += push;
    p.velocity.vz += push * t.depth_response;

    p.velocity.vx = p.velocity.vx * t.damping + (rng.gen::<f64>() - 0.5) * t.jitter;
    p.velocity.vy = p.velocity.vy * t.damping + (rng.gen::<f64>() - 0.5) * t.jitter;
    p.velocity.vz =
        p.velocity.vz * t.damping + (rng.gen::<f64>() - 0.5) * t.jitter * t.depth_response;

    p.age += 1;

    if ctx.energy_conservation {
        let decay = p.intent_decay_rate * ctx.dt;
        p.intent = if p.intent > 0.0 {
            (p.intent - decay).max(0.0)
        } else {
            (p.intent + decay).min(0.0)
        };
        p.knowledge = (p.knowledge - t.knowledge_decay_rate * ctx.dt).max(0.0);
        p.energy -= t.energy_decay * ctx.dt;
        if p.energy <= t.cull_energy {
            return (true, false);
        }
    }

    (true, true)
}

/// Advances every particle by `ctx.dt`.
///
/// Order per particle: integrate position, apply the boundary policy, add the
/// field push, damp and jitter, age, then decay under energy conservation.
/// Removed particles are dropped from the store before returning.
pub fn advance<R: Rng>(store: &mut ParticleStore, ctx: &MotionContext, rng: &mut R) -> MotionReport {
    let mut report = MotionReport::default();
    let mut keep = Vec::with_capacity(store.len());

    for p in store.iter_mut() {
        let (inside, alive) = step_particle(p, ctx, rng);
        if !inside {
            report.escaped += 1;
        } else if !alive {
            report.exhausted += 1;
        }
        keep.push(inside && alive);
    }

    let mut flags = keep.into_iter();
    store.retain(|_| flags.next().unwrap_or(true));
    report
}
