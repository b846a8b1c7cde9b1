use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Field magnitude above which a newborn particle carries a charge.
pub const CHARGE_THRESHOLD: f64 = 0.2;

/// Position of a particle in domain units.
#[derive(
    Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Archive, RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    #[must_use]
    pub fn distance_squared(&self, other: &Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        dx * dx + dy * dy + dz * dz
    }

    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Position) -> f64 {
        self.distance_squared(other).sqrt()
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Velocity of a particle in domain units per tick.
#[derive(
    Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Archive, RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
}

impl Velocity {
    #[must_use]
    pub fn new(vx: f64, vy: f64, vz: f64) -> Self {
        Self { vx, vy, vz }
    }

    #[must_use]
    pub fn speed(&self) -> f64 {
        (self.vx * self.vx + self.vy * self.vy + self.vz * self.vz).sqrt()
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.vx.is_finite() && self.vy.is_finite() && self.vz.is_finite()
    }
}

/// Charge classification governing interaction bias.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
#[serde(rename_all = "lowercase")]
pub enum Charge {
    Positive,
    Negative,
    Neutral,
}

impl Charge {
    pub const ALL: [Charge; 3] = [Charge::Positive, Charge::Negative, Charge::Neutral];

    /// Classifies a field sample. Pure: the same value always yields the same charge.
    #[must_use]
    pub fn from_field(value: f64) -> Self {
        if value > CHARGE_THRESHOLD {
            Charge::Positive
        } else if value < -CHARGE_THRESHOLD {
            Charge::Negative
        } else {
            Charge::Neutral
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Charge::Positive => "positive",
            Charge::Negative => "negative",
            Charge::Neutral => "neutral",
        }
    }
}

/// Particle species.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
#[serde(rename_all = "kebab-case")]
pub enum ParticleType {
    #[default]
    Standard,
    HighEnergy,
    Quantum,
    Composite,
    Adaptive,
}

/// A single simulated particle.
///
/// Field names serialise in camelCase; this is part of the persisted state
/// shape consumed by external exporters.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
#[serde(rename_all = "camelCase")]
pub struct Particle {
    pub id: Uuid,
    pub position: Position,
    pub velocity: Velocity,
    pub charge: Charge,
    #[serde(rename = "type")]
    pub kind: ParticleType,
    pub radius: f64,
    pub mass: f64,
    pub intent: f64,
    pub intent_decay_rate: f64,
    pub energy: f64,
    pub energy_capacity: f64,
    /// Accumulated knowledge. Only decays in energy-conservation mode.
    pub knowledge: f64,
    /// Structural complexity in `[1, 10]`.
    pub complexity: f64,
    /// Age in ticks.
    pub age: u64,
    pub interaction_count: u64,
    pub last_interaction_tick: u64,
    #[serde(default)]
    pub cluster_id: Option<u32>,
    #[serde(default)]
    pub is_post_inflation: bool,
    #[serde(default)]
    pub created_tick: u64,
}

impl Particle {
    /// True when every numeric attribute is finite, the radius is non-negative
    /// and the mass positive.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.position.is_finite()
            && self.velocity.is_finite()
            && self.radius.is_finite()
            && self.radius >= 0.0
            && self.mass.is_finite()
            && self.mass > 0.0
            && self.intent.is_finite()
            && self.intent_decay_rate.is_finite()
            && self.energy.is_finite()
            && self.energy_capacity.is_finite()
            && self.knowledge.is_finite()
            && self.complexity.is_finite()
    }
}
