//! Shared data structures for the IntentSim engine.
//!
//! Everything in this crate is plain data: particles, the events a tick can
//! emit, the per-tick statistics snapshot and the persisted state shape.
//! Behaviour lives in `intentsim_core`.

pub mod data;

pub use data::event::{
    AnomalyEvent, AnomalyKind, EmergentEntity, InflationEvent, LiveEvent, NarrativeTone,
    NarrativeTrigger,
};
pub use data::particle::{Charge, Particle, ParticleType, Position, Velocity, CHARGE_THRESHOLD};
pub use data::snapshot::{ChargeCounts, SimulationSnapshot, SimulationState, TypeCounts};
