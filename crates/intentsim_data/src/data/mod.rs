//! Core data structures for the IntentSim engine.

pub mod event;
pub mod particle;
pub mod snapshot;
