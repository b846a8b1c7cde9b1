//! Headless runner for the IntentSim engine.
//!
//! The engine lives in `intentsim_core`; this crate wires it to a state store,
//! an event journal and a narrative chronicle, and drives it from a timer.

pub mod app;
