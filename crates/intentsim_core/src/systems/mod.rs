//! Per-tick passes. Each takes what it needs as arguments and reports back;
//! none of them reaches into another's state.

pub mod anomaly;
pub mod cluster;
pub mod inflation;
pub mod interaction;
pub mod motion;
pub mod stats;
