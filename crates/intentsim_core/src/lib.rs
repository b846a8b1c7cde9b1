//! # IntentSim Core
//!
//! The simulation engine: a 3-D intent field, a population of charged
//! particles living in it, and the passes that move them, let them interact,
//! group them into clusters and measure what comes out.
//!
//! ## Architecture
//!
//! - **Data** lives in `intentsim_data` (particles, events, snapshot, state).
//! - **Systems** are free functions over slices and small state holders; they
//!   never reach into each other.
//! - **[`Universe`]** owns all mutable state and runs the systems in a fixed
//!   order once per tick.
//! - **Determinism**: with a seed and `deterministic = true`, two universes
//!   built from the same configuration produce identical trajectories.
//!
//! ## Example
//!
//! ```
//! use intentsim_core::{SimulationConfig, Universe};
//!
//! let config = SimulationConfig {
//!     seed: Some(42),
//!     initial_particles: 10,
//!     ..Default::default()
//! };
//! let mut universe = Universe::new(config).unwrap();
//! let _events = universe.tick();
//! assert_eq!(universe.snapshot().frame, 1);
//! ```

/// Configuration and tuning constants
pub mod config;
/// Error types
pub mod error;
/// The intent field grid
pub mod field;
/// Particle creation
pub mod lifecycle;
/// Uniform-grid neighbour index
pub mod spatial_hash;
/// Live particle collection
pub mod store;
/// Per-tick passes (motion, interaction, clustering, statistics, anomalies, inflation)
pub mod systems;
/// Tick metrics and logging setup
pub mod telemetry;
/// The simulation clock
pub mod universe;

pub use config::{BoundaryMode, Domain, SimulationConfig, StabilityMetric, Tuning};
pub use error::{Result, SimError};
pub use field::{FieldAnalysis, IntentField};
pub use systems::cluster::{Cluster, ClusterDetection};
pub use telemetry::{init_logging, Metrics};
pub use universe::Universe;
