//! Headless application: configuration, the tick loop and its stop signal.

pub mod config;
pub mod runner;
pub mod shutdown;

pub use config::{AppConfig, RunnerConfig};
pub use runner::{RunSummary, Runner};
pub use shutdown::StopSignal;
