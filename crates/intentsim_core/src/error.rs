//! Error types for the simulation core.

use thiserror::Error;

/// Errors raised while building or restoring an engine.
///
/// Ticking never fails; only construction-time inputs are validated.
#[derive(Error, Debug)]
pub enum SimError {
    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A persisted state could not be turned back into an engine.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The configuration file could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    #[must_use]
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    #[must_use]
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Self::InvalidState(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimError::invalid_config("max_particles must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: max_particles must be positive"
        );
    }
}
