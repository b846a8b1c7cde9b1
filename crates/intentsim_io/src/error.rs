//! Errors raised while moving engine state in and out of the process.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    /// A value could not be written in the named format.
    #[error("failed to encode {format}: {reason}")]
    Encode {
        format: &'static str,
        reason: String,
    },

    /// Bytes were not a valid instance of the named format.
    #[error("failed to decode {format}: {reason}")]
    Decode {
        format: &'static str,
        reason: String,
    },

    #[error("I/O failure: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Input rejected before any decoding was attempted.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Decoded fine, but the engine refused the state or configuration.
    #[error("state rejected by engine: {0}")]
    Simulation(#[from] intentsim_core::SimError),

    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<IoError>,
    },
}

pub type Result<T> = std::result::Result<T, IoError>;

impl IoError {
    #[must_use]
    pub fn encode<S: Into<String>>(format: &'static str, reason: S) -> Self {
        Self::Encode {
            format,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn decode<S: Into<String>>(format: &'static str, reason: S) -> Self {
        Self::Decode {
            format,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Wraps the error with a description of what was being attempted.
    #[must_use]
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context layers.
    #[must_use]
    pub fn root(&self) -> &IoError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}
