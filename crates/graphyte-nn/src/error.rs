//! Error types for graphyte-nn.

use thiserror::Error;

/// graphyte-nn error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Error from the core graph/feature types.
    #[error(transparent)]
    Core(#[from] graphyte_core::Error),

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// `backward` was called on a layer that has not run `forward`.
    #[error("backward called before forward")]
    MissingActivations,

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
