use thiserror::Error;

/// Errors that can occur in graphyte-core.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed line in an edge or feature file.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    /// Node id outside `[0, num_nodes)`.
    #[error("invalid node id {node} (graph has {num_nodes} nodes)")]
    InvalidNode { node: usize, num_nodes: usize },
    /// Similarity queried before training produced embeddings.
    #[error("embeddings not ready: run training first")]
    EmbeddingsNotReady,
    /// Dimension mismatch between two tensors.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    /// Invalid configuration value.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type alias for graphyte-core.
pub type Result<T> = std::result::Result<T, Error>;
