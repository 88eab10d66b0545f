use thiserror::Error;

/// LayerLens error types.
///
/// Only structural problems surface as errors. Missing package data
/// (version, license, source url, no packages for a layer) is recorded as
/// report notes and never aborts an analysis.
#[derive(Error, Debug)]
pub enum LensError {
    /// Layer history is shorter than the declared base layer count.
    #[error("alignment error: insufficient history ({history_len} entries, {base_layers} base layers expected)")]
    InsufficientHistory {
        base_layers: usize,
        history_len: usize,
    },

    /// Layer cache could not be read or written.
    #[error("cache error: {0}")]
    CacheError(String),

    /// Dockerfile could not be read or scanned.
    #[error("dockerfile error: {0}")]
    DockerfileError(String),

    /// Image metadata could not be obtained.
    #[error("image error: {0}")]
    ImageError(String),

    /// Container runtime operation failed.
    #[error("runtime error: {0}")]
    RuntimeError(String),

    /// Command knowledge lookup failed structurally.
    #[error("command library error: {0}")]
    LibraryError(String),

    /// Report artifact could not be written.
    #[error("report error: {0}")]
    ReportError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for LensError {
    fn from(err: serde_json::Error) -> Self {
        LensError::SerializationError(err.to_string())
    }
}

impl LensError {
    /// Whether the error is structural: the run must surface a non-zero
    /// exit even though a partial report may already have been written.
    pub fn is_structural(&self) -> bool {
        !matches!(self, LensError::Other(_))
    }
}

/// Result type alias for LayerLens operations.
pub type Result<T> = std::result::Result<T, LensError>;
