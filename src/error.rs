use thiserror::Error;

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Input slice is empty.
    #[error("empty input")]
    EmptyInput,

    /// An item's label is empty after normalization.
    #[error("item {index} has an empty label")]
    EmptyLabel {
        /// Position of the offending item in the input.
        index: usize,
    },

    /// Invalid parameter value passed to an algorithm.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// Invalid taxonomy configuration, rejected at construction.
    #[error("invalid configuration {name}: {message}")]
    InvalidConfig {
        /// Setting name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// Requested cluster count is incompatible with the dataset.
    #[error("invalid cluster count: requested {requested}, but dataset has {n_items} items")]
    InvalidClusterCount {
        /// Requested number of clusters.
        requested: usize,
        /// Number of items in the dataset.
        n_items: usize,
    },

    /// Points in a dataset have inconsistent dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// The text encoder failed or returned malformed output.
    #[error("encoder: {0}")]
    Encoder(String),

    /// A persisted embedding cache was written by a different encoder.
    #[error("embedding cache belongs to encoder {found:?}, expected {expected:?}")]
    CacheMismatch {
        /// Identity of the encoder in use.
        expected: String,
        /// Identity recorded in the cache.
        found: String,
    },

    /// I/O failure while reading or writing persisted state.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed persisted state.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
