//! Error types for HashTag codec operations

use thiserror::Error;

/// Errors returned by codec construction, repair, reconstruction and joining.
///
/// Every error is local and deterministic. A failed call leaves the shard
/// buffers it was writing in an unspecified state.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Invalid (k, m) at construction time
    #[error("Invalid codec configuration: {0}")]
    Config(String),

    /// More shards failed than the repair schedule tolerates
    #[error(
        "Cannot repair: {failed} failed shards but the repair schedule tolerates only {tolerated}"
    )]
    Unrepairable { failed: usize, tolerated: usize },

    /// The chosen source shards yield a non-invertible decoding matrix
    #[error("Decoding matrix for sources {0:?} is singular")]
    SingularMatrix(Vec<usize>),

    /// A shard buffer has the wrong length
    #[error("Shard {shard} buffer is {actual} bytes, expected {expected}")]
    ShortBuffer {
        shard: usize,
        expected: usize,
        actual: usize,
    },

    /// The shard arena was laid out for a different codec
    #[error(
        "Shard arena holds {shards} shards of {subchunks} subchunks, codec expects {expected_shards} of {expected_subchunks}"
    )]
    GeometryMismatch {
        shards: usize,
        subchunks: usize,
        expected_shards: usize,
        expected_subchunks: usize,
    },

    /// Shard index outside `[0, k+m)`
    #[error("Shard index {index} out of range for {total} shards")]
    InvalidShardIndex { index: usize, total: usize },

    /// Source selection for the full decoder is not `k` distinct shards
    #[error("Invalid source shards {sources:?}: need {required} distinct indices")]
    InvalidSources { sources: Vec<usize>, required: usize },

    /// Fewer than `k` shards survive
    #[error("Cannot reconstruct: {available} shards available but {required} required")]
    InsufficientShards { available: usize, required: usize },

    /// Requested output length exceeds the data held by the data shards
    #[error("Requested length {requested} exceeds {available} bytes of data")]
    LengthOutOfRange { requested: u64, available: u64 },

    /// Writing joined output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Result with CodecError
pub type Result<T> = std::result::Result<T, CodecError>;
