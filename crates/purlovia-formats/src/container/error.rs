//! Container error types

use thiserror::Error;

/// Errors raised while decoding, encoding or unpacking a chunked container
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Header does not start with the package tag
    #[error("invalid container magic: expected 0x9E2A83C1, got {0:#010X}")]
    InvalidMagic(u64),

    /// Descriptor table does not add up to the header's total
    #[error("chunk sizes sum to {actual} bytes but the header declares {expected}")]
    ChunkSumMismatch {
        /// Total uncompressed size from the header
        expected: u64,
        /// Sum of descriptor uncompressed sizes
        actual: u64,
    },

    /// A chunk inflated to a different size than its descriptor declares
    #[error("chunk {index} inflated to {actual} bytes, descriptor declares {expected}")]
    ChunkSizeMismatch {
        /// Zero-based chunk index
        index: usize,
        /// Size from the descriptor
        expected: u64,
        /// Size actually produced
        actual: u64,
    },

    /// A chunk other than the last is not the nominal chunk size
    #[error("chunk {index} is {actual} bytes, expected the nominal {nominal}")]
    UnexpectedChunkSize {
        /// Zero-based chunk index
        index: usize,
        /// Nominal chunk size from the header
        nominal: u64,
        /// Size actually produced
        actual: u64,
    },

    /// A chunk's declared sizes exceed the decoder limit
    #[error("chunk {index} declares {size} bytes, limit is {max}")]
    ChunkTooLarge {
        /// Zero-based chunk index
        index: usize,
        /// Declared size
        size: u64,
        /// Maximum accepted size
        max: u64,
    },

    /// Fewer payload bytes were available than a descriptor declares
    #[error("chunk {index} truncated: expected {expected} compressed bytes, got {actual}")]
    TruncatedChunk {
        /// Zero-based chunk index
        index: usize,
        /// Compressed size from the descriptor
        expected: u64,
        /// Bytes available
        actual: u64,
    },

    /// Header or descriptor table ended early
    #[error("container truncated while reading the {0}")]
    Truncated(&'static str),

    /// A chunk is not a valid zlib stream
    #[error("chunk {index} failed to inflate: {message}")]
    Decompression {
        /// Zero-based chunk index
        index: usize,
        /// Decoder message
        message: String,
    },

    /// Builder was given a chunk size of zero
    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(usize),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

impl ContainerError {
    /// Whether the error describes malformed container bytes rather than an
    /// environmental failure.
    pub fn is_corruption(&self) -> bool {
        !matches!(
            self,
            Self::Io(_) | Self::BinRw(binrw::Error::Io(_)) | Self::InvalidChunkSize(_)
        )
    }
}

/// Result type for container operations
pub type ContainerResult<T> = Result<T, ContainerError>;
