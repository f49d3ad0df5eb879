//! Package error types

use thiserror::Error;

use crate::strings::StringError;

/// Errors raised while parsing or building an asset package
#[derive(Debug, Error)]
pub enum PackageError {
    /// Summary does not start with the package tag
    #[error("invalid package tag: expected 0x9E2A83C1, got {0:#010X}")]
    InvalidTag(u32),

    /// Legacy file version outside the supported range
    #[error("unsupported legacy file version: {0}")]
    UnsupportedLegacyVersion(i32),

    /// Package was saved without engine version information
    #[error("unversioned packages are not supported")]
    Unversioned,

    /// A table count or offset is negative or points outside the file
    #[error("{table} table out of bounds: {count} entries at offset {offset}")]
    TableOutOfBounds {
        /// Table name
        table: &'static str,
        /// Declared entry count
        count: i32,
        /// Declared byte offset
        offset: i64,
    },

    /// A name reference does not index the name table
    #[error("name index {0} out of range")]
    NameIndexOutOfRange(i32),

    /// An object reference does not index the import or export table
    #[error("object index {0} out of range")]
    ObjectIndexOutOfRange(i32),

    /// Serialized export data lies outside the file
    #[error("export {export} data out of bounds: {size} bytes at offset {offset}")]
    SerialDataOutOfBounds {
        /// Zero-based export index
        export: usize,
        /// Declared offset
        offset: i64,
        /// Declared size
        size: i64,
    },

    /// A property value did not consume exactly its declared size
    #[error("property {property} declares {expected} bytes but {actual} were read")]
    PropertySizeMismatch {
        /// Property name
        property: String,
        /// Size from the property tag
        expected: i64,
        /// Bytes consumed by the value
        actual: i64,
    },

    /// A string field could not be read
    #[error("string field: {0}")]
    String(#[from] StringError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

impl PackageError {
    /// Whether the error describes malformed package bytes rather than an
    /// environmental failure.
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::Io(e) | Self::BinRw(binrw::Error::Io(e)) | Self::String(StringError::Io(e)) => {
                e.kind() == std::io::ErrorKind::UnexpectedEof
            }
            _ => true,
        }
    }
}

/// Result type for package operations
pub type PackageResult<T> = Result<T, PackageError>;
