//! Error types for asset loading

use std::path::PathBuf;

use purlovia_formats::{ContainerError, KeyValueError, ModInfoError, PackageError, StringError};
use thiserror::Error;

/// Broad classes of failure callers can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No file, mod, or export by that name
    NotFound,
    /// Input bytes or text are structurally invalid
    Corruption,
    /// The request has no defined meaning
    Unsupported,
    /// The filesystem failed underneath us
    Io,
    /// Invalid configuration or query
    Config,
}

/// Errors that can occur while resolving or loading assets
#[derive(Debug, Error)]
pub enum LoadError {
    /// No file exists under any recognised extension
    #[error("asset {0} not found")]
    AssetNotFound(String),

    /// The resolver has no mod by that name
    #[error("mod {0} not found")]
    ModNotFound(String),

    /// The asset has no export by that name
    #[error("export {export} not found in {asset}")]
    ExportNotFound {
        /// Canonical asset name
        asset: String,
        /// Requested export name
        export: String,
    },

    /// A class name was not of the form `<asset>.<export>`
    #[error("class name {0:?} is not of the form <asset>.<export>")]
    InvalidClassName(String),

    /// An asset file could not be parsed
    #[error("asset {name} is corrupt: {source}")]
    Package {
        /// Canonical asset name
        name: String,
        /// Underlying parse failure
        #[source]
        source: PackageError,
    },

    /// A reference could not be followed
    #[error("cannot follow {0}")]
    Unsupported(String),

    /// Traversal revisited an object or ran too deep
    #[error("reference cycle detected at {0}")]
    Cycle(String),

    /// Container decoding failed
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// Key-value text could not be parsed
    #[error(transparent)]
    KeyValue(#[from] KeyValueError),

    /// A mod descriptor could not be read
    #[error("mod descriptor: {0}")]
    ModInfo(#[from] ModInfoError),

    /// A mod data record could not be read or written
    #[error("mod data {}: {source}", path.display())]
    ModData {
        /// Record location
        path: PathBuf,
        /// JSON failure
        #[source]
        source: serde_json::Error,
    },

    /// A mod descriptor lacks a required field
    #[error("mod {mod_id} descriptor is missing {field}")]
    MissingModField {
        /// Mod id
        mod_id: String,
        /// Field name
        field: &'static str,
    },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Invalid name pattern
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Directory traversal failed
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AssetNotFound(_)
            | Self::ModNotFound(_)
            | Self::ExportNotFound { .. }
            | Self::InvalidClassName(_) => ErrorKind::NotFound,
            Self::Package { source, .. } => io_or_corruption(source.is_corruption()),
            Self::Container(e) => io_or_corruption(e.is_corruption()),
            Self::ModInfo(ModInfoError::String(e)) => string_kind(e),
            Self::Cycle(_)
            | Self::KeyValue(_)
            | Self::ModData { .. }
            | Self::MissingModField { .. } => ErrorKind::Corruption,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::Config(_) | Self::Pattern(_) => ErrorKind::Config,
            Self::ModInfo(_) | Self::Walk(_) | Self::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn package(name: &str, source: PackageError) -> Self {
        Self::Package {
            name: name.to_string(),
            source,
        }
    }
}

fn io_or_corruption(corrupt: bool) -> ErrorKind {
    if corrupt {
        ErrorKind::Corruption
    } else {
        ErrorKind::Io
    }
}

fn string_kind(error: &StringError) -> ErrorKind {
    match error {
        StringError::Io(e) if e.kind() != std::io::ErrorKind::UnexpectedEof => ErrorKind::Io,
        _ => ErrorKind::Corruption,
    }
}

/// Result type for loader operations
pub type LoadResult<T> = Result<T, LoadError>;
