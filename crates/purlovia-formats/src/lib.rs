//! File formats for ARK: Survival Evolved game data and workshop mods
//!
#![allow(clippy::cast_possible_wrap)] // Intentional for binary format fields
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::cast_precision_loss)] // Size reporting
#![allow(clippy::redundant_closure_for_method_calls)] // Iterator chains
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! This crate provides readers, and symmetric writers where the format is
//! produced by tooling, for the file formats met while extracting data from
//! the game and its downloaded mods.
//!
//! # Supported Formats
//!
//! - **Strings**: length-prefixed text fields shared by every binary format
//! - **Key-value text**: bracketed `.acf` / `.vdf` manifests from the package manager
//! - **Container**: chunked zlib packages that workshop mods are downloaded as
//! - **Mod descriptors**: `mod.info` and `modmeta.info` shipped with each mod
//! - **Package**: UE4 asset summary, name/import/export tables and tagged properties
//!
//! # Design Principles
//!
//! - **Validate before use**: structural checks run before payload bytes are trusted
//! - **Typed errors**: one error enum per format, each able to say whether it
//!   describes corrupt input
//! - **Streaming where it matters**: containers decode chunk by chunk

#![warn(missing_docs)]

pub mod container;
pub mod keyvalue;
pub mod modinfo;
pub mod package;
pub mod strings;

pub use container::{ContainerError, ContainerResult};
pub use keyvalue::{KeyValue, KeyValueDocument, KeyValueError};
pub use modinfo::{ModInfo, ModInfoError, ModMetaInfo};
pub use package::{Package, PackageError, PackageResult};
pub use strings::{StringError, read_string, write_string};
