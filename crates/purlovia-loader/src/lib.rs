//! Asset name resolution and cached loading for ARK: Survival Evolved
//!
//! This crate sits between raw game files and anything that wants to walk
//! game data. It turns loosely written asset names into canonical ones,
//! maps mod tags to workshop ids and back, loads and links asset packages,
//! and keeps every linked asset in a cache so each file is parsed once.
//!
//! # Components
//!
//! - [`PathCanonicalizer`]: canonical names and on-disk paths
//! - [`ModResolver`]: mod id and tag mapping, with ini, scanned-install and
//!   fixed-map strategies
//! - [`AssetLoader`]: retrieval, reference traversal, class lookup and
//!   enumeration, backed by an [`AssetCache`](purlovia_cache::AssetCache)
//! - [`mods`]: `_moddata.json` records for installed mods
//!
//! # Example
//!
//! ```no_run
//! use purlovia_loader::{AssetLoader, FixedModResolver, LoaderConfig};
//!
//! # fn main() -> Result<(), purlovia_loader::LoadError> {
//! let config = LoaderConfig::new("/srv/ark/ShooterGame");
//! let resolver = FixedModResolver::new([("ClassicFlyers", "895711211")]);
//! let mut loader = AssetLoader::with_memory_cache(config, resolver)?;
//!
//! let rex = loader.retrieve("/Game/PrimalEarth/Dinos/Rex/Rex_Character_BP")?;
//! println!("{} has {} exports", rex.name, rex.exports.len());
//!
//! for class in loader.ancestry("/Game/Mods/ClassicFlyers/Wyvern.Wyvern_C")? {
//!     println!("  {class}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod asset;
pub mod config;
pub mod error;
pub mod loader;
pub mod mods;
pub mod paths;
pub mod query;
pub mod resolver;

pub use asset::{Asset, Export, ExportRef, Import, Node, ObjectRef, Property, PropertyValue};
pub use config::LoaderConfig;
pub use error::{ErrorKind, LoadError, LoadResult};
pub use loader::{AssetLoader, LoaderStats, MAX_TRAVERSAL_DEPTH};
pub use mods::ModData;
pub use paths::PathCanonicalizer;
pub use query::{AssetNames, AssetQuery};
pub use resolver::{FixedModResolver, IniModResolver, ModResolver, ScannedModResolver};
