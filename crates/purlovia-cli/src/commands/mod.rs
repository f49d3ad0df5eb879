//! Subcommand definitions and handlers

pub mod assets;
pub mod container;
pub mod mods;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use purlovia_loader::{AssetLoader, FixedModResolver, LoaderConfig};
use serde::Serialize;
use tracing::debug;

/// JSON printer shared by every handler
#[derive(Debug, Clone, Copy)]
pub struct Output {
    compact: bool,
}

impl Output {
    pub fn new(compact: bool) -> Self {
        Self { compact }
    }

    pub fn print<T: Serialize + ?Sized>(self, value: &T) -> Result<()> {
        let text = if self.compact {
            serde_json::to_string(value)
        } else {
            serde_json::to_string_pretty(value)
        }
        .context("Failed to serialize output")?;
        println!("{text}");
        Ok(())
    }
}

/// Options shared by every command that needs an asset loader
#[derive(Args, Debug, Clone)]
pub struct LoaderArgs {
    /// Game directory containing `Content/`
    #[arg(long, env = "PURLOVIA_ASSET_ROOT")]
    pub root: Option<PathBuf>,

    /// JSON loader configuration file
    #[arg(long, env = "PURLOVIA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ini file with an `[ids]` section mapping mod ids to tags
    #[arg(long, env = "PURLOVIA_MODS_INI")]
    pub mods_ini: Option<PathBuf>,

    /// Map a mod tag to its id, as TAG=ID. Replaces the configured resolver
    #[arg(long = "mod", value_name = "TAG=ID", value_parser = parse_mod_pair)]
    pub mods: Vec<(String, String)>,
}

impl LoaderArgs {
    /// Effective configuration: file first, then command-line overrides
    pub fn config(&self) -> Result<LoaderConfig> {
        let mut config = match &self.config {
            Some(path) => LoaderConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => LoaderConfig::default(),
        };
        if let Some(root) = &self.root {
            config.asset_root.clone_from(root);
        }
        if let Some(ini) = &self.mods_ini {
            config = config.with_mods_ini(ini);
        }
        Ok(config)
    }

    pub fn open(&self) -> Result<AssetLoader> {
        let config = self.config()?;
        debug!(?config, "Opening asset loader");
        let root = config.asset_root.display().to_string();

        let loader = if self.mods.is_empty() {
            AssetLoader::from_config(config)
        } else {
            let resolver = FixedModResolver::new(self.mods.iter().map(|(t, i)| (t, i)));
            AssetLoader::with_memory_cache(config, resolver)
        };
        loader.with_context(|| format!("Failed to open asset root {root}"))
    }
}

fn parse_mod_pair(text: &str) -> Result<(String, String), String> {
    let (tag, id) = text
        .split_once('=')
        .ok_or_else(|| format!("expected TAG=ID, got {text:?}"))?;
    let (tag, id) = (tag.trim(), id.trim());
    if tag.is_empty() || id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("expected TAG=ID with a numeric id, got {text:?}"));
    }
    Ok((tag.to_string(), id.to_string()))
}

/// Container subcommands
#[derive(Subcommand, Debug)]
pub enum ContainerCommand {
    /// Decode a compressed container file
    Unpack {
        /// Compressed input
        src: PathBuf,
        /// Decoded output, written atomically
        dst: PathBuf,
    },

    /// Encode a file as a compressed container
    Pack {
        /// Plain input
        src: PathBuf,
        /// Compressed output
        dst: PathBuf,
        /// Nominal uncompressed chunk size in bytes
        #[arg(long, default_value_t = purlovia_formats::container::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// zlib level, 0-9
        #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=9))]
        level: u32,
    },

    /// Decode a downloaded mod tree: `.z` files are decoded, others copied
    UnpackMod {
        /// Downloaded mod directory
        src: PathBuf,
        /// Install directory
        dst: PathBuf,
    },
}

/// Mod and metadata subcommands
#[derive(Subcommand, Debug)]
pub enum ModCommand {
    /// Show installed mod records, or collate one mod's descriptors
    ModInfo {
        /// Mod id to collate; lists every installed mod when omitted
        id: Option<String>,
        /// Write the collated record to the mod's `_moddata.json`
        #[arg(long, requires = "id")]
        write: bool,
        #[command(flatten)]
        loader: LoaderArgs,
    },

    /// Parse a bracketed key-value file such as an `.acf` manifest
    Keyvalue {
        /// File to parse
        file: PathBuf,
        /// Only print the value at this `/`-separated path
        #[arg(long)]
        path: Option<String>,
    },
}

/// Asset subcommands
#[derive(Subcommand, Debug)]
pub enum AssetCommand {
    /// Load and link an asset
    Asset {
        /// Asset name or file path
        name: String,
        /// Parse tables only, without linking or caching
        #[arg(long)]
        shallow: bool,
        #[command(flatten)]
        loader: LoaderArgs,
    },

    /// Dump the leading bytes of an asset file as hex
    Raw {
        /// Asset name
        name: String,
        /// Number of bytes to show
        #[arg(long, default_value_t = 64)]
        bytes: usize,
        #[command(flatten)]
        loader: LoaderArgs,
    },

    /// List asset names matching a pattern
    Find {
        /// Regular expression matched at the start of canonical names
        pattern: String,
        /// Only search below this asset path
        #[arg(long, default_value = "/Game")]
        under: String,
        /// Drop names matching this expression; may be repeated
        #[arg(long)]
        exclude: Vec<String>,
        /// Accepted file extension; may be repeated
        #[arg(long = "ext", default_value = ".uasset")]
        extensions: Vec<String>,
        #[command(flatten)]
        loader: LoaderArgs,
    },

    /// Print the class chain of `<asset>.<export>`
    Ancestry {
        /// Qualified class name, e.g. /Game/Dinos/Rex/Rex_Character_BP.Rex_Character_BP_C
        class: String,
        #[command(flatten)]
        loader: LoaderArgs,
    },
}
