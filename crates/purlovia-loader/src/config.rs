//! Loader configuration

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, LoadResult};

/// Extensions tried, in order, when locating an asset file
pub const DEFAULT_EXTENSIONS: [&str; 2] = [".uasset", ".umap"];

/// Official pseudo-mods shipped with the game, by id
pub const DEFAULT_OFFICIAL_MODS: [(&str, &str); 1] = [("111111111", "PrimitivePlus")];

/// Configuration for an [`AssetLoader`](crate::AssetLoader)
///
/// Passed explicitly at construction; nothing is read from process-wide state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Game directory containing `Content/`
    pub asset_root: PathBuf,
    /// File extensions tried in order by `retrieve`
    pub extensions: Vec<String>,
    /// Official pseudo-mods registered with the scanned-install resolver
    pub official_mods: BTreeMap<String, String>,
    /// Optional ini-style id table with an `[ids]` section
    pub mods_ini: Option<PathBuf>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("."),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            official_mods: DEFAULT_OFFICIAL_MODS
                .iter()
                .map(|(id, tag)| ((*id).to_string(), (*tag).to_string()))
                .collect(),
            mods_ini: None,
        }
    }
}

impl LoaderConfig {
    /// Configuration rooted at `asset_root` with default extensions
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
            ..Self::default()
        }
    }

    /// Replace the extension search order
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Register an official pseudo-mod
    #[must_use]
    pub fn with_official_mod(mut self, id: impl Into<String>, tag: impl Into<String>) -> Self {
        self.official_mods.insert(id.into(), tag.into());
        self
    }

    /// Use an ini-style mod table
    #[must_use]
    pub fn with_mods_ini(mut self, path: impl Into<PathBuf>) -> Self {
        self.mods_ini = Some(path.into());
        self
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> LoadResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|source| LoadError::Config(format!("{}: {source}", path.display())))
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> LoadResult<()> {
        if !self.asset_root.is_dir() {
            return Err(LoadError::Config(format!(
                "asset root {} is not a directory",
                self.asset_root.display()
            )));
        }

        if self.extensions.is_empty() {
            return Err(LoadError::Config("at least one extension is required".to_string()));
        }

        if let Some(bad) = self.extensions.iter().find(|e| !e.starts_with('.') || e.len() < 2) {
            return Err(LoadError::Config(format!("extension {bad:?} must start with a dot")));
        }

        if let Some(bad) = self.official_mods.keys().find(|id| !is_numeric(id)) {
            return Err(LoadError::Config(format!("official mod id {bad:?} is not numeric")));
        }

        Ok(())
    }
}

/// True for a non-empty string of ASCII digits
pub(crate) fn is_numeric(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}
