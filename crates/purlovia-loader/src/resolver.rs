//! Mod identity resolution
//!
//! Mods are addressed both by numeric workshop id (`/Game/Mods/895711211/...`)
//! and by the tag the mod authors chose (`/Game/Mods/ClassicFlyers/...`). A
//! [`ModResolver`] maps between the two.
//!
//! Three strategies are provided:
//!
//! - [`IniModResolver`]: a hand-maintained `[ids]` section in an ini file
//! - [`ScannedModResolver`]: `_moddata.json` records found under an install,
//!   plus the official pseudo-mods
//! - [`FixedModResolver`]: an explicit map, for bootstrapping a single mod

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{LoadError, LoadResult};
use crate::mods::find_installed_mods;

/// Bidirectional mod id to name mapping
pub trait ModResolver {
    /// Build the lookup tables. Called once by the loader before first use.
    fn initialise(&mut self) -> LoadResult<()> {
        Ok(())
    }

    /// Name for a mod id. Unknown ids are returned unchanged.
    fn name_from_id(&self, id: &str) -> String;

    /// Id for a mod name, compared case-insensitively
    fn id_from_name(&self, name: &str) -> LoadResult<String>;
}

/// Lookup tables shared by the resolver strategies
#[derive(Debug, Clone, Default)]
struct ModTable {
    names: BTreeMap<String, String>,
    ids: HashMap<String, String>,
}

impl ModTable {
    fn insert(&mut self, id: &str, name: &str) {
        let key = name.to_lowercase();
        if let Some(existing) = self.ids.get(&key)
            && existing != id
        {
            warn!(name, existing = %existing, id, "Mod name registered to two ids, keeping the latest");
            self.names.remove(existing.as_str());
        }
        if let Some(old_name) = self.names.insert(id.to_string(), name.to_string()) {
            self.ids.remove(&old_name.to_lowercase());
        }
        self.ids.insert(key, id.to_string());
    }

    fn name_from_id(&self, id: &str) -> String {
        self.names.get(id).cloned().unwrap_or_else(|| id.to_string())
    }

    fn id_from_name(&self, name: &str) -> LoadResult<String> {
        self.ids
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| LoadError::ModNotFound(name.to_string()))
    }

    fn clear(&mut self) {
        self.names.clear();
        self.ids.clear();
    }

    fn len(&self) -> usize {
        self.names.len()
    }
}

/// Resolver backed by the `[ids]` section of an ini file
///
/// ```ini
/// [ids]
/// 895711211 = ClassicFlyers  ; inline comments are allowed
/// 1090809604 = Pyria
/// ```
#[derive(Debug, Clone)]
pub struct IniModResolver {
    path: PathBuf,
    table: ModTable,
}

impl IniModResolver {
    /// Resolver reading `path` on initialisation
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: ModTable::default(),
        }
    }

    /// Resolver built directly from ini text
    pub fn from_ini_str(text: &str) -> LoadResult<Self> {
        let mut resolver = Self::new(PathBuf::new());
        resolver.load(text)?;
        Ok(resolver)
    }

    /// Location of the ini file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&mut self, text: &str) -> LoadResult<()> {
        self.table.clear();
        let mut in_ids = false;
        let mut seen_ids = false;

        for line in text.lines() {
            let line = strip_comment(line).trim();
            if line.is_empty() {
                continue;
            }
            if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                in_ids = section.trim() == "ids";
                seen_ids |= in_ids;
                continue;
            }
            if !in_ids {
                continue;
            }
            let Some((id, name)) = line.split_once(['=', ':']) else {
                return Err(LoadError::Config(format!("malformed mod table line {line:?}")));
            };
            self.table.insert(id.trim(), name.trim());
        }

        if !seen_ids {
            return Err(LoadError::Config("mod table has no [ids] section".to_string()));
        }
        debug!(mods = self.table.len(), "Loaded ini mod table");
        Ok(())
    }
}

/// Drop a `#` or `;` comment, which must start the line or follow whitespace
fn strip_comment(line: &str) -> &str {
    let trimmed = line.trim_start();
    if trimmed.starts_with(['#', ';']) {
        return "";
    }
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if (b == b'#' || b == b';') && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return &line[..i];
        }
    }
    line
}

impl ModResolver for IniModResolver {
    fn initialise(&mut self) -> LoadResult<()> {
        let text = std::fs::read_to_string(&self.path)?;
        self.load(&text)
    }

    fn name_from_id(&self, id: &str) -> String {
        self.table.name_from_id(id)
    }

    fn id_from_name(&self, name: &str) -> LoadResult<String> {
        self.table.id_from_name(name)
    }
}

/// Resolver built by scanning an install for `_moddata.json` records
#[derive(Debug, Clone)]
pub struct ScannedModResolver {
    asset_root: PathBuf,
    official: BTreeMap<String, String>,
    table: ModTable,
}

impl ScannedModResolver {
    /// Resolver scanning `asset_root` and registering `official` id/tag pairs
    pub fn new(asset_root: impl Into<PathBuf>, official: BTreeMap<String, String>) -> Self {
        Self {
            asset_root: asset_root.into(),
            official,
            table: ModTable::default(),
        }
    }

    /// Ids of every known mod, official ones included
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.table.names.keys().map(String::as_str)
    }

    /// True if `id` is one of the official pseudo-mods
    pub fn is_official(&self, id: &str) -> bool {
        self.official.contains_key(id)
    }
}

impl ModResolver for ScannedModResolver {
    fn initialise(&mut self) -> LoadResult<()> {
        self.table.clear();
        for (id, data) in find_installed_mods(&self.asset_root)? {
            self.table.insert(&id, &data.name);
        }
        for (id, tag) in &self.official {
            self.table.insert(id, tag);
        }
        debug!(mods = self.table.len(), root = %self.asset_root.display(), "Scanned installed mods");
        Ok(())
    }

    fn name_from_id(&self, id: &str) -> String {
        self.table.name_from_id(id)
    }

    fn id_from_name(&self, name: &str) -> LoadResult<String> {
        self.table.id_from_name(name)
    }
}

/// Resolver over a caller-supplied name to id map
#[derive(Debug, Clone, Default)]
pub struct FixedModResolver {
    table: ModTable,
}

impl FixedModResolver {
    /// Resolver for the given `(name, id)` pairs
    pub fn new<I, N, D>(names_to_ids: I) -> Self
    where
        I: IntoIterator<Item = (N, D)>,
        N: AsRef<str>,
        D: AsRef<str>,
    {
        let mut table = ModTable::default();
        for (name, id) in names_to_ids {
            table.insert(id.as_ref(), name.as_ref());
        }
        Self { table }
    }

    /// Resolver that knows no mods
    pub fn empty() -> Self {
        Self::default()
    }
}

impl ModResolver for FixedModResolver {
    fn name_from_id(&self, id: &str) -> String {
        self.table.name_from_id(id)
    }

    fn id_from_name(&self, name: &str) -> LoadResult<String> {
        self.table.id_from_name(name)
    }
}
