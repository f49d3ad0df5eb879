//! Cached asset loading and cross-asset traversal

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use purlovia_cache::{AssetCache, CacheStats, MemoryCache};
use purlovia_formats::Package;
use serde::Serialize;
use tracing::{debug, info, trace};

use crate::asset::{Asset, ExportRef, Node, ObjectRef, PropertyValue};
use crate::config::LoaderConfig;
use crate::error::{ErrorKind, LoadError, LoadResult};
use crate::paths::PathCanonicalizer;
use crate::query::{AssetNames, AssetQuery};
use crate::resolver::{IniModResolver, ModResolver, ScannedModResolver};

/// Deepest class chain [`AssetLoader::ancestry`] will follow
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Loader counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoaderStats {
    /// Asset files read from disk
    pub raw_reads: u64,
    /// Cache counters
    pub cache: CacheStats,
}

/// Loads, links and caches assets by name
///
/// Every successfully linked asset is cached under its canonical name and
/// handed out as an [`Arc`]; repeated requests share one instance. Failed
/// loads are never cached.
///
/// The loader is single-threaded. Callers loading in parallel should give
/// each thread its own loader.
pub struct AssetLoader {
    config: LoaderConfig,
    resolver: Box<dyn ModResolver>,
    cache: Box<dyn AssetCache<Asset>>,
    raw_reads: AtomicU64,
}

impl std::fmt::Debug for AssetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLoader")
            .field("config", &self.config)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl AssetLoader {
    /// Create a loader, validating the configuration and initialising the resolver
    pub fn new(
        config: LoaderConfig,
        mut resolver: Box<dyn ModResolver>,
        cache: Box<dyn AssetCache<Asset>>,
    ) -> LoadResult<Self> {
        config.validate()?;
        resolver.initialise()?;
        info!(root = %config.asset_root.display(), "Asset loader ready");

        Ok(Self {
            config,
            resolver,
            cache,
            raw_reads: AtomicU64::new(0),
        })
    }

    /// Create a loader with an in-memory cache
    pub fn with_memory_cache(
        config: LoaderConfig,
        resolver: impl ModResolver + 'static,
    ) -> LoadResult<Self> {
        Self::new(config, Box::new(resolver), Box::new(MemoryCache::new()))
    }

    /// Create a loader whose resolver is chosen by the configuration: the ini
    /// table when one is configured, otherwise a scan of installed mods
    pub fn from_config(config: LoaderConfig) -> LoadResult<Self> {
        let resolver: Box<dyn ModResolver> = match &config.mods_ini {
            Some(path) => Box::new(IniModResolver::new(path)),
            None => Box::new(ScannedModResolver::new(
                &config.asset_root,
                config.official_mods.clone(),
            )),
        };
        Self::new(config, resolver, Box::new(MemoryCache::new()))
    }

    /// Loader configuration
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Directory assets are loaded from
    pub fn asset_root(&self) -> &Path {
        &self.config.asset_root
    }

    /// Mod resolver in use
    pub fn resolver(&self) -> &dyn ModResolver {
        self.resolver.as_ref()
    }

    /// Name canonicalizer bound to this loader's root and resolver
    pub fn paths(&self) -> PathCanonicalizer<'_> {
        PathCanonicalizer::new(&self.config.asset_root, self.resolver.as_ref())
    }

    /// Canonical spelling of an asset name
    pub fn clean(&self, name: &str) -> String {
        self.paths().clean(name)
    }

    /// File path of an asset, see [`PathCanonicalizer::to_path`]
    pub fn to_path(&self, name: &str, extension: Option<&str>) -> LoadResult<PathBuf> {
        self.paths().to_path(name, extension)
    }

    /// Tag of the mod an asset belongs to
    pub fn mod_name(&self, name: &str) -> Option<String> {
        self.paths().mod_name(name)
    }

    /// Id of the mod an asset belongs to
    pub fn mod_id(&self, name: &str) -> LoadResult<Option<String>> {
        self.paths().mod_id(name)
    }

    /// File backing an asset, trying each configured extension in turn
    pub fn locate(&self, name: &str) -> LoadResult<PathBuf> {
        let name = self.clean(name);
        for ext in &self.config.extensions {
            let path = self.to_path(&name, Some(ext))?;
            if path.is_file() {
                return Ok(path);
            }
        }
        Err(LoadError::AssetNotFound(name))
    }

    /// Bytes of an asset file, without parsing
    pub fn load_raw(&self, name: &str) -> LoadResult<Vec<u8>> {
        let path = self.locate(name)?;
        let data = std::fs::read(&path)?;
        self.raw_reads.fetch_add(1, Ordering::Relaxed);
        trace!(path = %path.display(), bytes = data.len(), "Read asset file");
        Ok(data)
    }

    /// Load an asset, from the cache when possible
    pub fn retrieve(&mut self, name: &str) -> LoadResult<Arc<Asset>> {
        let name = self.clean(name);
        if let Some(asset) = self.cache.lookup(&name) {
            return Ok(asset);
        }

        let package = self.parse(&name)?;
        let asset = Asset::link(&name, &package).map_err(|e| LoadError::package(&name, e))?;
        let asset = Arc::new(asset);
        self.cache.add(name, Arc::clone(&asset));
        Ok(asset)
    }

    /// Parse an asset's summary and tables only.
    ///
    /// Nothing is linked and the result is not cached; a later
    /// [`retrieve`](Self::retrieve) of the same name loads it afresh.
    pub fn retrieve_shallow(&self, name: &str) -> LoadResult<Package> {
        self.parse(&self.clean(name))
    }

    fn parse(&self, name: &str) -> LoadResult<Package> {
        debug!(name, "Loading asset");
        let data = self.load_raw(name)?;
        Package::parse(data).map_err(|e| LoadError::package(name, e))
    }

    /// Load the asset a reference points into.
    ///
    /// Properties are followed through their value, object references and
    /// imports to the package that exports them. Local exports, null
    /// references and non-reference values have no traversal rule.
    pub fn resolve_related(&mut self, node: Node<'_>) -> LoadResult<Arc<Asset>> {
        match node {
            Node::Property(property) => self.resolve_related(Node::Value(&property.value)),
            Node::Value(PropertyValue::Object(object)) => self.resolve_related(Node::Object(object)),
            Node::Object(ObjectRef::Import { package, .. }) => self.retrieve(package),
            Node::Import(import) => self.retrieve(&import.package),
            other => Err(LoadError::Unsupported(other.describe())),
        }
    }

    /// Find an export by `<asset>.<export>` name
    pub fn find_class_export(&mut self, qualified: &str) -> LoadResult<ExportRef> {
        let (asset, export) = split_qualified(qualified)?;
        let asset = self.retrieve(asset)?;
        let position = asset.find_export(export).ok_or_else(|| LoadError::ExportNotFound {
            asset: asset.name.clone(),
            export: export.to_string(),
        })?;
        ExportRef::new(asset, position).ok_or_else(|| LoadError::ExportNotFound {
            asset: qualified.to_string(),
            export: export.to_string(),
        })
    }

    /// Like [`find_class_export`](Self::find_class_export), but a missing
    /// export yields `fallback` instead of an error. Failures to load the
    /// asset itself are still reported.
    pub fn find_class_export_or(
        &mut self,
        qualified: &str,
        fallback: Option<ExportRef>,
    ) -> LoadResult<Option<ExportRef>> {
        match self.find_class_export(qualified) {
            Ok(export) => Ok(Some(export)),
            Err(LoadError::ExportNotFound { .. }) => Ok(fallback),
            Err(e) => Err(e),
        }
    }

    /// Enumerate canonical names matching a query
    pub fn find_asset_names(&self, query: &AssetQuery) -> LoadResult<AssetNames<'_>> {
        query.run(self.paths())
    }

    /// Canonical name of an existing asset given either an asset name or a
    /// filesystem path, absolute or relative to the working directory or
    /// the asset root
    pub fn find_from_external_path(&self, input: &str) -> LoadResult<String> {
        // MSYS shells turn /Game into //Game to dodge path conversion
        let input = if input.starts_with("//") { &input[1..] } else { input };

        let direct = self.clean(input);
        if self.locate(&direct).is_ok() {
            return Ok(direct);
        }

        let path = Path::new(input);
        let root = &self.config.asset_root;
        let roots: Vec<PathBuf> = [
            Some(root.clone()),
            std::path::absolute(root).ok(),
            root.canonicalize().ok(),
        ]
        .into_iter()
        .flatten()
        .collect();
        let candidates: Vec<PathBuf> = [
            Some(path.to_path_buf()),
            std::path::absolute(path).ok(),
            path.canonicalize().ok(),
        ]
        .into_iter()
        .flatten()
        .collect();

        let mut relatives: Vec<PathBuf> = Vec::new();
        for candidate in &candidates {
            for root in &roots {
                if let Ok(relative) = candidate.strip_prefix(root) {
                    relatives.push(relative.to_path_buf());
                }
            }
        }
        if path.is_relative() {
            relatives.push(path.to_path_buf());
        }

        for relative in relatives {
            let name = self.clean(&without_cur_dir(&relative).to_string_lossy());
            match self.locate(&name) {
                Ok(_) => return Ok(name),
                Err(e) if matches!(e.kind(), ErrorKind::NotFound) => {}
                Err(e) => return Err(e),
            }
        }
        Err(LoadError::AssetNotFound(input.to_string()))
    }

    /// Class chain of an export, as `<asset>.<export>` names.
    ///
    /// Starts at `qualified` and follows each parent class reference, across
    /// assets, until it reaches a class with no parent or one outside
    /// `/Game/`, which is included but not loaded.
    pub fn ancestry(&mut self, qualified: &str) -> LoadResult<Vec<String>> {
        let mut current = self.find_class_export(qualified)?;
        let mut chain = Vec::new();
        let mut visited = HashSet::new();

        loop {
            let name = current.qualified_name();
            if chain.len() >= MAX_TRAVERSAL_DEPTH || !visited.insert(name.clone()) {
                return Err(LoadError::Cycle(name));
            }
            chain.push(name);

            let next = match &current.export().super_ref {
                ObjectRef::Null => break,
                ObjectRef::Export { index, .. } => ExportRef::new(Arc::clone(current.asset()), *index),
                ObjectRef::Import { name, package, .. } => {
                    if !is_loadable(package) {
                        chain.push(format!("{package}.{name}"));
                        break;
                    }
                    let asset = self.retrieve(package)?;
                    let position =
                        asset.find_export(name).ok_or_else(|| LoadError::ExportNotFound {
                            asset: asset.name.clone(),
                            export: name.clone(),
                        })?;
                    ExportRef::new(asset, position)
                }
            };
            current = next.ok_or_else(|| LoadError::ExportNotFound {
                asset: current.asset().name.clone(),
                export: current.export().super_ref.to_string(),
            })?;
        }

        Ok(chain)
    }

    /// Drop one asset from the cache
    pub fn invalidate(&mut self, name: &str) -> bool {
        let name = self.clean(name);
        self.cache.remove(&name)
    }

    /// Drop every cached asset whose canonical name starts with `prefix`
    pub fn invalidate_all(&mut self, prefix: &str) -> usize {
        self.cache.wipe(prefix)
    }

    /// Drop every cached asset
    pub fn wipe_cache(&mut self) -> usize {
        self.cache.wipe("")
    }

    /// Counters since the loader was created
    pub fn stats(&self) -> LoaderStats {
        LoaderStats {
            raw_reads: self.raw_reads.load(Ordering::Relaxed),
            cache: self.cache.stats(),
        }
    }
}

fn split_qualified(qualified: &str) -> LoadResult<(&str, &str)> {
    qualified
        .split_once('.')
        .filter(|(asset, export)| !asset.is_empty() && !export.is_empty() && !export.contains('.'))
        .ok_or_else(|| LoadError::InvalidClassName(qualified.to_string()))
}

/// `./Content/X.uasset` must not be cut at its leading dot by `clean`
fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Packages outside `/Game/` are native and have no asset file
fn is_loadable(package: &str) -> bool {
    package
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("/game/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_qualified() {
        assert!(matches!(
            split_qualified("/Game/Items/Sword.Sword_C"),
            Ok(("/Game/Items/Sword", "Sword_C"))
        ));
        for bad in ["/Game/Items/Sword", "/Game/A.B.C", ".Sword_C", "/Game/Items/Sword."] {
            assert!(matches!(split_qualified(bad), Err(LoadError::InvalidClassName(_))));
        }
    }

    #[test]
    fn test_without_cur_dir() {
        assert_eq!(
            without_cur_dir(Path::new("./Content/Items/Sword.uasset")),
            PathBuf::from("Content/Items/Sword.uasset")
        );
        assert_eq!(
            without_cur_dir(Path::new("Content/./Items/Sword.uasset")),
            PathBuf::from("Content/Items/Sword.uasset")
        );
    }

    #[test]
    fn test_is_loadable() {
        assert!(is_loadable("/Game/PrimalEarth/CoreBlueprints/PrimalItem_Base"));
        assert!(is_loadable("/game/Mods/Pyria/Kaiju"));
        assert!(!is_loadable("/Script/ShooterGame"));
        assert!(!is_loadable("/Gam"));
    }
}
