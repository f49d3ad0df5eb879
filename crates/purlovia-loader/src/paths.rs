//! Asset name canonicalization
//!
//! Assets are named by logical paths such as
//! `/Game/PrimalEarth/Dinos/Rex/Rex_Character_BP`. The same asset may be
//! written many ways: with a `.ClassName` suffix, with backslashes, rooted
//! at `Content` instead of `Game`, or with a mod's numeric id where its tag
//! is expected. [`PathCanonicalizer::clean`] reduces all of these to one
//! canonical spelling, which is what the cache is keyed by.
//!
//! Canonical names always use the mod tag. On-disk paths always use the
//! numeric id, since that is how the workshop lays mods out.

use std::path::{Path, PathBuf};

use crate::config::is_numeric;
use crate::error::LoadResult;
use crate::resolver::ModResolver;

/// Canonicalizes asset names and maps them to files under an asset root
#[derive(Clone, Copy)]
pub struct PathCanonicalizer<'a> {
    asset_root: &'a Path,
    resolver: &'a dyn ModResolver,
}

impl std::fmt::Debug for PathCanonicalizer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathCanonicalizer")
            .field("asset_root", &self.asset_root)
            .finish_non_exhaustive()
    }
}

impl<'a> PathCanonicalizer<'a> {
    /// Canonicalizer for files under `asset_root`, resolving mods with `resolver`
    pub fn new(asset_root: &'a Path, resolver: &'a dyn ModResolver) -> Self {
        Self {
            asset_root,
            resolver,
        }
    }

    /// Directory the names are resolved against
    pub fn asset_root(&self) -> &'a Path {
        self.asset_root
    }

    /// Canonical spelling of an asset name.
    ///
    /// ```text
    /// Content\Mods\895711211\Dinos\Wyvern.Wyvern_C  ->  /Game/Mods/ClassicFlyers/Dinos/Wyvern
    /// ```
    pub fn clean(&self, name: &str) -> String {
        let name = name.split_once('.').map_or(name, |(head, _)| head).trim();
        let mut parts: Vec<String> = name
            .split(['/', '\\'])
            .filter(|part| !part.trim().is_empty())
            .map(str::to_string)
            .collect();
        // Only the ends of the whole name are trimmed, not inner segments
        if let Some(last) = parts.last_mut() {
            last.truncate(last.trim_end().len());
        }

        if parts.len() > 2 && parts[1].eq_ignore_ascii_case("mods") {
            if is_numeric(&parts[2]) {
                parts[2] = self.resolver.name_from_id(&parts[2]);
            } else if let Ok(id) = self.resolver.id_from_name(&parts[2]) {
                // Known tags take the resolver's spelling
                parts[2] = self.resolver.name_from_id(&id);
            }
        }
        if parts.first().is_some_and(|p| p.eq_ignore_ascii_case("content")) {
            parts[0] = "Game".to_string();
        }

        format!("/{}", parts.join("/"))
    }

    /// File path of an asset.
    ///
    /// With `extension` set the result names a file; without, it names the
    /// directory-style partial path, as used for enumeration roots. Fails if
    /// the name carries a mod tag the resolver does not know.
    pub fn to_path(&self, name: &str, extension: Option<&str>) -> LoadResult<PathBuf> {
        let name = self.clean(name);
        let mut parts: Vec<String> = segments(&name).map(str::to_string).collect();

        if parts.len() > 2 && parts[1].eq_ignore_ascii_case("mods") && !is_numeric(&parts[2]) {
            parts[2] = self.resolver.id_from_name(&parts[2])?;
        }
        if parts.first().is_some_and(|p| p.eq_ignore_ascii_case("game")) {
            parts[0] = "Content".to_string();
        }

        let mut path = self.asset_root.to_path_buf();
        if let Some((last, dirs)) = parts.split_last() {
            path.extend(dirs);
            match extension {
                Some(ext) => path.push(format!("{last}{ext}")),
                None => path.push(last),
            }
        }
        Ok(path)
    }

    /// Tag of the mod an asset belongs to, `None` outside `/Game/Mods/`
    pub fn mod_name(&self, name: &str) -> Option<String> {
        // clean() has already swapped known ids for tags
        mod_segment(&self.clean(name))
    }

    /// Id of the mod an asset belongs to, `None` outside `/Game/Mods/`
    pub fn mod_id(&self, name: &str) -> LoadResult<Option<String>> {
        match mod_segment(&self.clean(name)) {
            Some(segment) if is_numeric(&segment) => Ok(Some(segment)),
            Some(segment) => self.resolver.id_from_name(&segment).map(Some),
            None => Ok(None),
        }
    }

    /// Canonical name of a file under the asset root.
    ///
    /// Relative paths are taken relative to the asset root. Returns `None`
    /// for absolute paths outside it.
    pub fn name_from_path(&self, path: &Path) -> Option<String> {
        let relative = if path.is_absolute() || path.starts_with(self.asset_root) {
            path.strip_prefix(self.asset_root).ok()?
        } else {
            path
        };
        Some(self.clean(&relative.to_string_lossy()))
    }
}

fn segments(name: &str) -> impl Iterator<Item = &str> {
    name.split('/').filter(|part| !part.is_empty())
}

fn mod_segment(clean_name: &str) -> Option<String> {
    let mut parts = segments(clean_name);
    let root = parts.next()?;
    let mods = parts.next()?;
    let segment = parts.next()?;
    (root.eq_ignore_ascii_case("game") && mods.eq_ignore_ascii_case("mods"))
        .then(|| segment.to_string())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::resolver::FixedModResolver;
    use proptest::prelude::*;

    fn resolver() -> FixedModResolver {
        FixedModResolver::new([("ClassicFlyers", "895711211"), ("Pyria", "1090809604")])
    }

    #[test]
    fn test_clean() {
        let resolver = resolver();
        let paths = PathCanonicalizer::new(Path::new("/ark"), &resolver);

        assert_eq!(
            paths.clean("/Game/PrimalEarth/Dinos/Rex/Rex_Character_BP.Rex_Character_BP_C"),
            "/Game/PrimalEarth/Dinos/Rex/Rex_Character_BP"
        );
        assert_eq!(
            paths.clean(r"Content\Mods\895711211\Dinos\Wyvern"),
            "/Game/Mods/ClassicFlyers/Dinos/Wyvern"
        );
        assert_eq!(paths.clean("  /Game/Mods/12345/Thing/ "), "/Game/Mods/12345/Thing");
        assert_eq!(paths.clean("content/Maps"), "/Game/Maps");
        assert_eq!(paths.clean("/Game/Mods/pyria/Kaiju"), "/Game/Mods/Pyria/Kaiju");
        assert_eq!(paths.clean("/Game//Aberration/// Boss"), "/Game/Aberration/ Boss");
        assert_eq!(paths.clean("/Game/Items/ Sword"), "/Game/Items/ Sword");
        assert_eq!(paths.clean("/Game/Items/Sword /"), "/Game/Items/Sword");
        assert_eq!(paths.clean("/Game/ /Items/Sword"), "/Game/Items/Sword");
        assert_eq!(paths.clean(""), "/");
    }

    #[test]
    fn test_to_path() {
        let resolver = resolver();
        let paths = PathCanonicalizer::new(Path::new("/ark/ShooterGame"), &resolver);

        assert_eq!(
            paths.to_path("/Game/Mods/ClassicFlyers/Wyvern", Some(".uasset")).unwrap(),
            PathBuf::from("/ark/ShooterGame/Content/Mods/895711211/Wyvern.uasset")
        );
        assert_eq!(
            paths.to_path("/Game/Maps/TheIsland", Some(".umap")).unwrap(),
            PathBuf::from("/ark/ShooterGame/Content/Maps/TheIsland.umap")
        );
        assert_eq!(
            paths.to_path("/Game/Mods/pyria", None).unwrap(),
            PathBuf::from("/ark/ShooterGame/Content/Mods/1090809604")
        );
        assert_eq!(paths.to_path("/", None).unwrap(), PathBuf::from("/ark/ShooterGame"));
        assert!(matches!(
            paths.to_path("/Game/Mods/Unknown/Thing", Some(".uasset")),
            Err(LoadError::ModNotFound(_))
        ));
    }

    #[test]
    fn test_mod_segments() {
        let resolver = resolver();
        let paths = PathCanonicalizer::new(Path::new("/ark"), &resolver);

        assert_eq!(
            paths.mod_id("/Game/Mods/123456/Structure").unwrap().as_deref(),
            Some("123456")
        );
        assert_eq!(paths.mod_id("/Game/PrimalEarth/Foo").unwrap(), None);
        assert_eq!(paths.mod_id("/Game/Mods").unwrap(), None);
        assert_eq!(
            paths.mod_id("/Game/Mods/classicflyers/Wyvern").unwrap().as_deref(),
            Some("895711211")
        );
        assert_eq!(
            paths.mod_name("/Game/Mods/1090809604/Dinos/Kaiju").as_deref(),
            Some("Pyria")
        );
        assert_eq!(
            paths.mod_name("/Game/Mods/123456/Structure").as_deref(),
            Some("123456")
        );
        assert_eq!(paths.mod_name("/Script/ShooterGame"), None);
    }

    #[test]
    fn test_name_from_path() {
        let resolver = resolver();
        let paths = PathCanonicalizer::new(Path::new("/ark/ShooterGame"), &resolver);

        assert_eq!(
            paths.name_from_path(Path::new("/ark/ShooterGame/Content/Mods/895711211/Wyvern.uasset")),
            Some("/Game/Mods/ClassicFlyers/Wyvern".to_string())
        );
        assert_eq!(
            paths.name_from_path(Path::new("Content/Maps/TheIsland.umap")),
            Some("/Game/Maps/TheIsland".to_string())
        );
        assert_eq!(paths.name_from_path(Path::new("/elsewhere/Content/X.uasset")), None);
    }

    fn raw_name() -> impl Strategy<Value = String> {
        let segment = prop_oneof![
            Just("Game".to_string()),
            Just("Content".to_string()),
            Just("Mods".to_string()),
            Just("895711211".to_string()),
            Just("42".to_string()),
            "[A-Za-z_][A-Za-z0-9_ ]{0,8}",
        ];
        (
            proptest::collection::vec(segment, 0..6),
            prop::sample::select(vec!["/", "\\"]),
            "( |/|\\\\){0,2}",
            proptest::option::of("\\.[A-Za-z_]{1,8}"),
        )
            .prop_map(|(parts, sep, edge, suffix)| {
                format!("{edge}{}{edge}{}", parts.join(sep), suffix.unwrap_or_default())
            })
    }

    proptest! {
        #[test]
        fn clean_is_idempotent(name in raw_name()) {
            let resolver = resolver();
            let paths = PathCanonicalizer::new(Path::new("/ark"), &resolver);
            let once = paths.clean(&name);
            prop_assert_eq!(paths.clean(&once), once);
        }

        #[test]
        fn non_mod_names_round_trip_through_paths(
            parts in proptest::collection::vec("[A-Za-z_][A-Za-z0-9_]{0,10}", 1..5)
        ) {
            let resolver = FixedModResolver::empty();
            let root = Path::new("/ark/ShooterGame");
            let paths = PathCanonicalizer::new(root, &resolver);
            prop_assume!(!parts[0].eq_ignore_ascii_case("mods"));

            let name = format!("/Game/{}", parts.join("/"));
            let path = paths.to_path(&name, Some(".uasset")).unwrap();
            let relative = path.strip_prefix(root).unwrap();
            prop_assert_eq!(paths.clean(&relative.to_string_lossy()), name);
        }
    }
}
