//! Installed mod records
//!
//! Each installed mod lives under `Content/Mods/<id>/` and carries the two
//! descriptor binaries it was downloaded with. Their contents are collated
//! once into a `_moddata.json` record next to them, which is what the
//! scanned-install resolver reads.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use purlovia_formats::{ModInfo, ModMetaInfo};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{LoadError, LoadResult};

/// File name of the collated record in each mod directory
pub const MODDATA_FILENAME: &str = "_moddata.json";

/// Collated information about one installed mod
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModData {
    /// Workshop id
    pub id: String,
    /// Mod tag, used as the alias in asset paths
    pub name: String,
    /// Maps shipped by the mod
    #[serde(default)]
    pub maps: Vec<String>,
    /// Primary game data package
    #[serde(default)]
    pub package: Option<String>,
    /// Mod GUID
    #[serde(default)]
    pub guid: Option<String>,
    /// Workshop mod type
    #[serde(default, rename = "type")]
    pub mod_type: Option<String>,
    /// Installed workshop version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Human-readable title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Every `modmeta.info` pair, in file order
    #[serde(default, rename = "MODMETA.INFO")]
    pub meta: IndexMap<String, String>,
}

/// Directory of an installed mod
pub fn mod_directory(asset_root: &Path, mod_id: &str) -> PathBuf {
    asset_root.join("Content").join("Mods").join(mod_id)
}

/// Collate `mod.info` and `modmeta.info` of an installed mod
pub fn gather_mod_info(asset_root: &Path, mod_id: &str) -> LoadResult<ModData> {
    let dir = mod_directory(asset_root, mod_id);
    let info = ModInfo::from_path(dir.join("mod.info"))?;
    let meta = ModMetaInfo::from_path(dir.join("modmeta.info"))?;

    let name = info.name.ok_or_else(|| LoadError::MissingModField {
        mod_id: mod_id.to_string(),
        field: "name",
    })?;
    let field = |key: &str| meta.get(key).map(str::to_string);

    Ok(ModData {
        id: mod_id.to_string(),
        name,
        maps: info.maps,
        package: field("PrimalGameData"),
        guid: field("GUID"),
        mod_type: field("ModType"),
        version: None,
        title: None,
        meta: meta.entries.clone(),
    })
}

/// Write the record of an installed mod, returning its path
pub fn write_mod_data(asset_root: &Path, data: &ModData) -> LoadResult<PathBuf> {
    let dir = mod_directory(asset_root, &data.id);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(MODDATA_FILENAME);

    let mut writer = BufWriter::new(File::create(&path)?);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    data.serialize(&mut serializer)
        .map_err(|source| LoadError::ModData {
            path: path.clone(),
            source,
        })?;
    writer.flush()?;

    debug!(id = %data.id, path = %path.display(), "Wrote mod data");
    Ok(path)
}

/// Read the record of an installed mod, `None` if it has none
pub fn read_mod_data(asset_root: &Path, mod_id: &str) -> LoadResult<Option<ModData>> {
    let path = mod_directory(asset_root, mod_id).join(MODDATA_FILENAME);
    if !path.is_file() {
        debug!(path = %path.display(), "No mod data");
        return Ok(None);
    }

    let reader = BufReader::new(File::open(&path)?);
    serde_json::from_reader(reader)
        .map(Some)
        .map_err(|source| LoadError::ModData { path, source })
}

/// Records of every installed mod under `asset_root`, by id
pub fn find_installed_mods(asset_root: &Path) -> LoadResult<BTreeMap<String, ModData>> {
    let mods_dir = asset_root.join("Content").join("Mods");
    let mut mods = BTreeMap::new();
    if !mods_dir.is_dir() {
        return Ok(mods);
    }

    for entry in WalkDir::new(&mods_dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(id) = entry.file_name().to_str() else {
            warn!(path = %entry.path().display(), "Skipping mod directory with a non-UTF-8 name");
            continue;
        };
        if let Some(data) = read_mod_data(asset_root, id)? {
            if data.id != id {
                warn!(dir = id, recorded = %data.id, "Mod data id does not match its directory");
            }
            mods.insert(id.to_string(), data);
        }
    }

    Ok(mods)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn install_descriptors(root: &Path, id: &str, name: Option<&str>) {
        let dir = mod_directory(root, id);
        std::fs::create_dir_all(&dir).unwrap();

        let info = ModInfo {
            name: name.map(str::to_string),
            maps: vec!["Ebenus_Astrum".into()],
        };
        info.write(&mut File::create(dir.join("mod.info")).unwrap()).unwrap();

        let mut meta = ModMetaInfo::default();
        for (k, v) in [
            ("ModType", "1"),
            ("PrimalGameData", "/Game/Mods/EbenusAstrum/PrimalGameData_BP_EA"),
            ("GUID", "8a6e5f4c"),
        ] {
            meta.entries.insert(k.into(), v.into());
        }
        meta.write(&mut File::create(dir.join("modmeta.info")).unwrap()).unwrap();
    }

    #[test]
    fn test_gather_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        install_descriptors(dir.path(), "1333609359", Some("EbenusAstrum"));

        let data = gather_mod_info(dir.path(), "1333609359").expect("Descriptors should read");
        assert_eq!(data.name, "EbenusAstrum");
        assert_eq!(data.maps, vec!["Ebenus_Astrum"]);
        assert_eq!(data.mod_type.as_deref(), Some("1"));
        assert_eq!(data.meta.len(), 3);

        write_mod_data(dir.path(), &data).unwrap();
        let back = read_mod_data(dir.path(), "1333609359").unwrap();
        assert_eq!(back, Some(data));

        let json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(mod_directory(dir.path(), "1333609359").join(MODDATA_FILENAME))
                .unwrap(),
        )
        .unwrap();
        assert_eq!(json["type"], "1");
        assert_eq!(json["MODMETA.INFO"]["GUID"], "8a6e5f4c");
    }

    #[test]
    fn test_nameless_mod_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        install_descriptors(dir.path(), "42", None);
        assert!(matches!(
            gather_mod_info(dir.path(), "42"),
            Err(LoadError::MissingModField { field: "name", .. })
        ));
    }

    #[test]
    fn test_find_installed_mods() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_installed_mods(dir.path()).unwrap().is_empty());

        for (id, name) in [("1", "One"), ("2", "Two")] {
            let data = ModData {
                id: id.into(),
                name: name.into(),
                ..ModData::default()
            };
            write_mod_data(dir.path(), &data).unwrap();
        }
        // Installed but never collated
        std::fs::create_dir_all(mod_directory(dir.path(), "3")).unwrap();

        let mods = find_installed_mods(dir.path()).unwrap();
        assert_eq!(mods.keys().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(mods["2"].name, "Two");
    }
}
