#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Loader behaviour against small generated asset trees

use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use purlovia_formats::package::{ExportSpec, ObjectIndex, PackageBuilder, PropertySpec};
use purlovia_loader::{
    AssetLoader, AssetQuery, ErrorKind, FixedModResolver, LoadError, LoaderConfig, Node,
    ObjectRef, PropertyValue,
};
use tempfile::TempDir;

/// Blueprint asset whose class `<short>_C` derives from `parent`, given as
/// `(package, class)`. The default object carries a few properties.
fn blueprint(short: &str, parent: Option<(&str, &str)>) -> Vec<u8> {
    let mut builder = PackageBuilder::new();
    let engine = builder.add_import("/Script/CoreUObject", "Package", ObjectIndex::NULL, "/Script/Engine");
    let generated = builder.add_import("/Script/CoreUObject", "Class", engine, "BlueprintGeneratedClass");

    let super_ref = match parent {
        Some((package, class)) => {
            let outer = builder.add_import("/Script/CoreUObject", "Package", ObjectIndex::NULL, package);
            builder.add_import("/Script/Engine", "BlueprintGeneratedClass", outer, class)
        }
        None => ObjectIndex::NULL,
    };

    let class = builder.add_export(ExportSpec::new(format!("{short}_C"), generated).with_super(super_ref));
    let mut defaults = ExportSpec::new(format!("Default__{short}_C"), class)
        .with_property("DescriptiveNameBase", PropertySpec::Str(Some(short.to_string())))
        .with_property("MaxItemQuantity", PropertySpec::Int(100));
    if parent.is_some() {
        defaults = defaults.with_property("ParentClass", PropertySpec::Object(super_ref));
    }
    builder.add_export(defaults);
    builder.build().unwrap()
}

fn put(root: &Path, relative: &str, data: &[u8]) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
}

/// Item hierarchy: Sword -> Mid -> Base -> /Script/ShooterGame.PrimalItem
fn item_tree() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    put(
        root,
        "Content/Items/Base.uasset",
        &blueprint("Base", Some(("/Script/ShooterGame", "PrimalItem"))),
    );
    put(
        root,
        "Content/Items/Mid.uasset",
        &blueprint("Mid", Some(("/Game/Items/Base", "Base_C"))),
    );
    put(
        root,
        "Content/Items/Sword.uasset",
        &blueprint("Sword", Some(("/Game/Items/Mid", "Mid_C"))),
    );
    put(root, "Content/Maps/Island.umap", &blueprint("Island", None));
    put(root, "Content/Items/notes.txt", b"not an asset");
    dir
}

fn loader(dir: &TempDir) -> AssetLoader {
    let resolver = FixedModResolver::new([("Ebenus", "1333609359")]);
    AssetLoader::with_memory_cache(LoaderConfig::new(dir.path()), resolver).unwrap()
}

#[test]
fn retrieve_reads_each_asset_once() {
    let dir = item_tree();
    let mut loader = loader(&dir);

    let first = loader.retrieve("/Game/Items/Sword").unwrap();
    let second = loader.retrieve(r"Content\Items\Sword.Sword_C").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.name, "/Game/Items/Sword");
    assert_eq!(first.short_name(), "Sword");
    let stats = loader.stats();
    assert_eq!(stats.raw_reads, 1);
    assert_eq!(stats.cache.hits, 1);
    assert_eq!(stats.cache.misses, 1);
    assert_eq!(stats.cache.entries, 1);
}

#[test]
fn linked_asset_exposes_defaults() {
    let dir = item_tree();
    let mut loader = loader(&dir);
    let sword = loader.retrieve("/Game/Items/Sword").unwrap();

    let defaults = sword.default_object().expect("default object");
    assert_eq!(defaults.name, "Default__Sword_C");
    assert_eq!(sword.default_class().and_then(ObjectRef::name), Some("Sword_C"));
    assert_eq!(
        defaults.property("MaxItemQuantity").map(|p| &p.value),
        Some(&PropertyValue::Int(100))
    );
    assert_eq!(
        defaults.property("DescriptiveNameBase").map(|p| &p.value),
        Some(&PropertyValue::Str(Some("Sword".to_string())))
    );
}

#[test]
fn missing_assets_are_not_found() {
    let dir = item_tree();
    let mut loader = loader(&dir);

    let err = loader.retrieve("/Game/Items/Shield").unwrap_err();
    assert!(matches!(err, LoadError::AssetNotFound(ref name) if name == "/Game/Items/Shield"));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = loader.retrieve("/Game/Mods/Unknown/Thing").unwrap_err();
    assert!(matches!(err, LoadError::ModNotFound(_)));
    assert_eq!(loader.stats().cache.entries, 0);
}

#[test]
fn maps_load_through_the_second_extension() {
    let dir = item_tree();
    let mut loader = loader(&dir);

    assert!(loader.locate("/Game/Maps/Island").unwrap().ends_with("Island.umap"));
    let island = loader.retrieve("/Game/Maps/Island").unwrap();
    assert_eq!(island.exports.len(), 2);
}

#[test]
fn corrupt_assets_are_reported_and_not_cached() {
    let dir = item_tree();
    put(dir.path(), "Content/Items/Broken.uasset", b"not a package at all");
    let mut loader = loader(&dir);

    let err = loader.retrieve("/Game/Items/Broken").unwrap_err();
    assert!(matches!(err, LoadError::Package { ref name, .. } if name == "/Game/Items/Broken"));
    assert_eq!(err.kind(), ErrorKind::Corruption);
    assert_eq!(loader.stats().cache.entries, 0);

    // A repaired file loads on the next request
    put(dir.path(), "Content/Items/Broken.uasset", &blueprint("Broken", None));
    let fixed = loader.retrieve("/Game/Items/Broken").unwrap();
    assert_eq!(fixed.exports[0].name, "Broken_C");
    assert_eq!(loader.stats().raw_reads, 2);
}

#[test]
fn shallow_loads_bypass_the_cache() {
    let dir = item_tree();
    let mut loader = loader(&dir);

    let package = loader.retrieve_shallow("/Game/Items/Mid").unwrap();
    assert_eq!(package.exports.len(), 2);
    assert_eq!(loader.stats().cache.entries, 0);

    loader.retrieve("/Game/Items/Mid").unwrap();
    assert_eq!(loader.stats().raw_reads, 2);
}

#[test]
fn load_raw_returns_file_bytes() {
    let dir = item_tree();
    let loader = loader(&dir);
    let expected = std::fs::read(dir.path().join("Content/Items/Base.uasset")).unwrap();

    assert_eq!(loader.load_raw("/Game/Items/Base").unwrap(), expected);
    assert_eq!(loader.stats().raw_reads, 1);
}

#[test]
fn find_class_export_and_fallback() {
    let dir = item_tree();
    let mut loader = loader(&dir);

    let export = loader.find_class_export("/Game/Items/Sword.Sword_C").unwrap();
    assert_eq!(export.position(), 0);
    assert_eq!(export.qualified_name(), "/Game/Items/Sword.Sword_C");

    let err = loader.find_class_export("/Game/Items/Sword.Shield_C").unwrap_err();
    assert!(matches!(err, LoadError::ExportNotFound { ref export, .. } if export == "Shield_C"));
    assert!(matches!(
        loader.find_class_export("/Game/Items/Sword"),
        Err(LoadError::InvalidClassName(_))
    ));

    let fallback = loader.find_class_export("/Game/Items/Base.Base_C").unwrap();
    let found = loader
        .find_class_export_or("/Game/Items/Sword.Shield_C", Some(fallback.clone()))
        .unwrap();
    assert_eq!(found, Some(fallback));
    assert_eq!(loader.find_class_export_or("/Game/Items/Sword.Shield_C", None).unwrap(), None);

    // Load failures are not swallowed by the fallback
    assert!(matches!(
        loader.find_class_export_or("/Game/Items/Shield.Shield_C", None),
        Err(LoadError::AssetNotFound(_))
    ));
}

#[test]
fn resolve_related_follows_references() {
    let dir = item_tree();
    let mut loader = loader(&dir);
    let sword = loader.retrieve("/Game/Items/Sword").unwrap();
    let defaults = sword.default_object().unwrap();

    let parent = defaults.property("ParentClass").unwrap();
    let mid = loader.resolve_related(Node::Property(parent)).unwrap();
    assert_eq!(mid.name, "/Game/Items/Mid");

    let import = sword.imports.iter().find(|i| i.name == "/Game/Items/Mid").unwrap();
    let again = loader.resolve_related(Node::Import(import)).unwrap();
    assert!(Arc::ptr_eq(&mid, &again));

    let quantity = defaults.property("MaxItemQuantity").unwrap();
    let err = loader.resolve_related(Node::Property(quantity)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);

    let err = loader.resolve_related(Node::Export(&sword.exports[0])).unwrap_err();
    assert!(matches!(err, LoadError::Unsupported(_)));
    assert!(matches!(
        loader.resolve_related(Node::Object(&ObjectRef::Null)),
        Err(LoadError::Unsupported(_))
    ));
}

#[test]
fn ancestry_walks_across_assets() {
    let dir = item_tree();
    let mut loader = loader(&dir);

    let chain = loader.ancestry("/Game/Items/Sword.Sword_C").unwrap();
    assert_eq!(
        chain,
        vec![
            "/Game/Items/Sword.Sword_C",
            "/Game/Items/Mid.Mid_C",
            "/Game/Items/Base.Base_C",
            "/Script/ShooterGame.PrimalItem",
        ]
    );
    assert_eq!(loader.stats().raw_reads, 3);

    assert_eq!(loader.ancestry("/Game/Maps/Island.Island_C").unwrap(), vec!["/Game/Maps/Island.Island_C"]);
}

#[test]
fn ancestry_reports_cycles() {
    let dir = tempfile::tempdir().unwrap();
    put(dir.path(), "Content/Loop/A.uasset", &blueprint("A", Some(("/Game/Loop/B", "B_C"))));
    put(dir.path(), "Content/Loop/B.uasset", &blueprint("B", Some(("/Game/Loop/A", "A_C"))));
    let mut loader = loader(&dir);

    let err = loader.ancestry("/Game/Loop/A.A_C").unwrap_err();
    assert!(matches!(err, LoadError::Cycle(ref name) if name == "/Game/Loop/A.A_C"));
    assert_eq!(err.kind(), ErrorKind::Corruption);
}

#[test]
fn mod_assets_are_cached_under_their_tag() {
    let dir = item_tree();
    put(
        dir.path(),
        "Content/Mods/1333609359/Dinos/Astro.uasset",
        &blueprint("Astro", None),
    );
    put(
        dir.path(),
        "Content/Mods/1333609359/Dinos/Nova.uasset",
        &blueprint("Nova", None),
    );
    let mut loader = loader(&dir);

    let by_id = loader.retrieve("/Game/Mods/1333609359/Dinos/Astro").unwrap();
    let by_tag = loader.retrieve("/Game/Mods/ebenus/Dinos/Astro").unwrap();
    assert!(Arc::ptr_eq(&by_id, &by_tag));
    assert_eq!(by_id.name, "/Game/Mods/Ebenus/Dinos/Astro");
    assert_eq!(loader.mod_id(&by_id.name).unwrap().as_deref(), Some("1333609359"));
    assert_eq!(loader.mod_name("/Game/Mods/1333609359/Dinos/Nova").as_deref(), Some("Ebenus"));

    loader.retrieve("/Game/Mods/Ebenus/Dinos/Nova").unwrap();
    loader.retrieve("/Game/Items/Base").unwrap();
    assert_eq!(loader.stats().cache.entries, 3);

    assert_eq!(loader.invalidate_all("/Game/Mods/Ebenus/"), 2);
    assert_eq!(loader.stats().cache.entries, 1);
    assert!(loader.invalidate("/Game/Items/Base.Base_C"));
    assert!(!loader.invalidate("/Game/Items/Base"));

    loader.retrieve("/Game/Mods/Ebenus/Dinos/Astro").unwrap();
    assert_eq!(loader.stats().raw_reads, 4);
    assert_eq!(loader.wipe_cache(), 1);
}

#[test]
fn find_asset_names_filters_and_restarts() {
    let dir = item_tree();
    let loader = loader(&dir);

    let query = AssetQuery::new("/Game/Items/").under("/Game/Items").excluding(".*Base");
    let mut names: Vec<String> = loader.find_asset_names(&query).unwrap().collect();
    names.sort();
    assert_eq!(names, vec!["/Game/Items/Mid", "/Game/Items/Sword"]);

    let mut again: Vec<String> = loader.find_asset_names(&query).unwrap().collect();
    again.sort();
    assert_eq!(again, names);

    let maps = AssetQuery::new("/Game/Maps").with_extensions([".uasset", ".UMAP"]);
    let names: Vec<String> = loader.find_asset_names(&maps).unwrap().collect();
    assert_eq!(names, vec!["/Game/Maps/Island"]);

    // Pattern matches anchor at the start of the name
    let none = AssetQuery::new("Items");
    assert_eq!(loader.find_asset_names(&none).unwrap().count(), 0);

    let bad = AssetQuery::new("/Game/(");
    assert!(matches!(loader.find_asset_names(&bad), Err(LoadError::Pattern(_))));
}

#[test]
fn external_paths_resolve_to_names() {
    let dir = item_tree();
    let loader = loader(&dir);
    let file = dir.path().join("Content/Items/Sword.uasset");

    assert_eq!(loader.find_from_external_path("/Game/Items/Sword").unwrap(), "/Game/Items/Sword");
    assert_eq!(loader.find_from_external_path("//Game/Items/Sword").unwrap(), "/Game/Items/Sword");
    assert_eq!(
        loader.find_from_external_path("Content/Items/Sword.uasset").unwrap(),
        "/Game/Items/Sword"
    );
    assert_eq!(
        loader.find_from_external_path("./Content/Items/Sword.uasset").unwrap(),
        "/Game/Items/Sword"
    );
    assert_eq!(
        loader.find_from_external_path(&file.to_string_lossy()).unwrap(),
        "/Game/Items/Sword"
    );

    let missing = dir.path().join("Content/Items/Shield.uasset");
    let err = loader.find_from_external_path(&missing.to_string_lossy()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn invalid_configuration_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = LoaderConfig::new(dir.path()).with_extensions(Vec::<String>::new());
    let err = AssetLoader::with_memory_cache(config, FixedModResolver::empty()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}
