//! Linked asset model
//!
//! A [`Package`] holds raw table entries: name indices and signed object
//! indices. Linking resolves those into names and [`ObjectRef`]s, decodes
//! each export's property list, works out which asset every import comes
//! from, and picks the default object.

use std::fmt;
use std::sync::Arc;

use purlovia_formats::package::{
    ObjectIndex, Package, PackageError, PackageResult, PackageSummary,
    PropertyValue as RawValue,
};
use serde::Serialize;
use tracing::warn;

/// Prefix marking an asset's class default object
pub const DEFAULT_OBJECT_PREFIX: &str = "Default__";

/// A resolved object reference
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ObjectRef {
    /// No object
    Null,
    /// An export of the same asset
    Export {
        /// Position in the export table
        index: usize,
        /// Object name
        name: String,
    },
    /// An object defined in another asset
    Import {
        /// Position in the import table
        index: usize,
        /// Object name
        name: String,
        /// Canonical name of the package that exports it
        package: String,
    },
}

impl ObjectRef {
    /// Object name, `None` for the null reference
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Null => None,
            Self::Export { name, .. } | Self::Import { name, .. } => Some(name),
        }
    }

    /// True for the null reference
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Export { name, .. } => write!(f, "export {name}"),
            Self::Import { name, package, .. } => write!(f, "import {package}.{name}"),
        }
    }
}

/// A decoded property value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum PropertyValue {
    /// Object or class reference
    Object(ObjectRef),
    /// Name
    Name(String),
    /// String, `None` when stored empty
    Str(Option<String>),
    /// 32-bit integer
    Int(i32),
    /// 32-bit float
    Float(f32),
    /// Boolean
    Bool(bool),
    /// A type that is not decoded
    Other {
        /// Serialized type name
        type_name: String,
        /// Size of the skipped value
        size: i32,
    },
}

/// A named property of an export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    /// Property name
    pub name: String,
    /// Element index within fixed-size array properties
    pub index: i32,
    /// Decoded value
    pub value: PropertyValue,
}

/// An object referenced from another package
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Import {
    /// Object name
    pub name: String,
    /// Package of the object's class
    pub class_package: String,
    /// Class name
    pub class_name: String,
    /// Containing object
    pub outer: ObjectRef,
    /// Canonical name of the package that exports the object
    pub package: String,
}

/// An object defined in this asset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Export {
    /// Object name
    pub name: String,
    /// Class of the object
    pub class: ObjectRef,
    /// Parent class, for class exports
    pub super_ref: ObjectRef,
    /// Containing object
    pub outer: ObjectRef,
    /// Object flags
    pub flags: u32,
    /// Tagged properties from the export's data
    pub properties: Vec<Property>,
}

impl Export {
    /// First property with the given name
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// A fully loaded and linked asset
#[derive(Debug, Clone, Serialize)]
pub struct Asset {
    /// Canonical asset name
    pub name: String,
    /// File summary
    pub summary: PackageSummary,
    /// Import table
    pub imports: Vec<Import>,
    /// Export table
    pub exports: Vec<Export>,
    /// Position of the default object export
    pub default_export: Option<usize>,
}

impl Asset {
    /// Link a parsed package
    pub fn link(name: &str, package: &Package) -> PackageResult<Self> {
        let mut imports = Vec::with_capacity(package.imports.len());
        for (position, entry) in package.imports.iter().enumerate() {
            imports.push(Import {
                name: package.name(entry.object_name)?,
                class_package: package.name(entry.class_package)?,
                class_name: package.name(entry.class_name)?,
                outer: link_ref(package, entry.outer_index)?,
                package: import_package(package, position)?,
            });
        }

        let mut exports = Vec::with_capacity(package.exports.len());
        for (position, entry) in package.exports.iter().enumerate() {
            let properties = package
                .export_properties(position)?
                .into_iter()
                .map(|p| {
                    Ok(Property {
                        name: package.name(p.name)?,
                        index: p.array_index,
                        value: link_value(package, p.value)?,
                    })
                })
                .collect::<PackageResult<Vec<_>>>()?;

            exports.push(Export {
                name: package.name(entry.object_name)?,
                class: link_ref(package, entry.class_index)?,
                super_ref: link_ref(package, entry.super_index)?,
                outer: link_ref(package, entry.outer_index)?,
                flags: entry.object_flags,
                properties,
            });
        }

        let mut defaults = exports
            .iter()
            .enumerate()
            .filter(|(_, e)| e.name.starts_with(DEFAULT_OBJECT_PREFIX))
            .map(|(i, _)| i);
        let default_export = defaults.next();
        let extra = defaults.count();
        if extra > 0 {
            warn!(
                asset = name,
                candidates = extra + 1,
                "Found more than one default object, using the first"
            );
        }

        Ok(Self {
            name: name.to_string(),
            summary: package.summary.clone(),
            imports,
            exports,
            default_export,
        })
    }

    /// Short name: the final path segment
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// The class default object
    pub fn default_object(&self) -> Option<&Export> {
        self.default_export.and_then(|i| self.exports.get(i))
    }

    /// Class of the default object
    pub fn default_class(&self) -> Option<&ObjectRef> {
        self.default_object().map(|e| &e.class)
    }

    /// Position of the export with exactly this name
    pub fn find_export(&self, name: &str) -> Option<usize> {
        self.exports.iter().position(|e| e.name == name)
    }
}

/// An export together with the asset that owns it
#[derive(Debug, Clone)]
pub struct ExportRef {
    asset: Arc<Asset>,
    position: usize,
}

impl ExportRef {
    /// Handle to export `position` of `asset`, if it exists
    pub fn new(asset: Arc<Asset>, position: usize) -> Option<Self> {
        (position < asset.exports.len()).then_some(Self { asset, position })
    }

    /// Owning asset
    pub fn asset(&self) -> &Arc<Asset> {
        &self.asset
    }

    /// Position in the export table
    pub fn position(&self) -> usize {
        self.position
    }

    /// The export
    pub fn export(&self) -> &Export {
        &self.asset.exports[self.position]
    }

    /// `<asset>.<export>` name
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.asset.name, self.export().name)
    }
}

impl PartialEq for ExportRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.asset, &other.asset) && self.position == other.position
    }
}

/// A value that may lead to another asset
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    /// A property, followed through its value
    Property(&'a Property),
    /// A property value, followed if it is an object reference
    Value(&'a PropertyValue),
    /// An object reference
    Object(&'a ObjectRef),
    /// An import table entry
    Import(&'a Import),
    /// An export table entry, which has no traversal rule
    Export(&'a Export),
}

impl Node<'_> {
    /// Short description for error messages
    pub fn describe(&self) -> String {
        match self {
            Self::Property(p) => format!("property {}", p.name),
            Self::Value(v) => format!("{v:?}"),
            Self::Object(r) => r.to_string(),
            Self::Import(i) => format!("import {}", i.name),
            Self::Export(e) => format!("export {}", e.name),
        }
    }
}

fn link_ref(package: &Package, index: ObjectIndex) -> PackageResult<ObjectRef> {
    if index.is_null() {
        return Ok(ObjectRef::Null);
    }
    let name = package
        .object_name(index)?
        .ok_or(PackageError::ObjectIndexOutOfRange(index.0))?;
    Ok(match (index.as_export(), index.as_import()) {
        (Some(position), _) => ObjectRef::Export {
            index: position,
            name,
        },
        (None, Some(position)) => ObjectRef::Import {
            index: position,
            name,
            package: import_package(package, position)?,
        },
        (None, None) => ObjectRef::Null,
    })
}

/// Name of the outermost import containing import `position`
fn import_package(package: &Package, position: usize) -> PackageResult<String> {
    let mut current = ObjectIndex::import(position);
    for _ in 0..=package.imports.len() {
        let entry = package.import(current)?;
        if entry.outer_index.is_null() {
            return package.name(entry.object_name);
        }
        current = entry.outer_index;
    }
    Err(PackageError::ObjectIndexOutOfRange(current.0))
}

fn link_value(package: &Package, value: RawValue) -> PackageResult<PropertyValue> {
    Ok(match value {
        RawValue::Object(index) => PropertyValue::Object(link_ref(package, index)?),
        RawValue::Name(name) => PropertyValue::Name(package.name(name)?),
        RawValue::Str(text) => PropertyValue::Str(text),
        RawValue::Int(v) => PropertyValue::Int(v),
        RawValue::Float(v) => PropertyValue::Float(v),
        RawValue::Bool(v) => PropertyValue::Bool(v),
        RawValue::Other { type_name, size } => PropertyValue::Other {
            type_name: package.name(type_name)?,
            size,
        },
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use purlovia_formats::package::{ExportSpec, PackageBuilder, PropertySpec};

    fn item_package() -> Package {
        let mut builder = PackageBuilder::new();
        let base_pkg = builder.add_import(
            "/Script/CoreUObject",
            "Package",
            ObjectIndex::NULL,
            "/Game/PrimalEarth/CoreBlueprints/Items/PrimalItem_Base",
        );
        let base = builder.add_import(
            "/Script/Engine",
            "BlueprintGeneratedClass",
            base_pkg,
            "PrimalItem_Base_C",
        );
        let class =
            builder.add_export(ExportSpec::new("PrimalItem_Test_C", base).with_super(base));
        builder.add_export(
            ExportSpec::new("Default__PrimalItem_Test_C", class)
                .with_property("DescriptiveNameBase", PropertySpec::Str(Some("Test Item".into())))
                .with_property("Parent", PropertySpec::Object(base)),
        );
        builder.add_export(ExportSpec::new("Default__Second", class));
        Package::parse(builder.build().unwrap()).unwrap()
    }

    #[test]
    fn test_link() {
        let asset = Asset::link("/Game/Items/PrimalItem_Test", &item_package())
            .expect("Asset should link");

        assert_eq!(asset.short_name(), "PrimalItem_Test");
        assert_eq!(
            asset.imports[1].package,
            "/Game/PrimalEarth/CoreBlueprints/Items/PrimalItem_Base"
        );
        assert_eq!(asset.imports[0].package, asset.imports[0].name);

        let class = &asset.exports[0];
        assert_eq!(
            class.super_ref,
            ObjectRef::Import {
                index: 1,
                name: "PrimalItem_Base_C".into(),
                package: "/Game/PrimalEarth/CoreBlueprints/Items/PrimalItem_Base".into(),
            }
        );

        // Two candidates: the first wins
        assert_eq!(asset.default_export, Some(1));
        let default = asset.default_object().unwrap();
        assert_eq!(
            default.property("DescriptiveNameBase").unwrap().value,
            PropertyValue::Str(Some("Test Item".into()))
        );
        assert_eq!(
            asset.default_class(),
            Some(&ObjectRef::Export {
                index: 0,
                name: "PrimalItem_Test_C".into()
            })
        );
        assert_eq!(asset.find_export("Default__Second"), Some(2));
    }

    #[test]
    fn test_export_ref() {
        let asset = Arc::new(Asset::link("/Game/A", &item_package()).unwrap());
        let export = ExportRef::new(Arc::clone(&asset), 0).unwrap();
        assert_eq!(export.qualified_name(), "/Game/A.PrimalItem_Test_C");
        assert!(ExportRef::new(asset, 3).is_none());
    }
}
