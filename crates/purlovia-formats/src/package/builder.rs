//! Package builder

use std::collections::HashMap;

use binrw::io::{Cursor, Write};
use binrw::{BinWrite, Endian};

use super::error::PackageResult;
use super::properties::{NONE_NAME, PropertyValue, TaggedProperty, write_property};
use super::summary::PackageSummary;
use super::tables::{ExportEntry, FName, ImportEntry, NameEntry, ObjectIndex};

/// File version written when none is chosen
pub const DEFAULT_FILE_VERSION: i32 = 504;

/// Property value for [`ExportSpec::with_property`]
#[derive(Debug, Clone, PartialEq)]
pub enum PropertySpec {
    /// Object reference
    Object(ObjectIndex),
    /// Name, interned by the builder
    Name(String),
    /// String, `None` for an absent string
    Str(Option<String>),
    /// 32-bit integer
    Int(i32),
    /// 32-bit float
    Float(f32),
    /// Boolean
    Bool(bool),
}

/// Description of one export to add
#[derive(Debug, Clone)]
pub struct ExportSpec {
    name: String,
    class: ObjectIndex,
    super_index: ObjectIndex,
    outer: ObjectIndex,
    flags: u32,
    properties: Vec<(String, PropertySpec)>,
}

impl ExportSpec {
    /// Export named `name` whose class is `class`
    pub fn new(name: impl Into<String>, class: ObjectIndex) -> Self {
        Self {
            name: name.into(),
            class,
            super_index: ObjectIndex::NULL,
            outer: ObjectIndex::NULL,
            flags: 0,
            properties: Vec::new(),
        }
    }

    /// Set the parent class reference
    #[must_use]
    pub fn with_super(mut self, super_index: ObjectIndex) -> Self {
        self.super_index = super_index;
        self
    }

    /// Set the outer object
    #[must_use]
    pub fn with_outer(mut self, outer: ObjectIndex) -> Self {
        self.outer = outer;
        self
    }

    /// Set the object flags
    #[must_use]
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Append a tagged property
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: PropertySpec) -> Self {
        self.properties.push((name.into(), value));
        self
    }
}

/// Builder for asset packages
///
/// Produces the summary, name, import and export tables followed by each
/// export's property list, readable by [`super::Package::parse`].
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    file_version: i32,
    package_flags: u32,
    names: Vec<String>,
    name_lookup: HashMap<String, i32>,
    imports: Vec<ImportEntry>,
    exports: Vec<ExportSpec>,
}

impl Default for PackageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageBuilder {
    /// Create a builder for the default file version
    pub fn new() -> Self {
        let mut builder = Self {
            file_version: DEFAULT_FILE_VERSION,
            package_flags: 0,
            names: Vec::new(),
            name_lookup: HashMap::new(),
            imports: Vec::new(),
            exports: Vec::new(),
        };
        builder.name(NONE_NAME);
        builder
    }

    /// Set the UE4 file version
    #[must_use]
    pub fn with_file_version(mut self, file_version: i32) -> Self {
        self.file_version = file_version;
        self
    }

    /// Set the package flags
    #[must_use]
    pub fn with_package_flags(mut self, flags: u32) -> Self {
        self.package_flags = flags;
        self
    }

    /// Intern a name
    pub fn name(&mut self, text: &str) -> FName {
        if let Some(&index) = self.name_lookup.get(text) {
            return FName::new(index);
        }
        let index = self.names.len() as i32;
        self.names.push(text.to_string());
        self.name_lookup.insert(text.to_string(), index);
        FName::new(index)
    }

    /// Add an import and return its reference
    pub fn add_import(
        &mut self,
        class_package: &str,
        class_name: &str,
        outer: ObjectIndex,
        object_name: &str,
    ) -> ObjectIndex {
        let entry = ImportEntry {
            class_package: self.name(class_package),
            class_name: self.name(class_name),
            outer_index: outer,
            object_name: self.name(object_name),
        };
        self.imports.push(entry);
        ObjectIndex::import(self.imports.len() - 1)
    }

    /// Add an export and return its reference
    pub fn add_export(&mut self, spec: ExportSpec) -> ObjectIndex {
        self.name(&spec.name);
        self.exports.push(spec);
        ObjectIndex::export(self.exports.len() - 1)
    }

    /// Serialize the package
    pub fn build(mut self) -> PackageResult<Vec<u8>> {
        let version = self.file_version;
        let little = Endian::Little;

        // Property data first: it interns names that must land in the table
        let specs = std::mem::take(&mut self.exports);
        let mut blobs = Vec::with_capacity(specs.len());
        for spec in &specs {
            blobs.push(self.property_data(spec)?);
        }

        let mut summary = PackageSummary::new(version);
        summary.package_flags = self.package_flags;
        summary.name_count = self.names.len() as i32;
        summary.import_count = self.imports.len() as i32;
        summary.export_count = specs.len() as i32;

        let mut names = Cursor::new(Vec::new());
        for name in &self.names {
            NameEntry {
                name: name.clone(),
                hash: None,
            }
            .write_options(&mut names, little, (version,))?;
        }

        let mut imports = Cursor::new(Vec::new());
        for import in &self.imports {
            import.write_le(&mut imports)?;
        }

        let mut exports: Vec<ExportEntry> = Vec::with_capacity(specs.len());
        for spec in &specs {
            let mut entry = ExportEntry::new(
                version,
                spec.class,
                spec.outer,
                FName::new(self.name_lookup.get(&spec.name).copied().unwrap_or_default()),
            );
            entry.super_index = spec.super_index;
            entry.object_flags = spec.flags;
            exports.push(entry);
        }
        let export_table_len = table_len(&exports, version)?;

        let summary_len = {
            let mut probe = Cursor::new(Vec::new());
            summary.write_le(&mut probe)?;
            probe.into_inner().len()
        };
        let names = names.into_inner();
        let imports = imports.into_inner();

        let name_offset = summary_len;
        let import_offset = name_offset + names.len();
        let export_offset = import_offset + imports.len();
        let header_end = export_offset + export_table_len;

        summary.name_offset = name_offset as i32;
        summary.import_offset = import_offset as i32;
        summary.export_offset = export_offset as i32;
        summary.depends_offset = header_end as i32;
        summary.header_size = header_end as i32;

        let mut serial_offset = header_end;
        for (entry, blob) in exports.iter_mut().zip(&blobs) {
            entry.serial_offset = serial_offset as i64;
            entry.serial_size = blob.len() as i64;
            serial_offset += blob.len();
        }

        let mut output = Cursor::new(Vec::with_capacity(serial_offset));
        summary.write_le(&mut output)?;
        output.write_all(&names)?;
        output.write_all(&imports)?;
        for entry in &exports {
            entry.write_options(&mut output, little, (version,))?;
        }
        for blob in &blobs {
            output.write_all(blob)?;
        }
        Ok(output.into_inner())
    }

    fn property_data(&mut self, spec: &ExportSpec) -> PackageResult<Vec<u8>> {
        let mut data = Cursor::new(Vec::new());
        for (name, value) in &spec.properties {
            let value = match value {
                PropertySpec::Object(index) => PropertyValue::Object(*index),
                PropertySpec::Name(text) => PropertyValue::Name(self.name(text)),
                PropertySpec::Str(text) => PropertyValue::Str(text.clone()),
                PropertySpec::Int(v) => PropertyValue::Int(*v),
                PropertySpec::Float(v) => PropertyValue::Float(*v),
                PropertySpec::Bool(v) => PropertyValue::Bool(*v),
            };
            let type_name = self.name(value.type_name().unwrap_or(NONE_NAME));
            let property = TaggedProperty {
                name: self.name(name),
                array_index: 0,
                value,
            };
            write_property(&mut data, &property, type_name, self.file_version)?;
        }
        FName::new(0).write_le(&mut data)?;
        Ok(data.into_inner())
    }
}

fn table_len(exports: &[ExportEntry], version: i32) -> PackageResult<usize> {
    let mut probe = Cursor::new(Vec::new());
    for entry in exports {
        entry.write_options(&mut probe, Endian::Little, (version,))?;
    }
    Ok(probe.into_inner().len())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::package::Package;

    #[test]
    fn test_names_are_interned() {
        let mut builder = PackageBuilder::new();
        assert_eq!(builder.name("None"), FName::new(0));
        let a = builder.name("Engine");
        assert_eq!(builder.name("Engine"), a);
        assert_ne!(builder.name("engine"), a);
    }

    #[test]
    fn test_large_file_version_round_trip() {
        let mut builder = PackageBuilder::new().with_file_version(516);
        let class = builder.add_import("/Script/Engine", "Class", ObjectIndex::NULL, "Actor");
        let export = builder.add_export(
            ExportSpec::new("Thing", class)
                .with_super(class)
                .with_flags(0x10)
                .with_property("Enabled", PropertySpec::Bool(true))
                .with_property("Tag", PropertySpec::Name("Dino".into()))
                .with_property("Scale", PropertySpec::Float(1.5)),
        );
        let package = Package::parse(builder.build().unwrap()).unwrap();

        assert_eq!(package.summary.file_version, 516);
        let entry = package.export(export).unwrap();
        assert_eq!(entry.super_index, class);
        assert_eq!(entry.object_flags, 0x10);
        assert!(entry.template_index.is_some());

        let props = package.export_properties(0).unwrap();
        assert_eq!(props[0].value, PropertyValue::Bool(true));
        match props[1].value {
            PropertyValue::Name(name) => assert_eq!(package.name(name).unwrap(), "Dino"),
            ref other => panic!("unexpected value {other:?}"),
        }
        assert_eq!(props[2].value, PropertyValue::Float(1.5));
    }
}
