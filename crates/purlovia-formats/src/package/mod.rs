//! UE4 asset package reader and builder
//!
//! Game assets (`.uasset`, `.umap`) are UE4 packages: a [`PackageSummary`]
//! at offset zero locates the name, import and export tables. Each export's
//! serialized data begins with a tagged property list.
//!
//! Parsing stops at the tables; export data is only decoded on request with
//! [`Package::export_properties`].

mod builder;
mod error;
mod properties;
mod summary;
mod tables;

pub use builder::{DEFAULT_FILE_VERSION, ExportSpec, PackageBuilder, PropertySpec};
pub use error::{PackageError, PackageResult};
pub use properties::{NONE_NAME, PropertyValue, TaggedProperty, read_properties, write_property};
pub use summary::{CustomVersion, CustomVersionFormat, PackageSummary};
pub use tables::{ExportEntry, FName, ImportEntry, NameEntry, ObjectIndex};

use binrw::io::{Cursor, Read, Seek, Write};
use binrw::{BinRead, BinResult, Endian};
use serde::Serialize;
use tracing::trace;

use crate::strings::{StringError, read_string, write_string};

/// Package tag at the start of every asset file
pub const PACKAGE_TAG: u32 = 0x9E2A_83C1;

/// A parsed package: summary and tables, plus the raw bytes for export data
#[derive(Debug, Clone, Serialize)]
pub struct Package {
    /// File summary
    pub summary: PackageSummary,
    /// Name table
    pub names: Vec<NameEntry>,
    /// Import table
    pub imports: Vec<ImportEntry>,
    /// Export table
    pub exports: Vec<ExportEntry>,
    #[serde(skip)]
    data: Vec<u8>,
}

impl Package {
    /// Parse the summary and tables of a package
    pub fn parse(data: Vec<u8>) -> PackageResult<Self> {
        let (summary, names, imports, exports) = {
            let mut cursor = Cursor::new(data.as_slice());
            let summary = PackageSummary::read_le(&mut cursor)?;
            summary.validate()?;
            let version = summary.file_version;

            let names = read_table(
                &mut cursor,
                "name",
                summary.name_count,
                summary.name_offset,
                |c| NameEntry::read_options(c, Endian::Little, (version,)),
            )?;
            let imports = read_table(
                &mut cursor,
                "import",
                summary.import_count,
                summary.import_offset,
                |c| ImportEntry::read_le(c),
            )?;
            let exports = read_table(
                &mut cursor,
                "export",
                summary.export_count,
                summary.export_offset,
                |c| ExportEntry::read_options(c, Endian::Little, (version,)),
            )?;
            (summary, names, imports, exports)
        };

        trace!(
            names = names.len(),
            imports = imports.len(),
            exports = exports.len(),
            "Parsed package tables"
        );

        Ok(Self {
            summary,
            names,
            imports,
            exports,
            data,
        })
    }

    /// Size of the package file in bytes
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Render a name reference, including any instance number suffix
    pub fn name(&self, name: FName) -> PackageResult<String> {
        let base = usize::try_from(name.index)
            .ok()
            .and_then(|i| self.names.get(i))
            .ok_or(PackageError::NameIndexOutOfRange(name.index))?;
        if name.number > 0 {
            Ok(format!("{}_{}", base.name, name.number - 1))
        } else {
            Ok(base.name.clone())
        }
    }

    /// Look up an import by reference
    pub fn import(&self, index: ObjectIndex) -> PackageResult<&ImportEntry> {
        index
            .as_import()
            .and_then(|i| self.imports.get(i))
            .ok_or(PackageError::ObjectIndexOutOfRange(index.0))
    }

    /// Look up an export by reference
    pub fn export(&self, index: ObjectIndex) -> PackageResult<&ExportEntry> {
        index
            .as_export()
            .and_then(|i| self.exports.get(i))
            .ok_or(PackageError::ObjectIndexOutOfRange(index.0))
    }

    /// Name of the referenced object, `None` for the null reference
    pub fn object_name(&self, index: ObjectIndex) -> PackageResult<Option<String>> {
        if index.is_null() {
            return Ok(None);
        }
        let name = match index.as_export() {
            Some(_) => self.export(index)?.object_name,
            None => self.import(index)?.object_name,
        };
        self.name(name).map(Some)
    }

    /// Serialized data of the export at a zero-based position
    pub fn export_data(&self, position: usize) -> PackageResult<&[u8]> {
        let export = self
            .exports
            .get(position)
            .ok_or(PackageError::ObjectIndexOutOfRange(ObjectIndex::export(position).0))?;
        let out_of_bounds = || PackageError::SerialDataOutOfBounds {
            export: position,
            offset: export.serial_offset,
            size: export.serial_size,
        };
        let start = usize::try_from(export.serial_offset).map_err(|_| out_of_bounds())?;
        let size = usize::try_from(export.serial_size).map_err(|_| out_of_bounds())?;
        start
            .checked_add(size)
            .and_then(|end| self.data.get(start..end))
            .ok_or_else(out_of_bounds)
    }

    /// Decode the tagged property list of the export at a zero-based position
    pub fn export_properties(&self, position: usize) -> PackageResult<Vec<TaggedProperty>> {
        let data = self.export_data(position)?;
        if data.is_empty() {
            return Ok(Vec::new());
        }
        read_properties(&mut Cursor::new(data), &self.names, self.summary.file_version)
    }
}

fn read_table<T>(
    cursor: &mut Cursor<&[u8]>,
    table: &'static str,
    count: i32,
    offset: i32,
    mut read: impl FnMut(&mut Cursor<&[u8]>) -> BinResult<T>,
) -> PackageResult<Vec<T>> {
    let len = cursor.get_ref().len() as i64;
    if count < 0 || offset < 0 || i64::from(offset) > len || i64::from(count) > len {
        return Err(PackageError::TableOutOfBounds {
            table,
            count,
            offset: i64::from(offset),
        });
    }
    if count == 0 {
        return Ok(Vec::new());
    }

    cursor.set_position(offset as u64);
    let mut entries = Vec::with_capacity(initial_capacity(count));
    for _ in 0..count {
        entries.push(read(cursor)?);
    }
    Ok(entries)
}

/// Entries reserved before reading a table; a corrupt count must not
/// reserve far more memory than the file could describe
const MAX_TABLE_RESERVATION: usize = 4096;

fn initial_capacity(count: i32) -> usize {
    usize::try_from(count).unwrap_or_default().min(MAX_TABLE_RESERVATION)
}

/// Read a length-prefixed string inside a binrw parser
pub(crate) fn read_fstring<R: Read + Seek>(reader: &mut R) -> BinResult<Option<String>> {
    let pos = reader.stream_position()?;
    read_string(reader).map_err(|e| match e {
        StringError::Io(io) => binrw::Error::Io(io),
        other => binrw::Error::Custom {
            pos,
            err: Box::new(other),
        },
    })
}

/// Write a length-prefixed string inside a binrw writer
pub(crate) fn write_fstring<W: Write>(writer: &mut W, value: Option<&str>) -> BinResult<()> {
    write_string(writer, value)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_reservation_is_capped() {
        assert_eq!(initial_capacity(12), 12);
        assert_eq!(initial_capacity(i32::MAX), MAX_TABLE_RESERVATION);
        assert_eq!(initial_capacity(-1), 0);
    }

    fn sample() -> Vec<u8> {
        let mut builder = PackageBuilder::new();
        let script = builder.add_import(
            "/Script/CoreUObject",
            "Package",
            ObjectIndex::NULL,
            "/Script/ShooterGame",
        );
        let class = builder.add_import("/Script/CoreUObject", "Class", script, "PrimalItem");
        let generated = builder.add_export(ExportSpec::new("PrimalItem_Test_C", class));
        builder.add_export(
            ExportSpec::new("Default__PrimalItem_Test_C", generated)
                .with_property("ItemName", PropertySpec::Str(Some("Test".into())))
                .with_property("StackSize", PropertySpec::Int(100))
                .with_property("Parent", PropertySpec::Object(class)),
        );
        builder.build().expect("Package should build")
    }

    #[test]
    fn test_tables_parse() {
        let package = Package::parse(sample()).expect("Package should parse");
        assert_eq!(package.imports.len(), 2);
        assert_eq!(package.exports.len(), 2);
        assert_eq!(
            package.object_name(ObjectIndex(2)).unwrap().as_deref(),
            Some("Default__PrimalItem_Test_C")
        );
        assert_eq!(
            package.object_name(ObjectIndex(-2)).unwrap().as_deref(),
            Some("PrimalItem")
        );
        assert_eq!(package.object_name(ObjectIndex::NULL).unwrap(), None);
        assert!(matches!(
            package.object_name(ObjectIndex(9)),
            Err(PackageError::ObjectIndexOutOfRange(9))
        ));
    }

    #[test]
    fn test_export_properties() {
        let package = Package::parse(sample()).unwrap();
        assert!(package.export_properties(0).unwrap().is_empty());

        let props = package.export_properties(1).unwrap();
        let names: Vec<String> = props.iter().map(|p| package.name(p.name).unwrap()).collect();
        assert_eq!(names, vec!["ItemName", "StackSize", "Parent"]);
        assert_eq!(props[0].value, PropertyValue::Str(Some("Test".into())));
        assert_eq!(props[1].value, PropertyValue::Int(100));
        assert_eq!(props[2].value, PropertyValue::Object(ObjectIndex(-2)));
    }

    #[test]
    fn test_numbered_names() {
        let package = Package::parse(sample()).unwrap();
        let name = FName { index: 0, number: 3 };
        assert_eq!(package.name(name).unwrap(), format!("{}_2", package.names[0].name));
    }

    #[test]
    fn test_table_bounds_checked() {
        let mut bytes = sample();
        let mut summary = PackageSummary::read_le(&mut Cursor::new(&bytes)).unwrap();
        summary.import_offset = bytes.len() as i32 + 10;
        let mut cursor = Cursor::new(Vec::new());
        binrw::BinWrite::write_le(&summary, &mut cursor).unwrap();
        let header = cursor.into_inner();
        bytes[..header.len()].copy_from_slice(&header);

        let err = Package::parse(bytes).expect_err("Offset past end should fail");
        assert!(matches!(err, PackageError::TableOutOfBounds { table: "import", .. }));
        assert!(err.is_corruption());
    }

    #[test]
    fn test_truncated_package() {
        let bytes = sample();
        let err = Package::parse(bytes[..20].to_vec()).expect_err("Truncated summary");
        assert!(err.is_corruption());
    }
}
