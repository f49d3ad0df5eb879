//! Name, import and export table entries

use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite, Endian};
use serde::Serialize;

use super::{read_fstring, write_fstring};

/// First file version whose name entries carry a 4-byte hash pair
pub const VER_NAME_HASHES: i32 = 504;
/// First file version whose exports record `bNotAlwaysLoadedForEditorGame`
pub const VER_EDITOR_GAME_FLAG: i32 = 365;
/// First file version whose exports record `bIsAsset`
pub const VER_IS_ASSET_FLAG: i32 = 485;
/// First file version whose exports carry preload dependency counts
pub const VER_PRELOAD_DEPENDENCIES: i32 = 507;
/// First file version whose exports carry a template index
pub const VER_TEMPLATE_INDEX: i32 = 508;
/// First file version with 64-bit export serial sizes and offsets
pub const VER_64BIT_SERIAL_SIZES: i32 = 511;

/// Reference into the package name table plus an instance number
///
/// A non-zero `number` is rendered as a `_<number - 1>` suffix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, BinRead, BinWrite, Serialize)]
#[brw(little)]
pub struct FName {
    /// Index into the name table
    pub index: i32,
    /// Instance number, zero for none
    pub number: i32,
}

impl FName {
    /// Name with no instance number
    pub fn new(index: i32) -> Self {
        Self { index, number: 0 }
    }
}

/// Reference to an object in the package
///
/// Zero is null, positive values are one-based export indices and negative
/// values are one-based import indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, BinRead, BinWrite, Serialize)]
#[brw(little)]
pub struct ObjectIndex(pub i32);

impl ObjectIndex {
    /// The null reference
    pub const NULL: Self = Self(0);

    /// Reference to the export at a zero-based position
    pub fn export(position: usize) -> Self {
        Self(position as i32 + 1)
    }

    /// Reference to the import at a zero-based position
    pub fn import(position: usize) -> Self {
        Self(-(position as i32) - 1)
    }

    /// Whether this is the null reference
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Zero-based export position, if this refers to an export
    pub fn as_export(self) -> Option<usize> {
        (self.0 > 0).then(|| (self.0 - 1) as usize)
    }

    /// Zero-based import position, if this refers to an import
    pub fn as_import(self) -> Option<usize> {
        (self.0 < 0).then(|| (-(i64::from(self.0)) - 1) as usize)
    }
}

/// Name table entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameEntry {
    /// The name text
    pub name: String,
    /// Stored hash pair (file version 504 and later)
    pub hash: Option<u32>,
}

impl BinRead for NameEntry {
    type Args<'a> = (i32,);

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        (file_version,): Self::Args<'_>,
    ) -> BinResult<Self> {
        let name = read_fstring(reader)?.unwrap_or_default();
        let hash = if file_version >= VER_NAME_HASHES {
            Some(u32::read_options(reader, endian, ())?)
        } else {
            None
        };
        Ok(Self { name, hash })
    }
}

impl BinWrite for NameEntry {
    type Args<'a> = (i32,);

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        (file_version,): Self::Args<'_>,
    ) -> BinResult<()> {
        write_fstring(writer, Some(self.name.as_str()))?;
        if file_version >= VER_NAME_HASHES {
            self.hash.unwrap_or_default().write_options(writer, endian, ())?;
        }
        Ok(())
    }
}

/// Import table entry: an object defined in another package
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite, Serialize)]
#[brw(little)]
pub struct ImportEntry {
    /// Package containing the class of the imported object
    pub class_package: FName,
    /// Class of the imported object
    pub class_name: FName,
    /// Outer object, usually another import
    pub outer_index: ObjectIndex,
    /// Name of the imported object
    pub object_name: FName,
}

/// Export table entry: an object defined in this package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportEntry {
    /// Class of the object
    pub class_index: ObjectIndex,
    /// Parent class or struct, for class exports
    pub super_index: ObjectIndex,
    /// Archetype (file version 508 and later)
    pub template_index: Option<ObjectIndex>,
    /// Outer object, null for top-level objects
    pub outer_index: ObjectIndex,
    /// Object name
    pub object_name: FName,
    /// Object flags
    pub object_flags: u32,
    /// Size of the serialized object data
    pub serial_size: i64,
    /// File offset of the serialized object data
    pub serial_offset: i64,
    /// Whether the export was forced into this package
    pub forced_export: bool,
    /// Excluded from clients
    pub not_for_client: bool,
    /// Excluded from servers
    pub not_for_server: bool,
    /// Package GUID for forced exports
    pub package_guid: [u8; 16],
    /// Package flags for forced exports
    pub package_flags: u32,
    /// File version 365 and later
    pub not_always_loaded_for_editor_game: Option<bool>,
    /// File version 485 and later
    pub is_asset: Option<bool>,
    /// First preload dependency and the four dependency counts
    /// (file version 507 and later)
    pub preload_dependencies: Option<[i32; 5]>,
}

impl ExportEntry {
    /// Create an export with default flags for the given file version
    pub fn new(
        file_version: i32,
        class_index: ObjectIndex,
        outer_index: ObjectIndex,
        object_name: FName,
    ) -> Self {
        Self {
            class_index,
            super_index: ObjectIndex::NULL,
            template_index: (file_version >= VER_TEMPLATE_INDEX).then_some(ObjectIndex::NULL),
            outer_index,
            object_name,
            object_flags: 0,
            serial_size: 0,
            serial_offset: 0,
            forced_export: false,
            not_for_client: false,
            not_for_server: false,
            package_guid: [0; 16],
            package_flags: 0,
            not_always_loaded_for_editor_game: (file_version >= VER_EDITOR_GAME_FLAG)
                .then_some(false),
            is_asset: (file_version >= VER_IS_ASSET_FLAG).then_some(false),
            preload_dependencies: (file_version >= VER_PRELOAD_DEPENDENCIES)
                .then_some([-1, 0, 0, 0, 0]),
        }
    }
}

fn read_bool<R: Read + Seek>(reader: &mut R, endian: Endian) -> BinResult<bool> {
    Ok(u32::read_options(reader, endian, ())? != 0)
}

fn write_bool<W: Write + Seek>(writer: &mut W, endian: Endian, value: bool) -> BinResult<()> {
    u32::from(value).write_options(writer, endian, ())
}

impl BinRead for ExportEntry {
    type Args<'a> = (i32,);

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        (file_version,): Self::Args<'_>,
    ) -> BinResult<Self> {
        let class_index = ObjectIndex::read_options(reader, endian, ())?;
        let super_index = ObjectIndex::read_options(reader, endian, ())?;
        let template_index = if file_version >= VER_TEMPLATE_INDEX {
            Some(ObjectIndex::read_options(reader, endian, ())?)
        } else {
            None
        };
        let outer_index = ObjectIndex::read_options(reader, endian, ())?;
        let object_name = FName::read_options(reader, endian, ())?;
        let object_flags = u32::read_options(reader, endian, ())?;
        let (serial_size, serial_offset) = if file_version >= VER_64BIT_SERIAL_SIZES {
            (
                i64::read_options(reader, endian, ())?,
                i64::read_options(reader, endian, ())?,
            )
        } else {
            (
                i64::from(i32::read_options(reader, endian, ())?),
                i64::from(i32::read_options(reader, endian, ())?),
            )
        };
        let forced_export = read_bool(reader, endian)?;
        let not_for_client = read_bool(reader, endian)?;
        let not_for_server = read_bool(reader, endian)?;
        let mut package_guid = [0u8; 16];
        reader.read_exact(&mut package_guid)?;
        let package_flags = u32::read_options(reader, endian, ())?;
        let not_always_loaded_for_editor_game = if file_version >= VER_EDITOR_GAME_FLAG {
            Some(read_bool(reader, endian)?)
        } else {
            None
        };
        let is_asset = if file_version >= VER_IS_ASSET_FLAG {
            Some(read_bool(reader, endian)?)
        } else {
            None
        };
        let preload_dependencies = if file_version >= VER_PRELOAD_DEPENDENCIES {
            Some(<[i32; 5]>::read_options(reader, endian, ())?)
        } else {
            None
        };

        Ok(Self {
            class_index,
            super_index,
            template_index,
            outer_index,
            object_name,
            object_flags,
            serial_size,
            serial_offset,
            forced_export,
            not_for_client,
            not_for_server,
            package_guid,
            package_flags,
            not_always_loaded_for_editor_game,
            is_asset,
            preload_dependencies,
        })
    }
}

impl BinWrite for ExportEntry {
    type Args<'a> = (i32,);

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        (file_version,): Self::Args<'_>,
    ) -> BinResult<()> {
        self.class_index.write_options(writer, endian, ())?;
        self.super_index.write_options(writer, endian, ())?;
        if file_version >= VER_TEMPLATE_INDEX {
            self.template_index
                .unwrap_or_default()
                .write_options(writer, endian, ())?;
        }
        self.outer_index.write_options(writer, endian, ())?;
        self.object_name.write_options(writer, endian, ())?;
        self.object_flags.write_options(writer, endian, ())?;
        if file_version >= VER_64BIT_SERIAL_SIZES {
            self.serial_size.write_options(writer, endian, ())?;
            self.serial_offset.write_options(writer, endian, ())?;
        } else {
            (self.serial_size as i32).write_options(writer, endian, ())?;
            (self.serial_offset as i32).write_options(writer, endian, ())?;
        }
        write_bool(writer, endian, self.forced_export)?;
        write_bool(writer, endian, self.not_for_client)?;
        write_bool(writer, endian, self.not_for_server)?;
        writer.write_all(&self.package_guid)?;
        self.package_flags.write_options(writer, endian, ())?;
        if file_version >= VER_EDITOR_GAME_FLAG {
            write_bool(
                writer,
                endian,
                self.not_always_loaded_for_editor_game.unwrap_or_default(),
            )?;
        }
        if file_version >= VER_IS_ASSET_FLAG {
            write_bool(writer, endian, self.is_asset.unwrap_or_default())?;
        }
        if file_version >= VER_PRELOAD_DEPENDENCIES {
            self.preload_dependencies
                .unwrap_or([-1, 0, 0, 0, 0])
                .write_options(writer, endian, ())?;
        }
        Ok(())
    }
}
