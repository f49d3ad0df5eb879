//! Package file summary

use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite, Endian};
use serde::Serialize;

use super::error::{PackageError, PackageResult};
use super::{PACKAGE_TAG, read_fstring, write_fstring};

/// First file version that stores gatherable text offsets in the summary
pub const VER_GATHERABLE_TEXT: i32 = 459;

/// Layout of the custom version table, selected by the legacy file version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomVersionFormat {
    /// `-2`: integer tag and version
    Enums,
    /// `-3` to `-5`: GUID, version and friendly name
    Guids,
    /// `-6` and below: GUID and version
    Optimized,
}

impl CustomVersionFormat {
    /// Format used by a legacy file version, if it has a custom version table
    pub fn for_legacy_version(legacy_version: i32) -> Option<Self> {
        match legacy_version {
            -2 => Some(Self::Enums),
            -5..=-3 => Some(Self::Guids),
            v if v <= -6 => Some(Self::Optimized),
            _ => None,
        }
    }
}

/// One entry of the custom version table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomVersion {
    /// Version key. The enum format stores its integer tag in the first four bytes.
    pub key: [u8; 16],
    /// Version number
    pub version: i32,
    /// Friendly name, only present in the GUID format
    pub friendly_name: Option<String>,
}

impl BinRead for CustomVersion {
    type Args<'a> = (CustomVersionFormat,);

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        (format,): Self::Args<'_>,
    ) -> BinResult<Self> {
        let mut key = [0u8; 16];
        match format {
            CustomVersionFormat::Enums => {
                let tag = u32::read_options(reader, endian, ())?;
                key[..4].copy_from_slice(&tag.to_le_bytes());
            }
            CustomVersionFormat::Guids | CustomVersionFormat::Optimized => {
                reader.read_exact(&mut key)?;
            }
        }
        let version = i32::read_options(reader, endian, ())?;
        let friendly_name = if format == CustomVersionFormat::Guids {
            read_fstring(reader)?
        } else {
            None
        };
        Ok(Self {
            key,
            version,
            friendly_name,
        })
    }
}

impl BinWrite for CustomVersion {
    type Args<'a> = (CustomVersionFormat,);

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        (format,): Self::Args<'_>,
    ) -> BinResult<()> {
        match format {
            CustomVersionFormat::Enums => writer.write_all(&self.key[..4])?,
            CustomVersionFormat::Guids | CustomVersionFormat::Optimized => {
                writer.write_all(&self.key)?;
            }
        }
        self.version.write_options(writer, endian, ())?;
        if format == CustomVersionFormat::Guids {
            write_fstring(writer, self.friendly_name.as_deref())?;
        }
        Ok(())
    }
}

/// Package summary, the fixed-position header of every asset file
///
/// Only the fields up to the dependency table offset are decoded; the table
/// offsets are all that is needed to locate names, imports and exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSummary {
    /// Package tag, always `0x9E2A83C1`
    pub tag: u32,
    /// Legacy file version, negative
    pub legacy_version: i32,
    /// UE3 file version, absent when the legacy version is `-4`
    pub legacy_ue3_version: Option<i32>,
    /// UE4 object file version
    pub file_version: i32,
    /// Licensee file version
    pub licensee_version: i32,
    /// Custom version table
    pub custom_versions: Vec<CustomVersion>,
    /// Total size of the header portion of the file
    pub header_size: i32,
    /// Folder name, usually `None`
    pub folder_name: Option<String>,
    /// Package flags
    pub package_flags: u32,
    /// Number of name table entries
    pub name_count: i32,
    /// Byte offset of the name table
    pub name_offset: i32,
    /// Gatherable text entry count (file version 459 and later)
    pub gatherable_text_count: Option<i32>,
    /// Gatherable text offset (file version 459 and later)
    pub gatherable_text_offset: Option<i32>,
    /// Number of export table entries
    pub export_count: i32,
    /// Byte offset of the export table
    pub export_offset: i32,
    /// Number of import table entries
    pub import_count: i32,
    /// Byte offset of the import table
    pub import_offset: i32,
    /// Byte offset of the dependency table
    pub depends_offset: i32,
}

impl PackageSummary {
    /// Create a summary for the given UE4 file version with empty tables
    pub fn new(file_version: i32) -> Self {
        Self {
            tag: PACKAGE_TAG,
            legacy_version: -6,
            legacy_ue3_version: Some(0),
            file_version,
            licensee_version: 0,
            custom_versions: Vec::new(),
            header_size: 0,
            folder_name: Some("None".to_string()),
            package_flags: 0,
            name_count: 0,
            name_offset: 0,
            gatherable_text_count: (file_version >= VER_GATHERABLE_TEXT).then_some(0),
            gatherable_text_offset: (file_version >= VER_GATHERABLE_TEXT).then_some(0),
            export_count: 0,
            export_offset: 0,
            import_count: 0,
            import_offset: 0,
            depends_offset: 0,
        }
    }

    /// Validate the summary fields
    pub fn validate(&self) -> PackageResult<()> {
        if self.tag != PACKAGE_TAG {
            return Err(PackageError::InvalidTag(self.tag));
        }
        if !(-7..=-1).contains(&self.legacy_version) {
            return Err(PackageError::UnsupportedLegacyVersion(self.legacy_version));
        }
        if self.file_version == 0 {
            return Err(PackageError::Unversioned);
        }
        Ok(())
    }
}

impl BinRead for PackageSummary {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let pos = reader.stream_position()?;
        let tag = u32::read_options(reader, endian, ())?;
        if tag != PACKAGE_TAG {
            return Err(binrw::Error::BadMagic {
                pos,
                found: Box::new(tag),
            });
        }

        let legacy_version = i32::read_options(reader, endian, ())?;
        let legacy_ue3_version = if legacy_version == -4 {
            None
        } else {
            Some(i32::read_options(reader, endian, ())?)
        };
        let file_version = i32::read_options(reader, endian, ())?;
        let licensee_version = i32::read_options(reader, endian, ())?;

        let mut custom_versions = Vec::new();
        if let Some(format) = CustomVersionFormat::for_legacy_version(legacy_version) {
            let count_pos = reader.stream_position()?;
            let count = i32::read_options(reader, endian, ())?;
            if count < 0 {
                return Err(binrw::Error::AssertFail {
                    pos: count_pos,
                    message: format!("negative custom version count {count}"),
                });
            }
            for _ in 0..count {
                custom_versions.push(CustomVersion::read_options(reader, endian, (format,))?);
            }
        }

        let header_size = i32::read_options(reader, endian, ())?;
        let folder_name = read_fstring(reader)?;
        let package_flags = u32::read_options(reader, endian, ())?;
        let name_count = i32::read_options(reader, endian, ())?;
        let name_offset = i32::read_options(reader, endian, ())?;
        let (gatherable_text_count, gatherable_text_offset) = if file_version >= VER_GATHERABLE_TEXT
        {
            (
                Some(i32::read_options(reader, endian, ())?),
                Some(i32::read_options(reader, endian, ())?),
            )
        } else {
            (None, None)
        };
        let export_count = i32::read_options(reader, endian, ())?;
        let export_offset = i32::read_options(reader, endian, ())?;
        let import_count = i32::read_options(reader, endian, ())?;
        let import_offset = i32::read_options(reader, endian, ())?;
        let depends_offset = i32::read_options(reader, endian, ())?;

        Ok(Self {
            tag,
            legacy_version,
            legacy_ue3_version,
            file_version,
            licensee_version,
            custom_versions,
            header_size,
            folder_name,
            package_flags,
            name_count,
            name_offset,
            gatherable_text_count,
            gatherable_text_offset,
            export_count,
            export_offset,
            import_count,
            import_offset,
            depends_offset,
        })
    }
}

impl BinWrite for PackageSummary {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.tag.write_options(writer, endian, ())?;
        self.legacy_version.write_options(writer, endian, ())?;
        if self.legacy_version != -4 {
            self.legacy_ue3_version
                .unwrap_or_default()
                .write_options(writer, endian, ())?;
        }
        self.file_version.write_options(writer, endian, ())?;
        self.licensee_version.write_options(writer, endian, ())?;

        if let Some(format) = CustomVersionFormat::for_legacy_version(self.legacy_version) {
            (self.custom_versions.len() as i32).write_options(writer, endian, ())?;
            for custom in &self.custom_versions {
                custom.write_options(writer, endian, (format,))?;
            }
        }

        self.header_size.write_options(writer, endian, ())?;
        write_fstring(writer, self.folder_name.as_deref())?;
        self.package_flags.write_options(writer, endian, ())?;
        self.name_count.write_options(writer, endian, ())?;
        self.name_offset.write_options(writer, endian, ())?;
        if self.file_version >= VER_GATHERABLE_TEXT {
            self.gatherable_text_count
                .unwrap_or_default()
                .write_options(writer, endian, ())?;
            self.gatherable_text_offset
                .unwrap_or_default()
                .write_options(writer, endian, ())?;
        }
        self.export_count.write_options(writer, endian, ())?;
        self.export_offset.write_options(writer, endian, ())?;
        self.import_count.write_options(writer, endian, ())?;
        self.import_offset.write_options(writer, endian, ())?;
        self.depends_offset.write_options(writer, endian, ())?;
        Ok(())
    }
}
