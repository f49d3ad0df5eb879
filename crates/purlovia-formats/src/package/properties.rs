//! Tagged property lists stored at the start of every export's data

use binrw::io::{Read, Seek, SeekFrom, Write};
use binrw::{BinRead, BinWrite};
use serde::Serialize;

use super::error::{PackageError, PackageResult};
use super::tables::{FName, NameEntry, ObjectIndex};
use crate::strings::{read_string, write_string};

/// First file version whose array tags name their inner type
pub const VER_ARRAY_INNER_TAGS: i32 = 282;
/// First file version whose struct tags carry a GUID
pub const VER_STRUCT_GUID: i32 = 441;
/// First file version whose tags may carry a property GUID
pub const VER_PROPERTY_GUID: i32 = 503;
/// First file version with set and map property tags
pub const VER_SET_MAP_TAGS: i32 = 509;

/// Name that terminates a property list
pub const NONE_NAME: &str = "None";

/// Decoded property value
///
/// Only scalar and reference types are decoded; other types are skipped
/// using the size recorded in their tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum PropertyValue {
    /// `ObjectProperty` or `ClassProperty`
    Object(ObjectIndex),
    /// `NameProperty`
    Name(FName),
    /// `StrProperty`
    Str(Option<String>),
    /// `IntProperty`
    Int(i32),
    /// `FloatProperty`
    Float(f32),
    /// `BoolProperty`
    Bool(bool),
    /// Any other type, skipped
    Other {
        /// Serialized type name
        type_name: FName,
        /// Size of the skipped value
        size: i32,
    },
}

impl PropertyValue {
    /// Type name written in the property tag, `None` for skipped types
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            Self::Object(_) => Some("ObjectProperty"),
            Self::Name(_) => Some("NameProperty"),
            Self::Str(_) => Some("StrProperty"),
            Self::Int(_) => Some("IntProperty"),
            Self::Float(_) => Some("FloatProperty"),
            Self::Bool(_) => Some("BoolProperty"),
            Self::Other { .. } => None,
        }
    }
}

/// One entry of a tagged property list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedProperty {
    /// Property name
    pub name: FName,
    /// Element index for fixed-size array properties
    pub array_index: i32,
    /// Decoded value
    pub value: PropertyValue,
}

fn name_text(names: &[NameEntry], name: FName) -> PackageResult<&str> {
    usize::try_from(name.index)
        .ok()
        .and_then(|i| names.get(i))
        .map(|entry| entry.name.as_str())
        .ok_or(PackageError::NameIndexOutOfRange(name.index))
}

fn skip<R: Seek>(reader: &mut R, bytes: i64) -> PackageResult<()> {
    reader.seek(SeekFrom::Current(bytes))?;
    Ok(())
}

/// Read a property list up to and including its `None` terminator
pub fn read_properties<R: Read + Seek>(
    reader: &mut R,
    names: &[NameEntry],
    file_version: i32,
) -> PackageResult<Vec<TaggedProperty>> {
    let mut properties = Vec::new();

    loop {
        let name = FName::read_le(reader)?;
        let property_name = name_text(names, name)?;
        if property_name == NONE_NAME {
            break;
        }

        let type_name = FName::read_le(reader)?;
        let size = i32::read_le(reader)?;
        let array_index = i32::read_le(reader)?;
        let type_text = name_text(names, type_name)?;

        if size < 0 {
            return Err(PackageError::PropertySizeMismatch {
                property: property_name.to_string(),
                expected: i64::from(size),
                actual: 0,
            });
        }

        let mut bool_value = false;
        match type_text {
            "StructProperty" => {
                FName::read_le(reader)?;
                if file_version >= VER_STRUCT_GUID {
                    skip(reader, 16)?;
                }
            }
            "BoolProperty" => bool_value = u8::read_le(reader)? != 0,
            "ByteProperty" | "EnumProperty" => {
                FName::read_le(reader)?;
            }
            "ArrayProperty" if file_version >= VER_ARRAY_INNER_TAGS => {
                FName::read_le(reader)?;
            }
            "SetProperty" if file_version >= VER_SET_MAP_TAGS => {
                FName::read_le(reader)?;
            }
            "MapProperty" if file_version >= VER_SET_MAP_TAGS => {
                FName::read_le(reader)?;
                FName::read_le(reader)?;
            }
            _ => {}
        }
        if file_version >= VER_PROPERTY_GUID && u8::read_le(reader)? != 0 {
            skip(reader, 16)?;
        }

        let start = reader.stream_position()?;
        let value = match type_text {
            "ObjectProperty" | "ClassProperty" => {
                PropertyValue::Object(ObjectIndex::read_le(reader)?)
            }
            "NameProperty" => PropertyValue::Name(FName::read_le(reader)?),
            "StrProperty" => PropertyValue::Str(read_string(reader)?),
            "IntProperty" => PropertyValue::Int(i32::read_le(reader)?),
            "FloatProperty" => PropertyValue::Float(f32::read_le(reader)?),
            "BoolProperty" => PropertyValue::Bool(bool_value),
            _ => {
                skip(reader, i64::from(size))?;
                PropertyValue::Other { type_name, size }
            }
        };

        let consumed = (reader.stream_position()? - start) as i64;
        if consumed != i64::from(size) {
            return Err(PackageError::PropertySizeMismatch {
                property: property_name.to_string(),
                expected: i64::from(size),
                actual: consumed,
            });
        }

        properties.push(TaggedProperty {
            name,
            array_index,
            value,
        });
    }

    Ok(properties)
}

/// Write one property tag and its value.
///
/// `type_name` must reference the name matching [`PropertyValue::type_name`];
/// skipped values are written with a zero size.
pub fn write_property<W: Write + Seek>(
    writer: &mut W,
    property: &TaggedProperty,
    type_name: FName,
    file_version: i32,
) -> PackageResult<()> {
    let mut value = Vec::new();
    let mut bool_value = 0u8;
    match &property.value {
        PropertyValue::Object(index) => value.extend_from_slice(&index.0.to_le_bytes()),
        PropertyValue::Name(name) => {
            value.extend_from_slice(&name.index.to_le_bytes());
            value.extend_from_slice(&name.number.to_le_bytes());
        }
        PropertyValue::Str(text) => write_string(&mut value, text.as_deref())?,
        PropertyValue::Int(v) => value.extend_from_slice(&v.to_le_bytes()),
        PropertyValue::Float(v) => value.extend_from_slice(&v.to_le_bytes()),
        PropertyValue::Bool(v) => bool_value = u8::from(*v),
        PropertyValue::Other { .. } => {}
    }

    property.name.write_le(writer)?;
    type_name.write_le(writer)?;
    (value.len() as i32).write_le(writer)?;
    property.array_index.write_le(writer)?;
    if matches!(property.value, PropertyValue::Bool(_)) {
        bool_value.write_le(writer)?;
    }
    if file_version >= VER_PROPERTY_GUID {
        0u8.write_le(writer)?;
    }
    writer.write_all(&value)?;
    Ok(())
}
