//! Workshop mod descriptor files
//!
//! A downloaded mod carries two small binary descriptors next to its content:
//!
//! - `mod.info`: display name string, `u32` map count, that many map names
//! - `modmeta.info`: `u32` entry count, that many key/value string pairs
//!
//! All strings use the length-prefixed layout from [`crate::strings`].

use std::io::{BufReader, Read, Write};
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::strings::{StringError, read_string, write_string};

/// Errors raised while reading mod descriptors
#[derive(Debug, Error)]
pub enum ModInfoError {
    /// A string field could not be read
    #[error("string field: {0}")]
    String(#[from] StringError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for descriptor operations
pub type ModInfoResult<T> = Result<T, ModInfoError>;

/// Contents of `mod.info`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModInfo {
    /// Display name, absent when stored empty
    pub name: Option<String>,
    /// Map names shipped by the mod
    pub maps: Vec<String>,
}

impl ModInfo {
    /// Read from a stream
    pub fn read<R: Read>(reader: &mut R) -> ModInfoResult<Self> {
        let name = read_string(reader)?;
        let count = read_u32(reader)?;
        let mut maps = Vec::new();
        for index in 0..count {
            match read_string(reader)? {
                Some(map) => maps.push(map),
                None => warn!(index, count, "Skipping empty map name in mod.info"),
            }
        }
        Ok(Self { name, maps })
    }

    /// Read from a file
    pub fn from_path(path: impl AsRef<Path>) -> ModInfoResult<Self> {
        let mut reader = BufReader::new(std::fs::File::open(path)?);
        Self::read(&mut reader)
    }

    /// Write in the on-disk layout
    pub fn write<W: Write>(&self, writer: &mut W) -> ModInfoResult<()> {
        write_string(writer, self.name.as_deref())?;
        write_u32(writer, self.maps.len())?;
        for map in &self.maps {
            write_string(writer, Some(map.as_str()))?;
        }
        Ok(())
    }
}

/// Contents of `modmeta.info`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModMetaInfo {
    /// Metadata pairs in file order; later duplicates overwrite earlier ones
    pub entries: IndexMap<String, String>,
}

impl ModMetaInfo {
    /// Read from a stream
    pub fn read<R: Read>(reader: &mut R) -> ModInfoResult<Self> {
        let count = read_u32(reader)?;
        let mut entries = IndexMap::new();
        for _ in 0..count {
            let key = read_string(reader)?.unwrap_or_default();
            let value = read_string(reader)?.unwrap_or_default();
            entries.insert(key, value);
        }
        Ok(Self { entries })
    }

    /// Read from a file
    pub fn from_path(path: impl AsRef<Path>) -> ModInfoResult<Self> {
        let mut reader = BufReader::new(std::fs::File::open(path)?);
        Self::read(&mut reader)
    }

    /// Look up a metadata value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Write in the on-disk layout
    pub fn write<W: Write>(&self, writer: &mut W) -> ModInfoResult<()> {
        write_u32(writer, self.entries.len())?;
        for (key, value) in &self.entries {
            write_string(writer, Some(key.as_str()))?;
            write_string(writer, Some(value.as_str()))?;
        }
        Ok(())
    }
}

fn read_u32<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn write_u32<W: Write>(writer: &mut W, count: usize) -> std::io::Result<()> {
    let count = u32::try_from(count).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "too many entries")
    })?;
    writer.write_all(&count.to_le_bytes())
}
