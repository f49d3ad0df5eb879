//! Container header and chunk descriptor table

use binrw::io::{Read, Seek};
use binrw::{BinRead, BinWrite};
use serde::Serialize;

use super::error::{ContainerError, ContainerResult};
use super::CONTAINER_MAGIC;

/// Fixed container header
///
/// Four little-endian `u64` fields:
/// - Magic tag `0x9E2A83C1`
/// - Nominal uncompressed size of every chunk but the last
/// - Total compressed size (informational)
/// - Total uncompressed size
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite, Serialize)]
#[brw(little)]
pub struct ContainerHeader {
    /// Magic tag, always `0x9E2A83C1`
    pub magic: u64,
    /// Nominal uncompressed chunk size
    pub chunk_size: u64,
    /// Total compressed payload size
    pub compressed_size: u64,
    /// Total uncompressed size
    pub uncompressed_size: u64,
}

/// Sizes of one payload chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite, Serialize)]
#[brw(little)]
pub struct ChunkDescriptor {
    /// Bytes of zlib data in the payload
    pub compressed_size: u64,
    /// Bytes produced by inflating the chunk
    pub uncompressed_size: u64,
}

impl ContainerHeader {
    /// Create a header with the package tag
    pub fn new(chunk_size: u64, compressed_size: u64, uncompressed_size: u64) -> Self {
        Self {
            magic: CONTAINER_MAGIC,
            chunk_size,
            compressed_size,
            uncompressed_size,
        }
    }

    /// Validate the header fields
    pub fn validate(&self) -> ContainerResult<()> {
        if self.magic != CONTAINER_MAGIC {
            return Err(ContainerError::InvalidMagic(self.magic));
        }
        Ok(())
    }

    /// Read and validate the header, then read descriptors until their
    /// uncompressed sizes reach the declared total.
    ///
    /// The table is checked before any payload byte is consumed.
    pub fn read_with_descriptors<R: Read + Seek>(
        reader: &mut R,
    ) -> ContainerResult<(Self, Vec<ChunkDescriptor>)> {
        let header = Self::read(reader).map_err(|e| truncated_or(e, "header"))?;
        header.validate()?;

        let mut descriptors = Vec::new();
        let mut found: u64 = 0;
        while found < header.uncompressed_size {
            let descriptor =
                ChunkDescriptor::read(reader).map_err(|e| truncated_or(e, "chunk table"))?;
            found = found.checked_add(descriptor.uncompressed_size).ok_or(
                ContainerError::ChunkSumMismatch {
                    expected: header.uncompressed_size,
                    actual: u64::MAX,
                },
            )?;
            descriptors.push(descriptor);
        }

        if found != header.uncompressed_size {
            return Err(ContainerError::ChunkSumMismatch {
                expected: header.uncompressed_size,
                actual: found,
            });
        }

        Ok((header, descriptors))
    }
}

fn truncated_or(err: binrw::Error, what: &'static str) -> ContainerError {
    match err {
        binrw::Error::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            ContainerError::Truncated(what)
        }
        other => ContainerError::BinRw(other),
    }
}
