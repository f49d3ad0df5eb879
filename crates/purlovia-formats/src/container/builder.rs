//! Container builder

use std::io::{Cursor, Read, Seek, Write};

use binrw::BinWrite;
use flate2::Compression;
use flate2::read::ZlibEncoder;

use super::error::{ContainerError, ContainerResult};
use super::{ChunkDescriptor, ContainerHeader, ContainerSummary};

/// Default nominal chunk size (128 KB), as produced by the game's cooker
pub const DEFAULT_CHUNK_SIZE: usize = 128 * 1024;

/// Builder for chunked containers
#[derive(Debug, Clone)]
pub struct ContainerBuilder {
    chunk_size: usize,
    level: Compression,
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerBuilder {
    /// Create a builder with the default chunk size and compression level
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            level: Compression::default(),
        }
    }

    /// Set the nominal uncompressed chunk size
    pub fn with_chunk_size(mut self, size: usize) -> ContainerResult<Self> {
        if size == 0 {
            return Err(ContainerError::InvalidChunkSize(size));
        }
        self.chunk_size = size;
        Ok(self)
    }

    /// Set the zlib compression level (0-9)
    #[must_use]
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.level = Compression::new(level.min(9));
        self
    }

    /// Nominal chunk size this builder splits input into
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Encode `data` into `writer`
    pub fn write_to<W: Write + Seek>(
        &self,
        data: &[u8],
        writer: &mut W,
    ) -> ContainerResult<ContainerSummary> {
        let mut payloads = Vec::with_capacity(data.len().div_ceil(self.chunk_size));
        for chunk in data.chunks(self.chunk_size) {
            let mut compressed = Vec::new();
            ZlibEncoder::new(chunk, self.level).read_to_end(&mut compressed)?;
            payloads.push((compressed, chunk.len() as u64));
        }

        let compressed_size: u64 = payloads.iter().map(|(p, _)| p.len() as u64).sum();
        let header =
            ContainerHeader::new(self.chunk_size as u64, compressed_size, data.len() as u64);
        header.write(writer)?;
        for (payload, uncompressed_size) in &payloads {
            ChunkDescriptor {
                compressed_size: payload.len() as u64,
                uncompressed_size: *uncompressed_size,
            }
            .write(writer)?;
        }
        for (payload, _) in &payloads {
            writer.write_all(payload)?;
        }

        Ok(ContainerSummary {
            chunk_size: header.chunk_size,
            chunk_count: payloads.len(),
            compressed_size,
            uncompressed_size: header.uncompressed_size,
        })
    }

    /// Encode `data` into a new buffer
    pub fn build(&self, data: &[u8]) -> ContainerResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(data, &mut cursor)?;
        Ok(cursor.into_inner())
    }
}

/// Encode `data` with the given nominal chunk size
pub fn encode<W: Write + Seek>(
    data: &[u8],
    chunk_size: usize,
    writer: &mut W,
) -> ContainerResult<ContainerSummary> {
    ContainerBuilder::new()
        .with_chunk_size(chunk_size)?
        .write_to(data, writer)
}
