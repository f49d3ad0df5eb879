//! Chunked zlib container used by downloaded workshop mod packages
//!
//! A container is a fixed header, a table of chunk descriptors and then the
//! payload chunks back to back. Each chunk is an independent zlib stream.
//! Decoding validates the descriptor table before reading any payload and
//! checks every inflated chunk against its descriptor and the nominal chunk
//! size. Output is written chunk by chunk so peak memory is bounded by one
//! chunk rather than the whole file.
//!
//! # Example
//!
//! ```
//! use purlovia_formats::container::{ContainerBuilder, decode_to_vec};
//!
//! let data = vec![7u8; 300_000];
//! let packed = ContainerBuilder::new().build(&data).expect("encode");
//! assert_eq!(decode_to_vec(&packed).expect("decode"), data);
//! ```

mod builder;
mod error;
mod header;
mod unpack;

pub use builder::{ContainerBuilder, DEFAULT_CHUNK_SIZE, encode};
pub use error::{ContainerError, ContainerResult};
pub use header::{ChunkDescriptor, ContainerHeader};
pub use unpack::{UnpackReport, unpack_directory, unpack_file};

use std::io::{Cursor, Read, Seek, Write};

use flate2::read::ZlibDecoder;
use serde::Serialize;
use tracing::{debug, trace};

/// Package tag shared with UE4 asset summaries, stored as a 64-bit field
pub const CONTAINER_MAGIC: u64 = 0x9E2A_83C1;

/// Largest compressed or uncompressed chunk the decoder accepts (1 GB)
pub const MAX_CHUNK_SIZE: u64 = 1024 * 1024 * 1024;

/// Totals reported after a container has been decoded or encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    /// Nominal uncompressed chunk size
    pub chunk_size: u64,
    /// Number of payload chunks
    pub chunk_count: usize,
    /// Sum of compressed chunk sizes
    pub compressed_size: u64,
    /// Sum of uncompressed chunk sizes
    pub uncompressed_size: u64,
}

/// Decode a container from `reader`, streaming the inflated bytes to `writer`.
///
/// Bytes already handed to `writer` are not retracted when a later chunk
/// fails; use [`unpack_file`] or [`decode_to_vec`] when partial output must
/// never be observed.
pub fn decode<R: Read + Seek, W: Write>(
    reader: &mut R,
    writer: &mut W,
) -> ContainerResult<ContainerSummary> {
    let (header, descriptors) = ContainerHeader::read_with_descriptors(reader)?;

    debug!(
        chunks = descriptors.len(),
        chunk_size = header.chunk_size,
        uncompressed_size = header.uncompressed_size,
        "Decoding container"
    );

    let last = descriptors.len().saturating_sub(1);
    let mut compressed = Vec::new();
    let mut inflated = Vec::new();
    let mut compressed_total: u64 = 0;

    for (index, descriptor) in descriptors.iter().enumerate() {
        for size in [descriptor.compressed_size, descriptor.uncompressed_size] {
            if size > MAX_CHUNK_SIZE {
                return Err(ContainerError::ChunkTooLarge {
                    index,
                    size,
                    max: MAX_CHUNK_SIZE,
                });
            }
        }

        compressed.clear();
        Read::take(&mut *reader, descriptor.compressed_size).read_to_end(&mut compressed)?;
        let available = compressed.len() as u64;
        if available != descriptor.compressed_size {
            return Err(ContainerError::TruncatedChunk {
                index,
                expected: descriptor.compressed_size,
                actual: available,
            });
        }

        inflated.clear();
        inflate_chunk(index, &compressed, descriptor.uncompressed_size, &mut inflated)?;

        let actual = inflated.len() as u64;
        if actual != descriptor.uncompressed_size {
            return Err(ContainerError::ChunkSizeMismatch {
                index,
                expected: descriptor.uncompressed_size,
                actual,
            });
        }
        if index != last && actual != header.chunk_size {
            return Err(ContainerError::UnexpectedChunkSize {
                index,
                nominal: header.chunk_size,
                actual,
            });
        }

        writer.write_all(&inflated)?;
        compressed_total += available;
        trace!(index, compressed = available, inflated = actual, "Chunk decoded");
    }

    Ok(ContainerSummary {
        chunk_size: header.chunk_size,
        chunk_count: descriptors.len(),
        compressed_size: compressed_total,
        uncompressed_size: header.uncompressed_size,
    })
}

/// Decode an in-memory container
pub fn decode_to_vec(data: &[u8]) -> ContainerResult<Vec<u8>> {
    let mut output = Vec::new();
    decode(&mut Cursor::new(data), &mut output)?;
    Ok(output)
}

/// Inflate one chunk, reading at most one byte past the declared size so an
/// oversized chunk is detected without inflating all of it.
fn inflate_chunk(
    index: usize,
    data: &[u8],
    expected: u64,
    output: &mut Vec<u8>,
) -> ContainerResult<()> {
    ZlibDecoder::new(data)
        .take(expected + 1)
        .read_to_end(output)
        .map_err(|e| ContainerError::Decompression {
            index,
            message: e.to_string(),
        })?;
    Ok(())
}
