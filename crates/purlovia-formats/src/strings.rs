//! Length-prefixed string fields
//!
//! Strings are stored as a little-endian `u32` byte count followed by that
//! many bytes. The count includes a trailing NUL terminator. A count of zero
//! encodes an absent string. Counts with the top bit set denote UTF-16 text,
//! which this reader does not handle.

use std::io::{Read, Write};

use thiserror::Error;

/// Errors raised while reading a string field
#[derive(Debug, Error)]
pub enum StringError {
    /// The field is stored as UTF-16, which is not supported
    #[error("wide string of {0} code units is not supported")]
    WideString(u32),

    /// Fewer bytes were available than the length prefix announced
    #[error("string truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes announced by the length prefix
        expected: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// The payload is not valid UTF-8
    #[error("invalid UTF-8 in string field: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for string field operations
pub type StringResult<T> = Result<T, StringError>;

const WIDE_FLAG: u32 = 0x8000_0000;

/// Read one string field.
///
/// Returns `Ok(None)` for a zero length. The final stored byte is the
/// terminator and is dropped; anything after an embedded NUL is ignored.
pub fn read_string<R: Read>(reader: &mut R) -> StringResult<Option<String>> {
    let mut prefix = [0u8; 4];
    reader.read_exact(&mut prefix)?;
    let length = u32::from_le_bytes(prefix);

    if length == 0 {
        return Ok(None);
    }

    if length & WIDE_FLAG != 0 {
        return Err(StringError::WideString(length.wrapping_neg()));
    }

    let expected = length as usize;
    // Cap the up-front allocation; a corrupt prefix must not reserve gigabytes
    let mut data = Vec::with_capacity(expected.min(64 * 1024));
    Read::take(&mut *reader, u64::from(length)).read_to_end(&mut data)?;
    if data.len() != expected {
        return Err(StringError::Truncated {
            expected,
            actual: data.len(),
        });
    }

    data.truncate(expected - 1);
    if let Some(nul) = data.iter().position(|&b| b == 0) {
        data.truncate(nul);
    }

    Ok(Some(String::from_utf8(data)?))
}

/// Write one string field, adding the terminator.
pub fn write_string<W: Write>(writer: &mut W, value: Option<&str>) -> std::io::Result<()> {
    match value {
        None => writer.write_all(&0u32.to_le_bytes()),
        Some(text) => {
            let length = u32::try_from(text.len() + 1).map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "string too long for a 32-bit length prefix",
                )
            })?;
            writer.write_all(&length.to_le_bytes())?;
            writer.write_all(text.as_bytes())?;
            writer.write_all(&[0])
        }
    }
}
