//! Shared plumbing for the legacy binary formats
//!
//! Every reader and writer in the crate reports failures through
//! [`CodecError`]. The helpers here deal with the fixed-width, NUL-padded
//! string fields the DIV tools embed in their headers, and with bounds
//! checking over in-memory cursors.

use std::fmt;
use std::io::Cursor;

/// Error type for codec operations
#[derive(Debug)]
pub enum CodecError {
    /// Bad magic or header tag
    Format(String),
    /// A length-prefixed array or payload is shorter than declared
    Truncated {
        what: &'static str,
        needed: u64,
        available: u64,
    },
    /// Corrupt gzip stream
    Decompression(String),
    /// Open/read/write failure
    Io(std::io::Error),
    /// Header value outside the accepted range
    Validation(String),
}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        CodecError::Io(e)
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Format(msg) => write!(f, "Format error: {}", msg),
            CodecError::Truncated { what, needed, available } => write!(
                f,
                "Truncated file: {} needs {} bytes, only {} remain",
                what, needed, available
            ),
            CodecError::Decompression(msg) => write!(f, "Decompression error: {}", msg),
            CodecError::Io(e) => write!(f, "IO error: {}", e),
            CodecError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Bytes left to read in a cursor over a slice
pub(crate) fn remaining(cursor: &Cursor<&[u8]>) -> u64 {
    (cursor.get_ref().len() as u64).saturating_sub(cursor.position())
}

/// Fail with `Truncated` unless `needed` bytes remain
pub(crate) fn ensure_remaining(
    cursor: &Cursor<&[u8]>,
    needed: u64,
    what: &'static str,
) -> Result<(), CodecError> {
    let available = remaining(cursor);
    if needed > available {
        return Err(CodecError::Truncated { what, needed, available });
    }
    Ok(())
}

/// Advance the cursor without reading, clamped to the end of the buffer
pub(crate) fn skip(cursor: &mut Cursor<&[u8]>, bytes: u64) {
    let end = cursor.get_ref().len() as u64;
    let pos = cursor.position().saturating_add(bytes).min(end);
    cursor.set_position(pos);
}

/// Borrow the next `len` bytes and advance past them
pub(crate) fn take<'a>(cursor: &mut Cursor<&'a [u8]>, len: usize) -> Option<&'a [u8]> {
    let start = cursor.position() as usize;
    let end = start.checked_add(len)?;
    let data: &'a [u8] = *cursor.get_ref();
    let slice = data.get(start..end)?;
    cursor.set_position(end as u64);
    Some(slice)
}

/// Decode a NUL-padded fixed-width field, stopping at the first NUL
pub fn decode_fixed_str(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Encode a string into a NUL-padded field of `N` bytes.
///
/// At most `N - 1` bytes are copied so the field always ends in a NUL, the
/// way the legacy tools' `strncpy` calls leave it.
pub fn encode_fixed_str<const N: usize>(s: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let bytes = s.as_bytes();
    let len = bytes.len().min(N.saturating_sub(1));
    out[..len].copy_from_slice(&bytes[..len]);
    out
}
