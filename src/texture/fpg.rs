//! FPG texture packages (32-bit "F32" variant)
//!
//! Layout after the optional gzip wrapper:
//! - 8-byte header whose first three bytes spell `F32` (any case)
//! - A stream of chunks, each a 60-byte header, optional control points and
//!   `width * height` BGRA pixels
//!
//! Broken chunks are skipped and a short trailing chunk ends the stream;
//! only a bad header or a corrupt gzip stream fails the whole load.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::GzDecoder;
use image::RgbaImage;

use super::catalog::TextureEntry;
use crate::codec::{decode_fixed_str, remaining, skip, take, CodecError};

pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
pub const HEADER_SIZE: usize = 8;
/// `code, regsize, name[32], filename[12], width, height, flags`
pub const CHUNK_HEADER_SIZE: usize = 4 + 4 + 32 + 12 + 2 + 2 + 4;
/// Largest accepted width or height
pub const MAX_DIMENSION: i32 = 4096;
/// Hard stop for pathological inputs
pub const MAX_CHUNKS: usize = 1000;

const _: () = assert!(CHUNK_HEADER_SIZE == 60);

/// Initial inflate buffer; grows by doubling
const INFLATE_START_CAPACITY: usize = 4096;

/// A decoded chunk header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    pub code: i32,
    pub regsize: i32,
    pub name: String,
    pub filename: String,
    pub width: i16,
    pub height: i16,
    /// Number of control points that precede the pixels
    pub flags: i32,
}

impl ChunkHeader {
    fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let code = cursor.read_i32::<LittleEndian>()?;
        let regsize = cursor.read_i32::<LittleEndian>()?;
        let mut name = [0u8; 32];
        cursor.read_exact(&mut name)?;
        let mut filename = [0u8; 12];
        cursor.read_exact(&mut filename)?;
        let width = cursor.read_i16::<LittleEndian>()?;
        let height = cursor.read_i16::<LittleEndian>()?;
        let flags = cursor.read_i32::<LittleEndian>()?;
        Ok(Self {
            code,
            regsize,
            name: decode_fixed_str(&name),
            filename: decode_fixed_str(&filename),
            width,
            height,
            flags,
        })
    }

    fn has_valid_dimensions(&self) -> bool {
        let (w, h) = (self.width as i32, self.height as i32);
        w > 0 && h > 0 && w <= MAX_DIMENSION && h <= MAX_DIMENSION
    }

    /// Pixel payload size, when the dimensions can size one
    fn payload_size(&self) -> Option<u64> {
        if self.width > 0 && self.height > 0 {
            Some(self.width as u64 * self.height as u64 * 4)
        } else {
            None
        }
    }
}

/// Inflate a gzip-wrapped package; plain packages pass through
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    if bytes.len() < 2 || bytes[..2] != GZIP_MAGIC {
        return Ok(bytes.to_vec());
    }
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::with_capacity(INFLATE_START_CAPACITY);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Decompression(format!("gzip: {}", e)))?;
    tracing::debug!(packed = bytes.len(), unpacked = out.len(), "inflated FPG");
    Ok(out)
}

/// Swap the red and blue channels of every BGRA pixel in place
pub fn bgra_to_rgba(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
}

/// Decode a package held in memory
pub fn decode(bytes: &[u8]) -> Result<Vec<TextureEntry>, CodecError> {
    let data = decompress(bytes)?;

    if data.len() < 3 || !data[..3].eq_ignore_ascii_case(b"F32") {
        return Err(CodecError::Format("not an F32 FPG package".to_string()));
    }
    if data.len() < HEADER_SIZE {
        return Err(CodecError::Truncated {
            what: "FPG header",
            needed: HEADER_SIZE as u64,
            available: data.len() as u64,
        });
    }

    let mut cursor = Cursor::new(&data[..]);
    cursor.set_position(HEADER_SIZE as u64);

    let mut entries = Vec::new();
    let mut chunks = 0;
    while remaining(&cursor) >= CHUNK_HEADER_SIZE as u64 {
        if chunks == MAX_CHUNKS {
            tracing::warn!(limit = MAX_CHUNKS, "FPG chunk limit reached, ignoring the rest");
            break;
        }
        chunks += 1;

        let header = ChunkHeader::read(&mut cursor)?;

        if header.flags > 0 {
            let control_bytes = header.flags as u64 * 4;
            if remaining(&cursor) < control_bytes {
                tracing::warn!(code = header.code, "FPG ends inside control points");
                break;
            }
            skip(&mut cursor, control_bytes);
        }

        if !header.has_valid_dimensions() {
            tracing::warn!(
                code = header.code,
                width = header.width,
                height = header.height,
                "skipping FPG chunk with invalid dimensions"
            );
            if let Some(size) = header.payload_size() {
                skip(&mut cursor, size);
            }
            continue;
        }

        let size = header.width as usize * header.height as usize * 4;
        let Some(raw) = take(&mut cursor, size) else {
            tracing::warn!(code = header.code, "FPG ends inside pixel data");
            break;
        };

        let mut pixels = raw.to_vec();
        bgra_to_rgba(&mut pixels);
        let Some(image) = RgbaImage::from_raw(header.width as u32, header.height as u32, pixels)
        else {
            continue;
        };

        let filename = if header.filename.trim().is_empty() {
            header.name.clone()
        } else {
            header.filename.clone()
        };
        entries.push(TextureEntry::new(filename, header.code as u32, image));
    }

    tracing::debug!(textures = entries.len(), chunks, "decoded FPG");
    Ok(entries)
}

/// Load an FPG package from disk
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<TextureEntry>, CodecError> {
    let bytes = fs::read(path.as_ref())?;
    decode(&bytes)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    pub(crate) fn header() -> Vec<u8> {
        b"f32\x1a\x0d\x0a\x00\x00".to_vec()
    }

    pub(crate) fn chunk(
        code: i32,
        width: i16,
        height: i16,
        control_points: i32,
        pixels: &[u8],
    ) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&code.to_le_bytes());
        out.extend_from_slice(&(CHUNK_HEADER_SIZE as i32 + pixels.len() as i32).to_le_bytes());
        let mut name = [0u8; 32];
        name[..4].copy_from_slice(b"wall");
        out.extend_from_slice(&name);
        let mut filename = [0u8; 12];
        let fname = format!("TEX{:03}.MAP", code);
        filename[..fname.len().min(12)].copy_from_slice(&fname.as_bytes()[..fname.len().min(12)]);
        out.extend_from_slice(&filename);
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        out.extend_from_slice(&control_points.to_le_bytes());
        for i in 0..control_points.max(0) {
            out.extend_from_slice(&(i as i16).to_le_bytes());
            out.extend_from_slice(&(i as i16).to_le_bytes());
        }
        out.extend_from_slice(pixels);
        out
    }

    /// Package of solid chunks, `(code, width, height)` each
    pub(crate) fn fpg_with_chunks(chunks: &[(i32, i16, i16)]) -> Vec<u8> {
        let mut out = header();
        for &(code, w, h) in chunks {
            let pixels = vec![0x80u8; w.max(0) as usize * h.max(0) as usize * 4];
            out.extend(chunk(code, w, h, 0, &pixels));
        }
        out
    }

    const BGRA_2X2: [u8; 16] = [255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255, 255, 255, 255, 255];
    const RGBA_2X2: [u8; 16] = [0, 0, 255, 255, 0, 255, 0, 255, 255, 0, 0, 255, 255, 255, 255, 255];

    #[test]
    fn test_channel_swap_scenario() {
        let mut bytes = header();
        bytes.extend(chunk(5, 2, 2, 0, &BGRA_2X2));

        let entries = decode(&bytes).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, 5);
        assert_eq!(entries[0].filename, "TEX005.MAP");
        assert_eq!((entries[0].width(), entries[0].height()), (2, 2));
        assert_eq!(entries[0].pixels.as_raw().as_slice(), &RGBA_2X2);
    }

    #[test]
    fn test_gzip_wrapped_package() {
        let mut plain = header();
        plain.extend(chunk(1, 2, 2, 0, &BGRA_2X2));
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&plain).unwrap();
        let packed = encoder.finish().unwrap();

        let entries = decode(&packed).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pixels.as_raw().as_slice(), &RGBA_2X2);
    }

    #[test]
    fn test_corrupt_gzip() {
        let bytes = [0x1f, 0x8b, 0x08, 0x00, 0xde, 0xad, 0xbe, 0xef, 0x00, 0x00, 0xff, 0xff];
        assert!(matches!(decode(&bytes), Err(CodecError::Decompression(_))));
    }

    #[test]
    fn test_bad_magic_is_format_error() {
        for bytes in [&b"F16\x1a\x0d\x0a\x00\x00"[..], &b"xx"[..], &b""[..]] {
            assert!(matches!(decode(bytes), Err(CodecError::Format(_))));
        }
        // Any case is accepted
        assert!(decode(b"F32\x1a\x0d\x0a\x00\x00").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_dimensions_are_skipped() {
        let mut bytes = header();
        bytes.extend(chunk(1, 0, 4, 0, &[]));
        bytes.extend(chunk(2, 2, 2, 0, &BGRA_2X2));
        bytes.extend(chunk(3, -3, 2, 0, &[]));
        bytes.extend(chunk(4, 1, 1, 0, &[1, 2, 3, 4]));

        let ids: Vec<u32> = decode(&bytes).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn test_control_points_are_skipped() {
        let mut bytes = header();
        bytes.extend(chunk(9, 2, 2, 3, &BGRA_2X2));
        let entries = decode(&bytes).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pixels.as_raw().as_slice(), &RGBA_2X2);
    }

    #[test]
    fn test_partial_trailing_chunk_is_tolerated() {
        let mut bytes = header();
        bytes.extend(chunk(1, 2, 2, 0, &BGRA_2X2));
        bytes.extend(chunk(2, 2, 2, 0, &BGRA_2X2[..10]));
        let entries = decode(&bytes).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, 1);
    }

    #[test]
    fn test_chunk_limit() {
        let chunks: Vec<(i32, i16, i16)> =
            (0..(MAX_CHUNKS as i32 + 5)).map(|i| (i, 1, 1)).collect();
        let entries = decode(&fpg_with_chunks(&chunks)).unwrap();
        assert_eq!(entries.len(), MAX_CHUNKS);
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("T.FPG");
        std::fs::write(&path, fpg_with_chunks(&[(1, 4, 4), (2, 8, 8)])).unwrap();
        let entries = load(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].width(), 8);
    }
}
