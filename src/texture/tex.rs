//! TEX texture packages - the uncompressed sibling of FPG
//!
//! A 16-byte header (`TEX` magic, version, image count, reserved) followed by
//! one 258-byte entry header plus raw RGB24 or RGBA32 pixels per image.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use image::RgbaImage;

use super::catalog::TextureEntry;
use crate::codec::{ensure_remaining, remaining, skip, take, CodecError};

pub const HEADER_SIZE: usize = 4 + 4 + 2 + 6;
/// `index, width, height, format, reserved[250]`
pub const ENTRY_HEADER_SIZE: usize = 2 + 2 + 2 + 2 + 250;
pub const MAX_IMAGES: u16 = 1000;
pub const MAX_DIMENSION: u16 = 4096;
/// Largest accepted pixel payload per image
pub const MAX_PAYLOAD: u64 = 16 * 1024 * 1024;

/// Pixel layout of one image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb24,
    Rgba32,
}

impl PixelFormat {
    pub fn from_raw(raw: u16) -> Option<PixelFormat> {
        match raw {
            0 => Some(PixelFormat::Rgb24),
            1 => Some(PixelFormat::Rgba32),
            _ => None,
        }
    }

    pub fn bytes_per_pixel(self) -> u64 {
        match self {
            PixelFormat::Rgb24 => 3,
            PixelFormat::Rgba32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexHeader {
    pub version: u32,
    pub num_images: u16,
}

fn read_header(cursor: &mut Cursor<&[u8]>) -> Result<TexHeader, CodecError> {
    let data: &[u8] = cursor.get_ref();
    if data.len() < 3 || &data[..3] != b"TEX" {
        return Err(CodecError::Format("not a TEX package".to_string()));
    }
    ensure_remaining(cursor, HEADER_SIZE as u64, "TEX header")?;

    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic)?;
    let version = cursor.read_u32::<LittleEndian>()?;
    let num_images = cursor.read_u16::<LittleEndian>()?;
    let mut reserved = [0u8; 6];
    cursor.read_exact(&mut reserved)?;

    if !(1..=MAX_IMAGES).contains(&num_images) {
        return Err(CodecError::Validation(format!(
            "TEX image count {} outside 1..={}",
            num_images, MAX_IMAGES
        )));
    }
    Ok(TexHeader { version, num_images })
}

/// Expand RGB24 pixels to opaque RGBA
fn rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rgb.len() / 3 * 4);
    for px in rgb.chunks_exact(3) {
        out.extend_from_slice(&[px[0], px[1], px[2], 255]);
    }
    out
}

/// Decode a package held in memory.
///
/// `package_name` labels the entries, since TEX images carry no filenames.
pub fn decode(bytes: &[u8], package_name: &str) -> Result<Vec<TextureEntry>, CodecError> {
    let mut cursor = Cursor::new(bytes);
    let header = read_header(&mut cursor)?;
    tracing::debug!(version = header.version, images = header.num_images, "reading TEX");

    let mut entries = Vec::new();
    for _ in 0..header.num_images {
        if remaining(&cursor) < ENTRY_HEADER_SIZE as u64 {
            tracing::warn!(loaded = entries.len(), "TEX ends inside an entry header");
            break;
        }
        let index = cursor.read_u16::<LittleEndian>()?;
        let width = cursor.read_u16::<LittleEndian>()?;
        let height = cursor.read_u16::<LittleEndian>()?;
        let format = cursor.read_u16::<LittleEndian>()?;
        skip(&mut cursor, 250);

        let Some(format) = PixelFormat::from_raw(format) else {
            // Without a format the payload cannot be sized, so nothing after it is reachable
            tracing::warn!(index, format, "unsupported TEX pixel format, stopping");
            break;
        };

        let size = width as u64 * height as u64 * format.bytes_per_pixel();
        if size == 0 || size > MAX_PAYLOAD || width > MAX_DIMENSION || height > MAX_DIMENSION {
            tracing::warn!(index, width, height, "skipping TEX image with invalid size");
            skip(&mut cursor, size);
            continue;
        }

        let Some(raw) = take(&mut cursor, size as usize) else {
            tracing::warn!(index, "TEX ends inside pixel data");
            break;
        };
        let rgba = match format {
            PixelFormat::Rgb24 => rgb_to_rgba(raw),
            PixelFormat::Rgba32 => raw.to_vec(),
        };
        let Some(image) = RgbaImage::from_raw(width as u32, height as u32, rgba) else {
            continue;
        };
        let filename = format!("{}_{:03}", package_name, index);
        entries.push(TextureEntry::new(filename, index as u32, image));
    }

    Ok(entries)
}

/// Load a TEX package from disk
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<TextureEntry>, CodecError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    decode(&bytes, &stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(num_images: u16) -> Vec<u8> {
        let mut out = b"TEX\0".to_vec();
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&num_images.to_le_bytes());
        out.extend_from_slice(&[0u8; 6]);
        out
    }

    fn entry(index: u16, width: u16, height: u16, format: u16, pixels: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for v in [index, width, height, format] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(&[0u8; 250]);
        out.extend_from_slice(pixels);
        out
    }

    #[test]
    fn test_rgb_and_rgba_entries() {
        let mut bytes = header(2);
        bytes.extend(entry(4, 2, 1, 0, &[10, 20, 30, 40, 50, 60]));
        bytes.extend(entry(5, 1, 1, 1, &[1, 2, 3, 4]));

        let entries = decode(&bytes, "SKY").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, 4);
        assert_eq!(entries[0].filename, "SKY_004");
        assert_eq!(entries[0].pixels.as_raw().as_slice(), &[10, 20, 30, 255, 40, 50, 60, 255]);
        assert_eq!(entries[1].pixels.as_raw().as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_image_count_bounds() {
        assert!(matches!(decode(&header(0), "x"), Err(CodecError::Validation(_))));
        assert!(matches!(decode(&header(1001), "x"), Err(CodecError::Validation(_))));
    }

    #[test]
    fn test_bad_magic_and_short_header() {
        assert!(matches!(decode(b"XET\0aaaaaaaaaaaa", "x"), Err(CodecError::Format(_))));
        assert!(matches!(decode(b"TEX\0", "x"), Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let mut bytes = header(3);
        bytes.extend(entry(1, 0, 8, 1, &[]));
        bytes.extend(entry(2, 5000, 1, 0, &vec![0u8; 15000]));
        bytes.extend(entry(3, 1, 1, 0, &[9, 9, 9]));

        let ids: Vec<u32> = decode(&bytes, "x").unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_truncated_payload_stops_loop() {
        let mut bytes = header(2);
        bytes.extend(entry(1, 1, 1, 1, &[1, 2, 3, 4]));
        bytes.extend(entry(2, 2, 2, 1, &[1, 2, 3]));
        let entries = decode(&bytes, "x").unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_unknown_format_stops_loop() {
        let mut bytes = header(2);
        bytes.extend(entry(1, 1, 1, 7, &[1, 2]));
        bytes.extend(entry(2, 1, 1, 1, &[1, 2, 3, 4]));
        assert!(decode(&bytes, "x").unwrap().is_empty());
    }

    #[test]
    fn test_load_uses_file_stem() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("floors.tex");
        let mut bytes = header(1);
        bytes.extend(entry(0, 1, 1, 1, &[0, 0, 0, 255]));
        std::fs::write(&path, bytes).unwrap();
        assert_eq!(load(&path).unwrap()[0].filename, "floors_000");
    }
}
