//! WLD map loading and saving
//!
//! Reproduces the legacy DIV editor's fixed-layout `.wld` files byte for byte:
//! - 8-byte magic, total size, path/name header strings
//! - Length-prefixed point, wall and region arrays of packed `i32` records
//! - Empty flag array and a zero terminator
//!
//! Records are encoded field by field; nothing is reinterpreted in place.

use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::document::{MapDocument, WldMetadata};
use super::geometry::{Point, Region, Wall, WallType};
use crate::codec::{decode_fixed_str, encode_fixed_str, ensure_remaining, remaining, CodecError};

/// `"wld"` + `0x1a` + CR/LF + `0x01 0x00`
pub const WLD_MAGIC: [u8; 8] = *b"wld\x1a\x0d\x0a\x01\x00";

pub const PATH_LEN: usize = 256;
pub const NAME_LEN: usize = 16;

/// Bytes between the size field and the point count
pub const HEADER_STRINGS_SIZE: usize = PATH_LEN + NAME_LEN + 4 + PATH_LEN + NAME_LEN;

pub const POINT_RECORD_SIZE: usize = 16;
pub const WALL_RECORD_SIZE: usize = 40;
pub const REGION_RECORD_SIZE: usize = 28;

const POINT_FIELDS: usize = 4;
const WALL_FIELDS: usize = 10;
const REGION_FIELDS: usize = 7;

// Every field is a packed 4-byte integer
const _: () = assert!(POINT_FIELDS * 4 == POINT_RECORD_SIZE);
const _: () = assert!(WALL_FIELDS * 4 == WALL_RECORD_SIZE);
const _: () = assert!(REGION_FIELDS * 4 == REGION_RECORD_SIZE);
const _: () = assert!(HEADER_STRINGS_SIZE == 548);

/// Value of the size field for a map with the given record counts
pub fn total_size(points: usize, walls: usize, regions: usize) -> usize {
    HEADER_STRINGS_SIZE
        + 4 + points * POINT_RECORD_SIZE
        + 4 + walls * WALL_RECORD_SIZE
        + 4 + regions * REGION_RECORD_SIZE
        + 4 // flag count, always zero
        + 4 // terminator
}

/// Pack a list of `i32` fields into a fixed-size record
fn pack<const N: usize>(fields: &[i32]) -> [u8; N] {
    let mut out = [0u8; N];
    for (chunk, value) in out.chunks_exact_mut(4).zip(fields) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    out
}

fn unpack<const F: usize>(record: &[u8]) -> [i32; F] {
    let mut fields = [0i32; F];
    for (field, chunk) in fields.iter_mut().zip(record.chunks_exact(4)) {
        *field = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    fields
}

fn index_to_raw(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

pub fn encode_point(p: &Point) -> [u8; POINT_RECORD_SIZE] {
    pack(&[p.active as i32, p.x, p.y, p.links])
}

pub fn decode_point(record: &[u8]) -> Point {
    let [active, x, y, links] = unpack::<POINT_FIELDS>(record);
    Point {
        active: active != 0,
        x,
        y,
        links,
    }
}

pub fn encode_wall(w: &Wall) -> [u8; WALL_RECORD_SIZE] {
    pack(&[
        w.active as i32,
        w.kind.to_raw(),
        index_to_raw(w.p1),
        index_to_raw(w.p2),
        index_to_raw(w.front_region),
        w.back_region.map_or(-1, index_to_raw),
        w.texture as i32,
        w.texture_top as i32,
        w.texture_bot as i32,
        w.fade,
    ])
}

/// Decode a wall record. Returns `None` when an index field is negative.
pub fn decode_wall(record: &[u8]) -> Option<Wall> {
    let [active, kind, p1, p2, front, back, texture, top, bot, fade] =
        unpack::<WALL_FIELDS>(record);
    let kind = WallType::from_raw(kind).unwrap_or_else(|| {
        tracing::warn!(raw = kind, "unknown wall type, loading as normal");
        WallType::Normal
    });
    Some(Wall {
        active: active != 0,
        kind,
        p1: usize::try_from(p1).ok()?,
        p2: usize::try_from(p2).ok()?,
        front_region: usize::try_from(front).ok()?,
        back_region: usize::try_from(back).ok(),
        texture: texture as u32,
        texture_top: top as u32,
        texture_bot: bot as u32,
        fade,
    })
}

pub fn encode_region(r: &Region) -> [u8; REGION_RECORD_SIZE] {
    pack(&[
        r.active as i32,
        r.depth,
        r.floor_height,
        r.ceiling_height,
        r.floor_tex as i32,
        r.ceil_tex as i32,
        r.fade,
    ])
}

pub fn decode_region(record: &[u8]) -> Region {
    let [active, depth, floor, ceiling, floor_tex, ceil_tex, fade] =
        unpack::<REGION_FIELDS>(record);
    Region {
        active: active != 0,
        depth,
        floor_height: floor,
        ceiling_height: ceiling,
        floor_tex: floor_tex as u32,
        ceil_tex: ceil_tex as u32,
        wall_tex: 0,
        fade,
        points: Vec::new(),
    }
}

/// Serialize a document into a WLD image.
///
/// `metadata` supplies the header strings; see [`write`] for how they are
/// derived when saving to disk.
pub fn encode<W: Write>(
    document: &MapDocument,
    metadata: &WldMetadata,
    out: &mut W,
) -> Result<(), CodecError> {
    let points = document.points();
    let walls = document.walls();
    let regions = document.regions();

    out.write_all(&WLD_MAGIC)?;
    let size = total_size(points.len(), walls.len(), regions.len());
    out.write_i32::<LittleEndian>(index_to_raw(size))?;

    out.write_all(&encode_fixed_str::<PATH_LEN>(&metadata.map_path))?;
    out.write_all(&encode_fixed_str::<NAME_LEN>(&metadata.map_name))?;
    out.write_i32::<LittleEndian>(0)?;
    out.write_all(&encode_fixed_str::<PATH_LEN>(&metadata.package_path))?;
    out.write_all(&encode_fixed_str::<NAME_LEN>(&metadata.package_name))?;

    out.write_i32::<LittleEndian>(index_to_raw(points.len()))?;
    for p in points.iter() {
        out.write_all(&encode_point(p))?;
    }

    out.write_i32::<LittleEndian>(index_to_raw(walls.len()))?;
    for w in walls {
        out.write_all(&encode_wall(w))?;
    }

    out.write_i32::<LittleEndian>(index_to_raw(regions.len()))?;
    for r in regions {
        out.write_all(&encode_region(r))?;
    }

    // No flags, then the terminator
    out.write_i32::<LittleEndian>(0)?;
    out.write_i32::<LittleEndian>(0)?;
    Ok(())
}

/// Read a length prefix and make sure that many records follow
fn read_count(
    cursor: &mut Cursor<&[u8]>,
    record_size: usize,
    what: &'static str,
) -> Result<usize, CodecError> {
    ensure_remaining(cursor, 4, what)?;
    let count = cursor.read_i32::<LittleEndian>()?;
    let count = usize::try_from(count).map_err(|_| CodecError::Truncated {
        what,
        needed: u64::MAX,
        available: remaining(cursor),
    })?;
    ensure_remaining(cursor, (count as u64) * record_size as u64, what)?;
    Ok(count)
}

fn read_fixed<const N: usize>(cursor: &mut Cursor<&[u8]>) -> Result<String, CodecError> {
    let mut raw = [0u8; N];
    cursor.read_exact(&mut raw)?;
    Ok(decode_fixed_str(&raw))
}

/// Parse a WLD image held in memory
pub fn decode(bytes: &[u8]) -> Result<MapDocument, CodecError> {
    let mut cursor = Cursor::new(bytes);

    if bytes.len() < WLD_MAGIC.len() || bytes[..WLD_MAGIC.len()] != WLD_MAGIC {
        return Err(CodecError::Format("not a WLD file (bad magic)".to_string()));
    }
    cursor.set_position(WLD_MAGIC.len() as u64);

    ensure_remaining(&cursor, 4 + HEADER_STRINGS_SIZE as u64, "header")?;
    // Legacy readers never check the size field against the content
    let declared_size = cursor.read_i32::<LittleEndian>()?;

    let map_path = read_fixed::<PATH_LEN>(&mut cursor)?;
    let map_name = read_fixed::<NAME_LEN>(&mut cursor)?;
    let _reserved = cursor.read_i32::<LittleEndian>()?;
    let package_path = read_fixed::<PATH_LEN>(&mut cursor)?;
    let package_name = read_fixed::<NAME_LEN>(&mut cursor)?;

    let count = read_count(&mut cursor, POINT_RECORD_SIZE, "point array")?;
    let mut points = Vec::with_capacity(count);
    let mut record = [0u8; WALL_RECORD_SIZE];
    for _ in 0..count {
        cursor.read_exact(&mut record[..POINT_RECORD_SIZE])?;
        points.push(decode_point(&record[..POINT_RECORD_SIZE]));
    }

    let count = read_count(&mut cursor, WALL_RECORD_SIZE, "wall array")?;
    let mut walls = Vec::with_capacity(count);
    for i in 0..count {
        cursor.read_exact(&mut record)?;
        match decode_wall(&record) {
            Some(wall) => walls.push(wall),
            None => tracing::warn!(wall = i, "skipping wall with negative index"),
        }
    }

    let count = read_count(&mut cursor, REGION_RECORD_SIZE, "region array")?;
    let mut regions = Vec::with_capacity(count);
    for _ in 0..count {
        cursor.read_exact(&mut record[..REGION_RECORD_SIZE])?;
        regions.push(decode_region(&record[..REGION_RECORD_SIZE]));
    }

    // Flag count and terminator; old files sometimes stop short of them
    if remaining(&cursor) >= 4 {
        let flags = cursor.read_i32::<LittleEndian>()?;
        if flags != 0 {
            tracing::debug!(flags, "ignoring WLD flag records");
        }
    }

    let mut document = MapDocument::from_parts(points, walls, regions);
    document.metadata = WldMetadata {
        map_path,
        map_name,
        package_path,
        package_name,
    };
    document.rebuild_outlines();
    seed_wall_textures(&mut document);

    tracing::debug!(
        declared_size,
        points = document.points().len(),
        walls = document.walls().len(),
        regions = document.regions().len(),
        "decoded WLD"
    );
    Ok(document)
}

/// WLD regions carry no wall texture; take it from the first wall in front
fn seed_wall_textures(document: &mut MapDocument) {
    let seeds: Vec<u32> = (0..document.regions().len())
        .map(|r| {
            document
                .walls()
                .iter()
                .find(|w| w.front_region == r)
                .map(|w| if w.is_portal() { w.texture_top } else { w.texture })
                .unwrap_or(0)
        })
        .collect();
    for (region, tex) in document.regions_mut().iter_mut().zip(seeds) {
        region.wall_tex = tex;
    }
}

/// Header strings for saving `document` to `path`.
///
/// The map path and name always describe the file being written. The
/// package falls back to the first catalog entry when the document has none.
pub fn metadata_for(document: &MapDocument, path: &Path) -> WldMetadata {
    let map_path = path.to_string_lossy().into_owned();
    let map_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let package_path = if document.metadata.package_path.is_empty() {
        document
            .textures()
            .iter()
            .next()
            .map(|t| t.filename.clone())
            .unwrap_or_default()
    } else {
        document.metadata.package_path.clone()
    };
    let package_name = Path::new(&package_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    WldMetadata {
        map_path,
        map_name,
        package_path,
        package_name,
    }
}

/// Save a document as a WLD file
pub fn write<P: AsRef<Path>>(document: &MapDocument, path: P) -> Result<(), CodecError> {
    let path = path.as_ref();
    let metadata = metadata_for(document, path);
    let mut out = BufWriter::new(File::create(path)?);
    encode(document, &metadata, &mut out)?;
    out.flush()?;
    tracing::info!(path = %path.display(), "saved WLD");
    Ok(())
}

/// Load a WLD file
pub fn read<P: AsRef<Path>>(path: P) -> Result<MapDocument, CodecError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let document = decode(&bytes)?;
    tracing::info!(path = %path.display(), "loaded WLD");
    Ok(document)
}
