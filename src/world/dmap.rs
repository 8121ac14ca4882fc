//! DMAP export for the renderer
//!
//! The renderer's shaders address textures per region as a (wall, floor,
//! ceiling) triplet, so the texture table is written region by region rather
//! than as a shared pool. A texture used by several regions appears once per
//! region. Region and wall records refer to table slots, and coordinates are
//! written as `f32`.
//!
//! Wall records point at their front region's wall slot. A wall's own
//! `texture`, `texture_top` and `texture_bot` are not exported; the renderer
//! textures every wall of a region alike.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use super::document::MapDocument;
use super::geometry::TextureId;
use crate::codec::{encode_fixed_str, CodecError};
use crate::texture::TextureCatalog;

pub const DMAP_MAGIC: [u8; 4] = *b"DMAP";
pub const DMAP_VERSION: u32 = 1;
pub const FILENAME_LEN: usize = 256;
/// Table slots per region
pub const SLOTS_PER_REGION: u32 = 3;

/// Table slots of region `index`: `(wall, floor, ceiling)`.
///
/// `None` when the slots do not fit the format's `u32` fields.
pub fn region_slots(index: usize) -> Option<(u32, u32, u32)> {
    let base = u32::try_from(index).ok()?.checked_mul(SLOTS_PER_REGION)?;
    Some((base, base.checked_add(1)?, base.checked_add(2)?))
}

fn slots_or_err(index: usize) -> Result<(u32, u32, u32), CodecError> {
    region_slots(index).ok_or_else(|| {
        CodecError::Validation(format!("region {} has no texture slots", index))
    })
}

fn table_entry(catalog: &TextureCatalog, id: TextureId) -> [u8; FILENAME_LEN] {
    let name = catalog.filename_of(id).unwrap_or_else(|| {
        tracing::warn!(texture = id, "texture missing from catalog, exporting blank name");
        ""
    });
    encode_fixed_str::<FILENAME_LEN>(name)
}

/// Serialize a document into a DMAP image
pub fn encode<W: Write>(document: &MapDocument, out: &mut W) -> Result<(), CodecError> {
    let regions = document.regions();
    let walls = document.walls();
    let points = document.points();
    let catalog = document.textures();

    out.write_all(&DMAP_MAGIC)?;
    out.write_u32::<LittleEndian>(DMAP_VERSION)?;
    out.write_u32::<LittleEndian>(regions.len() as u32)?;
    out.write_u32::<LittleEndian>(walls.len() as u32)?;
    let texture_count = regions
        .len()
        .checked_mul(SLOTS_PER_REGION as usize)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| CodecError::Validation(format!("too many regions: {}", regions.len())))?;
    out.write_u32::<LittleEndian>(texture_count)?;

    for region in regions {
        for id in [region.wall_tex, region.floor_tex, region.ceil_tex] {
            out.write_all(&table_entry(catalog, id))?;
        }
    }

    for (i, region) in regions.iter().enumerate() {
        let (wall_slot, floor_slot, ceiling_slot) = slots_or_err(i)?;
        out.write_u32::<LittleEndian>(i as u32)?;
        out.write_f32::<LittleEndian>(region.floor_height as f32)?;
        out.write_f32::<LittleEndian>(region.ceiling_height as f32)?;
        out.write_u32::<LittleEndian>(floor_slot)?;
        out.write_u32::<LittleEndian>(ceiling_slot)?;
        out.write_u32::<LittleEndian>(wall_slot)?;
        out.write_u32::<LittleEndian>(region.points.len() as u32)?;
        for p in &region.points {
            out.write_f32::<LittleEndian>(p.x as f32)?;
            out.write_f32::<LittleEndian>(p.y as f32)?;
        }
    }

    for wall in walls {
        let (Some(a), Some(b)) = (points.get(wall.p1), points.get(wall.p2)) else {
            return Err(CodecError::Validation(format!(
                "wall references missing point ({} -> {})",
                wall.p1, wall.p2
            )));
        };
        if wall.front_region >= regions.len() {
            return Err(CodecError::Validation(format!(
                "wall references missing front region {}",
                wall.front_region
            )));
        }
        if let Some(back) = wall.back_region.filter(|&b| b >= regions.len()) {
            return Err(CodecError::Validation(format!(
                "wall references missing back region {}",
                back
            )));
        }
        let (wall_slot, _, _) = slots_or_err(wall.front_region)?;
        out.write_u32::<LittleEndian>(wall.front_region as u32)?;
        out.write_i32::<LittleEndian>(wall.back_region.map_or(-1, |b| b as i32))?;
        out.write_u32::<LittleEndian>(wall_slot)?;
        out.write_f32::<LittleEndian>(a.x as f32)?;
        out.write_f32::<LittleEndian>(a.y as f32)?;
        out.write_f32::<LittleEndian>(b.x as f32)?;
        out.write_f32::<LittleEndian>(b.y as f32)?;
    }

    Ok(())
}

/// Export a document as a DMAP file
pub fn write<P: AsRef<Path>>(document: &MapDocument, path: P) -> Result<(), CodecError> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    encode(document, &mut out)?;
    out.flush()?;
    tracing::info!(
        path = %path.display(),
        regions = document.regions().len(),
        walls = document.walls().len(),
        "exported DMAP"
    );
    Ok(())
}
