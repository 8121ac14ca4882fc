//! Core map records: points, walls and regions
//!
//! These mirror the legacy engine's `tpoint`/`twall`/`tregion` records field
//! for field. Cross references are plain indices into the owning document's
//! sequences, never object references.

use serde::{Deserialize, Serialize};

/// Upper bound of the legacy coordinate space (`32768 - 2560`)
pub const FIN_GRID: i32 = 32768 - 2560;

/// Index into a document's point store
pub type PointIndex = usize;
/// Index into a document's region list
pub type RegionIndex = usize;
/// Texture identifier (the `code` of an FPG chunk or the index of a TEX image)
pub type TextureId = u32;

/// Check whether a coordinate pair lies in `0..=FIN_GRID`
pub fn in_grid(x: i32, y: i32) -> bool {
    (0..=FIN_GRID).contains(&x) && (0..=FIN_GRID).contains(&y)
}

/// A vertex in the legacy coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub active: bool,
    pub x: i32,
    pub y: i32,
    /// Unused by the engine; carried through load/save untouched
    pub links: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            active: true,
            x,
            y,
            links: 0,
        }
    }
}

/// Wall classification, stored on disk as an `i32`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallType {
    /// Opening between two regions
    Portal,
    /// Solid wall with a single region behind it
    #[default]
    Normal,
}

impl WallType {
    pub fn to_raw(self) -> i32 {
        match self {
            WallType::Portal => 1,
            WallType::Normal => 2,
        }
    }

    pub fn from_raw(raw: i32) -> Option<WallType> {
        match raw {
            1 => Some(WallType::Portal),
            2 => Some(WallType::Normal),
            _ => None,
        }
    }
}

/// An edge between two points, optionally a portal between two regions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wall {
    pub active: bool,
    pub kind: WallType,
    pub p1: PointIndex,
    pub p2: PointIndex,
    pub front_region: RegionIndex,
    /// `None` is written as -1
    pub back_region: Option<RegionIndex>,
    pub texture: TextureId,
    pub texture_top: TextureId,
    pub texture_bot: TextureId,
    pub fade: i32,
}

impl Wall {
    /// A solid wall facing `front_region`
    pub fn new(p1: PointIndex, p2: PointIndex, front_region: RegionIndex) -> Self {
        Self {
            active: true,
            kind: WallType::Normal,
            p1,
            p2,
            front_region,
            back_region: None,
            texture: 0,
            texture_top: 0,
            texture_bot: 0,
            fade: 0,
        }
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = texture;
        self
    }

    pub fn is_portal(&self) -> bool {
        self.kind == WallType::Portal
    }

    /// True when both walls join the same two points, in either direction
    pub fn shares_endpoints(&self, other: &Wall) -> bool {
        (self.p1 == other.p1 && self.p2 == other.p2) || (self.p1 == other.p2 && self.p2 == other.p1)
    }
}

/// A closed area with floor/ceiling heights and textures (a sector)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub active: bool,
    /// The record's `type` slot. Holds the nesting depth once topology runs.
    pub depth: i32,
    pub floor_height: i32,
    pub ceiling_height: i32,
    pub floor_tex: TextureId,
    pub ceil_tex: TextureId,
    /// Default texture for new walls. Not stored in WLD files.
    pub wall_tex: TextureId,
    pub fade: i32,
    /// Ordered outline, cached for containment tests. Not stored in WLD files.
    pub points: Vec<Point>,
}

impl Region {
    pub fn new(floor_height: i32, ceiling_height: i32) -> Self {
        Self {
            active: true,
            depth: 1,
            floor_height,
            ceiling_height,
            floor_tex: 0,
            ceil_tex: 0,
            wall_tex: 0,
            fade: 0,
            points: Vec::new(),
        }
    }

    pub fn with_textures(mut self, floor: TextureId, ceiling: TextureId, wall: TextureId) -> Self {
        self.floor_tex = floor;
        self.ceil_tex = ceiling;
        self.wall_tex = wall;
        self
    }

    /// Outline as plain coordinate pairs
    pub fn outline(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.points.iter().map(|p| (p.x, p.y))
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::new(0, 150)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fin_grid_bounds() {
        assert_eq!(FIN_GRID, 30208);
        assert!(in_grid(0, FIN_GRID));
        assert!(!in_grid(-1, 0));
        assert!(!in_grid(0, FIN_GRID + 1));
    }

    #[test]
    fn test_wall_type_raw_values() {
        assert_eq!(WallType::Normal.to_raw(), 2);
        assert_eq!(WallType::Portal.to_raw(), 1);
        assert_eq!(WallType::from_raw(1), Some(WallType::Portal));
        assert_eq!(WallType::from_raw(0), None);
    }

    #[test]
    fn test_shares_endpoints_either_direction() {
        let a = Wall::new(0, 1, 0);
        let b = Wall::new(1, 0, 1);
        let c = Wall::new(1, 2, 1);
        assert!(a.shares_endpoints(&b));
        assert!(!a.shares_endpoints(&c));
    }
}
