//! MapDocument - the aggregate root for one editable map
//!
//! Owns the point store, walls, regions and texture catalog. Editors hold
//! borrowed references for the duration of an operation only; every cross
//! reference inside the document is an index.

use std::fmt;

use super::geometry::{in_grid, Point, PointIndex, Region, RegionIndex, Wall, WallType};
use super::point_store::PointStore;
use crate::texture::TextureCatalog;

/// Error type for document edits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// A region needs at least three vertices
    PolygonTooSmall(usize),
    /// Coordinates outside `0..=FIN_GRID`
    OutOfBounds { x: i32, y: i32 },
    /// Another point already sits at the target coordinates
    PointOccupied { x: i32, y: i32, index: PointIndex },
    UnknownPoint(PointIndex),
    UnknownRegion(RegionIndex),
    /// Both ends of a wall are the same point
    DegenerateWall(PointIndex),
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::PolygonTooSmall(n) => {
                write!(f, "a region needs at least 3 vertices, got {}", n)
            }
            DocumentError::OutOfBounds { x, y } => {
                write!(f, "point ({}, {}) is outside the map grid", x, y)
            }
            DocumentError::PointOccupied { x, y, index } => {
                write!(f, "point {} already occupies ({}, {})", index, x, y)
            }
            DocumentError::UnknownPoint(i) => write!(f, "no point with index {}", i),
            DocumentError::UnknownRegion(i) => write!(f, "no region with index {}", i),
            DocumentError::DegenerateWall(i) => write!(f, "wall starts and ends at point {}", i),
        }
    }
}

impl std::error::Error for DocumentError {}

/// Header strings carried by WLD files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WldMetadata {
    pub map_path: String,
    pub map_name: String,
    pub package_path: String,
    pub package_name: String,
}

#[derive(Debug, Default)]
pub struct MapDocument {
    points: PointStore,
    walls: Vec<Wall>,
    regions: Vec<Region>,
    textures: TextureCatalog,
    pub metadata: WldMetadata,
}

impl MapDocument {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a document from decoded records
    pub fn from_parts(points: Vec<Point>, walls: Vec<Wall>, regions: Vec<Region>) -> Self {
        Self {
            points: PointStore::from_points(points),
            walls,
            regions,
            textures: TextureCatalog::new(),
            metadata: WldMetadata::default(),
        }
    }

    /// Drop everything ("new map")
    pub fn clear(&mut self) {
        self.points.clear();
        self.walls.clear();
        self.regions.clear();
        self.textures.clear();
        self.metadata = WldMetadata::default();
    }

    pub fn points(&self) -> &PointStore {
        &self.points
    }

    /// Direct store access for in-crate edits that keep outlines in sync.
    /// Outside the crate, move points through [`MapDocument::move_point`].
    pub(crate) fn points_mut(&mut self) -> &mut PointStore {
        &mut self.points
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn walls_mut(&mut self) -> &mut [Wall] {
        &mut self.walls
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn regions_mut(&mut self) -> &mut [Region] {
        &mut self.regions
    }

    pub fn region_mut(&mut self, index: RegionIndex) -> Option<&mut Region> {
        self.regions.get_mut(index)
    }

    pub fn textures(&self) -> &TextureCatalog {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureCatalog {
        &mut self.textures
    }

    /// Walls and regions split for simultaneous mutable access
    pub(crate) fn topology_mut(&mut self) -> (&PointStore, &mut [Wall], &mut [Region]) {
        (&self.points, &mut self.walls, &mut self.regions)
    }

    /// Append a region with no walls
    pub fn add_region(&mut self, region: Region) -> RegionIndex {
        self.regions.push(region);
        self.regions.len() - 1
    }

    /// Append a solid wall between two existing points
    pub fn add_wall(
        &mut self,
        p1: PointIndex,
        p2: PointIndex,
        front: RegionIndex,
    ) -> Result<usize, DocumentError> {
        if p1 == p2 {
            return Err(DocumentError::DegenerateWall(p1));
        }
        for p in [p1, p2] {
            if self.points.get(p).is_none() {
                return Err(DocumentError::UnknownPoint(p));
            }
        }
        let region = self
            .regions
            .get(front)
            .ok_or(DocumentError::UnknownRegion(front))?;
        let wall = Wall::new(p1, p2, front).with_texture(region.wall_tex);
        self.walls.push(wall);
        Ok(self.walls.len() - 1)
    }

    /// Create a region from a closed polygon.
    ///
    /// Vertices are deduplicated through the point store, so drawing a region
    /// against an existing one reuses the shared corners. One solid wall is
    /// added per edge; portals are only detected when topology is re-run.
    pub fn add_region_from_polygon(
        &mut self,
        vertices: &[(i32, i32)],
        floor_height: i32,
        ceiling_height: i32,
    ) -> Result<RegionIndex, DocumentError> {
        self.add_textured_region(vertices, Region::new(floor_height, ceiling_height))
    }

    /// Same as [`add_region_from_polygon`](Self::add_region_from_polygon) with
    /// a caller-supplied region template (textures, fade)
    pub fn add_textured_region(
        &mut self,
        vertices: &[(i32, i32)],
        mut region: Region,
    ) -> Result<RegionIndex, DocumentError> {
        if vertices.len() < 3 {
            return Err(DocumentError::PolygonTooSmall(vertices.len()));
        }
        if let Some(&(x, y)) = vertices.iter().find(|&&(x, y)| !in_grid(x, y)) {
            return Err(DocumentError::OutOfBounds { x, y });
        }

        let indices: Vec<PointIndex> = vertices
            .iter()
            .map(|&(x, y)| self.points.find_or_create(x, y))
            .collect();

        let region_index = self.regions.len();
        region.points = indices
            .iter()
            .filter_map(|&i| self.points.get(i).copied())
            .collect();
        let wall_tex = region.wall_tex;
        self.regions.push(region);

        for i in 0..indices.len() {
            let p1 = indices[i];
            let p2 = indices[(i + 1) % indices.len()];
            // Repeated consecutive vertices collapse to nothing
            if p1 != p2 {
                self.walls
                    .push(Wall::new(p1, p2, region_index).with_texture(wall_tex));
            }
        }

        tracing::debug!(
            region = region_index,
            vertices = indices.len(),
            "added region from polygon"
        );
        Ok(region_index)
    }

    /// Remove a region and repair every wall index that referred past it.
    ///
    /// Walls in front of the removed region go with it. Portals that looked
    /// into it become solid walls again.
    pub fn remove_region(&mut self, index: RegionIndex) -> Result<Region, DocumentError> {
        if index >= self.regions.len() {
            return Err(DocumentError::UnknownRegion(index));
        }
        let removed = self.regions.remove(index);

        let before = self.walls.len();
        self.walls.retain(|w| w.front_region != index);
        let dropped = before - self.walls.len();

        for wall in &mut self.walls {
            if wall.front_region > index {
                wall.front_region -= 1;
            }
            match wall.back_region {
                Some(back) if back == index => {
                    wall.back_region = None;
                    wall.kind = WallType::Normal;
                    wall.texture = wall.texture_top;
                }
                Some(back) if back > index => wall.back_region = Some(back - 1),
                _ => {}
            }
        }

        tracing::debug!(region = index, walls_dropped = dropped, "removed region");
        Ok(removed)
    }

    /// Move a point and refresh the outlines that use it
    pub fn move_point(&mut self, index: PointIndex, x: i32, y: i32) -> Result<(), DocumentError> {
        let old = *self.points.get(index).ok_or(DocumentError::UnknownPoint(index))?;
        self.points.move_point(index, x, y)?;
        for region in &mut self.regions {
            for p in region.points.iter_mut().filter(|p| (p.x, p.y) == (old.x, old.y)) {
                p.x = x;
                p.y = y;
            }
        }
        Ok(())
    }

    /// Rebuild every region's outline cache from the walls in front of it.
    ///
    /// Walls are chained end to start; a region whose walls do not form a
    /// single loop gets its vertices in wall order instead.
    pub fn rebuild_outlines(&mut self) {
        for (region_index, region) in self.regions.iter_mut().enumerate() {
            let walls: Vec<&Wall> = self
                .walls
                .iter()
                .filter(|w| w.front_region == region_index)
                .collect();
            let order = chain_walls(&walls).unwrap_or_else(|| walls.iter().map(|w| w.p1).collect());
            region.points = order
                .into_iter()
                .filter_map(|i| self.points.get(i).copied())
                .collect();
        }
    }
}

/// Order wall start points so each wall begins where the previous one ended
fn chain_walls(walls: &[&Wall]) -> Option<Vec<PointIndex>> {
    let first = walls.first()?;
    let mut used = vec![false; walls.len()];
    used[0] = true;
    let mut order = vec![first.p1];
    let mut cursor = first.p2;

    while cursor != first.p1 {
        let next = walls
            .iter()
            .enumerate()
            .find(|(i, w)| !used[*i] && (w.p1 == cursor || w.p2 == cursor))
            .map(|(i, _)| i)?;
        used[next] = true;
        order.push(cursor);
        let w = walls[next];
        cursor = if w.p1 == cursor { w.p2 } else { w.p1 };
    }

    if used.iter().all(|&u| u) {
        Some(order)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: i32, y: i32, size: i32) -> Vec<(i32, i32)> {
        vec![(x, y), (x + size, y), (x + size, y + size), (x, y + size)]
    }

    #[test]
    fn test_add_region_from_polygon() {
        let mut doc = MapDocument::new();
        let r = doc.add_region_from_polygon(&square(0, 0, 100), 0, 128).unwrap();
        assert_eq!(r, 0);
        assert_eq!(doc.points().len(), 4);
        assert_eq!(doc.walls().len(), 4);
        assert!(doc.walls().iter().all(|w| w.front_region == 0 && !w.is_portal()));
        assert_eq!(doc.regions()[0].points.len(), 4);
        assert_eq!(doc.regions()[0].ceiling_height, 128);
    }

    #[test]
    fn test_adjacent_regions_share_points() {
        let mut doc = MapDocument::new();
        doc.add_region_from_polygon(&square(0, 0, 100), 0, 128).unwrap();
        doc.add_region_from_polygon(&square(100, 0, 100), 0, 128).unwrap();
        assert_eq!(doc.points().len(), 6);
        assert_eq!(doc.walls().len(), 8);
    }

    #[test]
    fn test_add_region_rejects_bad_input() {
        let mut doc = MapDocument::new();
        assert_eq!(
            doc.add_region_from_polygon(&[(0, 0), (10, 0)], 0, 10),
            Err(DocumentError::PolygonTooSmall(2))
        );
        assert_eq!(
            doc.add_region_from_polygon(&[(0, 0), (40000, 0), (0, 10)], 0, 10),
            Err(DocumentError::OutOfBounds { x: 40000, y: 0 })
        );
        assert!(doc.regions().is_empty());
        assert!(doc.points().is_empty());
    }

    #[test]
    fn test_add_wall_validation() {
        let mut doc = MapDocument::new();
        let r = doc.add_region(Region::default().with_textures(1, 2, 3));
        let a = doc.points_mut().find_or_create(0, 0);
        let b = doc.points_mut().find_or_create(10, 0);

        assert_eq!(doc.add_wall(a, a, r), Err(DocumentError::DegenerateWall(a)));
        assert_eq!(doc.add_wall(a, 7, r), Err(DocumentError::UnknownPoint(7)));
        assert_eq!(doc.add_wall(a, b, 4), Err(DocumentError::UnknownRegion(4)));

        let w = doc.add_wall(a, b, r).unwrap();
        assert_eq!(doc.walls()[w].texture, 3);
    }

    #[test]
    fn test_remove_region_reindexes_walls() {
        let mut doc = MapDocument::new();
        doc.add_region_from_polygon(&square(0, 0, 100), 0, 128).unwrap();
        doc.add_region_from_polygon(&square(100, 0, 100), 0, 128).unwrap();
        doc.add_region_from_polygon(&square(200, 0, 100), 0, 128).unwrap();

        // Wall of region 2 that looks back into region 1
        let shared = doc
            .walls()
            .iter()
            .position(|w| w.front_region == 2)
            .unwrap();
        {
            let wall = &mut doc.walls_mut()[shared];
            wall.kind = WallType::Portal;
            wall.back_region = Some(1);
            wall.texture_top = 9;
            wall.texture = 0;
        }

        doc.remove_region(1).unwrap();
        assert_eq!(doc.regions().len(), 2);
        assert_eq!(doc.walls().len(), 8);
        for wall in doc.walls() {
            assert!(wall.front_region < doc.regions().len());
            assert!(wall.back_region.map_or(true, |b| b < doc.regions().len()));
        }
        let reverted = doc.walls().iter().find(|w| w.texture == 9).unwrap();
        assert_eq!(reverted.front_region, 1);
        assert_eq!(reverted.kind, WallType::Normal);
        assert_eq!(reverted.back_region, None);

        assert_eq!(doc.remove_region(5), Err(DocumentError::UnknownRegion(5)));
    }

    #[test]
    fn test_move_point_updates_outline() {
        let mut doc = MapDocument::new();
        doc.add_region_from_polygon(&square(0, 0, 100), 0, 128).unwrap();
        let idx = doc.points().find(100, 100).unwrap();
        doc.move_point(idx, 150, 150).unwrap();
        assert!(doc.regions()[0].outline().any(|p| p == (150, 150)));
        assert!(!doc.regions()[0].outline().any(|p| p == (100, 100)));
    }

    #[test]
    fn test_rebuild_outlines_follows_wall_chain() {
        let mut doc = MapDocument::new();
        doc.add_region_from_polygon(&square(0, 0, 64), 0, 64).unwrap();
        let expected: Vec<_> = doc.regions()[0].outline().collect();
        doc.regions_mut()[0].points.clear();
        // Shuffle wall order; the chain should still come back in sequence
        doc.walls_mut().swap(1, 3);
        doc.rebuild_outlines();
        assert_eq!(doc.regions()[0].outline().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_move_point_keeps_outlines_in_sync() {
        let mut doc = MapDocument::new();
        doc.add_region_from_polygon(&square(0, 0, 64), 0, 64).unwrap();
        doc.add_region_from_polygon(&square(64, 0, 64), 0, 64).unwrap();
        let shared = doc.points().find(64, 64).unwrap();
        doc.move_point(shared, 70, 80).unwrap();
        for region in doc.regions() {
            assert!(region.outline().any(|p| p == (70, 80)));
        }
        let rebuilt: Vec<Vec<(i32, i32)>> =
            doc.regions().iter().map(|r| r.outline().collect()).collect();
        doc.rebuild_outlines();
        let fresh: Vec<Vec<(i32, i32)>> =
            doc.regions().iter().map(|r| r.outline().collect()).collect();
        assert_eq!(rebuilt, fresh);
    }

    #[test]
    fn test_clear() {
        let mut doc = MapDocument::new();
        doc.add_region_from_polygon(&square(0, 0, 64), 0, 64).unwrap();
        doc.metadata.map_name = "E1M1.WLD".to_string();
        doc.clear();
        assert!(doc.points().is_empty());
        assert!(doc.walls().is_empty());
        assert!(doc.regions().is_empty());
        assert_eq!(doc.metadata, WldMetadata::default());
    }
}
