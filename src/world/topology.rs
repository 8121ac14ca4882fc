//! Derived topology: region nesting depth and wall portals
//!
//! Nothing here runs automatically. Editors call
//! [`assign_regions_and_portals`] after structural edits (and before saving)
//! to bring the derived fields back in line with the raw point/wall data.
//!
//! The depth pass is a single sweep over the walls, not a fixed-point
//! computation: a region nested three or more levels deep only picks up the
//! depth its encloser had at the moment the sweep reached it.

use super::document::MapDocument;
use super::geometry::{Point, WallType};

/// Summary of a topology pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopologyReport {
    pub max_depth: i32,
    pub portals: usize,
}

/// Even-odd ray casting test.
///
/// Outlines with fewer than three vertices contain nothing.
pub fn point_in_polygon(outline: &[Point], x: f64, y: f64) -> bool {
    if outline.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = outline.len() - 1;
    for i in 0..outline.len() {
        let (xi, yi) = (outline[i].x as f64, outline[i].y as f64);
        let (xj, yj) = (outline[j].x as f64, outline[j].y as f64);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// True when `(x, y)` lies on one of the outline's edges
fn on_boundary(outline: &[Point], x: f64, y: f64) -> bool {
    if outline.len() < 2 {
        return false;
    }
    let mut j = outline.len() - 1;
    for i in 0..outline.len() {
        let (ax, ay) = (outline[j].x as f64, outline[j].y as f64);
        let (bx, by) = (outline[i].x as f64, outline[i].y as f64);
        let cross = (bx - ax) * (y - ay) - (by - ay) * (x - ax);
        if cross.abs() < 1e-9
            && x >= ax.min(bx)
            && x <= ax.max(bx)
            && y >= ay.min(by)
            && y <= ay.max(by)
        {
            return true;
        }
        j = i;
    }
    false
}

/// Strict interior test used for nesting
fn encloses(outline: &[Point], x: f64, y: f64) -> bool {
    !on_boundary(outline, x, y) && point_in_polygon(outline, x, y)
}

/// Recompute every region's nesting depth.
///
/// All regions start at depth 1. For each wall, any other region whose
/// outline strictly contains the wall's midpoint pushes the wall's front
/// region to at least one level below itself. Midpoints on another region's
/// boundary (shared edges between neighbours) do not count as nesting.
pub fn sort_regions_by_depth(document: &mut MapDocument) -> i32 {
    let (points, walls, regions) = document.topology_mut();

    for region in regions.iter_mut() {
        region.depth = 1;
    }

    for wall in walls.iter() {
        let (Some(a), Some(b)) = (points.get(wall.p1), points.get(wall.p2)) else {
            tracing::warn!(p1 = wall.p1, p2 = wall.p2, "wall references a missing point");
            continue;
        };
        if wall.front_region >= regions.len() {
            continue;
        }
        let mx = (a.x as f64 + b.x as f64) / 2.0;
        let my = (a.y as f64 + b.y as f64) / 2.0;

        for other in 0..regions.len() {
            if other == wall.front_region {
                continue;
            }
            if encloses(&regions[other].points, mx, my) {
                let candidate = regions[other].depth + 1;
                let front = &mut regions[wall.front_region];
                front.depth = front.depth.max(candidate);
            }
        }
    }

    regions.iter().map(|r| r.depth).max().unwrap_or(0)
}

/// Depth-sort the regions, then link walls that two regions share.
///
/// Existing portals are first reverted to solid walls, so edges that stopped
/// being shared lose their portal. Then, for every pair of walls joining the
/// same two points with different front regions, the first wall of the pair
/// becomes a portal looking into the second wall's region. Its solid texture
/// moves to the upper and lower slots, since portals have no infill. Running
/// the pass twice changes nothing.
pub fn assign_regions_and_portals(document: &mut MapDocument) -> TopologyReport {
    let max_depth = sort_regions_by_depth(document);
    let (_, walls, _) = document.topology_mut();

    for wall in walls.iter_mut().filter(|w| w.is_portal()) {
        wall.kind = WallType::Normal;
        wall.back_region = None;
        wall.texture = wall.texture_top;
    }

    for i in 0..walls.len() {
        for j in (i + 1)..walls.len() {
            if !walls[i].shares_endpoints(&walls[j]) {
                continue;
            }
            if walls[i].front_region == walls[j].front_region {
                continue;
            }
            let back = walls[j].front_region;
            let wall = &mut walls[i];
            if wall.kind != WallType::Portal {
                wall.kind = WallType::Portal;
                wall.texture_top = wall.texture;
                wall.texture_bot = wall.texture;
                wall.texture = 0;
            }
            wall.back_region = Some(back);
        }
    }

    let portals = walls.iter().filter(|w| w.is_portal()).count();
    tracing::info!(max_depth, portals, "topology assigned");
    TopologyReport { max_depth, portals }
}
