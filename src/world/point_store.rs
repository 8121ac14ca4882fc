//! Deduplicated point registry
//!
//! Walls and region outlines refer to vertices by index. The store keeps a
//! coordinate lookup next to the point list so `find_or_create` never has to
//! scan the whole map.

use std::collections::HashMap;

use super::document::DocumentError;
use super::geometry::{in_grid, Point, PointIndex};

#[derive(Debug, Clone, Default)]
pub struct PointStore {
    points: Vec<Point>,
    /// Coordinates to the first point found with them
    lookup: HashMap<(i32, i32), PointIndex>,
}

impl PointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from points read off disk.
    ///
    /// Legacy files may contain duplicate coordinates; they are kept as-is so
    /// wall indices stay valid, and lookups resolve to the first occurrence.
    pub fn from_points(points: Vec<Point>) -> Self {
        let mut lookup = HashMap::with_capacity(points.len());
        for (i, p) in points.iter().enumerate() {
            lookup.entry((p.x, p.y)).or_insert(i);
        }
        Self { points, lookup }
    }

    /// Return the index of the point at `(x, y)`, appending one if needed
    pub fn find_or_create(&mut self, x: i32, y: i32) -> PointIndex {
        if let Some(&index) = self.lookup.get(&(x, y)) {
            return index;
        }
        let index = self.points.len();
        self.points.push(Point::new(x, y));
        self.lookup.insert((x, y), index);
        index
    }

    /// Index of the point at `(x, y)` without creating it
    pub fn find(&self, x: i32, y: i32) -> Option<PointIndex> {
        self.lookup.get(&(x, y)).copied()
    }

    pub fn get(&self, index: PointIndex) -> Option<&Point> {
        self.points.get(index)
    }

    /// Move a point, keeping coordinates unique
    pub fn move_point(&mut self, index: PointIndex, x: i32, y: i32) -> Result<(), DocumentError> {
        let old = *self.points.get(index).ok_or(DocumentError::UnknownPoint(index))?;
        if !in_grid(x, y) {
            return Err(DocumentError::OutOfBounds { x, y });
        }
        if (old.x, old.y) == (x, y) {
            return Ok(());
        }
        if let Some(&other) = self.lookup.get(&(x, y)) {
            return Err(DocumentError::PointOccupied { x, y, index: other });
        }

        if self.lookup.get(&(old.x, old.y)) == Some(&index) {
            self.lookup.remove(&(old.x, old.y));
            // A legacy duplicate may still sit at the old spot
            if let Some(dup) = self
                .points
                .iter()
                .enumerate()
                .position(|(i, p)| i != index && (p.x, p.y) == (old.x, old.y))
            {
                self.lookup.insert((old.x, old.y), dup);
            }
        }

        let point = &mut self.points[index];
        point.x = x;
        point.y = y;
        self.lookup.insert((x, y), index);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.iter()
    }

    pub fn as_slice(&self) -> &[Point] {
        &self.points
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.lookup.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_find_or_create_dedupes() {
        let mut store = PointStore::new();
        let a = store.find_or_create(100, 200);
        let b = store.find_or_create(300, 200);
        let c = store.find_or_create(100, 200);
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(c, a);
        assert_eq!(store.len(), 2);

        let p = store.get(a).unwrap();
        assert!(p.active);
        assert_eq!(p.links, 0);
    }

    #[test]
    fn test_from_points_keeps_duplicates() {
        let store = PointStore::from_points(vec![
            Point::new(5, 5),
            Point::new(7, 7),
            Point::new(5, 5),
        ]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.find(5, 5), Some(0));
    }

    #[test]
    fn test_move_point() {
        let mut store = PointStore::new();
        let a = store.find_or_create(10, 10);
        let b = store.find_or_create(20, 20);

        assert!(matches!(
            store.move_point(a, 20, 20),
            Err(DocumentError::PointOccupied { index, .. }) if index == b
        ));
        assert!(matches!(
            store.move_point(a, -5, 0),
            Err(DocumentError::OutOfBounds { .. })
        ));
        assert!(matches!(store.move_point(9, 0, 0), Err(DocumentError::UnknownPoint(9))));

        store.move_point(a, 30, 30).unwrap();
        assert_eq!(store.find(30, 30), Some(a));
        assert_eq!(store.find(10, 10), None);
        // The freed spot can be reused
        assert_eq!(store.find_or_create(10, 10), 2);
    }

    proptest! {
        #[test]
        fn find_or_create_is_idempotent(
            x in 0..=30208i32,
            y in 0..=30208i32,
            others in proptest::collection::vec((0..=30208i32, 0..=30208i32), 0..32),
        ) {
            let mut store = PointStore::new();
            for (ox, oy) in others {
                store.find_or_create(ox, oy);
            }
            let first = store.find_or_create(x, y);
            let len = store.len();
            let second = store.find_or_create(x, y);
            prop_assert_eq!(first, second);
            prop_assert_eq!(store.len(), len);
        }
    }
}
