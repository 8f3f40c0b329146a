//! R-tree over record geometries.
//!
//! Points are stored as planar `[lng, lat]`, the same envelope model the
//! database's GiST index uses. Nearest-neighbor traversal is therefore planar
//! in degrees; radius filtering and reported distances are geodesic.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use uuid::Uuid;

use radar_core::{BoundingBox, GeoPoint};

/// Index entry: a record id at its derived geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedToilet {
    pub id: Uuid,
    pub point: GeoPoint,
}

impl RTreeObject for IndexedToilet {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point.to_xy())
    }
}

impl PointDistance for IndexedToilet {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let [x, y] = self.point.to_xy();
        let dx = x - point[0];
        let dy = y - point[1];
        dx * dx + dy * dy
    }
}

/// Spatial index over located records.
pub struct SpatialIndex {
    tree: RTree<IndexedToilet>,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Build an index from a batch of entries.
    pub fn bulk_load(entries: Vec<IndexedToilet>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn insert(&mut self, id: Uuid, point: GeoPoint) {
        self.tree.insert(IndexedToilet { id, point });
    }

    /// Remove the entry for `id` at `point`. Returns whether it was present.
    pub fn remove(&mut self, id: Uuid, point: GeoPoint) -> bool {
        self.tree.remove(&IndexedToilet { id, point }).is_some()
    }

    /// Up to `limit` entries accepted by `accept`, in nearest-first index
    /// traversal order.
    pub fn nearest_matching<F>(
        &self,
        center: &GeoPoint,
        limit: usize,
        mut accept: F,
    ) -> Vec<IndexedToilet>
    where
        F: FnMut(&IndexedToilet) -> bool,
    {
        let query = center.to_xy();
        self.tree
            .nearest_neighbor_iter(&query)
            .filter(|entry| accept(entry))
            .take(limit)
            .copied()
            .collect()
    }

    /// Entries within `radius_m` meters of `center`, nearest first, with
    /// their geodesic distance. Equal distances keep traversal order.
    pub fn within_radius(&self, center: &GeoPoint, radius_m: f64) -> Vec<(IndexedToilet, f64)> {
        let bounds = BoundingBox::around(center, radius_m);
        let envelope = AABB::from_corners(bounds.min_xy(), bounds.max_xy());

        let mut hits: Vec<(IndexedToilet, f64)> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| (*entry, center.distance_m(&entry.point)))
            .filter(|(_, distance)| *distance <= radius_m)
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits
    }

    /// Up to `limit` entries whose point intersects `bounds` (edges
    /// inclusive), in no particular order.
    pub fn in_bounds(&self, bounds: &BoundingBox, limit: usize) -> Vec<IndexedToilet> {
        let envelope = AABB::from_corners(bounds.min_xy(), bounds.max_xy());
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .take(limit)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(lat: f64, lng: f64) -> IndexedToilet {
        IndexedToilet {
            id: Uuid::new_v4(),
            point: GeoPoint { lat, lng },
        }
    }

    #[test]
    fn test_insert_and_remove() {
        let mut index = SpatialIndex::new();
        let e = entry(46.5, 6.6);
        index.insert(e.id, e.point);
        assert_eq!(index.len(), 1);
        assert!(index.remove(e.id, e.point));
        assert!(!index.remove(e.id, e.point));
        assert!(index.is_empty());
    }

    #[test]
    fn test_nearest_iter_order() {
        let near = entry(46.52, 6.63);
        let mid = entry(46.60, 6.70);
        let far = entry(47.37, 8.54);
        let index = SpatialIndex::bulk_load(vec![far, near, mid]);

        let center = GeoPoint {
            lat: 46.5197,
            lng: 6.6323,
        };
        let order: Vec<Uuid> = index
            .nearest_matching(&center, 10, |_| true)
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(order, vec![near.id, mid.id, far.id]);

        let first_two = index.nearest_matching(&center, 2, |e| e.id != near.id);
        assert_eq!(first_two.len(), 2);
        assert_eq!(first_two[0].id, mid.id);
    }

    #[test]
    fn test_within_radius_filters_and_sorts() {
        let a = entry(46.5197, 6.6323);
        let b = entry(46.53, 6.64);
        let geneva = entry(46.2044, 6.1432);
        let index = SpatialIndex::bulk_load(vec![geneva, b, a]);

        let hits = index.within_radius(&GeoPoint { lat: 46.52, lng: 6.63 }, 5_000.0);
        let ids: Vec<Uuid> = hits.iter().map(|(e, _)| e.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
        assert!(hits[0].1 < 500.0);
        assert!(hits[0].1 <= hits[1].1);
    }

    #[test]
    fn test_within_zero_radius_matches_exact_point() {
        let a = entry(10.0, 20.0);
        let index = SpatialIndex::bulk_load(vec![a]);
        let hits = index.within_radius(&a.point, 0.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1, 0.0);
    }

    #[test]
    fn test_in_bounds() {
        let inside = entry(46.5, 6.5);
        let edge = entry(47.0, 7.0);
        let outside = entry(47.5, 6.5);
        let index = SpatialIndex::bulk_load(vec![inside, edge, outside]);

        let bounds = BoundingBox::new(46.0, 6.0, 47.0, 7.0).unwrap();
        let mut ids: Vec<Uuid> = index.in_bounds(&bounds, 10).iter().map(|e| e.id).collect();
        ids.sort();
        let mut expected = vec![inside.id, edge.id];
        expected.sort();
        assert_eq!(ids, expected);

        assert_eq!(index.in_bounds(&bounds, 1).len(), 1);
    }
}
