// Spatial Index - R-tree of bounding boxes to opaque handles
// Shared by the ENC geometry indices and the raster tile catalog

use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::GeoRect;

/// Index entry: a bounding box and the handle it locates
#[derive(Debug, Clone)]
pub struct IndexEntry<T> {
    envelope: AABB<[f64; 2]>,
    pub handle: T,
}

impl<T> IndexEntry<T> {
    pub fn new(rect: GeoRect, handle: T) -> Self {
        Self {
            envelope: AABB::from_corners(
                [rect.min_lon, rect.min_lat],
                [rect.max_lon, rect.max_lat],
            ),
            handle,
        }
    }

    pub fn bounds(&self) -> GeoRect {
        let lower = self.envelope.lower();
        let upper = self.envelope.upper();
        GeoRect::new(lower[0], lower[1], upper[0], upper[1])
    }
}

impl<T> RTreeObject for IndexEntry<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Bounding box index. Queries take `&self` and may run concurrently;
/// insert and clear need `&mut self`, so callers serialize them with a lock.
#[derive(Debug)]
pub struct SpatialIndex<T> {
    tree: RTree<IndexEntry<T>>,
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SpatialIndex<T> {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Build an index in one pass; faster and better balanced than
    /// repeated inserts
    pub fn bulk_build(entries: impl IntoIterator<Item = (GeoRect, T)>) -> Self {
        let entries: Vec<IndexEntry<T>> = entries
            .into_iter()
            .map(|(rect, handle)| IndexEntry::new(rect, handle))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn insert(&mut self, rect: GeoRect, handle: T) {
        self.tree.insert(IndexEntry::new(rect, handle));
    }

    /// Handles whose boxes intersect `rect`, in no particular order
    pub fn query<'a>(&'a self, rect: &GeoRect) -> impl Iterator<Item = &'a T> + 'a {
        let envelope = AABB::from_corners([rect.min_lon, rect.min_lat], [rect.max_lon, rect.max_lat]);
        let empty = rect.is_empty();
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(move |_| !empty)
            .map(|entry| &entry.handle)
    }

    /// All entries, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry<T>> {
        self.tree.iter()
    }

    /// Union of all entry boxes (empty for an empty index)
    pub fn bounds(&self) -> GeoRect {
        self.iter()
            .fold(GeoRect::empty(), |acc, entry| acc.union(&entry.bounds()))
    }

    /// Drop every entry, releasing the handles
    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sorted(mut v: Vec<u32>) -> Vec<u32> {
        v.sort_unstable();
        v
    }

    #[test]
    fn test_bulk_build_and_query() {
        let index = SpatialIndex::bulk_build(vec![
            (GeoRect::new(0.0, 0.0, 1.0, 1.0), 1u32),
            (GeoRect::new(5.0, 5.0, 6.0, 6.0), 2),
            (GeoRect::new(0.5, 0.5, 5.5, 5.5), 3),
        ]);

        assert_eq!(index.len(), 3);
        let hits: Vec<u32> = index.query(&GeoRect::new(0.9, 0.9, 1.1, 1.1)).copied().collect();
        assert_eq!(sorted(hits), vec![1, 3]);
        let hits: Vec<u32> = index.query(&GeoRect::new(10.0, 10.0, 11.0, 11.0)).copied().collect();
        assert!(hits.is_empty());
        assert_eq!(index.bounds(), GeoRect::new(0.0, 0.0, 6.0, 6.0));
    }

    #[test]
    fn test_insert_point_entries() {
        let mut index = SpatialIndex::new();
        index.insert(GeoRect::new(0.1, 0.2, 0.1, 0.2), "a");
        index.insert(GeoRect::new(-3.0, -3.0, -2.0, -2.0), "b");

        let hits: Vec<&str> = index.query(&GeoRect::world()).copied().collect();
        assert_eq!(hits.len(), 2);
        // Touching boundary counts as intersecting
        let hits: Vec<&str> = index.query(&GeoRect::new(0.1, 0.2, 1.0, 1.0)).copied().collect();
        assert_eq!(hits, vec!["a"]);
    }

    #[test]
    fn test_empty_query_rect() {
        let index = SpatialIndex::bulk_build(vec![(GeoRect::new(0.0, 0.0, 1.0, 1.0), 1u32)]);
        assert_eq!(index.query(&GeoRect::empty()).count(), 0);
    }

    #[test]
    fn test_clear_releases_handles() {
        let handle = Arc::new(42u32);
        let mut index = SpatialIndex::new();
        index.insert(GeoRect::new(0.0, 0.0, 1.0, 1.0), Arc::clone(&handle));
        assert_eq!(Arc::strong_count(&handle), 2);

        index.clear();
        assert!(index.is_empty());
        assert_eq!(Arc::strong_count(&handle), 1);
    }
}
