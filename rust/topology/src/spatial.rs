// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial access methods (SAM) over element bounding boxes, and the
//! tolerance grid used to snap vertices.
//!
//! A component keeps exactly its own elements in one [`SpatialAccess`]
//! instance. Queries return owned sets, so callers may prune them freely
//! without touching the index.

use geonet_geometry::{GeoEpsilon, Mbb3D, Point3};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::NetConfig;
use crate::keys::{ElementKey, VertexId};

/// Range and nearest-neighbour index over a mutable set of element boxes.
pub trait SpatialAccess: std::fmt::Debug {
    /// Creates an empty index for a component built with `config`.
    fn create(config: &NetConfig) -> Self
    where
        Self: Sized;

    /// Inserts (or replaces) the box of `key`.
    fn insert(&mut self, key: ElementKey, mbb: Mbb3D);

    /// Removes `key`. Returns `false` if it was not indexed.
    fn remove(&mut self, key: ElementKey) -> bool;

    /// Keys whose box intersects `mbb` (closed boxes, touching counts).
    fn intersects(&self, mbb: &Mbb3D) -> FxHashSet<ElementKey>;

    /// Keys whose box contains `p`.
    fn contains(&self, p: &Point3<f64>) -> FxHashSet<ElementKey> {
        self.intersects(&Mbb3D::from_point(*p))
    }

    /// Up to `k` keys ordered by the distance from `p` to their box.
    fn nearest(&self, k: usize, p: &Point3<f64>) -> Vec<(ElementKey, f64)>;

    fn entries(&self) -> FxHashSet<ElementKey>;

    fn count(&self) -> usize;

    /// The stored box of `key`.
    fn mbb_of(&self, key: ElementKey) -> Option<Mbb3D>;
}

fn sort_by_distance(mut hits: Vec<(ElementKey, f64)>, k: usize) -> Vec<(ElementKey, f64)> {
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits.truncate(k);
    hits
}

// =============================================================================
// Grid index
// =============================================================================

/// Boxes covering more cells than this go to the overflow list instead.
const MAX_CELLS_PER_ENTRY: f64 = 512.0;

type Cell = (i64, i64, i64);

/// Uniform hash grid over element boxes.
///
/// Each box is registered in every cell it overlaps. Boxes that would span
/// more than [`MAX_CELLS_PER_ENTRY`] cells are kept in an overflow list that
/// every query scans.
#[derive(Debug, Clone)]
pub struct GridIndex {
    cell_size: f64,
    margin: f64,
    boxes: FxHashMap<ElementKey, Mbb3D>,
    grid: FxHashMap<Cell, Vec<ElementKey>>,
    oversized: FxHashSet<ElementKey>,
}

impl GridIndex {
    pub fn new(cell_size: f64, margin: f64) -> Self {
        Self {
            cell_size,
            margin,
            boxes: FxHashMap::default(),
            grid: FxHashMap::default(),
            oversized: FxHashSet::default(),
        }
    }

    fn cell_of(&self, p: &Point3<f64>) -> Cell {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        )
    }

    /// Inclusive cell range covered by `mbb`, or `None` if it spans too many
    /// cells to enumerate.
    fn cell_range(&self, mbb: &Mbb3D) -> Option<(Cell, Cell)> {
        let span = |lo: f64, hi: f64| ((hi - lo) / self.cell_size).floor() + 1.0;
        let cells = span(mbb.min.x, mbb.max.x) * span(mbb.min.y, mbb.max.y) * span(mbb.min.z, mbb.max.z);
        if !cells.is_finite() || cells > MAX_CELLS_PER_ENTRY {
            return None;
        }
        Some((self.cell_of(&mbb.min), self.cell_of(&mbb.max)))
    }

    fn cells(range: (Cell, Cell)) -> impl Iterator<Item = Cell> {
        let ((x0, y0, z0), (x1, y1, z1)) = range;
        (x0..=x1).flat_map(move |x| (y0..=y1).flat_map(move |y| (z0..=z1).map(move |z| (x, y, z))))
    }
}

impl SpatialAccess for GridIndex {
    fn create(config: &NetConfig) -> Self {
        Self::new(config.grid_cell_size, config.epsilon)
    }

    fn insert(&mut self, key: ElementKey, mbb: Mbb3D) {
        self.remove(key);
        let mbb = mbb.expanded(self.margin);
        match self.cell_range(&mbb) {
            Some(range) => {
                for cell in Self::cells(range) {
                    self.grid.entry(cell).or_default().push(key);
                }
            }
            None => {
                self.oversized.insert(key);
            }
        }
        self.boxes.insert(key, mbb);
    }

    fn remove(&mut self, key: ElementKey) -> bool {
        let Some(mbb) = self.boxes.remove(&key) else {
            return false;
        };
        if self.oversized.remove(&key) {
            return true;
        }
        if let Some(range) = self.cell_range(&mbb) {
            for cell in Self::cells(range) {
                if let Some(keys) = self.grid.get_mut(&cell) {
                    keys.retain(|k| *k != key);
                    if keys.is_empty() {
                        self.grid.remove(&cell);
                    }
                }
            }
        }
        true
    }

    fn intersects(&self, mbb: &Mbb3D) -> FxHashSet<ElementKey> {
        let hit = |k: &ElementKey| self.boxes.get(k).is_some_and(|b| b.intersects(mbb));
        let mut result: FxHashSet<ElementKey> = self.oversized.iter().copied().filter(|k| hit(k)).collect();
        match self.cell_range(mbb) {
            Some(range) => {
                for cell in Self::cells(range) {
                    if let Some(keys) = self.grid.get(&cell) {
                        result.extend(keys.iter().copied().filter(|k| hit(k)));
                    }
                }
            }
            None => {
                result.extend(self.boxes.iter().filter(|(_, b)| b.intersects(mbb)).map(|(k, _)| *k));
            }
        }
        result
    }

    fn nearest(&self, k: usize, p: &Point3<f64>) -> Vec<(ElementKey, f64)> {
        if k == 0 || self.boxes.is_empty() {
            return Vec::new();
        }
        // Grow a cube around `p` until it holds k boxes within its half-width:
        // every box closer than that radius intersects the cube.
        let mut radius = self.cell_size;
        loop {
            let query_box = Mbb3D::from_point(*p).expanded(radius);
            let candidates = self.intersects(&query_box);
            let all = candidates.len() == self.boxes.len();
            let hits: Vec<(ElementKey, f64)> = candidates
                .into_iter()
                .filter_map(|key| self.boxes.get(&key).map(|b| (key, b.distance_to_point(p))))
                .filter(|(_, d)| all || *d <= radius)
                .collect();
            if all || hits.len() >= k {
                return sort_by_distance(hits, k);
            }
            radius *= 2.0;
        }
    }

    fn entries(&self) -> FxHashSet<ElementKey> {
        self.boxes.keys().copied().collect()
    }

    fn count(&self) -> usize {
        self.boxes.len()
    }

    fn mbb_of(&self, key: ElementKey) -> Option<Mbb3D> {
        self.boxes.get(&key).copied()
    }
}

// =============================================================================
// Linear index
// =============================================================================

/// Brute-force index. Every query scans all boxes; useful as a reference and
/// for very small components.
#[derive(Debug, Clone, Default)]
pub struct LinearIndex {
    margin: f64,
    boxes: FxHashMap<ElementKey, Mbb3D>,
}

impl SpatialAccess for LinearIndex {
    fn create(config: &NetConfig) -> Self {
        Self {
            margin: config.epsilon,
            boxes: FxHashMap::default(),
        }
    }

    fn insert(&mut self, key: ElementKey, mbb: Mbb3D) {
        self.boxes.insert(key, mbb.expanded(self.margin));
    }

    fn remove(&mut self, key: ElementKey) -> bool {
        self.boxes.remove(&key).is_some()
    }

    fn intersects(&self, mbb: &Mbb3D) -> FxHashSet<ElementKey> {
        self.boxes
            .iter()
            .filter(|(_, b)| b.intersects(mbb))
            .map(|(k, _)| *k)
            .collect()
    }

    fn nearest(&self, k: usize, p: &Point3<f64>) -> Vec<(ElementKey, f64)> {
        let hits = self.boxes.iter().map(|(key, b)| (*key, b.distance_to_point(p))).collect();
        sort_by_distance(hits, k)
    }

    fn entries(&self) -> FxHashSet<ElementKey> {
        self.boxes.keys().copied().collect()
    }

    fn count(&self) -> usize {
        self.boxes.len()
    }

    fn mbb_of(&self, key: ElementKey) -> Option<Mbb3D> {
        self.boxes.get(&key).copied()
    }
}

// =============================================================================
// Vertex snapping
// =============================================================================

/// A spatial hash grid for tolerance-based vertex identity.
///
/// The grid divides space into cubic cells of side `epsilon`. Lookups check
/// the 27 neighbouring cells for a vertex that is epsilon-equal to the query.
#[derive(Debug)]
pub struct VertexSnapper {
    eps: GeoEpsilon,
    cell_size: f64,
    points: Vec<Point3<f64>>,
    grid: FxHashMap<Cell, Vec<VertexId>>,
}

impl VertexSnapper {
    pub fn new(eps: GeoEpsilon) -> Self {
        Self {
            eps,
            cell_size: eps.value().max(1e-12),
            points: Vec::new(),
            grid: FxHashMap::default(),
        }
    }

    fn cell_of(&self, p: &Point3<f64>) -> Cell {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        )
    }

    /// Finds a vertex epsilon-equal to `p`.
    pub fn find(&self, p: &Point3<f64>) -> Option<VertexId> {
        let (cx, cy, cz) = self.cell_of(p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(ids) = self.grid.get(&(cx + dx, cy + dy, cz + dz)) {
                        for &id in ids {
                            if self.eps.equal_points(&self.points[id.0 as usize], p) {
                                return Some(id);
                            }
                        }
                    }
                }
            }
        }
        None
    }

    /// Returns the identity of the vertex epsilon-equal to `p`, creating one
    /// if none exists yet.
    pub fn find_or_insert(&mut self, p: Point3<f64>) -> VertexId {
        if let Some(id) = self.find(&p) {
            return id;
        }
        let id = VertexId(self.points.len() as u32);
        let cell = self.cell_of(&p);
        self.points.push(p);
        self.grid.entry(cell).or_default().push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The representative coordinates, indexed by vertex id.
    pub fn into_points(self) -> Vec<Point3<f64>> {
        self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn keys(n: usize) -> Vec<ElementKey> {
        let mut map: SlotMap<ElementKey, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    fn unit_box_at(x: f64) -> Mbb3D {
        Mbb3D::new(Point3::new(x, 0.0, 0.0), Point3::new(x + 1.0, 1.0, 1.0))
    }

    fn exercise<I: SpatialAccess>() {
        let config = NetConfig::default();
        let mut index = I::create(&config);
        let k = keys(4);
        for (i, key) in k.iter().enumerate() {
            index.insert(*key, unit_box_at(i as f64 * 3.0));
        }
        assert_eq!(index.count(), 4);

        let hits = index.intersects(&Mbb3D::new(Point3::new(0.5, 0.5, 0.5), Point3::new(3.5, 0.5, 0.5)));
        assert_eq!(hits.len(), 2);
        assert!(hits.contains(&k[0]) && hits.contains(&k[1]));

        assert!(index.contains(&Point3::new(9.5, 0.5, 0.5)).contains(&k[3]));

        let near = index.nearest(2, &Point3::new(6.5, 0.5, 0.5));
        assert_eq!(near.len(), 2);
        assert_eq!(near[0].0, k[2]);
        assert_eq!(near[0].1, 0.0);

        assert!(index.remove(k[2]));
        assert!(!index.remove(k[2]));
        assert!(index.intersects(&unit_box_at(6.0)).is_empty());
        assert_eq!(index.entries().len(), 3);
    }

    #[test]
    fn grid_index_contract() {
        exercise::<GridIndex>();
    }

    #[test]
    fn linear_index_contract() {
        exercise::<LinearIndex>();
    }

    #[test]
    fn oversized_boxes_are_found() {
        let mut index = GridIndex::new(0.1, 0.0);
        let k = keys(2);
        index.insert(k[0], Mbb3D::new(Point3::new(-100.0, -100.0, -100.0), Point3::new(100.0, 100.0, 100.0)));
        index.insert(k[1], unit_box_at(0.0));
        let hits = index.contains(&Point3::new(50.0, 50.0, 50.0));
        assert_eq!(hits.len(), 1);
        assert!(hits.contains(&k[0]));
        assert!(index.remove(k[0]));
        assert!(index.contains(&Point3::new(50.0, 50.0, 50.0)).is_empty());
    }

    #[test]
    fn mutating_a_result_leaves_index_intact() {
        let mut index = GridIndex::new(1.0, 0.0);
        let k = keys(1);
        index.insert(k[0], unit_box_at(0.0));
        let mut hits = index.intersects(&unit_box_at(0.0));
        hits.clear();
        assert_eq!(index.intersects(&unit_box_at(0.0)).len(), 1);
    }

    #[test]
    fn snapper_merges_within_tolerance() {
        let eps = GeoEpsilon::new(1e-6).unwrap();
        let mut snapper = VertexSnapper::new(eps);
        let a = snapper.find_or_insert(Point3::new(1.0, 1.0, 1.0));
        let b = snapper.find_or_insert(Point3::new(1.0 + 5e-7, 1.0, 1.0 - 5e-7));
        let c = snapper.find_or_insert(Point3::new(1.0 + 1e-5, 1.0, 1.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(snapper.len(), 2);
    }
}
