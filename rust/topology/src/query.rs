// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-only queries on components.

use geonet_geometry::{Line3D, Mbb3D, Plane3D, Point3, Segment3D, Tetrahedron3D, Triangle3D};
use rustc_hash::FxHashSet;

use crate::component::Component;
use crate::contact::NetSimplex;
use crate::element::Element;
use crate::error::Result;
use crate::keys::ElementKey;
use crate::spatial::SpatialAccess;

// =============================================================================
// Element access
// =============================================================================

impl<S: NetSimplex, I: SpatialAccess> Component<S, I> {
    pub fn element(&self, key: ElementKey) -> Option<&Element<S>> {
        self.elements.get(key)
    }

    pub fn element_by_id(&self, id: u64) -> Option<(ElementKey, &Element<S>)> {
        let key = *self.ids.get(&id)?;
        self.elements.get(key).map(|e| (key, e))
    }

    /// All elements, in arena order.
    pub fn elements(&self) -> impl Iterator<Item = (ElementKey, &Element<S>)> + '_ {
        self.elements.iter()
    }

    /// All element keys as held by the spatial index, ordered by id.
    pub fn elements_via_sam(&self) -> Vec<ElementKey> {
        let mut keyed: Vec<(u64, ElementKey)> = self
            .sam
            .entries()
            .into_iter()
            .filter_map(|k| self.elements.get(k).map(|e| (e.id(), k)))
            .collect();
        keyed.sort_unstable();
        keyed.into_iter().map(|(_, k)| k).collect()
    }

    /// Elements reachable from the entry through neighbour links, in
    /// depth-first order. Equals the full element set iff the component is
    /// connected.
    pub fn elements_via_traversal(&self) -> Vec<ElementKey> {
        let Some(start) = self.entry() else {
            return Vec::new();
        };
        let mut visited: FxHashSet<ElementKey> = FxHashSet::default();
        let mut order = Vec::with_capacity(self.len());
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(current) = stack.pop() {
            order.push(current);
            if let Some(element) = self.elements.get(current) {
                for (_, next) in element.linked() {
                    if visited.insert(next) {
                        stack.push(next);
                    }
                }
            }
        }
        order
    }

    pub fn neighbours(&self, key: ElementKey) -> Result<Vec<ElementKey>> {
        Ok(self.element_ref(key)?.linked().map(|(_, n)| n).collect())
    }

    /// Elements with at least one free facet, ordered by id.
    pub fn border_elements(&self) -> Vec<ElementKey> {
        self.keys_by_id()
            .into_iter()
            .filter(|k| self.elements.get(*k).is_some_and(Element::is_border))
            .collect()
    }

    /// The member geometry-equivalent to `shape`.
    pub fn find_equivalent(&self, shape: &S) -> Option<ElementKey> {
        self.candidates(&shape.mbb().expanded(self.eps.value()))
            .into_iter()
            .find(|k| {
                self.elements
                    .get(*k)
                    .is_some_and(|e| e.shape().is_geometry_equivalent(shape, &self.eps))
            })
    }

    pub fn contains_element(&self, shape: &S) -> bool {
        self.find_equivalent(shape).is_some()
    }

    // =========================================================================
    // Spatial predicates
    // =========================================================================

    /// Elements whose shape contains `p`, ordered by id.
    pub fn elements_containing(&self, p: &Point3<f64>) -> Vec<ElementKey> {
        let query_box = Mbb3D::from_point(*p);
        self.candidates(&query_box)
            .into_iter()
            .filter(|k| self.elements.get(*k).is_some_and(|e| e.shape().contains_point(p, &self.eps)))
            .collect()
    }

    pub fn contains_point(&self, p: &Point3<f64>) -> bool {
        let query_box = Mbb3D::from_point(*p);
        self.mbb().is_some_and(|m| m.contains_point(p, &self.eps))
            && self.candidates(&query_box).into_iter().any(|k| {
                self.elements
                    .get(k)
                    .is_some_and(|e| e.shape().contains_point(p, &self.eps))
            })
    }

    /// Elements whose box intersects `mbb`, ordered by id.
    pub fn elements_intersecting(&self, mbb: &Mbb3D) -> Vec<ElementKey> {
        self.candidates(mbb)
            .into_iter()
            .filter(|k| self.elements.get(*k).is_some_and(|e| e.shape().mbb().expanded(self.eps.value()).intersects(mbb)))
            .collect()
    }

    pub fn intersects_mbb(&self, mbb: &Mbb3D) -> bool {
        !self.elements_intersecting(mbb).is_empty()
    }

    pub fn intersects_plane(&self, plane: &Plane3D) -> bool {
        let Some(mbb) = self.mbb() else {
            return false;
        };
        mbb.intersects_plane(plane, &self.eps)
            && self.elements.values().any(|e| e.shape().intersects_plane(plane, &self.eps))
    }

    pub fn intersects_line(&self, line: &Line3D) -> bool {
        self.elements.values().any(|e| e.shape().intersects_line(line, &self.eps))
    }

    /// The `k` elements closest to `p` by exact shape distance.
    ///
    /// Index candidates arrive ordered by box distance, which never exceeds
    /// the shape distance; the scan stops once the next box is farther than
    /// the current k-th best.
    pub fn nearest(&self, k: usize, p: &Point3<f64>) -> Vec<(ElementKey, f64)> {
        if k == 0 || self.is_empty() {
            return Vec::new();
        }
        let mut want = k;
        loop {
            let candidates = self.sam.nearest(want, p);
            let exhausted = candidates.len() < want || want >= self.len();
            let mut best: Vec<(ElementKey, f64)> = candidates
                .iter()
                .filter_map(|(key, _)| self.elements.get(*key).map(|e| (*key, e.shape().distance_to_point(p))))
                .collect();
            best.sort_by(|a, b| a.1.total_cmp(&b.1));
            best.truncate(k);
            let bound = candidates.last().map_or(f64::INFINITY, |(_, d)| *d);
            let kth = best.last().map_or(f64::INFINITY, |(_, d)| *d);
            if exhausted || (best.len() == k && kth <= bound) {
                return best;
            }
            want = (want * 2).min(self.len());
        }
    }
}

// =============================================================================
// Per-kind measures
// =============================================================================

impl<I: SpatialAccess> Component<Segment3D, I> {
    /// Total length.
    pub fn length(&self) -> f64 {
        self.elements.values().map(|e| e.shape().length()).sum()
    }
}

impl<I: SpatialAccess> Component<Triangle3D, I> {
    /// Total area.
    pub fn area(&self) -> f64 {
        self.elements.values().map(|e| e.shape().area()).sum()
    }
}

impl<I: SpatialAccess> Component<Tetrahedron3D, I> {
    /// Total volume.
    pub fn volume(&self) -> f64 {
        self.elements.values().map(|e| e.shape().volume()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetConfig;
    use approx::assert_relative_eq;
    use geonet_geometry::Simplex;

    fn config() -> NetConfig {
        NetConfig::with_epsilon(1e-9)
    }

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    fn strip(n: usize) -> Component<Triangle3D> {
        let eps = config().geo_epsilon().unwrap();
        let mut shapes = Vec::new();
        for i in 0..n {
            let x = i as f64;
            shapes.push(Triangle3D::new(p(x, 0.0, 0.0), p(x + 1.0, 0.0, 0.0), p(x + 1.0, 1.0, 0.0), &eps).unwrap());
            shapes.push(Triangle3D::new(p(x, 0.0, 0.0), p(x + 1.0, 1.0, 0.0), p(x, 1.0, 0.0), &eps).unwrap());
        }
        Component::from_elements(&config(), shapes).unwrap()
    }

    #[test]
    fn traversal_reaches_every_element() {
        let c = strip(4);
        assert_eq!(c.elements_via_traversal().len(), 8);
        assert_eq!(c.elements_via_sam().len(), 8);
        assert_eq!(c.border_elements().len(), 8);
    }

    #[test]
    fn point_and_box_queries() {
        let c = strip(3);
        assert!(c.contains_point(&p(2.5, 0.5, 0.0)));
        assert!(!c.contains_point(&p(2.5, 0.5, 0.1)));
        // On the shared diagonal of the first square.
        assert_eq!(c.elements_containing(&p(0.5, 0.5, 0.0)).len(), 2);
        assert!(c.intersects_mbb(&Mbb3D::new(p(2.9, 0.9, -1.0), p(3.1, 1.1, 1.0))));
        assert!(!c.intersects_mbb(&Mbb3D::new(p(5.0, 5.0, 5.0), p(6.0, 6.0, 6.0))));
    }

    #[test]
    fn plane_and_line_queries() {
        let c = strip(2);
        let cutting = Plane3D::new(p(1.5, 0.0, 0.0), nalgebra::Vector3::x()).unwrap();
        let above = Plane3D::new(p(0.0, 0.0, 1.0), nalgebra::Vector3::z()).unwrap();
        assert!(c.intersects_plane(&cutting));
        assert!(!c.intersects_plane(&above));
        let vertical = Line3D::through(&p(0.7, 0.2, -1.0), &p(0.7, 0.2, 1.0)).unwrap();
        assert!(c.intersects_line(&vertical));
    }

    #[test]
    fn empty_component_contains_and_cuts_nothing() {
        let c: Component<Triangle3D> = Component::new(&config()).unwrap();
        let through_origin = Plane3D::new(p(0.0, 0.0, 0.0), nalgebra::Vector3::z()).unwrap();
        assert!(!c.contains_point(&p(0.0, 0.0, 0.0)));
        assert!(!c.intersects_plane(&through_origin));
    }

    #[test]
    fn nearest_uses_exact_distance() {
        let c = strip(3);
        let hits = c.nearest(1, &p(1.8, 0.1, 2.0));
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].1, 2.0, epsilon = 1e-9);
        let element = c.element(hits[0].0).unwrap();
        assert!(element.shape().contains_point(&p(1.8, 0.1, 0.0), c.epsilon()));

        let all = c.nearest(100, &p(0.0, 0.0, 0.0));
        assert_eq!(all.len(), 6);
        assert!(all.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn measures() {
        let c = strip(2);
        assert_relative_eq!(c.area(), 2.0, epsilon = 1e-12);
        assert!(c.find_equivalent(&c.element_by_id(0).unwrap().1.shape().inverted()).is_some());
    }
}
