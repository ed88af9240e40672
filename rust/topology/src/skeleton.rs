// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vertex, edge and face skeleton of a component.
//!
//! Vertices are snapped through a [`VertexSnapper`], so coordinates within
//! epsilon of each other share one [`VertexId`]. Edges and faces are stored
//! as sorted id tuples, which makes geometry-equivalent sub-simplices reached
//! from different elements collapse into one entry.
//!
//! The skeleton is derived data. [`Component::skeleton`] computes it on
//! demand; [`Component::build_vertices`] additionally caches it until the
//! next mutation.

use std::collections::BTreeSet;

use geonet_geometry::Point3;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::component::Component;
use crate::contact::NetSimplex;
use crate::keys::{ElementKey, VertexId};
use crate::spatial::{SpatialAccess, VertexSnapper};

/// Snapped vertices, edges, faces and border sub-simplices of a component.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    vertices: Vec<Point3<f64>>,
    edges: Vec<[VertexId; 2]>,
    faces: Vec<[VertexId; 3]>,
    solids: usize,
    element_vertices: FxHashMap<ElementKey, SmallVec<[VertexId; 4]>>,
    border_vertices: Vec<VertexId>,
    border_edges: Vec<[VertexId; 2]>,
    border_faces: Vec<[VertexId; 3]>,
}

fn sorted_pair(a: VertexId, b: VertexId) -> [VertexId; 2] {
    if a <= b {
        [a, b]
    } else {
        [b, a]
    }
}

fn sorted_triple(a: VertexId, b: VertexId, c: VertexId) -> [VertexId; 3] {
    let mut t = [a, b, c];
    t.sort_unstable();
    t
}

impl Skeleton {
    pub(crate) fn build<S: NetSimplex, I: SpatialAccess>(component: &Component<S, I>) -> Self {
        let mut snapper = VertexSnapper::new(*component.epsilon());
        let mut edges: BTreeSet<[VertexId; 2]> = BTreeSet::new();
        let mut faces: BTreeSet<[VertexId; 3]> = BTreeSet::new();
        let mut border_vertices: BTreeSet<VertexId> = BTreeSet::new();
        let mut border_edges: BTreeSet<[VertexId; 2]> = BTreeSet::new();
        let mut border_faces: BTreeSet<[VertexId; 3]> = BTreeSet::new();
        let mut element_vertices = FxHashMap::default();

        for key in component.keys_by_id() {
            let Some(element) = component.element(key) else {
                continue;
            };
            let ids: SmallVec<[VertexId; 4]> = element
                .shape()
                .vertices()
                .iter()
                .map(|v| snapper.find_or_insert(*v))
                .collect();

            for [a, b] in S::EDGES {
                edges.insert(sorted_pair(ids[*a], ids[*b]));
            }
            for [a, b, c] in S::FACES {
                faces.insert(sorted_triple(ids[*a], ids[*b], ids[*c]));
            }

            for (slot, neighbour) in element.neighbours().iter().enumerate() {
                if neighbour.is_some() {
                    continue;
                }
                let facet: SmallVec<[VertexId; 3]> = S::FACETS[slot].iter().map(|&j| ids[j]).collect();
                border_vertices.extend(facet.iter().copied());
                match facet.as_slice() {
                    [_] => {}
                    [a, b] => {
                        border_edges.insert(sorted_pair(*a, *b));
                    }
                    [a, b, c] => {
                        border_faces.insert(sorted_triple(*a, *b, *c));
                        border_edges.insert(sorted_pair(*a, *b));
                        border_edges.insert(sorted_pair(*b, *c));
                        border_edges.insert(sorted_pair(*a, *c));
                    }
                    _ => {}
                }
            }
            element_vertices.insert(key, ids);
        }

        Self {
            vertices: snapper.into_points(),
            edges: edges.into_iter().collect(),
            faces: faces.into_iter().collect(),
            solids: if S::DIMENSION == 3 { component.len() } else { 0 },
            element_vertices,
            border_vertices: border_vertices.into_iter().collect(),
            border_edges: border_edges.into_iter().collect(),
            border_faces: border_faces.into_iter().collect(),
        }
    }

    /// Coordinates indexed by vertex id.
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Point3<f64>> {
        self.vertices.get(id.0 as usize)
    }

    /// Edges as sorted vertex id pairs, in ascending order.
    pub fn edges(&self) -> &[[VertexId; 2]] {
        &self.edges
    }

    /// Faces as sorted vertex id triples, in ascending order.
    pub fn faces(&self) -> &[[VertexId; 3]] {
        &self.faces
    }

    /// Vertex ids of an element, in the element's vertex order.
    pub fn element_vertices(&self, key: ElementKey) -> Option<&[VertexId]> {
        self.element_vertices.get(&key).map(|ids| ids.as_slice())
    }

    pub fn count_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn count_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn count_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn count_solids(&self) -> usize {
        self.solids
    }

    /// V - E + F. Solids are not counted.
    pub fn euler(&self) -> i64 {
        self.vertices.len() as i64 - self.edges.len() as i64 + self.faces.len() as i64
    }

    pub fn border_vertices(&self) -> &[VertexId] {
        &self.border_vertices
    }

    pub fn border_edges(&self) -> &[[VertexId; 2]] {
        &self.border_edges
    }

    pub fn border_faces(&self) -> &[[VertexId; 3]] {
        &self.border_faces
    }

    pub fn border_points(&self) -> Vec<Point3<f64>> {
        self.border_vertices
            .iter()
            .filter_map(|id| self.vertex(*id).copied())
            .collect()
    }
}

impl<S: NetSimplex, I: SpatialAccess> Component<S, I> {
    /// Runs the snapping pass and caches the result until the next
    /// mutation.
    pub fn build_vertices(&mut self) -> &Skeleton {
        let skeleton = self.snapshot.take().unwrap_or_else(|| Skeleton::build(self));
        tracing::trace!(
            kind = S::NAME,
            vertices = skeleton.count_vertices(),
            edges = skeleton.count_edges(),
            faces = skeleton.count_faces(),
            "Built component skeleton"
        );
        self.snapshot.insert(skeleton)
    }

    /// The cached skeleton if current, otherwise a freshly computed one.
    pub fn skeleton(&self) -> std::borrow::Cow<'_, Skeleton> {
        match &self.snapshot {
            Some(cached) => std::borrow::Cow::Borrowed(cached),
            None => std::borrow::Cow::Owned(Skeleton::build(self)),
        }
    }

    pub fn count_vertices(&self) -> usize {
        self.skeleton().count_vertices()
    }

    pub fn count_edges(&self) -> usize {
        self.skeleton().count_edges()
    }

    pub fn count_faces(&self) -> usize {
        self.skeleton().count_faces()
    }

    pub fn count_solids(&self) -> usize {
        if S::DIMENSION == 3 {
            self.len()
        } else {
            0
        }
    }

    pub fn euler(&self) -> i64 {
        self.skeleton().euler()
    }

    pub fn border_vertices(&self) -> Vec<Point3<f64>> {
        self.skeleton().border_points()
    }

    pub fn border_edges(&self) -> Vec<[Point3<f64>; 2]> {
        let skeleton = self.skeleton();
        skeleton
            .border_edges()
            .iter()
            .filter_map(|[a, b]| Some([*skeleton.vertex(*a)?, *skeleton.vertex(*b)?]))
            .collect()
    }

    pub fn border_faces(&self) -> Vec<[Point3<f64>; 3]> {
        let skeleton = self.skeleton();
        skeleton
            .border_faces()
            .iter()
            .filter_map(|[a, b, c]| Some([*skeleton.vertex(*a)?, *skeleton.vertex(*b)?, *skeleton.vertex(*c)?]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetConfig;
    use geonet_geometry::{Segment3D, Tetrahedron3D, Triangle3D};

    fn config() -> NetConfig {
        NetConfig::with_epsilon(1e-9)
    }

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    #[test]
    fn single_triangle() {
        let eps = config().geo_epsilon().unwrap();
        let t = Triangle3D::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), &eps).unwrap();
        let c: Component<Triangle3D> = Component::from_elements(&config(), vec![t]).unwrap();
        assert_eq!((c.count_vertices(), c.count_edges(), c.count_faces()), (3, 3, 1));
        assert_eq!(c.euler(), 1);
        assert_eq!(c.border_edges().len(), 3);
        assert!(c.border_faces().is_empty());
    }

    #[test]
    fn shared_edge_is_counted_once() {
        let eps = config().geo_epsilon().unwrap();
        let shapes = vec![
            Triangle3D::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), &eps).unwrap(),
            // Off by less than epsilon from the shared corners.
            Triangle3D::new(p(0.0, 0.0, 1e-10), p(1.0, 1.0, 0.0), p(0.0, 1.0, 0.0), &eps).unwrap(),
        ];
        let mut c: Component<Triangle3D> = Component::from_elements(&config(), shapes).unwrap();
        let skeleton = c.build_vertices();
        assert_eq!(skeleton.count_vertices(), 4);
        assert_eq!(skeleton.count_edges(), 5);
        assert_eq!(skeleton.border_edges().len(), 4);
        assert_eq!(skeleton.euler(), 1);
    }

    #[test]
    fn single_tetrahedron() {
        let eps = config().geo_epsilon().unwrap();
        let t = Tetrahedron3D::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 0.0, 1.0), &eps)
            .unwrap();
        let c: Component<Tetrahedron3D> = Component::from_elements(&config(), vec![t]).unwrap();
        assert_eq!((c.count_vertices(), c.count_edges(), c.count_faces()), (4, 6, 4));
        assert_eq!(c.count_solids(), 1);
        assert_eq!(c.euler(), 2);
        assert_eq!(c.border_faces().len(), 4);
    }

    #[test]
    fn segment_chain_border_is_its_ends() {
        let eps = config().geo_epsilon().unwrap();
        let shapes = vec![
            Segment3D::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), &eps).unwrap(),
            Segment3D::new(p(1.0, 0.0, 0.0), p(2.0, 0.0, 0.0), &eps).unwrap(),
        ];
        let c: Component<Segment3D> = Component::from_elements(&config(), shapes).unwrap();
        let mut ends = c.border_vertices();
        ends.sort_by(|a, b| a.x.total_cmp(&b.x));
        assert_eq!(ends, vec![p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0)]);
        assert_eq!(c.euler(), 1);
    }

    #[test]
    fn cache_is_dropped_on_mutation() {
        let eps = config().geo_epsilon().unwrap();
        let mut c: Component<Segment3D> = Component::new(&config()).unwrap();
        c.add_element(Segment3D::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), &eps).unwrap())
            .unwrap();
        c.build_vertices();
        assert!(matches!(c.skeleton(), std::borrow::Cow::Borrowed(_)));
        c.add_element(Segment3D::new(p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), &eps).unwrap())
            .unwrap();
        assert!(matches!(c.skeleton(), std::borrow::Cow::Owned(_)));
        assert_eq!(c.count_vertices(), 3);
    }
}
