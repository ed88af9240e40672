// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The shape contract shared by points, segments, triangles and tetrahedra.
//!
//! A simplex of dimension `d` has `d + 1` vertices. Its *facets* are the
//! sub-simplices through which it can be glued to a neighbour: the vertices
//! of a segment, the edges of a triangle, the faces of a tetrahedron. Facet
//! `i` always excludes vertex `i` (or, for a segment, is vertex `i`), so the
//! neighbour slot matching a facet is also indexed by that vertex.

use nalgebra::Point3;
use smallvec::SmallVec;

use crate::epsilon::{same_point_set, Equivalentable, GeoEpsilon};
use crate::mbb::Mbb3D;
use crate::plane::{Line3D, Plane3D};

pub trait Simplex: Clone + std::fmt::Debug + Equivalentable {
    /// Human-readable kind name.
    const NAME: &'static str;

    /// Topological dimension (0 for points, 3 for tetrahedra).
    const DIMENSION: usize;

    /// Local vertex indices of each facet. The number of facets is the
    /// neighbour arity of elements of this kind.
    const FACETS: &'static [&'static [usize]];

    /// Local vertex index pairs of every edge.
    const EDGES: &'static [[usize; 2]];

    /// Local vertex index triples of every face.
    const FACES: &'static [[usize; 3]];

    /// The two vertices swapped by [`Simplex::inverted`]. Because facet `i`
    /// is tied to vertex `i`, the same pair of neighbour slots must be
    /// swapped to keep neighbour indices consistent.
    const INVERSION: Option<[usize; 2]>;

    fn vertices(&self) -> &[Point3<f64>];

    /// The same shape with reversed orientation.
    fn inverted(&self) -> Self;

    fn contains_point(&self, p: &Point3<f64>, eps: &GeoEpsilon) -> bool;

    fn distance_to_point(&self, p: &Point3<f64>) -> f64;

    fn intersects_line(&self, line: &Line3D, eps: &GeoEpsilon) -> bool;

    fn arity() -> usize {
        Self::FACETS.len()
    }

    fn mbb(&self) -> Mbb3D {
        let v = self.vertices();
        let mut mbb = Mbb3D::from_point(v[0]);
        for p in &v[1..] {
            mbb.extend(p);
        }
        mbb
    }

    fn centroid(&self) -> Point3<f64> {
        let v = self.vertices();
        let sum = v.iter().fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
        Point3::from(sum / v.len() as f64)
    }

    /// Points of facet `i`, in facet order.
    fn facet_points(&self, i: usize) -> SmallVec<[Point3<f64>; 3]> {
        let v = self.vertices();
        Self::FACETS[i].iter().map(|&j| v[j]).collect()
    }

    /// Returns `true` if facet `i` of `self` and facet `k` of `other` are
    /// geometrically the same, ignoring vertex order.
    fn facet_matches(&self, i: usize, other: &Self, k: usize, eps: &GeoEpsilon) -> bool {
        same_point_set(&self.facet_points(i), &other.facet_points(k), eps)
    }

    /// Returns `true` if some vertex of `self` equals `p`.
    fn has_vertex(&self, p: &Point3<f64>, eps: &GeoEpsilon) -> bool {
        self.vertices().iter().any(|v| eps.equal_points(v, p))
    }

    fn intersects_plane(&self, plane: &Plane3D, eps: &GeoEpsilon) -> bool {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for v in self.vertices() {
            let d = plane.signed_distance(v);
            lo = lo.min(d);
            hi = hi.max(d);
        }
        lo <= eps.value() && hi >= -eps.value()
    }
}

impl Simplex for Point3<f64> {
    const NAME: &'static str = "point";
    const DIMENSION: usize = 0;
    const FACETS: &'static [&'static [usize]] = &[];
    const EDGES: &'static [[usize; 2]] = &[];
    const FACES: &'static [[usize; 3]] = &[];
    const INVERSION: Option<[usize; 2]> = None;

    fn vertices(&self) -> &[Point3<f64>] {
        std::slice::from_ref(self)
    }

    fn inverted(&self) -> Self {
        *self
    }

    fn contains_point(&self, p: &Point3<f64>, eps: &GeoEpsilon) -> bool {
        eps.equal_points(self, p)
    }

    fn distance_to_point(&self, p: &Point3<f64>) -> f64 {
        (p - self).norm()
    }

    fn intersects_line(&self, line: &Line3D, eps: &GeoEpsilon) -> bool {
        line.distance_to_point(self) <= eps.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Segment3D;
    use crate::tetrahedron::Tetrahedron3D;
    use crate::triangle::Triangle3D;

    #[test]
    fn arities_follow_dimension() {
        assert_eq!(<Point3<f64> as Simplex>::arity(), 0);
        assert_eq!(Segment3D::arity(), 2);
        assert_eq!(Triangle3D::arity(), 3);
        assert_eq!(Tetrahedron3D::arity(), 4);
    }

    #[test]
    fn facet_excludes_its_vertex() {
        fn check<S: Simplex>() {
            if S::DIMENSION == 1 {
                return; // segment facets are the vertices themselves
            }
            for (i, facet) in S::FACETS.iter().enumerate() {
                assert!(!facet.contains(&i), "{} facet {i} contains vertex {i}", S::NAME);
                assert_eq!(facet.len(), S::DIMENSION);
            }
        }
        check::<Triangle3D>();
        check::<Tetrahedron3D>();
    }

    #[test]
    fn point_simplex() {
        let eps = GeoEpsilon::new(1e-9).unwrap();
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(p.vertices().len(), 1);
        assert_eq!(p.mbb().min, p);
        assert!(Simplex::contains_point(&p, &Point3::new(1.0, 2.0, 3.0), &eps));
    }
}
