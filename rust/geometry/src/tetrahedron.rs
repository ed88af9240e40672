// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tetrahedra.
//!
//! Face `i` is opposite vertex `i`. The face index tables are chosen so that
//! every face normal points outward when the signed volume is positive.

use nalgebra::{Matrix3, Point3, Vector3};

use crate::epsilon::{same_point_sequence, same_point_set, Equivalentable, GeoEpsilon};
use crate::error::{Error, Result};
use crate::intersection::{classify_convex, snap, Intersection};
use crate::plane::Line3D;
use crate::segment::Segment3D;
use crate::simplex::Simplex;
use crate::triangle::Triangle3D;

const FACE_TABLE: [[usize; 3]; 4] = [[1, 2, 3], [0, 3, 2], [0, 1, 3], [0, 2, 1]];
const EDGE_TABLE: [[usize; 2]; 6] = [[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]];

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tetrahedron3D {
    vertices: [Point3<f64>; 4],
}

impl Tetrahedron3D {
    /// Creates a tetrahedron. Fails if any vertex lies within `eps` of the
    /// plane of the opposite face.
    pub fn new(
        a: Point3<f64>,
        b: Point3<f64>,
        c: Point3<f64>,
        d: Point3<f64>,
        eps: &GeoEpsilon,
    ) -> Result<Self> {
        let t = Self { vertices: [a, b, c, d] };
        let six_volume = t.signed_volume().abs() * 6.0;
        for face in FACE_TABLE {
            let [p, q, r] = face.map(|j| t.vertices[j]);
            let double_area = (q - p).cross(&(r - p)).norm();
            if double_area <= eps.value() * eps.value() {
                return Err(Error::degenerate("tetrahedron", "collapsed face"));
            }
            if six_volume / double_area <= eps.value() {
                return Err(Error::degenerate("tetrahedron", "coplanar vertices"));
            }
        }
        Ok(t)
    }

    pub fn vertex(&self, i: usize) -> Point3<f64> {
        self.vertices[i]
    }

    /// Signed volume; positive when `(v1 - v0, v2 - v0, v3 - v0)` is a
    /// right-handed frame.
    pub fn signed_volume(&self) -> f64 {
        let [a, b, c, d] = self.vertices;
        Matrix3::from_columns(&[b - a, c - a, d - a]).determinant() / 6.0
    }

    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }

    /// Face opposite vertex `i`, wound outward for a positively oriented
    /// tetrahedron.
    pub fn face(&self, i: usize) -> Triangle3D {
        let [p, q, r] = FACE_TABLE[i].map(|j| self.vertices[j]);
        Triangle3D::from_points_unchecked(p, q, r)
    }

    /// Face `i` wound outward regardless of orientation.
    pub fn outward_face(&self, i: usize) -> Triangle3D {
        let face = self.face(i);
        if self.signed_volume() < 0.0 {
            face.inverted()
        } else {
            face
        }
    }

    pub fn faces(&self) -> [Triangle3D; 4] {
        [self.face(0), self.face(1), self.face(2), self.face(3)]
    }

    pub fn edge(&self, i: usize) -> Segment3D {
        let [p, q] = EDGE_TABLE[i];
        Segment3D::from_points_unchecked(self.vertices[p], self.vertices[q])
    }

    /// Signed distances of `p` to the four outward face planes; all are `<= 0`
    /// for interior points.
    fn face_distances(&self, p: &Point3<f64>) -> [f64; 4] {
        let sign = self.signed_volume().signum();
        let mut out = [0.0; 4];
        for (i, d) in out.iter_mut().enumerate() {
            let face = self.face(i);
            *d = sign * (p - face.vertex(0)).dot(&face.normal());
        }
        out
    }

    fn axis_overlap(&self, other: &Tetrahedron3D, axis: &Vector3<f64>) -> f64 {
        let project = |v: &[Point3<f64>; 4]| {
            v.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                let t = p.coords.dot(axis);
                (lo.min(t), hi.max(t))
            })
        };
        let (lo_a, hi_a) = project(&self.vertices);
        let (lo_b, hi_b) = project(&other.vertices);
        hi_a.min(hi_b) - lo_a.max(lo_b)
    }

    /// Classifies the intersection with another tetrahedron.
    ///
    /// Uses the separating-axis test over face normals and edge cross
    /// products: a clear gap on any axis means `Empty`, positive overlap on
    /// every axis means `Volume`. In the touching case the contact set is
    /// reconstructed from face-face intersections.
    pub fn intersection(&self, other: &Tetrahedron3D, eps: &GeoEpsilon) -> Intersection {
        let e = eps.value();
        if !self.mbb().expanded(e).intersects(&other.mbb()) {
            return Intersection::Empty;
        }

        let mut axes: Vec<Vector3<f64>> = Vec::with_capacity(44);
        for t in [self, other] {
            for face in t.faces() {
                axes.push(face.normal());
            }
        }
        for i in 0..6 {
            for j in 0..6 {
                let c = self.edge(i).vector().cross(&other.edge(j).vector());
                let norm = c.norm();
                if norm >= 1e-12 {
                    axes.push(c / norm);
                }
            }
        }

        let mut min_overlap = f64::INFINITY;
        for axis in &axes {
            let overlap = self.axis_overlap(other, axis);
            if overlap < -e {
                return Intersection::Empty;
            }
            min_overlap = min_overlap.min(overlap);
        }
        if min_overlap > e {
            return Intersection::Volume;
        }

        let mut pts: Vec<Point3<f64>> = Vec::new();
        for fa in self.faces() {
            for fb in other.faces() {
                match fa.intersection(&fb, eps) {
                    Intersection::Point(p) => pts.push(p),
                    Intersection::Segment(s) => pts.extend([s.start(), s.end()]),
                    Intersection::Polygon(poly) => pts.extend(poly),
                    Intersection::Empty | Intersection::Volume => {}
                }
            }
        }
        let anchors: Vec<Point3<f64>> = self.vertices.iter().chain(&other.vertices).copied().collect();
        let snapped: Vec<Point3<f64>> = pts.into_iter().map(|p| snap(p, &anchors, eps)).collect();
        classify_convex(&snapped, eps)
    }
}

impl Equivalentable for Tetrahedron3D {
    fn is_equal(&self, other: &Self, eps: &GeoEpsilon) -> bool {
        same_point_sequence(&self.vertices, &other.vertices, eps)
    }

    fn is_geometry_equivalent(&self, other: &Self, eps: &GeoEpsilon) -> bool {
        same_point_set(&self.vertices, &other.vertices, eps)
    }
}

impl Simplex for Tetrahedron3D {
    const NAME: &'static str = "tetrahedron";
    const DIMENSION: usize = 3;
    const FACETS: &'static [&'static [usize]] = &[&[1, 2, 3], &[0, 3, 2], &[0, 1, 3], &[0, 2, 1]];
    const EDGES: &'static [[usize; 2]] = &EDGE_TABLE;
    const FACES: &'static [[usize; 3]] = &FACE_TABLE;
    const INVERSION: Option<[usize; 2]> = Some([2, 3]);

    fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    fn inverted(&self) -> Self {
        let [a, b, c, d] = self.vertices;
        Self { vertices: [a, b, d, c] }
    }

    fn contains_point(&self, p: &Point3<f64>, eps: &GeoEpsilon) -> bool {
        self.face_distances(p).iter().all(|&d| d <= eps.value())
    }

    fn distance_to_point(&self, p: &Point3<f64>) -> f64 {
        if self.face_distances(p).iter().all(|&d| d <= 0.0) {
            return 0.0;
        }
        self.faces()
            .iter()
            .map(|f| f.distance_to_point(p))
            .fold(f64::INFINITY, f64::min)
    }

    fn intersects_line(&self, line: &Line3D, eps: &GeoEpsilon) -> bool {
        // Clip the line parameter against the four outward half-spaces.
        let e = eps.value();
        let sign = self.signed_volume().signum();
        let mut lo = f64::NEG_INFINITY;
        let mut hi = f64::INFINITY;
        for face in self.faces() {
            let n = face.normal() * sign;
            let dist = (line.point - face.vertex(0)).dot(&n);
            let rate = line.direction.dot(&n);
            if rate.abs() < 1e-12 {
                if dist > e {
                    return false;
                }
                continue;
            }
            let t = (e - dist) / rate;
            if rate > 0.0 {
                hi = hi.min(t);
            } else {
                lo = lo.max(t);
            }
            if lo > hi {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn eps() -> GeoEpsilon {
        GeoEpsilon::new(1e-9).unwrap()
    }

    fn unit() -> Tetrahedron3D {
        Tetrahedron3D::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            &eps(),
        )
        .unwrap()
    }

    #[test]
    fn flat_tetrahedron_is_rejected() {
        let r = Tetrahedron3D::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            &eps(),
        );
        assert!(r.is_err());
    }

    #[test]
    fn volume_and_inversion() {
        let t = unit();
        assert_relative_eq!(t.signed_volume(), 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(t.inverted().signed_volume(), -1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(t.inverted().volume(), 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn faces_point_outward() {
        let t = unit();
        let c = t.centroid();
        for i in 0..4 {
            let f = t.face(i);
            assert!((c - f.vertex(0)).dot(&f.normal()) < 0.0, "face {i} points inward");
            let g = t.inverted().outward_face(i);
            let ci = t.inverted().centroid();
            assert!((ci - g.vertex(0)).dot(&g.normal()) < 0.0);
        }
    }

    #[test]
    fn containment_and_distance() {
        let t = unit();
        let e = eps();
        assert!(t.contains_point(&Point3::new(0.1, 0.1, 0.1), &e));
        assert!(t.contains_point(&Point3::new(0.0, 0.0, 0.0), &e));
        assert!(!t.contains_point(&Point3::new(1.0, 1.0, 1.0), &e));
        assert_relative_eq!(t.distance_to_point(&Point3::new(0.1, 0.1, 0.1)), 0.0);
        assert_relative_eq!(t.distance_to_point(&Point3::new(0.2, 0.2, -2.0)), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn shared_face_is_polygon() {
        let a = unit();
        let b = Tetrahedron3D::new(
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            &eps(),
        )
        .unwrap();
        match a.intersection(&b, &eps()) {
            Intersection::Polygon(pts) => assert_eq!(pts.len(), 3),
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn overlap_and_separation() {
        let a = unit();
        let shifted = Tetrahedron3D::new(
            Point3::new(0.1, 0.1, 0.1),
            Point3::new(1.1, 0.1, 0.1),
            Point3::new(0.1, 1.1, 0.1),
            Point3::new(0.1, 0.1, 1.1),
            &eps(),
        )
        .unwrap();
        assert_eq!(a.intersection(&shifted, &eps()), Intersection::Volume);

        let far = Tetrahedron3D::new(
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
            Point3::new(5.0, 1.0, 0.0),
            Point3::new(5.0, 0.0, 1.0),
            &eps(),
        )
        .unwrap();
        assert!(a.intersection(&far, &eps()).is_empty());
    }

    #[test]
    fn corner_contact_is_point() {
        let a = unit();
        let b = Tetrahedron3D::new(
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, -1.0),
            &eps(),
        )
        .unwrap();
        assert_eq!(
            a.intersection(&b, &eps()),
            Intersection::Point(Point3::new(1.0, 0.0, 0.0))
        );
    }

    #[test]
    fn line_query() {
        let t = unit();
        let through = Line3D::through(&Point3::new(0.2, 0.2, -1.0), &Point3::new(0.2, 0.2, 1.0)).unwrap();
        let beside = Line3D::through(&Point3::new(2.0, 2.0, -1.0), &Point3::new(2.0, 2.0, 1.0)).unwrap();
        assert!(t.intersects_line(&through, &eps()));
        assert!(!t.intersects_line(&beside, &eps()));
    }
}
