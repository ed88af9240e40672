// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line segments.

use nalgebra::{Point3, Vector3};

use crate::epsilon::{same_point_sequence, same_point_set, Equivalentable, GeoEpsilon};
use crate::error::{Error, Result};
use crate::intersection::{snap, Intersection};
use crate::plane::Line3D;
use crate::simplex::Simplex;

/// A straight segment between two distinct points.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment3D {
    vertices: [Point3<f64>; 2],
}

impl Segment3D {
    /// Creates a segment. Fails if the endpoints coincide within `eps`.
    pub fn new(start: Point3<f64>, end: Point3<f64>, eps: &GeoEpsilon) -> Result<Self> {
        if eps.equal_points(&start, &end) {
            return Err(Error::degenerate("segment", "endpoints coincide"));
        }
        Ok(Self::from_points_unchecked(start, end))
    }

    /// Builds a segment without the degeneracy check. Used for sub-simplices of
    /// already validated shapes.
    pub(crate) fn from_points_unchecked(start: Point3<f64>, end: Point3<f64>) -> Self {
        Self {
            vertices: [start, end],
        }
    }

    pub fn start(&self) -> Point3<f64> {
        self.vertices[0]
    }

    pub fn end(&self) -> Point3<f64> {
        self.vertices[1]
    }

    pub fn vector(&self) -> Vector3<f64> {
        self.vertices[1] - self.vertices[0]
    }

    pub fn length(&self) -> f64 {
        self.vector().norm()
    }

    pub fn midpoint(&self) -> Point3<f64> {
        nalgebra::center(&self.vertices[0], &self.vertices[1])
    }

    /// Point at parameter `t` (0 = start, 1 = end).
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.vertices[0] + self.vector() * t
    }

    /// Parameter of the orthogonal projection of `p`, clamped to `[0, 1]`.
    pub fn parameter_of(&self, p: &Point3<f64>) -> f64 {
        let v = self.vector();
        let len_sq = v.norm_squared();
        if len_sq == 0.0 {
            return 0.0;
        }
        ((p - self.vertices[0]).dot(&v) / len_sq).clamp(0.0, 1.0)
    }

    pub fn closest_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.point_at(self.parameter_of(p))
    }

    /// Classifies the intersection with another segment.
    pub fn intersection(&self, other: &Segment3D, eps: &GeoEpsilon) -> Intersection {
        if !self.mbb().expanded(eps.value()).intersects(&other.mbb()) {
            return Intersection::Empty;
        }

        let anchors = [self.vertices[0], self.vertices[1], other.vertices[0], other.vertices[1]];
        let a = self.vertices[0];
        let d1 = self.vector();
        let len1 = d1.norm();
        let u = d1 / len1;

        let off_line = |p: &Point3<f64>| {
            let w = p - a;
            (w - u * w.dot(&u)).norm()
        };

        if off_line(&other.vertices[0]) <= eps.value() && off_line(&other.vertices[1]) <= eps.value() {
            // Collinear: overlap of the two parameter intervals along `u`.
            let tc = (other.vertices[0] - a).dot(&u);
            let td = (other.vertices[1] - a).dot(&u);
            let lo = tc.min(td).max(0.0);
            let hi = tc.max(td).min(len1);
            if lo > hi + eps.value() {
                return Intersection::Empty;
            }
            let p_lo = snap(a + u * lo, &anchors, eps);
            if hi - lo <= eps.value() {
                return Intersection::Point(p_lo);
            }
            let p_hi = snap(a + u * hi, &anchors, eps);
            return Intersection::Segment(Segment3D::from_points_unchecked(p_lo, p_hi));
        }

        let d2 = other.vector();
        if d1.cross(&d2).norm() <= 1e-12 * len1 * d2.norm() {
            // Parallel, not collinear.
            return Intersection::Empty;
        }

        let (p1, p2) = closest_points(a, d1, other.vertices[0], d2);
        if (p1 - p2).norm() <= eps.value() {
            Intersection::Point(snap(p1, &anchors, eps))
        } else {
            Intersection::Empty
        }
    }
}

/// Closest points between segments `p + s*d1` and `q + t*d2` (s, t in [0, 1]).
///
/// Both direction vectors must be non-zero.
pub(crate) fn closest_points(
    p: Point3<f64>,
    d1: Vector3<f64>,
    q: Point3<f64>,
    d2: Vector3<f64>,
) -> (Point3<f64>, Point3<f64>) {
    let r = p - q;
    let a = d1.dot(&d1);
    let e = d2.dot(&d2);
    let f = d2.dot(&r);
    let c = d1.dot(&r);
    let b = d1.dot(&d2);
    let denom = a * e - b * b;

    let mut s = if denom > 0.0 {
        ((b * f - c * e) / denom).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut t = (b * s + f) / e;
    if t < 0.0 {
        t = 0.0;
        s = (-c / a).clamp(0.0, 1.0);
    } else if t > 1.0 {
        t = 1.0;
        s = ((b - c) / a).clamp(0.0, 1.0);
    }

    (p + d1 * s, q + d2 * t)
}

impl Equivalentable for Segment3D {
    fn is_equal(&self, other: &Self, eps: &GeoEpsilon) -> bool {
        same_point_sequence(&self.vertices, &other.vertices, eps)
    }

    fn is_geometry_equivalent(&self, other: &Self, eps: &GeoEpsilon) -> bool {
        same_point_set(&self.vertices, &other.vertices, eps)
    }
}

impl Simplex for Segment3D {
    const NAME: &'static str = "segment";
    const DIMENSION: usize = 1;
    const FACETS: &'static [&'static [usize]] = &[&[0], &[1]];
    const EDGES: &'static [[usize; 2]] = &[[0, 1]];
    const FACES: &'static [[usize; 3]] = &[];
    const INVERSION: Option<[usize; 2]> = Some([0, 1]);

    fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    fn inverted(&self) -> Self {
        Self::from_points_unchecked(self.vertices[1], self.vertices[0])
    }

    fn contains_point(&self, p: &Point3<f64>, eps: &GeoEpsilon) -> bool {
        self.distance_to_point(p) <= eps.value()
    }

    fn distance_to_point(&self, p: &Point3<f64>) -> f64 {
        (p - self.closest_point(p)).norm()
    }

    fn intersects_line(&self, line: &Line3D, eps: &GeoEpsilon) -> bool {
        let u = line.direction;
        let perp = |v: Vector3<f64>| v - u * v.dot(&u);
        let pw = perp(self.vertices[0] - line.point);
        let pd = perp(self.vector());
        let denom = pd.norm_squared();
        let s = if denom > 0.0 {
            (-pw.dot(&pd) / denom).clamp(0.0, 1.0)
        } else {
            0.0
        };
        (pw + pd * s).norm() <= eps.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn eps() -> GeoEpsilon {
        GeoEpsilon::new(1e-9).unwrap()
    }

    fn seg(a: [f64; 3], b: [f64; 3]) -> Segment3D {
        Segment3D::new(Point3::from(a), Point3::from(b), &eps()).unwrap()
    }

    #[test]
    fn degenerate_segment_is_rejected() {
        let p = Point3::new(1.0, 1.0, 1.0);
        assert!(Segment3D::new(p, p, &eps()).is_err());
    }

    #[test]
    fn crossing_segments_meet_in_point() {
        let a = seg([0.0, 0.0, 0.0], [2.0, 2.0, 0.0]);
        let b = seg([0.0, 2.0, 0.0], [2.0, 0.0, 0.0]);
        match a.intersection(&b, &eps()) {
            Intersection::Point(p) => {
                assert_relative_eq!(p.x, 1.0, epsilon = 1e-12);
                assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
            }
            other => panic!("expected point, got {other:?}"),
        }
    }

    #[test]
    fn shared_endpoint_is_snapped() {
        let a = seg([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let b = seg([1.0, 0.0, 0.0], [1.0, 1.0, 0.0]);
        assert_eq!(
            a.intersection(&b, &eps()),
            Intersection::Point(Point3::new(1.0, 0.0, 0.0))
        );
    }

    #[test]
    fn collinear_overlap_is_segment() {
        let a = seg([0.0, 0.0, 0.0], [2.0, 0.0, 0.0]);
        let b = seg([1.0, 0.0, 0.0], [3.0, 0.0, 0.0]);
        match a.intersection(&b, &eps()) {
            Intersection::Segment(s) => assert_relative_eq!(s.length(), 1.0, epsilon = 1e-12),
            other => panic!("expected segment, got {other:?}"),
        }
        let c = seg([5.0, 0.0, 0.0], [6.0, 0.0, 0.0]);
        assert!(a.intersection(&c, &eps()).is_empty());
    }

    #[test]
    fn skew_segments_do_not_meet() {
        let a = seg([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let b = seg([0.5, -1.0, 1.0], [0.5, 1.0, 1.0]);
        assert!(a.intersection(&b, &eps()).is_empty());
    }

    #[test]
    fn equivalence_ignores_direction() {
        let a = seg([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let b = a.inverted();
        assert!(a.is_geometry_equivalent(&b, &eps()));
        assert!(!a.is_equal(&b, &eps()));
    }

    #[test]
    fn line_query() {
        let a = seg([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let hit = Line3D::through(&Point3::new(0.5, -1.0, 0.0), &Point3::new(0.5, 1.0, 0.0)).unwrap();
        let miss = Line3D::through(&Point3::new(3.0, -1.0, 0.0), &Point3::new(3.0, 1.0, 0.0)).unwrap();
        assert!(a.intersects_line(&hit, &eps()));
        assert!(!a.intersects_line(&miss, &eps()));
    }
}
