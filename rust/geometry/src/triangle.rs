// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangles and their intersection classification.
//!
//! Two non-coplanar triangles can only meet along the line where their planes
//! cross: each triangle is cut by the other's plane, and the two cuts are
//! intersected as intervals on that line. Coplanar triangles are handled by
//! clipping one against the inward half-planes of the other
//! (Sutherland–Hodgman), which yields the overlap polygon directly.

use nalgebra::{Point3, Vector3};

use crate::epsilon::{same_point_sequence, same_point_set, Equivalentable, GeoEpsilon};
use crate::error::{Error, Result};
use crate::intersection::{classify_convex, dedup_points, snap, Intersection};
use crate::plane::{Line3D, Plane3D};
use crate::segment::Segment3D;
use crate::simplex::Simplex;

/// A triangle with three non-collinear vertices.
///
/// Edge `i` joins vertices `i + 1` and `i + 2` (mod 3) and therefore lies
/// opposite vertex `i`. The normal follows the right-hand rule over
/// `(v0, v1, v2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Triangle3D {
    vertices: [Point3<f64>; 3],
}

impl Triangle3D {
    /// Creates a triangle. Fails on coincident or collinear vertices.
    pub fn new(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>, eps: &GeoEpsilon) -> Result<Self> {
        if eps.equal_points(&a, &b) || eps.equal_points(&b, &c) || eps.equal_points(&c, &a) {
            return Err(Error::degenerate("triangle", "coincident vertices"));
        }
        let longest = (b - a).norm().max((c - b).norm()).max((a - c).norm());
        let height = (b - a).cross(&(c - a)).norm() / longest;
        if height <= eps.value() {
            return Err(Error::degenerate("triangle", "collinear vertices"));
        }
        Ok(Self::from_points_unchecked(a, b, c))
    }

    pub(crate) fn from_points_unchecked(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }

    pub fn vertex(&self, i: usize) -> Point3<f64> {
        self.vertices[i % 3]
    }

    /// Edge opposite vertex `i`, directed from vertex `i + 1` to `i + 2`.
    pub fn edge(&self, i: usize) -> Segment3D {
        Segment3D::from_points_unchecked(self.vertex(i + 1), self.vertex(i + 2))
    }

    pub fn edges(&self) -> [Segment3D; 3] {
        [self.edge(0), self.edge(1), self.edge(2)]
    }

    fn raw_normal(&self) -> Vector3<f64> {
        let [a, b, c] = self.vertices;
        (b - a).cross(&(c - a))
    }

    /// Unit normal.
    pub fn normal(&self) -> Vector3<f64> {
        let n = self.raw_normal();
        n / n.norm()
    }

    pub fn area(&self) -> f64 {
        self.raw_normal().norm() * 0.5
    }

    pub fn plane(&self) -> Plane3D {
        Plane3D {
            point: self.vertices[0],
            normal: self.normal(),
        }
    }

    /// In-plane unit vector perpendicular to edge `i`, pointing inside.
    fn inward(&self, i: usize, n: &Vector3<f64>) -> Vector3<f64> {
        let e = self.edge(i).vector();
        let v = n.cross(&e);
        v / v.norm()
    }

    /// Returns `true` if `p` lies within `eps` of an edge.
    pub fn on_border(&self, p: &Point3<f64>, eps: &GeoEpsilon) -> bool {
        self.edges().iter().any(|e| e.contains_point(p, eps))
    }

    /// Closest point on the triangle to `p` (Ericson, Real-Time Collision
    /// Detection, 5.1.5).
    pub fn closest_point(&self, p: &Point3<f64>) -> Point3<f64> {
        let [a, b, c] = self.vertices;
        let ab = b - a;
        let ac = c - a;
        let ap = p - a;
        let d1 = ab.dot(&ap);
        let d2 = ac.dot(&ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return a;
        }

        let bp = p - b;
        let d3 = ab.dot(&bp);
        let d4 = ac.dot(&bp);
        if d3 >= 0.0 && d4 <= d3 {
            return b;
        }

        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            return a + ab * (d1 / (d1 - d3));
        }

        let cp = p - c;
        let d5 = ab.dot(&cp);
        let d6 = ac.dot(&cp);
        if d6 >= 0.0 && d5 <= d6 {
            return c;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            return a + ac * (d2 / (d2 - d6));
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
        }

        let denom = 1.0 / (va + vb + vc);
        a + ab * (vb * denom) + ac * (vc * denom)
    }

    /// Points where the triangle meets `plane`: up to two, or the three
    /// vertices when the triangle lies in the plane.
    fn plane_section(&self, plane: &Plane3D, eps: &GeoEpsilon) -> Vec<Point3<f64>> {
        let e = eps.value();
        let d: Vec<f64> = self.vertices.iter().map(|v| plane.signed_distance(v)).collect();
        let mut pts = Vec::with_capacity(3);
        for i in 0..3 {
            if d[i].abs() <= e {
                pts.push(self.vertices[i]);
            }
        }
        for (i, j) in [(0, 1), (1, 2), (2, 0)] {
            if (d[i] > e && d[j] < -e) || (d[i] < -e && d[j] > e) {
                let t = d[i] / (d[i] - d[j]);
                pts.push(self.vertices[i] + (self.vertices[j] - self.vertices[i]) * t);
            }
        }
        dedup_points(&pts, eps)
    }

    /// Clips a polygon lying in this triangle's plane to the triangle.
    fn clip_coplanar(&self, subject: &[Point3<f64>], eps: &GeoEpsilon) -> Vec<Point3<f64>> {
        let e = eps.value();
        let n = self.normal();
        let mut output: Vec<Point3<f64>> = subject.to_vec();

        for i in 0..3 {
            if output.is_empty() {
                break;
            }
            let origin = self.vertex(i + 1);
            let inward = self.inward(i, &n);
            let dist = |p: &Point3<f64>| (p - origin).dot(&inward);
            let input = std::mem::take(&mut output);
            let len = input.len();
            for j in 0..len {
                let cur = input[j];
                let prev = input[(j + len - 1) % len];
                let (dc, dp) = (dist(&cur), dist(&prev));
                let crossing = || prev + (cur - prev) * (dp / (dp - dc));
                if dc >= -e {
                    if dp < -e {
                        output.push(crossing());
                    }
                    output.push(cur);
                } else if dp >= -e {
                    output.push(crossing());
                }
            }
        }
        output
    }

    /// Classifies the intersection with another triangle.
    pub fn intersection(&self, other: &Triangle3D, eps: &GeoEpsilon) -> Intersection {
        let e = eps.value();
        if !self.mbb().expanded(e).intersects(&other.mbb()) {
            return Intersection::Empty;
        }

        let anchors: Vec<Point3<f64>> = self.vertices.iter().chain(&other.vertices).copied().collect();
        let pa = self.plane();
        let pb = other.plane();
        let db: Vec<f64> = other.vertices.iter().map(|v| pa.signed_distance(v)).collect();
        let da: Vec<f64> = self.vertices.iter().map(|v| pb.signed_distance(v)).collect();

        if db.iter().all(|d| d.abs() <= e) || da.iter().all(|d| d.abs() <= e) {
            let clipped = self.clip_coplanar(&other.vertices, eps);
            let snapped: Vec<Point3<f64>> = clipped.into_iter().map(|p| snap(p, &anchors, eps)).collect();
            return classify_convex(&snapped, eps);
        }

        let one_side = |d: &[f64]| d.iter().all(|&x| x > e) || d.iter().all(|&x| x < -e);
        if one_side(&db) || one_side(&da) {
            return Intersection::Empty;
        }

        let sec_a = self.plane_section(&pb, eps);
        let sec_b = other.plane_section(&pa, eps);
        if sec_a.is_empty() || sec_b.is_empty() {
            return Intersection::Empty;
        }

        let dir = pa.normal.cross(&pb.normal);
        let dir_norm = dir.norm();
        if dir_norm < 1e-12 {
            return Intersection::Empty;
        }
        let dir = dir / dir_norm;

        let extent = |pts: &[Point3<f64>]| {
            let mut lo = (f64::INFINITY, pts[0]);
            let mut hi = (f64::NEG_INFINITY, pts[0]);
            for p in pts {
                let t = p.coords.dot(&dir);
                if t < lo.0 {
                    lo = (t, *p);
                }
                if t > hi.0 {
                    hi = (t, *p);
                }
            }
            (lo, hi)
        };
        let (lo_a, hi_a) = extent(&sec_a);
        let (lo_b, hi_b) = extent(&sec_b);
        let lo = if lo_a.0 >= lo_b.0 { lo_a } else { lo_b };
        let hi = if hi_a.0 <= hi_b.0 { hi_a } else { hi_b };

        if lo.0 > hi.0 + e {
            return Intersection::Empty;
        }
        let p_lo = snap(lo.1, &anchors, eps);
        if hi.0 - lo.0 <= e {
            return Intersection::Point(p_lo);
        }
        let p_hi = snap(hi.1, &anchors, eps);
        Intersection::Segment(Segment3D::from_points_unchecked(p_lo, p_hi))
    }

    /// Classifies the intersection with a segment.
    pub fn intersection_segment(&self, segment: &Segment3D, eps: &GeoEpsilon) -> Intersection {
        let e = eps.value();
        if !self.mbb().expanded(e).intersects(&segment.mbb()) {
            return Intersection::Empty;
        }

        let (a, b) = (segment.start(), segment.end());
        let anchors = [self.vertices[0], self.vertices[1], self.vertices[2], a, b];
        let plane = self.plane();
        let (da, db) = (plane.signed_distance(&a), plane.signed_distance(&b));

        if da.abs() <= e && db.abs() <= e {
            let clipped = self.clip_coplanar(&[a, b], eps);
            let snapped: Vec<Point3<f64>> = clipped.into_iter().map(|p| snap(p, &anchors, eps)).collect();
            return classify_convex(&snapped, eps);
        }
        if (da > e && db > e) || (da < -e && db < -e) {
            return Intersection::Empty;
        }

        let candidate = if da.abs() <= e {
            a
        } else if db.abs() <= e {
            b
        } else {
            a + (b - a) * (da / (da - db))
        };

        if self.contains_point(&candidate, eps) {
            Intersection::Point(snap(candidate, &anchors, eps))
        } else {
            Intersection::Empty
        }
    }
}

impl Equivalentable for Triangle3D {
    fn is_equal(&self, other: &Self, eps: &GeoEpsilon) -> bool {
        same_point_sequence(&self.vertices, &other.vertices, eps)
    }

    fn is_geometry_equivalent(&self, other: &Self, eps: &GeoEpsilon) -> bool {
        same_point_set(&self.vertices, &other.vertices, eps)
    }
}

impl Simplex for Triangle3D {
    const NAME: &'static str = "triangle";
    const DIMENSION: usize = 2;
    const FACETS: &'static [&'static [usize]] = &[&[1, 2], &[2, 0], &[0, 1]];
    const EDGES: &'static [[usize; 2]] = &[[1, 2], [2, 0], [0, 1]];
    const FACES: &'static [[usize; 3]] = &[[0, 1, 2]];
    const INVERSION: Option<[usize; 2]> = Some([1, 2]);

    fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    fn inverted(&self) -> Self {
        let [a, b, c] = self.vertices;
        Self::from_points_unchecked(a, c, b)
    }

    fn contains_point(&self, p: &Point3<f64>, eps: &GeoEpsilon) -> bool {
        let n = self.normal();
        if !eps.equal_zero((p - self.vertices[0]).dot(&n)) {
            return false;
        }
        (0..3).all(|i| (p - self.vertex(i + 1)).dot(&self.inward(i, &n)) >= -eps.value())
    }

    fn distance_to_point(&self, p: &Point3<f64>) -> f64 {
        (p - self.closest_point(p)).norm()
    }

    fn intersects_line(&self, line: &Line3D, eps: &GeoEpsilon) -> bool {
        let plane = self.plane();
        let denom = line.direction.dot(&plane.normal);
        if denom.abs() < 1e-12 {
            // Parallel: only a line lying in the plane can touch, and then it
            // must cross the border.
            return plane.contains_point(&line.point, eps)
                && self.edges().iter().any(|edge| edge.intersects_line(line, eps));
        }
        let t = -plane.signed_distance(&line.point) / denom;
        self.contains_point(&(line.point + line.direction * t), eps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn eps() -> GeoEpsilon {
        GeoEpsilon::new(1e-9).unwrap()
    }

    fn tri(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Triangle3D {
        Triangle3D::new(Point3::from(a), Point3::from(b), Point3::from(c), &eps()).unwrap()
    }

    #[test]
    fn degenerate_triangles_are_rejected() {
        let e = eps();
        let o = Point3::new(0.0, 0.0, 0.0);
        let x = Point3::new(1.0, 0.0, 0.0);
        assert!(Triangle3D::new(o, o, x, &e).is_err());
        assert!(Triangle3D::new(o, x, Point3::new(2.0, 0.0, 0.0), &e).is_err());
    }

    #[test]
    fn area_and_normal() {
        let t = tri([0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [0.0, 3.0, 0.0]);
        assert_relative_eq!(t.area(), 6.0);
        assert_relative_eq!(t.normal().z, 1.0);
        assert_relative_eq!(t.inverted().normal().z, -1.0);
    }

    #[test]
    fn edge_opposite_vertex() {
        let t = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let e0 = t.edge(0);
        assert_eq!(e0.start(), Point3::new(1.0, 0.0, 0.0));
        assert_eq!(e0.end(), Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn containment() {
        let t = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let e = eps();
        assert!(t.contains_point(&Point3::new(0.25, 0.25, 0.0), &e));
        assert!(t.contains_point(&Point3::new(0.5, 0.0, 0.0), &e));
        assert!(t.on_border(&Point3::new(0.5, 0.0, 0.0), &e));
        assert!(!t.on_border(&Point3::new(0.25, 0.25, 0.0), &e));
        assert!(!t.contains_point(&Point3::new(0.25, 0.25, 0.1), &e));
        assert!(!t.contains_point(&Point3::new(1.0, 1.0, 0.0), &e));
    }

    #[test]
    fn closest_point_regions() {
        let t = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert_eq!(t.closest_point(&Point3::new(-1.0, -1.0, 0.0)), Point3::new(0.0, 0.0, 0.0));
        let q = t.closest_point(&Point3::new(0.5, -2.0, 0.0));
        assert_relative_eq!(q.x, 0.5);
        assert_relative_eq!(q.y, 0.0);
        assert_relative_eq!(t.distance_to_point(&Point3::new(0.2, 0.2, 3.0)), 3.0);
    }

    #[test]
    fn coplanar_edge_neighbours_share_segment() {
        let a = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let b = tri([1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]);
        match a.intersection(&b, &eps()) {
            Intersection::Segment(s) => {
                let expected = Segment3D::from_points_unchecked(
                    Point3::new(1.0, 0.0, 0.0),
                    Point3::new(0.0, 1.0, 0.0),
                );
                assert!(s.is_geometry_equivalent(&expected, &eps()));
            }
            other => panic!("expected segment, got {other:?}"),
        }
    }

    #[test]
    fn coplanar_overlap_is_polygon() {
        let a = tri([0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]);
        let b = tri([0.5, 0.5, 0.0], [3.0, 0.5, 0.0], [0.5, 3.0, 0.0]);
        assert_eq!(a.intersection(&b, &eps()).type_name(), "polygon");
    }

    #[test]
    fn coplanar_corner_contact_is_point() {
        let a = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let b = tri([1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 1.0, 0.0]);
        assert_eq!(
            a.intersection(&b, &eps()),
            Intersection::Point(Point3::new(1.0, 0.0, 0.0))
        );
    }

    #[test]
    fn folded_neighbours_share_edge() {
        let a = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let b = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        match a.intersection(&b, &eps()) {
            Intersection::Segment(s) => assert_relative_eq!(s.length(), 1.0, epsilon = 1e-12),
            other => panic!("expected segment, got {other:?}"),
        }
    }

    #[test]
    fn piercing_triangles_cross_in_segment() {
        let a = tri([0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]);
        let b = tri([0.5, 0.5, -1.0], [0.5, 0.5, 1.0], [3.0, 3.0, 0.0]);
        assert_eq!(a.intersection(&b, &eps()).type_name(), "segment");
    }

    #[test]
    fn separated_triangles() {
        let a = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let b = tri([0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0]);
        assert!(a.intersection(&b, &eps()).is_empty());
    }

    #[test]
    fn segment_through_triangle() {
        let t = tri([0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]);
        let s = Segment3D::new(Point3::new(0.5, 0.5, -1.0), Point3::new(0.5, 0.5, 1.0), &eps()).unwrap();
        assert_eq!(
            t.intersection_segment(&s, &eps()),
            Intersection::Point(Point3::new(0.5, 0.5, 0.0))
        );

        let coplanar = Segment3D::new(Point3::new(-1.0, 0.5, 0.0), Point3::new(3.0, 0.5, 0.0), &eps()).unwrap();
        match t.intersection_segment(&coplanar, &eps()) {
            Intersection::Segment(piece) => assert_relative_eq!(piece.length(), 1.5, epsilon = 1e-9),
            other => panic!("expected segment, got {other:?}"),
        }
    }

    #[test]
    fn line_query() {
        let t = tri([0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]);
        let vertical = Line3D::through(&Point3::new(0.5, 0.5, 5.0), &Point3::new(0.5, 0.5, 4.0)).unwrap();
        let in_plane = Line3D::through(&Point3::new(-1.0, 0.5, 0.0), &Point3::new(1.0, 0.5, 0.0)).unwrap();
        let outside = Line3D::through(&Point3::new(3.0, 3.0, 5.0), &Point3::new(3.0, 3.0, 4.0)).unwrap();
        assert!(t.intersects_line(&vertical, &eps()));
        assert!(t.intersects_line(&in_plane, &eps()));
        assert!(!t.intersects_line(&outside, &eps()));
    }
}
