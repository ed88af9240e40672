// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tagged intersection results.
//!
//! Every intersection routine returns an [`Intersection`] describing the
//! geometric type of the common point set. The intersection of two convex
//! primitives is itself convex, so a single variant always describes it
//! completely.

use nalgebra::Point3;

use crate::epsilon::GeoEpsilon;
use crate::segment::Segment3D;

/// The geometric type of the point set shared by two primitives.
#[derive(Debug, Clone, PartialEq)]
pub enum Intersection {
    /// The primitives do not meet.
    Empty,
    /// They meet in a single point.
    Point(Point3<f64>),
    /// They meet along a segment.
    Segment(Segment3D),
    /// They meet in a planar region with non-zero area; the points are the
    /// distinct corners of that region.
    Polygon(Vec<Point3<f64>>),
    /// Their interiors overlap.
    Volume,
}

impl Intersection {
    pub fn is_empty(&self) -> bool {
        matches!(self, Intersection::Empty)
    }

    /// Name of the geometric type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Intersection::Empty => "empty",
            Intersection::Point(_) => "point",
            Intersection::Segment(_) => "segment",
            Intersection::Polygon(_) => "polygon",
            Intersection::Volume => "volume",
        }
    }
}

/// Removes points that are epsilon-equal to an earlier point, keeping order.
pub(crate) fn dedup_points(points: &[Point3<f64>], eps: &GeoEpsilon) -> Vec<Point3<f64>> {
    let mut out: Vec<Point3<f64>> = Vec::with_capacity(points.len());
    for p in points {
        if !out.iter().any(|q| eps.equal_points(p, q)) {
            out.push(*p);
        }
    }
    out
}

/// Replaces `p` by the first of `anchors` it is epsilon-equal to.
///
/// Keeps computed intersection points bit-identical to input vertices when
/// they coincide, so that later vertex comparisons are exact.
pub(crate) fn snap(p: Point3<f64>, anchors: &[Point3<f64>], eps: &GeoEpsilon) -> Point3<f64> {
    anchors
        .iter()
        .find(|a| eps.equal_points(a, &p))
        .copied()
        .unwrap_or(p)
}

/// Classifies the corner points of a convex set by dimension.
pub(crate) fn classify_convex(points: &[Point3<f64>], eps: &GeoEpsilon) -> Intersection {
    let pts = dedup_points(points, eps);
    match pts.len() {
        0 => return Intersection::Empty,
        1 => return Intersection::Point(pts[0]),
        _ => {}
    }

    // Farthest pair spans the set; everything else must hug that line for a segment.
    let mut best = (0, 1, 0.0);
    for i in 0..pts.len() {
        for j in (i + 1)..pts.len() {
            let d = (pts[j] - pts[i]).norm_squared();
            if d > best.2 {
                best = (i, j, d);
            }
        }
    }
    let (a, b) = (pts[best.0], pts[best.1]);
    let axis = (b - a) / best.2.sqrt();
    let collinear = pts.iter().all(|p| {
        let v = p - a;
        (v - axis * v.dot(&axis)).norm() <= eps.value()
    });

    if collinear {
        Intersection::Segment(Segment3D::from_points_unchecked(a, b))
    } else {
        Intersection::Polygon(pts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_dimension() {
        let eps = GeoEpsilon::new(1e-9).unwrap();
        let o = Point3::new(0.0, 0.0, 0.0);
        let x = Point3::new(1.0, 0.0, 0.0);
        let mid = Point3::new(0.5, 0.0, 0.0);
        let y = Point3::new(0.0, 1.0, 0.0);

        assert_eq!(classify_convex(&[], &eps), Intersection::Empty);
        assert_eq!(classify_convex(&[o, o], &eps), Intersection::Point(o));
        match classify_convex(&[o, mid, x], &eps) {
            Intersection::Segment(s) => {
                assert!(eps.equal_points(&s.start(), &o));
                assert!(eps.equal_points(&s.end(), &x));
            }
            other => panic!("expected segment, got {other:?}"),
        }
        assert_eq!(classify_convex(&[o, x, y], &eps).type_name(), "polygon");
    }

    #[test]
    fn snap_prefers_anchor() {
        let eps = GeoEpsilon::new(1e-6).unwrap();
        let anchor = Point3::new(1.0, 2.0, 3.0);
        let near = Point3::new(1.0 + 1e-8, 2.0, 3.0);
        assert_eq!(snap(near, &[anchor], &eps), anchor);
        let far = Point3::new(5.0, 5.0, 5.0);
        assert_eq!(snap(far, &[anchor], &eps), far);
    }
}
