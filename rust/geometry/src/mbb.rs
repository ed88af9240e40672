// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned minimum bounding boxes.

use nalgebra::{Point3, Vector3};

use crate::epsilon::GeoEpsilon;
use crate::plane::Plane3D;

/// Axis-aligned minimum bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mbb3D {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Mbb3D {
    /// Creates a box from two corners (in any order).
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// A zero-volume box around a single point.
    pub fn from_point(p: Point3<f64>) -> Self {
        Self { min: p, max: p }
    }

    /// The smallest box enclosing all `points`, or `None` if empty.
    pub fn from_points(points: &[Point3<f64>]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut mbb = Self::from_point(*first);
        for p in rest {
            mbb.extend(p);
        }
        Some(mbb)
    }

    /// Grows the box to include `p`.
    pub fn extend(&mut self, p: &Point3<f64>) {
        self.min = Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn union(&self, other: &Mbb3D) -> Mbb3D {
        let mut out = *self;
        out.extend(&other.min);
        out.extend(&other.max);
        out
    }

    /// Returns a copy grown by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> Mbb3D {
        let m = Vector3::new(margin, margin, margin);
        Mbb3D {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Closed-interval overlap test (touching boxes intersect).
    pub fn intersects(&self, other: &Mbb3D) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn contains_point(&self, p: &Point3<f64>, eps: &GeoEpsilon) -> bool {
        let e = eps.value();
        p.x >= self.min.x - e
            && p.x <= self.max.x + e
            && p.y >= self.min.y - e
            && p.y <= self.max.y + e
            && p.z >= self.min.z - e
            && p.z <= self.max.z + e
    }

    /// Returns `true` if this box lies within `other` (up to tolerance).
    pub fn inside(&self, other: &Mbb3D, eps: &GeoEpsilon) -> bool {
        other.contains_point(&self.min, eps) && other.contains_point(&self.max, eps)
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn diagonal(&self) -> f64 {
        (self.max - self.min).norm()
    }

    /// Euclidean distance from `p` to the box (0 inside).
    pub fn distance_to_point(&self, p: &Point3<f64>) -> f64 {
        let dx = (self.min.x - p.x).max(0.0).max(p.x - self.max.x);
        let dy = (self.min.y - p.y).max(0.0).max(p.y - self.max.y);
        let dz = (self.min.z - p.z).max(0.0).max(p.z - self.max.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// The eight corner points.
    pub fn corners(&self) -> [Point3<f64>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(b.x, b.y, b.z),
            Point3::new(a.x, b.y, b.z),
        ]
    }

    /// Returns `true` if the plane passes through the box.
    pub fn intersects_plane(&self, plane: &Plane3D, eps: &GeoEpsilon) -> bool {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for c in self.corners() {
            let d = plane.signed_distance(&c);
            lo = lo.min(d);
            hi = hi.max(d);
        }
        lo <= eps.value() && hi >= -eps.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn union_and_intersection() {
        let a = Mbb3D::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = Mbb3D::new(Point3::new(2.0, 2.0, 2.0), Point3::new(1.0, 1.0, 1.0));
        let c = Mbb3D::new(Point3::new(3.0, 3.0, 3.0), Point3::new(4.0, 4.0, 4.0));

        assert!(a.intersects(&b)); // touching corner
        assert!(!a.intersects(&c));

        let u = a.union(&c);
        assert_eq!(u.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(u.max, Point3::new(4.0, 4.0, 4.0));
    }

    #[test]
    fn point_distance() {
        let eps = GeoEpsilon::new(1e-9).unwrap();
        let a = Mbb3D::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert!(a.contains_point(&Point3::new(0.5, 0.5, 1.0), &eps));
        assert_relative_eq!(a.distance_to_point(&Point3::new(0.5, 0.5, 0.5)), 0.0);
        assert_relative_eq!(a.distance_to_point(&Point3::new(4.0, 5.0, 1.0)), 5.0);
    }

    #[test]
    fn plane_through_box() {
        let eps = GeoEpsilon::new(1e-9).unwrap();
        let a = Mbb3D::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let through = Plane3D::new(Point3::new(0.5, 0.5, 0.5), Vector3::z()).unwrap();
        let above = Plane3D::new(Point3::new(0.0, 0.0, 3.0), Vector3::z()).unwrap();
        assert!(a.intersects_plane(&through, &eps));
        assert!(!a.intersects_plane(&above, &eps));
    }
}
