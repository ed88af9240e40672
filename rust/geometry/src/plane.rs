// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Infinite planes and lines used as query shapes.

use nalgebra::{Point3, Vector3};

use crate::epsilon::GeoEpsilon;
use crate::error::{Error, Result};

/// A plane through `point` with unit `normal`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Plane3D {
    pub point: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Plane3D {
    /// Creates a plane, normalizing `normal`.
    pub fn new(point: Point3<f64>, normal: Vector3<f64>) -> Result<Self> {
        let normal = normal.try_normalize(f64::EPSILON).ok_or(Error::ZeroLengthVector)?;
        Ok(Self { point, normal })
    }

    /// Plane through three points; the normal follows the right-hand rule.
    pub fn from_points(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Result<Self> {
        Self::new(*a, (b - a).cross(&(c - a)))
    }

    /// Signed distance from `p` (positive on the normal side).
    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        (p - self.point).dot(&self.normal)
    }

    pub fn contains_point(&self, p: &Point3<f64>, eps: &GeoEpsilon) -> bool {
        eps.equal_zero(self.signed_distance(p))
    }
}

/// An infinite line through `point` along unit `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Line3D {
    pub point: Point3<f64>,
    pub direction: Vector3<f64>,
}

impl Line3D {
    pub fn new(point: Point3<f64>, direction: Vector3<f64>) -> Result<Self> {
        let direction = direction
            .try_normalize(f64::EPSILON)
            .ok_or(Error::ZeroLengthVector)?;
        Ok(Self { point, direction })
    }

    /// The line through two distinct points.
    pub fn through(a: &Point3<f64>, b: &Point3<f64>) -> Result<Self> {
        Self::new(*a, b - a)
    }

    /// Perpendicular foot of `p` on the line.
    pub fn project(&self, p: &Point3<f64>) -> Point3<f64> {
        self.point + self.direction * (p - self.point).dot(&self.direction)
    }

    pub fn distance_to_point(&self, p: &Point3<f64>) -> f64 {
        (p - self.project(p)).norm()
    }
}
