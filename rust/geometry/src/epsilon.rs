// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tolerance-based comparison of scalars, points and vectors.
//!
//! Every geometric predicate in this crate takes a [`GeoEpsilon`] explicitly.
//! Two coordinates are equal when they differ by at most the epsilon value;
//! exact floating-point equality is never used for geometry.

use nalgebra::{Point3, Vector3};

use crate::error::{Error, Result};

/// A validated tolerance value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoEpsilon {
    value: f64,
}

impl GeoEpsilon {
    /// Creates a tolerance. The value must be finite and strictly positive.
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::InvalidEpsilon(value));
        }
        Ok(Self { value })
    }

    /// Returns the raw tolerance value.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn equal(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.value
    }

    pub fn equal_zero(&self, a: f64) -> bool {
        a.abs() <= self.value
    }

    /// `a < b` by more than the tolerance.
    pub fn less(&self, a: f64, b: f64) -> bool {
        a < b - self.value
    }

    /// `a > b` by more than the tolerance.
    pub fn greater(&self, a: f64, b: f64) -> bool {
        a > b + self.value
    }

    /// Per-coordinate equality of two points.
    pub fn equal_points(&self, a: &Point3<f64>, b: &Point3<f64>) -> bool {
        self.equal(a.x, b.x) && self.equal(a.y, b.y) && self.equal(a.z, b.z)
    }

    /// Per-component equality of two vectors.
    pub fn equal_vectors(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
        self.equal(a.x, b.x) && self.equal(a.y, b.y) && self.equal(a.z, b.z)
    }
}

/// Two notions of equality for geometric values.
///
/// `is_equal` compares vertices position by position: a triangle `(a, b, c)`
/// is equal only to a triangle whose first vertex matches `a`, and so on.
/// `is_geometry_equivalent` ignores vertex order, so `(a, b, c)` and
/// `(c, a, b)` or the inverted `(a, c, b)` describe the same shape.
pub trait Equivalentable {
    fn is_equal(&self, other: &Self, eps: &GeoEpsilon) -> bool;

    fn is_geometry_equivalent(&self, other: &Self, eps: &GeoEpsilon) -> bool;
}

impl Equivalentable for Point3<f64> {
    fn is_equal(&self, other: &Self, eps: &GeoEpsilon) -> bool {
        eps.equal_points(self, other)
    }

    fn is_geometry_equivalent(&self, other: &Self, eps: &GeoEpsilon) -> bool {
        eps.equal_points(self, other)
    }
}

/// Returns `true` if `a` and `b` hold the same points in the same order.
pub fn same_point_sequence(a: &[Point3<f64>], b: &[Point3<f64>], eps: &GeoEpsilon) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(p, q)| eps.equal_points(p, q))
}

/// Returns `true` if `a` and `b` hold the same points in any order.
///
/// Both slices are expected to contain pairwise distinct points (the vertices
/// of a non-degenerate simplex), so a one-sided match per point suffices.
pub fn same_point_set(a: &[Point3<f64>], b: &[Point3<f64>], eps: &GeoEpsilon) -> bool {
    a.len() == b.len()
        && a.iter().all(|p| b.iter().any(|q| eps.equal_points(p, q)))
        && b.iter().all(|q| a.iter().any(|p| eps.equal_points(p, q)))
}
