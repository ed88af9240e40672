// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # geonet Geometry
//!
//! Tolerance-aware 3D simplex primitives for the geonet topology kernel.
//!
//! Every comparison goes through an explicit [`GeoEpsilon`]; there is no
//! global tolerance. Intersections between primitives are classified into a
//! closed [`Intersection`] enum so that callers match every case.
//!
//! ```
//! use geonet_geometry::{GeoEpsilon, Intersection, Point3, Segment3D};
//!
//! let eps = GeoEpsilon::new(1e-9).unwrap();
//! let a = Segment3D::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), &eps).unwrap();
//! let b = Segment3D::new(Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0), &eps).unwrap();
//! assert_eq!(a.intersection(&b, &eps), Intersection::Point(Point3::new(1.0, 0.0, 0.0)));
//! ```

pub mod epsilon;
pub mod error;
pub mod intersection;
pub mod mbb;
pub mod plane;
pub mod segment;
pub mod simplex;
pub mod tetrahedron;
pub mod triangle;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};

pub use epsilon::{Equivalentable, GeoEpsilon};
pub use error::{Error, Result};
pub use intersection::Intersection;
pub use mbb::Mbb3D;
pub use plane::{Line3D, Plane3D};
pub use segment::Segment3D;
pub use simplex::Simplex;
pub use tetrahedron::Tetrahedron3D;
pub use triangle::Triangle3D;
