// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # geonet Topology
//!
//! Topological nets of 3D simplices: points, segment polylines, triangle
//! surfaces (TINs) and tetrahedral meshes.
//!
//! A [`Net`] is a list of connected [`Component`]s of one simplex kind. Each
//! component owns its [`Element`]s in a slot map, keeps them in a spatial
//! index, and records which elements share a facet through reciprocal
//! neighbour slots. Every mutation keeps the net manifold and every component
//! connected, or fails without changing anything.
//!
//! On top of triangle components, [`ClosedHullComponent`] computes enclosed
//! volume and point containment.
//!
//! ```
//! use geonet_geometry::{Point3, Segment3D};
//! use geonet_topology::{NetConfig, SegmentNet};
//!
//! let config = NetConfig::with_epsilon(1e-9);
//! let eps = config.geo_epsilon().unwrap();
//! let seg = |a: [f64; 3], b: [f64; 3]| Segment3D::new(Point3::from(a), Point3::from(b), &eps).unwrap();
//!
//! let mut net: SegmentNet = SegmentNet::new(&config).unwrap();
//! net.add_element(seg([0.0, 0.0, 0.0], [1.0, 0.0, 0.0])).unwrap();
//! net.add_element(seg([3.0, 0.0, 0.0], [2.0, 0.0, 0.0])).unwrap();
//! assert_eq!(net.len(), 2);
//!
//! // Linking both ends merges the two components.
//! net.add_element(seg([1.0, 0.0, 0.0], [2.0, 0.0, 0.0])).unwrap();
//! assert_eq!(net.len(), 1);
//! assert_eq!(net.euler(), 1);
//! ```

pub mod closed_hull;
pub mod component;
pub mod config;
pub mod contact;
pub mod element;
pub mod error;
pub mod keys;
pub mod net;
mod orientation;
mod query;
pub mod skeleton;
pub mod spatial;

use geonet_geometry::{Point3, Segment3D, Tetrahedron3D, Triangle3D};

pub use closed_hull::{ClosedHullComponent, ClosedHullNet, Location};
pub use component::{Component, PendingLink};
pub use config::NetConfig;
pub use contact::{Contact, NetSimplex};
pub use element::Element;
pub use error::{Error, ErrorKind, Result};
pub use keys::{ElementKey, ElementRef, VertexId};
pub use net::Net;
pub use skeleton::Skeleton;
pub use spatial::{GridIndex, LinearIndex, SpatialAccess, VertexSnapper};

pub type PointComponent<I = GridIndex> = Component<Point3<f64>, I>;
pub type SegmentComponent<I = GridIndex> = Component<Segment3D, I>;
pub type TriangleComponent<I = GridIndex> = Component<Triangle3D, I>;
pub type TetrahedronComponent<I = GridIndex> = Component<Tetrahedron3D, I>;

pub type PointNet<I = GridIndex> = Net<Point3<f64>, I>;
pub type SegmentNet<I = GridIndex> = Net<Segment3D, I>;
pub type TriangleNet<I = GridIndex> = Net<Triangle3D, I>;
pub type TetrahedronNet<I = GridIndex> = Net<Tetrahedron3D, I>;
