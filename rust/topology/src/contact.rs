// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-kind rules for how two elements may meet.
//!
//! A tagged [`Intersection`] says *what* two shapes share; [`NetSimplex`]
//! decides whether that is a legal contact inside a manifold net and which
//! facets get linked.

use geonet_geometry::{
    Equivalentable, GeoEpsilon, Intersection, Point3, Segment3D, Simplex, Tetrahedron3D, Triangle3D,
};

/// Classification of how a candidate element meets an existing one.
#[derive(Debug, Clone, PartialEq)]
pub enum Contact {
    /// No common point.
    Disjoint,
    /// Legal contact that does not glue the two elements (a shared corner,
    /// or a shared edge of tetrahedra).
    Touching,
    /// The elements share facet `local` of the candidate and facet `remote`
    /// of the existing element.
    Adjacent { local: usize, remote: usize },
    /// Illegal overlap.
    Overlap(String),
}

impl Contact {
    pub fn is_legal(&self) -> bool {
        !matches!(self, Contact::Overlap(_))
    }
}

/// Simplex kinds that can be linked into a net.
pub trait NetSimplex: Simplex {
    /// Classifies the contact of `self` (the candidate) with `existing`.
    ///
    /// Geometry-equivalent duplicates are detected by the caller before this
    /// is called.
    fn contact(&self, existing: &Self, eps: &GeoEpsilon) -> Contact;

    /// Whether `current` and `neighbour`, glued through slot `slot` of
    /// `current` and slot `neighbour_slot` of `neighbour`, are consistently
    /// oriented.
    fn orientation_agrees(
        current: &Self,
        slot: usize,
        neighbour: &Self,
        neighbour_slot: usize,
        eps: &GeoEpsilon,
    ) -> bool;

    /// Whether a traversal seed must be inverted to reach the canonical
    /// orientation.
    fn seed_needs_inversion(&self) -> bool {
        false
    }
}

fn vertex_index<S: Simplex>(shape: &S, p: &Point3<f64>, eps: &GeoEpsilon) -> Option<usize> {
    shape.vertices().iter().position(|v| eps.equal_points(v, p))
}

fn unexpected(intersection: &Intersection) -> Contact {
    Contact::Overlap(format!("unexpected {} intersection", intersection.type_name()))
}

impl NetSimplex for Point3<f64> {
    fn contact(&self, existing: &Self, eps: &GeoEpsilon) -> Contact {
        if eps.equal_points(self, existing) {
            Contact::Overlap("coincident points".into())
        } else {
            Contact::Disjoint
        }
    }

    fn orientation_agrees(_: &Self, _: usize, _: &Self, _: usize, _: &GeoEpsilon) -> bool {
        true
    }
}

impl NetSimplex for Segment3D {
    fn contact(&self, existing: &Self, eps: &GeoEpsilon) -> Contact {
        match self.intersection(existing, eps) {
            Intersection::Empty => Contact::Disjoint,
            Intersection::Point(p) => match (vertex_index(self, &p, eps), vertex_index(existing, &p, eps)) {
                (Some(local), Some(remote)) => Contact::Adjacent { local, remote },
                _ => Contact::Overlap("segments meet away from a shared endpoint".into()),
            },
            Intersection::Segment(_) => Contact::Overlap("collinear overlap".into()),
            other @ (Intersection::Polygon(_) | Intersection::Volume) => unexpected(&other),
        }
    }

    fn orientation_agrees(_: &Self, slot: usize, _: &Self, neighbour_slot: usize, _: &GeoEpsilon) -> bool {
        // End glued to start.
        slot != neighbour_slot
    }
}

impl NetSimplex for Triangle3D {
    fn contact(&self, existing: &Self, eps: &GeoEpsilon) -> Contact {
        match self.intersection(existing, eps) {
            Intersection::Empty => Contact::Disjoint,
            Intersection::Point(p) => {
                if self.has_vertex(&p, eps) && existing.has_vertex(&p, eps) {
                    Contact::Touching
                } else {
                    Contact::Overlap("point contact away from a shared corner".into())
                }
            }
            Intersection::Segment(s) => {
                let local = (0..3).find(|&i| self.edge(i).is_geometry_equivalent(&s, eps));
                let remote = (0..3).find(|&k| existing.edge(k).is_geometry_equivalent(&s, eps));
                match (local, remote) {
                    (Some(local), Some(remote)) => Contact::Adjacent { local, remote },
                    _ => Contact::Overlap("segment contact that is not a shared edge".into()),
                }
            }
            Intersection::Polygon(_) => Contact::Overlap("area overlap".into()),
            other @ Intersection::Volume => unexpected(&other),
        }
    }

    fn orientation_agrees(
        current: &Self,
        slot: usize,
        neighbour: &Self,
        neighbour_slot: usize,
        eps: &GeoEpsilon,
    ) -> bool {
        // The shared edge must be traversed in opposite directions.
        let mine = current.edge(slot);
        let theirs = neighbour.edge(neighbour_slot);
        eps.equal_points(&mine.start(), &theirs.end()) && eps.equal_points(&mine.end(), &theirs.start())
    }
}

impl NetSimplex for Tetrahedron3D {
    fn contact(&self, existing: &Self, eps: &GeoEpsilon) -> Contact {
        match self.intersection(existing, eps) {
            Intersection::Empty => Contact::Disjoint,
            Intersection::Point(p) => {
                if self.has_vertex(&p, eps) && existing.has_vertex(&p, eps) {
                    Contact::Touching
                } else {
                    Contact::Overlap("point contact away from a shared corner".into())
                }
            }
            Intersection::Segment(s) => {
                let is_edge = |t: &Tetrahedron3D| (0..6).any(|i| t.edge(i).is_geometry_equivalent(&s, eps));
                if is_edge(self) && is_edge(existing) {
                    Contact::Touching
                } else {
                    Contact::Overlap("segment contact that is not a shared edge".into())
                }
            }
            Intersection::Polygon(points) => {
                let face_of = |t: &Tetrahedron3D| {
                    (0..4).find(|&i| geonet_geometry::epsilon::same_point_set(&t.facet_points(i), &points, eps))
                };
                match (face_of(self), face_of(existing)) {
                    (Some(local), Some(remote)) if points.len() == 3 => Contact::Adjacent { local, remote },
                    _ => Contact::Overlap("face contact that is not a shared face".into()),
                }
            }
            Intersection::Volume => Contact::Overlap("volume overlap".into()),
        }
    }

    fn orientation_agrees(current: &Self, _: usize, neighbour: &Self, _: usize, _: &GeoEpsilon) -> bool {
        (current.signed_volume() > 0.0) == (neighbour.signed_volume() > 0.0)
    }

    fn seed_needs_inversion(&self) -> bool {
        self.signed_volume() < 0.0
    }
}
