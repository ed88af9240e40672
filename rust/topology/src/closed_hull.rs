// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed triangle surfaces: volume and point containment.
//!
//! A hull is closed when every triangle has all three neighbours. Volume and
//! containment need a closed, consistently oriented surface; they orient the
//! hull first if needed and fail with `NotClosed` on an open one.
//!
//! ## Containment
//!
//! 1. Points outside the hull box are outside.
//! 2. Points on a triangle are on the border.
//! 3. Otherwise an axis-parallel ray is cast toward the nearest box side and
//!    the closest hit decides: leaving through an outward normal means the
//!    point was inside.
//! 4. A hit on a triangle edge or a ray lying in a triangle plane is
//!    ambiguous. The test then looks for a triangle whose centroid is in
//!    unobstructed line of sight and applies the normal test to it.

use geonet_geometry::{
    GeoEpsilon, Intersection, Mbb3D, Point3, Segment3D, Simplex, Tetrahedron3D, Triangle3D, Vector3,
};
use rustc_hash::FxHashSet;

use crate::component::Component;
use crate::config::NetConfig;
use crate::error::{Error, Result};
use crate::keys::ElementKey;
use crate::net::Net;
use crate::spatial::{GridIndex, SpatialAccess};

/// Where a point lies relative to a closed hull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Outside,
    Border,
    Inside,
}

/// A triangle component that may enclose a volume.
#[derive(Debug)]
pub struct ClosedHullComponent<I: SpatialAccess = GridIndex> {
    inner: Component<Triangle3D, I>,
    closed: bool,
    /// Set once a closed hull has been oriented with outward normals.
    outward: bool,
}

fn is_closed_surface<I: SpatialAccess>(component: &Component<Triangle3D, I>) -> bool {
    !component.is_empty() && component.elements().all(|(_, e)| e.neighbour_count() == 3)
}

impl<I: SpatialAccess> ClosedHullComponent<I> {
    pub fn from_elements(config: &NetConfig, shapes: Vec<Triangle3D>) -> Result<Self> {
        Ok(Self::from_component(Component::from_elements(config, shapes)?))
    }

    pub fn from_component(inner: Component<Triangle3D, I>) -> Self {
        let closed = is_closed_surface(&inner);
        Self {
            inner,
            closed,
            outward: false,
        }
    }

    pub fn component(&self) -> &Component<Triangle3D, I> {
        &self.inner
    }

    pub fn into_component(self) -> Component<Triangle3D, I> {
        self.inner
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn add_element(&mut self, shape: Triangle3D) -> Result<ElementKey> {
        let key = self.inner.add_element(shape)?;
        self.closed = is_closed_surface(&self.inner);
        self.outward = false;
        Ok(key)
    }

    pub fn remove_element(&mut self, shape: &Triangle3D) -> Result<Triangle3D> {
        let removed = self.inner.remove_element(shape)?;
        self.closed = false;
        self.outward = false;
        Ok(removed)
    }

    fn require_closed(&self) -> Result<()> {
        if self.closed {
            Ok(())
        } else {
            Err(Error::NotClosed)
        }
    }

    /// Orients neighbours consistently, then turns normals outward on a
    /// closed hull.
    pub fn make_orientation_consistent(&mut self) -> Result<()> {
        self.inner.make_orientation_consistent()?;
        if self.closed && self.signed_volume() < 0.0 {
            self.inner.invert_orientation()?;
            tracing::debug!(elements = self.inner.len(), "Hull normals turned outward");
        }
        self.outward = self.closed;
        Ok(())
    }

    fn ensure_oriented(&mut self) -> Result<()> {
        self.require_closed()?;
        if !self.outward || !self.inner.is_oriented() {
            self.make_orientation_consistent()?;
        }
        Ok(())
    }

    /// Sum of the signed tetrahedron volumes spanned by each triangle and
    /// the box centre. Positive for outward normals.
    pub fn signed_volume(&self) -> f64 {
        let Some(mbb) = self.inner.mbb() else {
            return 0.0;
        };
        let r = mbb.center();
        self.inner
            .elements()
            .map(|(_, e)| {
                let v = e.shape().vertices();
                (v[0] - r).dot(&(v[1] - r).cross(&(v[2] - r)))
            })
            .sum::<f64>()
            / 6.0
    }

    /// Enclosed volume.
    pub fn volume(&mut self) -> Result<f64> {
        self.ensure_oriented()?;
        Ok(self.signed_volume())
    }

    pub fn contains_inside(&mut self, p: &Point3<f64>) -> Result<bool> {
        Ok(self.locate(p)? != Location::Outside)
    }

    pub fn contains_strict_inside(&mut self, p: &Point3<f64>) -> Result<bool> {
        Ok(self.locate(p)? == Location::Inside)
    }

    /// Classifies `p` against the hull.
    pub fn locate(&mut self, p: &Point3<f64>) -> Result<Location> {
        self.ensure_oriented()?;
        let eps = *self.inner.epsilon();
        let Some(mbb) = self.inner.mbb() else {
            return Ok(Location::Outside);
        };
        if !mbb.contains_point(p, &eps) {
            return Ok(Location::Outside);
        }
        if !self.inner.elements_containing(p).is_empty() {
            return Ok(Location::Border);
        }

        let (direction, reach) = nearest_side(&mbb, p);
        let end = p + direction * (reach + mbb.diagonal() * 0.01 + eps.value() * 10.0);
        let ray = Segment3D::new(*p, end, &eps)?;

        let mut closest: Option<(f64, ElementKey, bool)> = None;
        for key in self.inner.candidates(&Mbb3D::new(*p, end)) {
            let Some(element) = self.inner.element(key) else {
                continue;
            };
            let tri = element.shape();
            let hit = match tri.intersection_segment(&ray, &eps) {
                Intersection::Point(q) => Some(((q - p).norm(), tri.on_border(&q, &eps))),
                Intersection::Segment(s) => Some(((s.start() - p).norm().min((s.end() - p).norm()), true)),
                Intersection::Empty => None,
                Intersection::Polygon(_) | Intersection::Volume => None,
            };
            if let Some((distance, degenerate)) = hit {
                if closest.map_or(true, |(best, _, _)| distance < best) {
                    closest = Some((distance, key, degenerate));
                }
            }
        }

        let Some((_, key, degenerate)) = closest else {
            return Ok(Location::Outside);
        };
        if !degenerate {
            let normal = self.inner.element_ref(key)?.shape().normal();
            return Ok(inside_if(direction.dot(&normal), &eps));
        }
        tracing::trace!(x = p.x, y = p.y, z = p.z, "Ambiguous ray hit, using line of sight");
        self.line_of_sight(p, key, &eps)
    }

    /// Finds a triangle whose centroid is visible from `p`, starting with
    /// `first`, and applies the normal test to it.
    fn line_of_sight(&self, p: &Point3<f64>, first: ElementKey, eps: &GeoEpsilon) -> Result<Location> {
        let mut order: Vec<(f64, ElementKey)> = self
            .inner
            .elements()
            .filter(|(k, _)| *k != first)
            .map(|(k, e)| ((e.shape().centroid() - p).norm(), k))
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut visited: FxHashSet<ElementKey> = FxHashSet::default();
        for key in std::iter::once(first).chain(order.into_iter().map(|(_, k)| k)) {
            if !visited.insert(key) {
                continue;
            }
            let tri = self.inner.element_ref(key)?.shape();
            let target = tri.centroid();
            let Ok(sight) = Segment3D::new(*p, target, eps) else {
                continue;
            };
            let towards = sight.vector() / sight.length();
            let facing = towards.dot(&tri.normal());
            if eps.equal_zero(facing) {
                continue;
            }
            if self.is_obstructed(&sight, key, eps) {
                continue;
            }
            return Ok(inside_if(facing, eps));
        }
        Err(Error::Update("hull has no triangle in line of sight".into()))
    }

    fn is_obstructed(&self, sight: &Segment3D, target: ElementKey, eps: &GeoEpsilon) -> bool {
        self.inner
            .candidates(&sight.mbb().expanded(eps.value()))
            .into_iter()
            .filter(|k| *k != target)
            .any(|k| {
                self.inner
                    .element(k)
                    .is_some_and(|e| !e.shape().intersection_segment(sight, eps).is_empty())
            })
    }

    /// Whether every point of `segment` is inside or on the hull.
    pub fn contains_segment(&mut self, segment: &Segment3D) -> Result<bool> {
        self.ensure_oriented()?;
        let eps = *self.inner.epsilon();
        let mut params = vec![0.0, 1.0];
        for key in self.inner.candidates(&segment.mbb().expanded(eps.value())) {
            let Some(element) = self.inner.element(key) else {
                continue;
            };
            match element.shape().intersection_segment(segment, &eps) {
                Intersection::Point(q) => params.push(segment.parameter_of(&q)),
                Intersection::Segment(s) => {
                    params.push(segment.parameter_of(&s.start()));
                    params.push(segment.parameter_of(&s.end()));
                }
                Intersection::Empty | Intersection::Polygon(_) | Intersection::Volume => {}
            }
        }
        params.sort_by(f64::total_cmp);
        params.dedup_by(|a, b| (*a - *b).abs() * segment.length() <= eps.value());

        for t in &params {
            if !self.contains_inside(&segment.point_at(t.clamp(0.0, 1.0)))? {
                return Ok(false);
            }
        }
        for pair in params.windows(2) {
            let mid = segment.point_at(((pair[0] + pair[1]) * 0.5).clamp(0.0, 1.0));
            if !self.contains_inside(&mid)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether `triangle` lies inside or on the hull: its edges are
    /// contained and no hull edge pierces its interior.
    pub fn contains_triangle(&mut self, triangle: &Triangle3D) -> Result<bool> {
        for edge in triangle.edges() {
            if !self.contains_segment(&edge)? {
                return Ok(false);
            }
        }
        let eps = *self.inner.epsilon();
        for key in self.inner.candidates(&triangle.mbb().expanded(eps.value())) {
            let Some(element) = self.inner.element(key) else {
                continue;
            };
            for hull_edge in element.shape().edges() {
                if let Intersection::Point(q) = triangle.intersection_segment(&hull_edge, &eps) {
                    if !triangle.on_border(&q, &eps) && !hull_edge.has_vertex(&q, &eps) {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    /// Whether `tetrahedron` lies inside or on the hull.
    pub fn contains_tetrahedron(&mut self, tetrahedron: &Tetrahedron3D) -> Result<bool> {
        for face in tetrahedron.faces() {
            if !self.contains_triangle(&face)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Unit axis direction toward the nearest box side and the distance to it.
fn nearest_side(mbb: &Mbb3D, p: &Point3<f64>) -> (Vector3<f64>, f64) {
    let candidates = [
        (-Vector3::x(), p.x - mbb.min.x),
        (Vector3::x(), mbb.max.x - p.x),
        (-Vector3::y(), p.y - mbb.min.y),
        (Vector3::y(), mbb.max.y - p.y),
        (-Vector3::z(), p.z - mbb.min.z),
        (Vector3::z(), mbb.max.z - p.z),
    ];
    candidates
        .into_iter()
        .map(|(d, reach)| (d, reach.max(0.0)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or((Vector3::x(), 0.0))
}

/// A ray leaving through a triangle whose normal points along it started
/// inside.
fn inside_if(direction_dot_normal: f64, eps: &GeoEpsilon) -> Location {
    if direction_dot_normal > eps.value() {
        Location::Inside
    } else {
        Location::Outside
    }
}

// =============================================================================
// Hull nets
// =============================================================================

/// A set of disjoint hulls sharing one tolerance.
#[derive(Debug)]
pub struct ClosedHullNet<I: SpatialAccess = GridIndex> {
    config: NetConfig,
    hulls: Vec<ClosedHullComponent<I>>,
}

impl<I: SpatialAccess> ClosedHullNet<I> {
    pub fn new(config: &NetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: *config,
            hulls: Vec::new(),
        })
    }

    /// Builds the triangle topology and wraps each connected component.
    pub fn from_elements(config: &NetConfig, shapes: Vec<Triangle3D>) -> Result<Self> {
        Ok(Self::from_net(Net::from_elements(config, shapes)?))
    }

    pub fn from_net(net: Net<Triangle3D, I>) -> Self {
        let config = *net.config();
        let hulls = net
            .into_components()
            .into_iter()
            .map(ClosedHullComponent::from_component)
            .collect();
        Self { config, hulls }
    }

    pub fn hulls(&self) -> &[ClosedHullComponent<I>] {
        &self.hulls
    }

    pub fn hull_mut(&mut self, id: usize) -> Option<&mut ClosedHullComponent<I>> {
        self.hulls.get_mut(id)
    }

    pub fn add_hull(&mut self, hull: ClosedHullComponent<I>) -> Result<usize> {
        let (net, component) = (self.config.epsilon, hull.component().epsilon().value());
        if net != component {
            return Err(Error::EpsilonMismatch { net, component });
        }
        self.hulls.push(hull);
        Ok(self.hulls.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.hulls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hulls.is_empty()
    }

    /// True iff every hull is closed.
    pub fn is_closed(&self) -> bool {
        self.hulls.iter().all(ClosedHullComponent::is_closed)
    }

    pub fn count_elements(&self) -> usize {
        self.hulls.iter().map(|h| h.component().len()).sum()
    }

    pub fn mbb(&self) -> Option<Mbb3D> {
        self.hulls
            .iter()
            .filter_map(|h| h.component().mbb())
            .reduce(|a, b| a.union(&b))
    }

    fn require_closed(&self) -> Result<()> {
        if self.is_closed() {
            Ok(())
        } else {
            Err(Error::NotClosed)
        }
    }

    pub fn make_orientation_consistent(&mut self) -> Result<()> {
        for hull in &mut self.hulls {
            hull.make_orientation_consistent()?;
        }
        Ok(())
    }

    pub fn volume(&mut self) -> Result<f64> {
        self.require_closed()?;
        let mut total = 0.0;
        for hull in &mut self.hulls {
            total += hull.volume()?;
        }
        Ok(total)
    }

    pub fn contains_inside(&mut self, p: &Point3<f64>) -> Result<bool> {
        self.require_closed()?;
        for hull in &mut self.hulls {
            if hull.contains_inside(p)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn contains_strict_inside(&mut self, p: &Point3<f64>) -> Result<bool> {
        self.require_closed()?;
        for hull in &mut self.hulls {
            if hull.contains_strict_inside(p)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
