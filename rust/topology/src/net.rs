// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Nets: ordered collections of connected components of one kind.
//!
//! A net keeps every component connected. Inserting an element that links
//! to several components merges them; an element linking to none starts a
//! new component. Component ids are positions in the component list and
//! shift when a component is removed.

use geonet_geometry::{GeoEpsilon, Line3D, Mbb3D, Plane3D, Point3, Segment3D, Tetrahedron3D, Triangle3D};
use smallvec::SmallVec;

use crate::component::{Component, PendingLink};
use crate::config::NetConfig;
use crate::contact::NetSimplex;
use crate::element::Element;
use crate::error::{Error, Result};
use crate::keys::{ElementKey, ElementRef};
use crate::spatial::{GridIndex, SpatialAccess};

/// Connected components of one simplex kind sharing one tolerance.
#[derive(Debug)]
pub struct Net<S: NetSimplex, I: SpatialAccess = GridIndex> {
    config: NetConfig,
    eps: GeoEpsilon,
    components: Vec<Component<S, I>>,
}

impl<S: NetSimplex, I: SpatialAccess> Net<S, I> {
    pub fn new(config: &NetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: *config,
            eps: config.geo_epsilon()?,
            components: Vec::new(),
        })
    }

    /// Builds the topology of a batch and splits it into maximal connected
    /// components. Point nets keep all points in one component.
    pub fn from_elements(config: &NetConfig, shapes: Vec<S>) -> Result<Self> {
        let mut net = Self::new(config)?;
        if shapes.is_empty() {
            return Ok(net);
        }
        let whole = Component::<S, I>::from_elements(config, shapes)?;
        let groups = whole.connected_groups();
        if S::arity() == 0 || groups.len() <= 1 {
            net.components.push(whole);
        } else {
            for group in &groups {
                net.components.push(whole.extract(group)?);
            }
        }
        tracing::debug!(
            kind = S::NAME,
            elements = net.count_elements(),
            components = net.components.len(),
            "Built net"
        );
        Ok(net)
    }

    // =========================================================================
    // Components
    // =========================================================================

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    pub fn epsilon(&self) -> &GeoEpsilon {
        &self.eps
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[Component<S, I>] {
        &self.components
    }

    pub fn component(&self, id: usize) -> Option<&Component<S, I>> {
        self.components.get(id)
    }

    /// Mutable access to one component. Insertions made through it are not
    /// checked against the other components.
    pub fn component_mut(&mut self, id: usize) -> Option<&mut Component<S, I>> {
        self.components.get_mut(id)
    }

    pub fn into_components(self) -> Vec<Component<S, I>> {
        self.components
    }

    /// Appends a component and returns its id.
    pub fn add_component(&mut self, component: Component<S, I>) -> Result<usize> {
        if component.epsilon().value() != self.eps.value() {
            return Err(Error::EpsilonMismatch {
                net: self.eps.value(),
                component: component.epsilon().value(),
            });
        }
        if S::arity() > 0 && !component.is_connected() {
            return Err(Error::Config(format!(
                "{} component with {} elements is not connected",
                S::NAME,
                component.len()
            )));
        }
        self.components.push(component);
        Ok(self.components.len() - 1)
    }

    /// Removes a component. Later components move down by one id.
    pub fn remove_component(&mut self, id: usize) -> Result<Component<S, I>> {
        if id >= self.components.len() {
            return Err(Error::ComponentNotFound(id));
        }
        Ok(self.components.remove(id))
    }

    // =========================================================================
    // Elements
    // =========================================================================

    pub fn element(&self, at: ElementRef) -> Option<&Element<S>> {
        self.components.get(at.component)?.element(at.key)
    }

    pub fn find_element(&self, shape: &S) -> Option<ElementRef> {
        self.components
            .iter()
            .enumerate()
            .find_map(|(i, c)| c.find_equivalent(shape).map(|key| ElementRef::new(i, key)))
    }

    pub fn contains_element(&self, shape: &S) -> bool {
        self.find_element(shape).is_some()
    }

    /// Inserts `shape`, creating or merging components as needed.
    ///
    /// Every component near the shape is checked before anything changes,
    /// so a rejected insertion leaves the net untouched.
    pub fn add_element(&mut self, shape: S) -> Result<ElementRef> {
        if S::arity() == 0 {
            if self.components.is_empty() {
                self.components.push(Component::new(&self.config)?);
            }
            let key = self.components[0].add_element(shape)?;
            return Ok(ElementRef::new(0, key));
        }

        let query_box = shape.mbb().expanded(self.eps.value());
        let mut adjacent: Vec<(usize, Vec<PendingLink>)> = Vec::new();
        for (i, component) in self.components.iter().enumerate() {
            if !component.mbb().is_some_and(|m| m.expanded(self.eps.value()).intersects(&query_box)) {
                continue;
            }
            let pending = component.check_insertion(&shape)?;
            if !pending.is_empty() {
                adjacent.push((i, pending));
            }
        }

        let mut used: SmallVec<[usize; 4]> = SmallVec::new();
        for link in adjacent.iter().flat_map(|(_, links)| links) {
            if used.contains(&link.local) {
                return Err(Error::NonManifold(format!(
                    "facet {} of the new {} element meets two components",
                    link.local,
                    S::NAME
                )));
            }
            used.push(link.local);
        }

        match adjacent.len() {
            0 => {
                let mut component = Component::new(&self.config)?;
                let key = component.add_element(shape)?;
                self.components.push(component);
                Ok(ElementRef::new(self.components.len() - 1, key))
            }
            1 => {
                let (id, links) = &adjacent[0];
                let key = self.components[*id].commit_insertion(shape, links)?;
                Ok(ElementRef::new(*id, key))
            }
            _ => self.merge_and_insert(shape, adjacent),
        }
    }

    /// Folds every adjacent component into the one with the lowest id, then
    /// inserts `shape` with all pending links remapped.
    fn merge_and_insert(&mut self, shape: S, mut adjacent: Vec<(usize, Vec<PendingLink>)>) -> Result<ElementRef> {
        adjacent.sort_unstable_by_key(|(id, _)| *id);
        let (target, mut links) = adjacent.remove(0);
        let merged = adjacent.len();

        for (id, pending) in adjacent.into_iter().rev() {
            let other = self.components.remove(id);
            let remap = self.components[target].absorb(other)?;
            for mut link in pending {
                link.remote = remap
                    .get(&link.remote)
                    .copied()
                    .ok_or_else(|| Error::Update("pending link to an element that was not absorbed".into()))?;
                links.push(link);
            }
        }

        let component = &mut self.components[target];
        let key = component.commit_insertion(shape, &links)?;
        component.refresh_connectivity();
        tracing::debug!(
            kind = S::NAME,
            merged = merged + 1,
            elements = component.len(),
            components = self.components.len(),
            "Merged components through new element"
        );
        Ok(ElementRef::new(target, key))
    }

    /// Removes the element geometry-equivalent to `shape`. A component left
    /// empty is dropped.
    pub fn remove_element(&mut self, shape: &S) -> Result<S> {
        let at = self.find_element(shape).ok_or(Error::NotAMember { kind: S::NAME })?;
        let removed = self.components[at.component].remove_key(at.key)?;
        if self.components[at.component].is_empty() {
            self.components.remove(at.component);
            tracing::debug!(kind = S::NAME, component = at.component, "Dropped empty component");
        }
        Ok(removed)
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    /// Union of the component boxes.
    pub fn mbb(&self) -> Option<Mbb3D> {
        self.components
            .iter()
            .filter_map(Component::mbb)
            .reduce(|a, b| a.union(&b))
    }

    pub fn count_elements(&self) -> usize {
        self.components.iter().map(Component::len).sum()
    }

    pub fn count_vertices(&self) -> usize {
        self.components.iter().map(Component::count_vertices).sum()
    }

    pub fn count_edges(&self) -> usize {
        self.components.iter().map(Component::count_edges).sum()
    }

    pub fn count_faces(&self) -> usize {
        self.components.iter().map(Component::count_faces).sum()
    }

    pub fn count_solids(&self) -> usize {
        self.components.iter().map(Component::count_solids).sum()
    }

    /// Sum of the component Euler characteristics.
    pub fn euler(&self) -> i64 {
        self.components.iter().map(Component::euler).sum()
    }

    pub fn contains_point(&self, p: &Point3<f64>) -> bool {
        self.components.iter().any(|c| c.contains_point(p))
    }

    pub fn elements_containing(&self, p: &Point3<f64>) -> Vec<ElementRef> {
        self.collect_refs(|c| c.elements_containing(p))
    }

    pub fn intersects_mbb(&self, mbb: &Mbb3D) -> bool {
        self.components.iter().any(|c| c.intersects_mbb(mbb))
    }

    pub fn intersects_plane(&self, plane: &Plane3D) -> bool {
        self.components.iter().any(|c| c.intersects_plane(plane))
    }

    pub fn intersects_line(&self, line: &Line3D) -> bool {
        self.components.iter().any(|c| c.intersects_line(line))
    }

    pub fn elements_intersecting(&self, mbb: &Mbb3D) -> Vec<ElementRef> {
        self.collect_refs(|c| c.elements_intersecting(mbb))
    }

    /// The `k` elements closest to `p` across all components.
    pub fn nearest(&self, k: usize, p: &Point3<f64>) -> Vec<(ElementRef, f64)> {
        let mut hits: Vec<(ElementRef, f64)> = self
            .components
            .iter()
            .enumerate()
            .flat_map(|(i, c)| {
                c.nearest(k, p)
                    .into_iter()
                    .map(move |(key, d)| (ElementRef::new(i, key), d))
            })
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.truncate(k);
        hits
    }

    fn collect_refs(&self, query: impl Fn(&Component<S, I>) -> Vec<ElementKey>) -> Vec<ElementRef> {
        self.components
            .iter()
            .enumerate()
            .flat_map(|(i, c)| query(c).into_iter().map(move |key| ElementRef::new(i, key)))
            .collect()
    }

    /// Orients every component. Components are independent: one that cannot
    /// be oriented is left unchanged and its error returned, while the
    /// components before it keep their new orientation.
    pub fn make_orientation_consistent(&mut self) -> Result<()> {
        for component in &mut self.components {
            component.make_orientation_consistent()?;
        }
        Ok(())
    }

    pub fn invert_orientation(&mut self) -> Result<()> {
        for component in &mut self.components {
            component.invert_orientation()?;
        }
        Ok(())
    }

    /// Validates every component, and checks that each is connected and
    /// shares the net tolerance.
    pub fn validate(&self) -> Result<()> {
        for (i, component) in self.components.iter().enumerate() {
            component.validate()?;
            if component.epsilon().value() != self.eps.value() {
                return Err(Error::EpsilonMismatch {
                    net: self.eps.value(),
                    component: component.epsilon().value(),
                });
            }
            if S::arity() > 0 && !component.check_connectivity() {
                return Err(Error::Update(format!("component {i} is not connected")));
            }
        }
        Ok(())
    }
}

impl<I: SpatialAccess> Net<Segment3D, I> {
    pub fn length(&self) -> f64 {
        self.components.iter().map(Component::length).sum()
    }
}

impl<I: SpatialAccess> Net<Triangle3D, I> {
    pub fn area(&self) -> f64 {
        self.components.iter().map(Component::area).sum()
    }
}

impl<I: SpatialAccess> Net<Tetrahedron3D, I> {
    pub fn volume(&self) -> f64 {
        self.components.iter().map(Component::volume).sum()
    }
}
