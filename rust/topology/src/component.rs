// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Components: one connected, manifold set of same-kind elements.
//!
//! The [`Component`] owns its elements in a slot map and keeps exactly those
//! elements in its spatial index. Mutations are all-or-nothing: a rejected
//! insertion or removal leaves links, index and counters untouched.
//!
//! ## Manifold rule
//!
//! Every facet is shared by at most two elements, and a shared facet is
//! recorded by reciprocal neighbour links at the matching slots. Insertion
//! checks the candidate against every nearby element first and commits the
//! links only when no contact is illegal. Removal refuses to split the
//! component in two.

use geonet_geometry::{GeoEpsilon, Mbb3D};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::config::NetConfig;
use crate::contact::{Contact, NetSimplex};
use crate::element::Element;
use crate::error::{Error, Result};
use crate::keys::ElementKey;
use crate::skeleton::Skeleton;
use crate::spatial::{GridIndex, SpatialAccess};

/// A neighbour link found by [`Component::check_insertion`] and not yet
/// committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingLink {
    /// Facet slot of the candidate element.
    pub local: usize,
    /// Existing element sharing that facet.
    pub remote: ElementKey,
    /// Facet slot of the existing element.
    pub remote_slot: usize,
}

/// A connected set of same-kind elements with one spatial index.
#[derive(Debug)]
pub struct Component<S: NetSimplex, I: SpatialAccess = GridIndex> {
    pub(crate) config: NetConfig,
    pub(crate) eps: GeoEpsilon,
    pub(crate) elements: SlotMap<ElementKey, Element<S>>,
    pub(crate) ids: FxHashMap<u64, ElementKey>,
    pub(crate) sam: I,
    next_id: u64,
    entry: Option<ElementKey>,
    connected: bool,
    pub(crate) oriented: bool,
    mbb: Option<Mbb3D>,
    pub(crate) snapshot: Option<Skeleton>,
}

impl<S: NetSimplex, I: SpatialAccess> Component<S, I> {
    /// Creates an empty component.
    pub fn new(config: &NetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: *config,
            eps: config.geo_epsilon()?,
            elements: SlotMap::with_key(),
            ids: FxHashMap::default(),
            sam: I::create(config),
            next_id: 0,
            entry: None,
            connected: true,
            oriented: false,
            mbb: None,
            snapshot: None,
        })
    }

    /// Builds a component from a batch of shapes in one topology pass.
    ///
    /// The batch is not required to be connected; check
    /// [`is_connected`](Self::is_connected) or split it through a net.
    pub fn from_elements(config: &NetConfig, shapes: Vec<S>) -> Result<Self> {
        let mut component = Self::new(config)?;
        for shape in shapes {
            if component.find_equivalent(&shape).is_some() {
                return Err(Error::DuplicateElement { kind: S::NAME });
            }
            component.insert_unlinked(shape);
        }
        component.build_net_topology()?;
        Ok(component)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    pub fn epsilon(&self) -> &GeoEpsilon {
        &self.eps
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The border element graph walks start from, if any element exists.
    pub fn entry(&self) -> Option<ElementKey> {
        self.entry
    }

    /// Whether the neighbour graph is a single connected piece.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Whether the last orientation pass still holds.
    pub fn is_oriented(&self) -> bool {
        self.oriented
    }

    /// Union of all element boxes.
    pub fn mbb(&self) -> Option<Mbb3D> {
        self.mbb
    }

    pub(crate) fn element_ref(&self, key: ElementKey) -> Result<&Element<S>> {
        self.elements.get(key).ok_or(Error::ElementNotFound(key))
    }

    pub(crate) fn element_mut(&mut self, key: ElementKey) -> Result<&mut Element<S>> {
        self.elements.get_mut(key).ok_or(Error::ElementNotFound(key))
    }

    /// Keys ordered by element id.
    pub(crate) fn keys_by_id(&self) -> Vec<ElementKey> {
        let mut keyed: Vec<(u64, ElementKey)> = self.elements.iter().map(|(k, e)| (e.id(), k)).collect();
        keyed.sort_unstable();
        keyed.into_iter().map(|(_, k)| k).collect()
    }

    /// Indexed elements whose box meets `mbb`, ordered by id.
    pub(crate) fn candidates(&self, mbb: &Mbb3D) -> Vec<ElementKey> {
        let mut keyed: Vec<(u64, ElementKey)> = self
            .sam
            .intersects(mbb)
            .into_iter()
            .filter_map(|k| self.elements.get(k).map(|e| (e.id(), k)))
            .collect();
        keyed.sort_unstable();
        keyed.into_iter().map(|(_, k)| k).collect()
    }

    fn insert_unlinked(&mut self, shape: S) -> ElementKey {
        let id = self.next_id;
        self.next_id += 1;
        let mbb = shape.mbb();
        let key = self.elements.insert(Element::new(shape, id));
        self.ids.insert(id, key);
        self.sam.insert(key, mbb);
        self.mbb = Some(match self.mbb {
            Some(current) => current.union(&mbb),
            None => mbb,
        });
        self.snapshot = None;
        key
    }

    fn link(&mut self, a: ElementKey, slot_a: usize, b: ElementKey, slot_b: usize) -> Result<()> {
        self.element_mut(a)?.set_neighbour(slot_a, Some(b));
        self.element_mut(b)?.set_neighbour(slot_b, Some(a));
        Ok(())
    }

    fn recompute_mbb(&mut self) {
        self.mbb = self
            .elements
            .values()
            .map(|e| e.shape().mbb())
            .reduce(|a, b| a.union(&b));
    }

    // =========================================================================
    // Batch topology
    // =========================================================================

    /// Links every pair of elements sharing a facet.
    ///
    /// Elements are visited in id order and each free slot is glued to the
    /// first candidate with a matching free facet. A facet shared by more than
    /// two elements fails the build when `reject_non_manifold` is set;
    /// otherwise the extra candidates stay unlinked.
    pub(crate) fn build_net_topology(&mut self) -> Result<()> {
        let mut links = 0usize;
        for key in self.keys_by_id() {
            for slot in 0..S::arity() {
                let element = self.element_ref(key)?;
                if element.neighbour(slot).is_some() {
                    continue;
                }
                let shape = element.shape();
                let mut matches: SmallVec<[(ElementKey, usize); 2]> = SmallVec::new();
                for candidate in self.candidates(&shape.mbb()) {
                    if candidate == key || element.slot_of(candidate).is_some() {
                        continue;
                    }
                    let other = self.element_ref(candidate)?;
                    if let Some(k) = (0..S::arity()).find(|&k| shape.facet_matches(slot, other.shape(), k, &self.eps)) {
                        matches.push((candidate, k));
                    }
                }

                if matches.len() > 1 {
                    let message = format!(
                        "{} facet {slot} of element {} is shared by {} elements",
                        S::NAME,
                        element.id(),
                        matches.len() + 1
                    );
                    if self.config.reject_non_manifold {
                        return Err(Error::NonManifold(message));
                    }
                    tracing::warn!(kind = S::NAME, %message, "Non-manifold facet, keeping first match");
                }

                let free = matches
                    .iter()
                    .copied()
                    .find(|&(c, k)| self.elements.get(c).is_some_and(|e| e.neighbour(k).is_none()));
                if let Some((other, k)) = free {
                    self.link(key, slot, other, k)?;
                    links += 1;
                }
            }
        }

        self.update_entry_element();
        self.connected = self.check_connectivity();
        self.oriented = false;
        self.snapshot = None;
        tracing::debug!(
            kind = S::NAME,
            elements = self.elements.len(),
            links,
            connected = self.connected,
            "Built net topology"
        );
        Ok(())
    }

    /// Adopts a border element as entry, or any element if none is on the
    /// border (a closed net).
    pub fn update_entry_element(&mut self) {
        self.entry = self
            .elements
            .iter()
            .find(|(_, e)| e.is_border())
            .map(|(k, _)| k)
            .or_else(|| self.elements.keys().next());
    }

    fn refresh_entry_after_insert(&mut self, key: ElementKey) {
        if S::arity() == 0 {
            self.entry.get_or_insert(key);
            return;
        }
        let entry_on_border = self
            .entry
            .and_then(|e| self.elements.get(e))
            .is_some_and(Element::is_border);
        if entry_on_border {
            return;
        }
        if self.elements.get(key).is_some_and(Element::is_border) {
            self.entry = Some(key);
        } else {
            self.update_entry_element();
        }
    }

    // =========================================================================
    // Incremental insertion
    // =========================================================================

    /// Validates `shape` against every nearby element without mutating.
    ///
    /// Returns the links the insertion would create. Fails with
    /// `DuplicateElement` for a geometry-equivalent member,
    /// `IllegalIntersection` for an overlap that is not a shared recognised
    /// facet, and `NonManifold` when a facet would get a third owner.
    pub fn check_insertion(&self, shape: &S) -> Result<Vec<PendingLink>> {
        let mut pending: Vec<PendingLink> = Vec::new();
        for candidate in self.candidates(&shape.mbb().expanded(self.eps.value())) {
            let existing = self.element_ref(candidate)?;
            if existing.shape().is_geometry_equivalent(shape, &self.eps) {
                return Err(Error::DuplicateElement { kind: S::NAME });
            }
            match shape.contact(existing.shape(), &self.eps) {
                Contact::Disjoint | Contact::Touching => {}
                Contact::Adjacent { local, remote } => {
                    if existing.neighbour(remote).is_some() {
                        return Err(Error::NonManifold(format!(
                            "facet {remote} of {} element {} already has a neighbour",
                            S::NAME,
                            existing.id()
                        )));
                    }
                    if pending.iter().any(|p| p.local == local) {
                        return Err(Error::NonManifold(format!(
                            "facet {local} of the new {} element meets two elements",
                            S::NAME
                        )));
                    }
                    pending.push(PendingLink {
                        local,
                        remote: candidate,
                        remote_slot: remote,
                    });
                }
                Contact::Overlap(reason) => {
                    tracing::debug!(kind = S::NAME, existing = existing.id(), %reason, "Rejected insertion");
                    return Err(Error::IllegalIntersection {
                        existing: existing.id(),
                        contact: reason,
                    });
                }
            }
        }
        Ok(pending)
    }

    /// Inserts `shape` after checking it against its neighbourhood.
    pub fn add_element(&mut self, shape: S) -> Result<ElementKey> {
        let pending = self.check_insertion(&shape)?;
        self.commit_insertion(shape, &pending)
    }

    /// Inserts `shape` with the links returned by an earlier
    /// [`check_insertion`](Self::check_insertion) on an unchanged component.
    pub(crate) fn commit_insertion(&mut self, shape: S, pending: &[PendingLink]) -> Result<ElementKey> {
        let was_empty = self.elements.is_empty();
        let key = self.insert_unlinked(shape);
        for link in pending {
            self.link(key, link.local, link.remote, link.remote_slot)?;
        }
        if self.oriented {
            self.orient_new_element(key)?;
        }
        if S::arity() > 0 {
            self.connected = was_empty || (self.connected && !pending.is_empty());
        }
        self.refresh_entry_after_insert(key);
        tracing::trace!(
            kind = S::NAME,
            id = self.element_ref(key)?.id(),
            links = pending.len(),
            "Inserted element"
        );
        Ok(key)
    }

    /// Inserts `shape` and links every free matching facet, skipping the
    /// legality scan. Only for trusted, pre-validated batches.
    pub fn add_element_without_topology_check(&mut self, shape: S) -> Result<ElementKey> {
        let was_empty = self.elements.is_empty();
        let mbb = shape.mbb();
        let key = self.insert_unlinked(shape);
        let mut links = 0usize;
        for slot in 0..S::arity() {
            let mut found = None;
            {
                let element = self.element_ref(key)?;
                for candidate in self.candidates(&mbb) {
                    if candidate == key || element.slot_of(candidate).is_some() {
                        continue;
                    }
                    let other = self.element_ref(candidate)?;
                    let free = (0..S::arity()).find(|&k| {
                        other.neighbour(k).is_none()
                            && element.shape().facet_matches(slot, other.shape(), k, &self.eps)
                    });
                    if let Some(k) = free {
                        found = Some((candidate, k));
                        break;
                    }
                }
            }
            if let Some((other, k)) = found {
                self.link(key, slot, other, k)?;
                links += 1;
            }
        }
        if S::arity() > 0 {
            self.connected = was_empty || (self.connected && links > 0);
        }
        self.oriented = false;
        self.refresh_entry_after_insert(key);
        Ok(key)
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Removes the member geometry-equivalent to `shape`.
    pub fn remove_element(&mut self, shape: &S) -> Result<S> {
        let key = self.find_equivalent(shape).ok_or(Error::NotAMember { kind: S::NAME })?;
        self.remove_key(key)
    }

    /// Removes an element by key, refusing removals that would split the
    /// component.
    ///
    /// With two or more neighbours the links are cleared tentatively and the
    /// former neighbours must still reach each other; otherwise every link is
    /// restored and `WouldDisconnect` returned.
    pub fn remove_key(&mut self, key: ElementKey) -> Result<S> {
        let element = self.element_ref(key)?;
        let id = element.id();
        let mut reciprocal: SmallVec<[(ElementKey, usize); 4]> = SmallVec::new();
        for (_, neighbour) in element.linked() {
            let back = self.element_ref(neighbour)?.slot_of(key).ok_or_else(|| {
                Error::Update(format!("element {id} links to a neighbour without a back-link"))
            })?;
            reciprocal.push((neighbour, back));
        }

        for &(neighbour, back) in &reciprocal {
            self.element_mut(neighbour)?.set_neighbour(back, None);
        }

        if reciprocal.len() >= 2 {
            let targets: SmallVec<[ElementKey; 4]> = reciprocal[1..].iter().map(|(n, _)| *n).collect();
            if !self.all_reachable(reciprocal[0].0, &targets, key) {
                for &(neighbour, back) in &reciprocal {
                    self.element_mut(neighbour)?.set_neighbour(back, Some(key));
                }
                tracing::debug!(kind = S::NAME, id, "Rejected removal that would disconnect the component");
                return Err(Error::WouldDisconnect(id));
            }
        }

        let element = self.elements.remove(key).ok_or(Error::ElementNotFound(key))?;
        self.ids.remove(&id);
        if !self.sam.remove(key) {
            return Err(Error::Update(format!("element {id} was missing from the spatial index")));
        }
        if self.entry == Some(key) {
            self.update_entry_element();
        }
        self.recompute_mbb();
        if !self.connected {
            self.connected = self.check_connectivity();
        }
        self.snapshot = None;
        tracing::trace!(kind = S::NAME, id, links = reciprocal.len(), "Removed element");
        Ok(element.into_shape())
    }

    // =========================================================================
    // Connectivity
    // =========================================================================

    /// Walks the neighbour graph from `start` with an explicit stack, never
    /// entering `exclude`, until every target has been seen.
    fn all_reachable(&self, start: ElementKey, targets: &[ElementKey], exclude: ElementKey) -> bool {
        let mut remaining: FxHashSet<ElementKey> = targets.iter().copied().filter(|t| *t != start).collect();
        if remaining.is_empty() {
            return true;
        }
        let mut visited: FxHashSet<ElementKey> = FxHashSet::default();
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(current) = stack.pop() {
            let Some(element) = self.elements.get(current) else {
                continue;
            };
            for (_, next) in element.linked() {
                if next == exclude || !visited.insert(next) {
                    continue;
                }
                if remaining.remove(&next) && remaining.is_empty() {
                    return true;
                }
                stack.push(next);
            }
        }
        false
    }

    /// Whether `b` is reachable from `a` through neighbour links.
    pub fn is_connected_with(&self, a: ElementKey, b: ElementKey) -> bool {
        self.elements.contains_key(a) && self.elements.contains_key(b) && self.all_reachable(a, &[b], ElementKey::default())
    }

    /// Every element reachable from `start`, including itself.
    pub(crate) fn reachable_from(&self, start: ElementKey) -> FxHashSet<ElementKey> {
        let mut visited: FxHashSet<ElementKey> = FxHashSet::default();
        if !self.elements.contains_key(start) {
            return visited;
        }
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(current) = stack.pop() {
            if let Some(element) = self.elements.get(current) {
                for (_, next) in element.linked() {
                    if visited.insert(next) {
                        stack.push(next);
                    }
                }
            }
        }
        visited
    }

    /// Recomputes connectivity from scratch. Empty components and point
    /// components count as connected.
    pub fn check_connectivity(&self) -> bool {
        if S::arity() == 0 || self.elements.len() <= 1 {
            return true;
        }
        match self.elements.keys().next() {
            Some(start) => self.reachable_from(start).len() == self.elements.len(),
            None => true,
        }
    }

    pub(crate) fn refresh_connectivity(&mut self) {
        self.connected = self.check_connectivity();
    }

    /// Maximal linked groups, each ordered by id, groups ordered by their
    /// smallest id.
    pub fn connected_groups(&self) -> Vec<Vec<ElementKey>> {
        let mut seen: FxHashSet<ElementKey> = FxHashSet::default();
        let mut groups = Vec::new();
        for key in self.keys_by_id() {
            if seen.contains(&key) {
                continue;
            }
            let group = if S::arity() == 0 {
                FxHashSet::from_iter([key])
            } else {
                self.reachable_from(key)
            };
            let mut ordered: Vec<(u64, ElementKey)> = group
                .iter()
                .filter_map(|k| self.elements.get(*k).map(|e| (e.id(), *k)))
                .collect();
            ordered.sort_unstable();
            seen.extend(group);
            groups.push(ordered.into_iter().map(|(_, k)| k).collect());
        }
        groups
    }

    /// Moves every element of `other` into `self`, keeping their links.
    ///
    /// Returns the mapping from keys in `other` to the new keys. The absorbed
    /// elements receive fresh ids.
    pub fn absorb(&mut self, mut other: Component<S, I>) -> Result<FxHashMap<ElementKey, ElementKey>> {
        if other.eps.value() != self.eps.value() {
            return Err(Error::EpsilonMismatch {
                net: self.eps.value(),
                component: other.eps.value(),
            });
        }
        let mut drained: Vec<(ElementKey, Element<S>)> = other.elements.drain().collect();
        drained.sort_unstable_by_key(|(_, e)| e.id());

        let mut remap: FxHashMap<ElementKey, ElementKey> = FxHashMap::default();
        let mut old_links = Vec::with_capacity(drained.len());
        for (old, element) in drained {
            let links: SmallVec<[(usize, ElementKey); 4]> = element.linked().collect();
            let new = self.insert_unlinked(element.into_shape());
            remap.insert(old, new);
            old_links.push((new, links));
        }
        for (new, links) in old_links {
            for (slot, old_neighbour) in links {
                let neighbour = remap.get(&old_neighbour).copied().ok_or_else(|| {
                    Error::Update("absorbed element links outside its component".into())
                })?;
                self.element_mut(new)?.set_neighbour(slot, Some(neighbour));
            }
        }

        self.refresh_connectivity();
        self.oriented = false;
        if !self.entry.and_then(|e| self.elements.get(e)).is_some_and(Element::is_border) {
            self.update_entry_element();
        }
        tracing::debug!(kind = S::NAME, absorbed = remap.len(), total = self.elements.len(), "Absorbed component");
        Ok(remap)
    }

    /// Rebuilds a component from the shapes of a key subset, dropping links
    /// to elements outside it.
    pub(crate) fn extract(&self, keys: &[ElementKey]) -> Result<Self> {
        let mut shapes = Vec::with_capacity(keys.len());
        for key in keys {
            shapes.push(self.element_ref(*key)?.shape().clone());
        }
        let mut part = Self::new(&self.config)?;
        for shape in shapes {
            part.insert_unlinked(shape);
        }
        part.build_net_topology()?;
        Ok(part)
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Checks neighbour symmetry, shared-facet equivalence and that the
    /// spatial index holds exactly the component's elements.
    pub fn validate(&self) -> Result<()> {
        if self.sam.count() != self.elements.len() {
            return Err(Error::Update(format!(
                "spatial index holds {} entries for {} elements",
                self.sam.count(),
                self.elements.len()
            )));
        }
        for (key, element) in &self.elements {
            if self.sam.mbb_of(key).is_none() {
                return Err(Error::Update(format!("element {} is not indexed", element.id())));
            }
            if self.ids.get(&element.id()) != Some(&key) {
                return Err(Error::Update(format!("id {} does not resolve to its element", element.id())));
            }
            for (slot, neighbour) in element.linked() {
                let other = self.elements.get(neighbour).ok_or_else(|| {
                    Error::Update(format!("element {} links to a removed element", element.id()))
                })?;
                let back = other.slot_of(key).ok_or_else(|| {
                    Error::Update(format!(
                        "element {} links to {} without a back-link",
                        element.id(),
                        other.id()
                    ))
                })?;
                if !element.shape().facet_matches(slot, other.shape(), back, &self.eps) {
                    return Err(Error::Update(format!(
                        "elements {} and {} are linked through different facets",
                        element.id(),
                        other.id()
                    )));
                }
            }
        }
        Ok(())
    }
}
