// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Elements: a simplex plus its identity and neighbour slots.

use geonet_geometry::Simplex;
use smallvec::SmallVec;

use crate::keys::ElementKey;

/// Neighbour slots, one per facet. Slot `i` holds the element glued to
/// facet `i` of the shape.
pub type Neighbours = SmallVec<[Option<ElementKey>; 4]>;

/// A shape owned by a component.
///
/// Elements are created and linked only by their component; the net-facing
/// API hands out shared references.
#[derive(Debug, Clone)]
pub struct Element<S: Simplex> {
    shape: S,
    id: u64,
    neighbours: Neighbours,
}

impl<S: Simplex> Element<S> {
    pub(crate) fn new(shape: S, id: u64) -> Self {
        Self {
            shape,
            id,
            neighbours: SmallVec::from_elem(None, S::arity()),
        }
    }

    pub fn shape(&self) -> &S {
        &self.shape
    }

    pub(crate) fn into_shape(self) -> S {
        self.shape
    }

    /// Identifier unique within the owning component. Ids are assigned in
    /// increasing order and never reused.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn neighbours(&self) -> &[Option<ElementKey>] {
        &self.neighbours
    }

    pub fn neighbour(&self, slot: usize) -> Option<ElementKey> {
        self.neighbours.get(slot).copied().flatten()
    }

    /// Linked neighbours with their slot index.
    pub fn linked(&self) -> impl Iterator<Item = (usize, ElementKey)> + '_ {
        self.neighbours
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.map(|key| (i, key)))
    }

    pub fn neighbour_count(&self) -> usize {
        self.neighbours.iter().flatten().count()
    }

    /// An element with at least one free facet.
    pub fn is_border(&self) -> bool {
        self.neighbours.iter().any(Option::is_none)
    }

    /// Slot through which `key` is linked, if any.
    pub fn slot_of(&self, key: ElementKey) -> Option<usize> {
        self.neighbours.iter().position(|n| *n == Some(key))
    }

    pub(crate) fn set_neighbour(&mut self, slot: usize, key: Option<ElementKey>) {
        self.neighbours[slot] = key;
    }

    /// Reverses the orientation of the shape and swaps the neighbour slots of
    /// the two swapped vertices, so slot `i` still faces facet `i`.
    pub(crate) fn invert_orientation(&mut self) {
        self.shape = self.shape.inverted();
        if let Some([a, b]) = S::INVERSION {
            self.neighbours.swap(a, b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geonet_geometry::{GeoEpsilon, Point3, Triangle3D};
    use slotmap::SlotMap;

    #[test]
    fn inversion_keeps_slots_on_their_facets() {
        let eps = GeoEpsilon::new(1e-9).unwrap();
        let tri = Triangle3D::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            &eps,
        )
        .unwrap();
        let mut keys: SlotMap<ElementKey, ()> = SlotMap::with_key();
        let (a, b) = (keys.insert(()), keys.insert(()));

        let mut element = Element::new(tri, 0);
        element.set_neighbour(1, Some(a));
        element.set_neighbour(2, Some(b));
        let facet_1 = element.shape().facet_points(1);

        element.invert_orientation();
        // Facet 1 moved to slot 2 together with its neighbour.
        assert_eq!(element.neighbour(2), Some(a));
        assert_eq!(element.neighbour(1), Some(b));
        assert!(element.shape().facet_matches(2, &tri, 1, &eps));
        assert_eq!(facet_1.len(), 2);
        assert_eq!(element.slot_of(a), Some(2));
        assert_eq!(element.neighbour_count(), 2);
        assert!(element.is_border());
    }
}
