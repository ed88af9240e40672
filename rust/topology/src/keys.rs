// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key types for arena-based element storage.
//!
//! Elements live in a per-component `slotmap::SlotMap`. Neighbour arrays hold
//! keys, never references, so the neighbour graph may be cyclic and still be
//! mutated freely. Keys are generational: a key of a removed element never
//! resolves to a later element.

use slotmap::new_key_type;

new_key_type! {
    /// Key of an element inside its owning component.
    pub struct ElementKey;
}

/// Net-wide address of an element: the component index plus the element key
/// inside that component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef {
    pub component: usize,
    pub key: ElementKey,
}

impl ElementRef {
    pub fn new(component: usize, key: ElementKey) -> Self {
        Self { component, key }
    }
}

/// Identity of a snapped vertex in a component skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u32);

impl std::fmt::Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}
