// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for net and component operations.
//!
//! Every operation that returns an error leaves the structure exactly as it
//! was before the call.

use crate::keys::ElementKey;

/// Result type alias for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Cause category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Assumed presence or absence of an element did not hold.
    Containment,
    /// The mutation would create an illegal intersection.
    Geometry,
    /// The mutation would break a structural invariant.
    Topology,
    /// An internal invariant was found violated.
    Update,
    /// A primitive could not be built.
    Degenerate,
    /// Invalid configuration.
    Config,
}

/// Errors that can occur during topology operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The element (or a geometry-equivalent one) is already present.
    #[error("{kind} element is already present")]
    DuplicateElement { kind: &'static str },

    /// The element to remove is not geometry-equivalent to any member.
    #[error("{kind} element is not a member of the component")]
    NotAMember { kind: &'static str },

    /// A key did not resolve in the component arena.
    #[error("element not found: {0:?}")]
    ElementNotFound(ElementKey),

    /// A component index is out of range.
    #[error("component {0} not found")]
    ComponentNotFound(usize),

    /// The new element overlaps an existing one in a way that is not a shared
    /// recognised facet.
    #[error("illegal intersection with element {existing}: {contact}")]
    IllegalIntersection { existing: u64, contact: String },

    /// A facet would be shared by more than two elements.
    #[error("non-manifold configuration: {0}")]
    NonManifold(String),

    /// Removing the element would split the component.
    #[error("removing element {0} would disconnect the component")]
    WouldDisconnect(u64),

    /// No consistent orientation exists (e.g. a Möbius strip).
    #[error("component is not orientable")]
    NonOrientable,

    /// The operation needs a watertight hull.
    #[error("hull is not closed")]
    NotClosed,

    /// A component with a different tolerance was added to a net.
    #[error("epsilon mismatch: net uses {net}, component uses {component}")]
    EpsilonMismatch { net: f64, component: f64 },

    /// Internal invariant violation.
    #[error("update failed: {0}")]
    Update(String),

    #[error(transparent)]
    Geometry(#[from] geonet_geometry::Error),

    /// Configuration could not be loaded or validated.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns the cause category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DuplicateElement { .. }
            | Error::NotAMember { .. }
            | Error::ElementNotFound(_)
            | Error::ComponentNotFound(_) => ErrorKind::Containment,
            Error::IllegalIntersection { .. } => ErrorKind::Geometry,
            Error::NonManifold(_)
            | Error::WouldDisconnect(_)
            | Error::NonOrientable
            | Error::NotClosed
            | Error::EpsilonMismatch { .. } => ErrorKind::Topology,
            Error::Update(_) => ErrorKind::Update,
            Error::Geometry(_) => ErrorKind::Degenerate,
            Error::Config(_) => ErrorKind::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_cause() {
        assert_eq!(Error::NotAMember { kind: "segment" }.kind(), ErrorKind::Containment);
        assert_eq!(Error::WouldDisconnect(3).kind(), ErrorKind::Topology);
        assert_eq!(
            Error::from(geonet_geometry::Error::ZeroLengthVector).kind(),
            ErrorKind::Degenerate
        );
    }

    #[test]
    fn messages() {
        let e = Error::IllegalIntersection {
            existing: 4,
            contact: "polygon".into(),
        };
        assert_eq!(e.to_string(), "illegal intersection with element 4: polygon");
    }
}
