// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing or combining primitives
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid epsilon: {0} (must be finite and > 0)")]
    InvalidEpsilon(f64),

    #[error("Degenerate {shape}: {reason}")]
    Degenerate {
        shape: &'static str,
        reason: &'static str,
    },

    #[error("Cannot normalize a zero-length vector")]
    ZeroLengthVector,
}

impl Error {
    pub(crate) fn degenerate(shape: &'static str, reason: &'static str) -> Self {
        Error::Degenerate { shape, reason }
    }
}
