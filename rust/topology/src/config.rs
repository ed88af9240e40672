// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Net configuration.
//!
//! Every component and net is built from an explicit [`NetConfig`]; nothing
//! reads a process-wide tolerance.

use geonet_geometry::GeoEpsilon;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_EPSILON: f64 = 1e-6;
const DEFAULT_GRID_CELL_SIZE: f64 = 1.0;

/// Tolerance and indexing parameters shared by a net and its components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Geometric tolerance for every coordinate comparison.
    pub epsilon: f64,
    /// Cell edge length of the default grid spatial index. Should be on the
    /// order of a typical element size.
    pub grid_cell_size: f64,
    /// Reject batches where a facet is shared by more than two elements.
    /// When `false`, the first matching candidate wins and the rest stay
    /// unlinked.
    pub reject_non_manifold: bool,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            grid_cell_size: DEFAULT_GRID_CELL_SIZE,
            reject_non_manifold: true,
        }
    }
}

impl NetConfig {
    /// Default configuration with the given tolerance.
    pub fn with_epsilon(epsilon: f64) -> Self {
        Self {
            epsilon,
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `GEONET_EPSILON`, `GEONET_GRID_CELL_SIZE` and
    /// `GEONET_REJECT_NON_MANIFOLD`; unset or unparsable values fall back to
    /// the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            epsilon: get("GEONET_EPSILON")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.epsilon),
            grid_cell_size: get("GEONET_GRID_CELL_SIZE")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.grid_cell_size),
            reject_non_manifold: get("GEONET_REJECT_NON_MANIFOLD")
                .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" => Some(true),
                    "0" | "false" | "no" => Some(false),
                    _ => None,
                })
                .unwrap_or(defaults.reject_non_manifold),
        }
    }

    /// Parse and validate a JSON configuration. Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        GeoEpsilon::new(self.epsilon).map_err(|e| Error::Config(e.to_string()))?;
        if !self.grid_cell_size.is_finite() || self.grid_cell_size <= 0.0 {
            return Err(Error::Config(format!(
                "grid cell size must be finite and > 0, got {}",
                self.grid_cell_size
            )));
        }
        Ok(())
    }

    /// The validated tolerance.
    pub fn geo_epsilon(&self) -> Result<GeoEpsilon> {
        Ok(GeoEpsilon::new(self.epsilon)?)
    }
}
