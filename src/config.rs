//! World configuration
//!
//! Plain serde struct read once at world creation. Missing JSON fields fall
//! back to their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{ConfigError, WorldError};

/// Configuration recognized by [`crate::World::new`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Fixed number of collider slots
    pub max_colliders: usize,
    /// Spatial hash cell edge length. Larger cells visit fewer cells per query
    /// but coarsen the broad phase.
    pub cell_size: f32,
    /// Initial spatial hash table capacity (rounded up to a power of two)
    pub spatial_initial_capacity: usize,
    /// Candidates remembered per query for de-duplication
    pub dedup_capacity: usize,
    /// Results returned per query before truncation
    pub max_query_results: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_colliders: DEFAULT_MAX_COLLIDERS,
            cell_size: DEFAULT_CELL_SIZE,
            spatial_initial_capacity: DEFAULT_SPATIAL_CAPACITY,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            max_query_results: DEFAULT_MAX_QUERY_RESULTS,
        }
    }
}

impl WorldConfig {
    /// Default config with a different cell size
    pub fn with_cell_size(cell_size: f32) -> Self {
        Self {
            cell_size,
            ..Self::default()
        }
    }

    /// Default config with a different collider capacity
    pub fn with_max_colliders(max_colliders: usize) -> Self {
        Self {
            max_colliders,
            ..Self::default()
        }
    }

    /// Reject values the world cannot run with
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.max_colliders == 0 {
            return Err(WorldError::InvalidConfig("max_colliders must be > 0".into()));
        }
        if self.max_colliders >= u32::MAX as usize {
            return Err(WorldError::InvalidConfig(format!(
                "max_colliders {} exceeds the id range",
                self.max_colliders
            )));
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(WorldError::InvalidConfig(format!(
                "cell_size must be positive, got {}",
                self.cell_size
            )));
        }
        if self.spatial_initial_capacity == 0 {
            return Err(WorldError::InvalidConfig(
                "spatial_initial_capacity must be > 0".into(),
            ));
        }
        if self.dedup_capacity == 0 || self.max_query_results == 0 {
            return Err(WorldError::InvalidConfig(
                "query buffers must hold at least one entry".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded world config from {}", path.display());
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
