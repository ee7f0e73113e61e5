//! Configuration parameters for the allocation engine

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Order in which priority tiers are filled during assignment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierOrder {
    /// Ascending priority value; tiers sharing a value keep their stored order
    #[default]
    MostUrgentFirst,
    /// Exactly the order the tiers are stored in
    Stored,
}

/// Tunables threaded into the fitness model and the assigner
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationParams {
    /// Weight of passion on top of the skill average (negative acts as 0)
    pub passion_multiplier: f64,
    /// Workers below this fitness are not assigned skilled categories
    pub minimum_fitness: f64,
    /// Tier processing order during assignment
    pub tier_order: TierOrder,
}

impl Default for AllocationParams {
    fn default() -> Self {
        AllocationParams {
            passion_multiplier: 1.0,
            minimum_fitness: 0.0,
            tier_order: TierOrder::MostUrgentFirst,
        }
    }
}

impl AllocationParams {
    /// Read parameters from a JSON file; absent fields take their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let params: AllocationParams =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.passion_multiplier.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "passion_multiplier",
                value: self.passion_multiplier,
            });
        }
        if !self.minimum_fitness.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "minimum_fitness",
                value: self.minimum_fitness,
            });
        }
        Ok(())
    }

    /// Passion multiplier as used by the fitness model
    pub fn effective_passion_multiplier(&self) -> f64 {
        self.passion_multiplier.max(0.0)
    }
}
