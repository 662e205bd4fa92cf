//! Run-time configuration of the refinement engine.
//!
//! The crate does no file parsing; callers deserialize an [`AmrConfig`] with
//! any serde format and call [`AmrConfig::validate`] before use.

use crate::algs::split::SplitPattern;
use crate::amr_error::AmrError;
use crate::geometry::index_box::MAX_DIM;

/// Default prefix of the messenger's internal resources.
pub const DEFAULT_STRATEGY_NAME: &str = "HybridModel-HybridModel";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AmrConfig {
    pub dimension: usize,
    pub interp_order: u32,
    pub refinement_ratio: i32,
    /// Width of the particle ghost layer, in cells.
    pub particle_ghost_width: u32,
    pub split_pattern: String,
    pub strategy_name: String,
    pub periodic: [bool; MAX_DIM],
    /// Root-level mesh spacing.
    pub mesh_size: [f64; MAX_DIM],
    pub origin: [f64; MAX_DIM],
}

impl Default for AmrConfig {
    fn default() -> Self {
        Self {
            dimension: 1,
            interp_order: 1,
            refinement_ratio: 2,
            particle_ghost_width: 1,
            split_pattern: SplitPattern::Binary.name().to_string(),
            strategy_name: DEFAULT_STRATEGY_NAME.to_string(),
            periodic: [false; MAX_DIM],
            mesh_size: [1.0; MAX_DIM],
            origin: [0.0; MAX_DIM],
        }
    }
}

impl AmrConfig {
    pub fn split(&self) -> Result<SplitPattern, AmrError> {
        SplitPattern::from_name(&self.split_pattern)
    }

    pub fn validate(&self) -> Result<(), AmrError> {
        if !(1..=MAX_DIM).contains(&self.dimension) {
            return Err(AmrError::InvalidDimension(self.dimension));
        }
        if !(1..=3).contains(&self.interp_order) {
            return Err(AmrError::UnsupportedInterpOrder(self.interp_order));
        }
        if self.refinement_ratio < 2 {
            return Err(AmrError::InvalidConfig(format!(
                "refinement_ratio must be at least 2, got {}",
                self.refinement_ratio
            )));
        }
        if self.particle_ghost_width == 0 {
            return Err(AmrError::InvalidConfig(
                "particle_ghost_width must be at least 1".into(),
            ));
        }
        if self.strategy_name.is_empty() {
            return Err(AmrError::InvalidConfig("strategy_name is empty".into()));
        }
        if let Some(a) = (0..self.dimension).find(|&a| !(self.mesh_size[a] > 0.0)) {
            return Err(AmrError::InvalidConfig(format!(
                "mesh_size[{a}] must be positive, got {}",
                self.mesh_size[a]
            )));
        }
        self.split().map(|_| ())
    }
}
