//! Configuration types for truss topology operators and material properties.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

fn default_max_edge_length() -> f64 {
    10.0
}
fn default_min_vertex_distance() -> f64 {
    1.0
}
fn default_max_crossover_radius() -> f64 {
    10.0
}
fn default_tryout_limit() -> usize {
    20
}
fn default_elasticity() -> f64 {
    210e9
}
fn default_density() -> f64 {
    7850.0
}
fn default_weight_multiplier() -> f64 {
    1.0
}
fn default_synthesis_limit() -> usize {
    10_000
}

/// Closed range of member cross-sectional areas, in m².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaRange {
    pub min: f64,
    pub max: f64,
}

impl Default for AreaRange {
    fn default() -> Self {
        Self {
            min: 0.01,
            max: 0.01,
        }
    }
}

impl AreaRange {
    /// Single-valued range: area variation is pointless.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    #[inline]
    pub fn range(&self) -> RangeInclusive<f64> {
        self.min..=self.max
    }
}

/// Shared, read-only parameters for every topology in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Maximum member length, in meters.
    #[serde(default = "default_max_edge_length")]
    pub max_edge_length: f64,
    /// Minimum distance between two joints, in meters.
    #[serde(default = "default_min_vertex_distance")]
    pub min_vertex_distance: f64,
    /// Member cross-section range.
    #[serde(default)]
    pub edge_area_range: AreaRange,
    /// Largest radius of the region exchanged during crossover.
    #[serde(default = "default_max_crossover_radius")]
    pub max_crossover_radius: f64,
    /// Attempts per stochastic operator before giving up.
    #[serde(default = "default_tryout_limit")]
    pub tryout_limit: usize,
    /// Young's modulus of every member, in Pa.
    #[serde(default = "default_elasticity")]
    pub elasticity: f64,
    /// Material density, in kg/m³.
    #[serde(default = "default_density")]
    pub density: f64,
    /// Scale applied to self-weight forces.
    #[serde(default = "default_weight_multiplier")]
    pub weight_multiplier: f64,
    /// Iteration cap for archetype walks and the solvability repair loop.
    #[serde(default = "default_synthesis_limit")]
    pub synthesis_limit: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            max_edge_length: default_max_edge_length(),
            min_vertex_distance: default_min_vertex_distance(),
            edge_area_range: AreaRange::default(),
            max_crossover_radius: default_max_crossover_radius(),
            tryout_limit: default_tryout_limit(),
            elasticity: default_elasticity(),
            density: default_density(),
            weight_multiplier: default_weight_multiplier(),
            synthesis_limit: default_synthesis_limit(),
        }
    }
}

/// Optional overrides applied once on top of the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigOverrides {
    pub max_edge_length: Option<f64>,
    pub min_vertex_distance: Option<f64>,
    pub edge_area_range: Option<AreaRange>,
    pub max_crossover_radius: Option<f64>,
    pub tryout_limit: Option<usize>,
    pub elasticity: Option<f64>,
    pub density: Option<f64>,
    pub weight_multiplier: Option<f64>,
}

impl TopologyConfig {
    /// Defaults with every set override applied.
    pub fn with_overrides(overrides: &ConfigOverrides) -> Self {
        let defaults = Self::default();
        Self {
            max_edge_length: overrides.max_edge_length.unwrap_or(defaults.max_edge_length),
            min_vertex_distance: overrides
                .min_vertex_distance
                .unwrap_or(defaults.min_vertex_distance),
            edge_area_range: overrides.edge_area_range.unwrap_or(defaults.edge_area_range),
            max_crossover_radius: overrides
                .max_crossover_radius
                .unwrap_or(defaults.max_crossover_radius),
            tryout_limit: overrides.tryout_limit.unwrap_or(defaults.tryout_limit),
            elasticity: overrides.elasticity.unwrap_or(defaults.elasticity),
            density: overrides.density.unwrap_or(defaults.density),
            weight_multiplier: overrides.weight_multiplier.unwrap_or(defaults.weight_multiplier),
            synthesis_limit: defaults.synthesis_limit,
        }
    }

    /// Distances at which two joints may be connected.
    #[inline]
    pub fn connection_range(&self) -> RangeInclusive<f64> {
        self.min_vertex_distance..=self.max_edge_length
    }

    /// A point closer than this to a member splits it instead of being
    /// connected beside it.
    #[inline]
    pub fn max_distance_to_split_edge(&self) -> f64 {
        self.min_vertex_distance / 5.0
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_edge_length > 0.0) || !(self.min_vertex_distance > 0.0) {
            return Err(ConfigError::InvalidLength);
        }
        if self.min_vertex_distance > self.max_edge_length {
            return Err(ConfigError::InvertedConnectionRange {
                min: self.min_vertex_distance,
                max: self.max_edge_length,
            });
        }
        if !(self.edge_area_range.min > 0.0) || self.edge_area_range.min > self.edge_area_range.max
        {
            return Err(ConfigError::InvalidAreaRange {
                min: self.edge_area_range.min,
                max: self.edge_area_range.max,
            });
        }
        if self.max_crossover_radius < self.min_vertex_distance {
            return Err(ConfigError::InvalidCrossoverRadius);
        }
        if self.tryout_limit == 0 || self.synthesis_limit == 0 {
            return Err(ConfigError::InvalidLimit);
        }
        if !(self.elasticity > 0.0) || !(self.density > 0.0) || !(self.weight_multiplier >= 0.0) {
            return Err(ConfigError::InvalidMaterial);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Member length and joint spacing must be positive")]
    InvalidLength,
    #[error("Minimum joint spacing ({min}) exceeds maximum member length ({max})")]
    InvertedConnectionRange { min: f64, max: f64 },
    #[error("Invalid member area range [{min}, {max}]")]
    InvalidAreaRange { min: f64, max: f64 },
    #[error("Crossover radius must be at least the minimum joint spacing")]
    InvalidCrossoverRadius,
    #[error("Tryout and synthesis limits must be non-zero")]
    InvalidLimit,
    #[error("Elasticity and density must be positive, weight multiplier non-negative")]
    InvalidMaterial,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = TopologyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.connection_range(), 1.0..=10.0);
        assert!((config.max_distance_to_split_edge() - 0.2).abs() < 1e-12);
        assert!(config.edge_area_range.is_degenerate());
    }

    #[test]
    fn test_overrides_keep_unset_defaults() {
        let config = TopologyConfig::with_overrides(&ConfigOverrides {
            max_edge_length: Some(8.0),
            edge_area_range: Some(AreaRange {
                min: 0.005,
                max: 0.02,
            }),
            ..Default::default()
        });
        assert_eq!(config.max_edge_length, 8.0);
        assert_eq!(config.min_vertex_distance, 1.0);
        assert_eq!(config.tryout_limit, 20);
        assert!(!config.edge_area_range.is_degenerate());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let inverted = TopologyConfig {
            min_vertex_distance: 12.0,
            ..Default::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(ConfigError::InvertedConnectionRange { .. })
        ));

        let bad_area = TopologyConfig {
            edge_area_range: AreaRange { min: 0.02, max: 0.01 },
            ..Default::default()
        };
        assert!(matches!(bad_area.validate(), Err(ConfigError::InvalidAreaRange { .. })));

        let no_tries = TopologyConfig {
            tryout_limit: 0,
            ..Default::default()
        };
        assert!(matches!(no_tries.validate(), Err(ConfigError::InvalidLimit)));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TopologyConfig = serde_json::from_str(r#"{"max_edge_length": 6.0}"#).unwrap();
        assert_eq!(config.max_edge_length, 6.0);
        assert_eq!(config.density, 7850.0);
        assert_eq!(config.synthesis_limit, 10_000);
    }
}
