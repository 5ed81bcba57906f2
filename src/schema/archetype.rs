//! Layout specifications for the initial structures a run starts from.

use serde::{Deserialize, Serialize};

use super::TopologyConfig;
use crate::compute::Vec2;

/// Supports of a bridge: a horizontal floor line plus optional extra
/// anchors anywhere away from that line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeSpec {
    /// Floor anchors. All share one y coordinate.
    pub floor_supports: Vec<Vec2>,
    /// Extra anchors, simulation-fixed on y.
    #[serde(default)]
    pub extra_supports: Vec<Vec2>,
}

impl Default for BridgeSpec {
    fn default() -> Self {
        Self {
            floor_supports: vec![Vec2::new(-40.0, 0.0), Vec2::new(40.0, 0.0)],
            extra_supports: Vec::new(),
        }
    }
}

impl BridgeSpec {
    pub fn new(floor_supports: Vec<Vec2>) -> Self {
        Self {
            floor_supports,
            extra_supports: Vec::new(),
        }
    }

    pub fn with_extra_supports(mut self, extra: Vec<Vec2>) -> Self {
        self.extra_supports = extra;
        self
    }

    /// Y coordinate of the floor line, if any floor support exists.
    pub fn floor_y(&self) -> Option<f64> {
        self.floor_supports.first().map(|p| p.y)
    }

    /// Check the layout against the topology constraints.
    pub fn validate(&self, config: &TopologyConfig) -> Result<(), ArchetypeError> {
        if self.floor_supports.len() < 2 {
            return Err(ArchetypeError::TooFewSupports(self.floor_supports.len()));
        }
        let y = self.floor_supports[0].y;
        if let Some(p) = self.floor_supports.iter().find(|p| p.y != y) {
            return Err(ArchetypeError::UnevenFloor {
                expected: y,
                found: p.y,
            });
        }

        let mut xs: Vec<f64> = self.floor_supports.iter().map(|p| p.x).collect();
        xs.sort_by(f64::total_cmp);
        if xs.windows(2).any(|w| w[1] - w[0] < config.min_vertex_distance) {
            return Err(ArchetypeError::SupportsTooClose);
        }

        let left = Vec2::new(xs[0], y);
        let right = Vec2::new(xs[xs.len() - 1], y);
        for &extra in &self.extra_supports {
            if extra.distance_to_segment(left, right) <= config.min_vertex_distance {
                return Err(ArchetypeError::ExtraSupportOnFloor(extra));
            }
        }
        for (i, a) in self.extra_supports.iter().enumerate() {
            if self.extra_supports[i + 1..]
                .iter()
                .any(|b| a.distance(*b) < config.min_vertex_distance)
            {
                return Err(ArchetypeError::SupportsTooClose);
            }
        }
        Ok(())
    }
}

/// Ground supports of a tower, all at y = 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerSpec {
    pub support_xs: Vec<f64>,
}

impl Default for TowerSpec {
    fn default() -> Self {
        Self {
            support_xs: vec![-5.0, 5.0],
        }
    }
}

impl TowerSpec {
    pub fn validate(&self, config: &TopologyConfig) -> Result<(), ArchetypeError> {
        if self.support_xs.len() < 2 {
            return Err(ArchetypeError::TooFewSupports(self.support_xs.len()));
        }
        let mut xs = self.support_xs.clone();
        xs.sort_by(f64::total_cmp);
        if xs.windows(2).any(|w| w[1] - w[0] < config.min_vertex_distance) {
            return Err(ArchetypeError::SupportsTooClose);
        }
        Ok(())
    }
}

/// Malformed archetype layouts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArchetypeError {
    #[error("At least two supports are required, got {0}")]
    TooFewSupports(usize),
    #[error("Floor supports must share one y coordinate (expected {expected}, found {found})")]
    UnevenFloor { expected: f64, found: f64 },
    #[error("Supports are closer than the minimum joint spacing")]
    SupportsTooClose,
    #[error("Extra support at ({}, {}) is too close to the floor line", .0.x, .0.y)]
    ExtraSupportOnFloor(Vec2),
}
