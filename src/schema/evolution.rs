//! Evolution configuration, objectives and run statistics.
//!
//! A [`RunConfig`] bundles everything the CLI needs: the shared topology
//! parameters, the generational loop settings and the [`Objective`] that
//! picks a fitness variant together with its archetype layout.

use serde::{Deserialize, Serialize};

use super::{ArchetypeError, BridgeSpec, ConfigError, TopologyConfig, TowerSpec};

// ============================================================================
// Generational loop
// ============================================================================

/// Settings of the generational loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Individuals kept after every generation.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Number of generations to run.
    #[serde(default = "default_generation_limit")]
    pub generation_limit: usize,
    /// Share of the population replaced each generation.
    #[serde(default = "default_replacement_percentage")]
    pub replacement_percentage: f64,
    /// Probability that a refill slot is produced by crossover.
    #[serde(default = "default_crossover_probability")]
    pub crossover_probability: f64,
    /// Minimum gain for a new best individual to be recorded.
    #[serde(default = "default_improvement_epsilon")]
    pub improvement_epsilon: f64,
    /// Share of the population used for mean/deviation statistics.
    #[serde(default = "default_top_fraction")]
    pub top_fraction: f64,
    /// Generations between statistics reports.
    #[serde(default = "default_statistics_interval")]
    pub statistics_interval: usize,
    /// Relative weights of the composite mutation kinds.
    #[serde(default)]
    pub mutation_weights: MutationWeights,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            generation_limit: default_generation_limit(),
            replacement_percentage: default_replacement_percentage(),
            crossover_probability: default_crossover_probability(),
            improvement_epsilon: default_improvement_epsilon(),
            top_fraction: default_top_fraction(),
            statistics_interval: default_statistics_interval(),
            mutation_weights: MutationWeights::default(),
            random_seed: None,
        }
    }
}

fn default_population_size() -> usize {
    120
}
fn default_generation_limit() -> usize {
    600
}
fn default_replacement_percentage() -> f64 {
    0.3
}
fn default_crossover_probability() -> f64 {
    0.95
}
fn default_improvement_epsilon() -> f64 {
    1e-4
}
fn default_top_fraction() -> f64 {
    0.2
}
fn default_statistics_interval() -> usize {
    50
}

impl EvolutionConfig {
    /// Individuals dropped and refilled each generation.
    pub fn replaced_count(&self) -> usize {
        (self.replacement_percentage * self.population_size as f64).round() as usize
    }

    /// Size of the top slice used for statistics (at least one).
    pub fn top_count(&self) -> usize {
        ((self.top_fraction * self.population_size as f64).round() as usize)
            .clamp(1, self.population_size.max(1))
    }

    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        if self.population_size < 2 {
            return Err(EvolutionConfigError::PopulationTooSmall);
        }
        if !(0.0..1.0).contains(&self.replacement_percentage) {
            return Err(EvolutionConfigError::InvalidProbability(format!(
                "replacement_percentage {} must be in [0, 1)",
                self.replacement_percentage
            )));
        }
        if self.population_size - self.replaced_count() < 2 {
            return Err(EvolutionConfigError::TooFewSurvivors {
                survivors: self.population_size - self.replaced_count(),
            });
        }
        for (name, p) in [
            ("crossover_probability", self.crossover_probability),
            ("top_fraction", self.top_fraction),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(EvolutionConfigError::InvalidProbability(format!(
                    "{name} {p} must be in [0, 1]"
                )));
            }
        }
        if self.statistics_interval == 0 {
            return Err(EvolutionConfigError::InvalidInterval);
        }
        self.mutation_weights.validate()
    }
}

/// Composite mutation applied to an individual once per generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    RemoveVertex,
    AddVertex,
    RemoveEdge,
    AddEdge,
    MoveVertex,
    /// A burst of every operator in sequence.
    Combined,
    VaryArea,
}

impl MutationKind {
    pub const ALL: [MutationKind; 7] = [
        MutationKind::RemoveVertex,
        MutationKind::AddVertex,
        MutationKind::RemoveEdge,
        MutationKind::AddEdge,
        MutationKind::MoveVertex,
        MutationKind::Combined,
        MutationKind::VaryArea,
    ];
}

/// Weights for drawing a [`MutationKind`]. Uniform by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationWeights {
    pub remove_vertex: f64,
    pub add_vertex: f64,
    pub remove_edge: f64,
    pub add_edge: f64,
    pub move_vertex: f64,
    pub combined: f64,
    pub vary_area: f64,
}

impl Default for MutationWeights {
    fn default() -> Self {
        Self {
            remove_vertex: 1.0,
            add_vertex: 1.0,
            remove_edge: 1.0,
            add_edge: 1.0,
            move_vertex: 1.0,
            combined: 1.0,
            vary_area: 1.0,
        }
    }
}

impl MutationWeights {
    /// Weight for `kind`.
    pub fn weight(&self, kind: MutationKind) -> f64 {
        match kind {
            MutationKind::RemoveVertex => self.remove_vertex,
            MutationKind::AddVertex => self.add_vertex,
            MutationKind::RemoveEdge => self.remove_edge,
            MutationKind::AddEdge => self.add_edge,
            MutationKind::MoveVertex => self.move_vertex,
            MutationKind::Combined => self.combined,
            MutationKind::VaryArea => self.vary_area,
        }
    }

    fn validate(&self) -> Result<(), EvolutionConfigError> {
        let weights = MutationKind::ALL.map(|k| self.weight(k));
        if let Some(w) = weights.iter().find(|w| !(**w >= 0.0) || !w.is_finite()) {
            return Err(EvolutionConfigError::InvalidWeight(format!(
                "Weight {w} must be finite and non-negative"
            )));
        }
        // VaryArea alone is not enough: it is skipped for fixed-area runs.
        if weights[..6].iter().all(|&w| w == 0.0) {
            return Err(EvolutionConfigError::InvalidWeight(
                "At least one structural mutation needs a positive weight".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Objectives
// ============================================================================

fn default_stress_limit() -> f64 {
    300e6
}
fn default_bridge_load() -> f64 {
    6e6
}
fn default_material_limit() -> f64 {
    25_000.0
}

/// Fitness variant and its scalar parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Objective {
    /// Minimize member mass under a fixed floor load.
    MinMaterialBridge {
        #[serde(default)]
        bridge: BridgeSpec,
        /// Total floor load, in N.
        #[serde(default = "default_bridge_load")]
        load: f64,
        /// Allowed absolute member stress, in Pa.
        #[serde(default = "default_stress_limit")]
        stress_limit: f64,
    },
    /// Minimize the most stressed members under a fixed floor load.
    MinStressBridge {
        #[serde(default)]
        bridge: BridgeSpec,
        #[serde(default = "default_bridge_load")]
        load: f64,
        /// Allowed member mass, in kg.
        #[serde(default = "default_material_limit")]
        material_limit: f64,
    },
    /// Maximize the supported floor load.
    MaxLoadBridge {
        #[serde(default)]
        bridge: BridgeSpec,
        #[serde(default = "default_stress_limit")]
        stress_limit: f64,
        #[serde(default = "default_material_limit")]
        material_limit: f64,
    },
    /// Maximize the height of a self-supporting tower.
    MaxHeightTower {
        #[serde(default)]
        tower: TowerSpec,
        #[serde(default = "default_stress_limit")]
        stress_limit: f64,
        #[serde(default = "default_material_limit")]
        material_limit: f64,
    },
}

impl Default for Objective {
    fn default() -> Self {
        Self::MinMaterialBridge {
            bridge: BridgeSpec::default(),
            load: default_bridge_load(),
            stress_limit: default_stress_limit(),
        }
    }
}

impl Objective {
    pub fn name(&self) -> &'static str {
        match self {
            Objective::MinMaterialBridge { .. } => "min-material bridge",
            Objective::MinStressBridge { .. } => "min-stress bridge",
            Objective::MaxLoadBridge { .. } => "max-load bridge",
            Objective::MaxHeightTower { .. } => "max-height tower",
        }
    }

    /// Check the archetype layout and the scalar limits.
    pub fn validate(&self, topology: &TopologyConfig) -> Result<(), EvolutionConfigError> {
        let (limits, layout) = match self {
            Objective::MinMaterialBridge {
                bridge,
                load,
                stress_limit,
            } => ([*load, *stress_limit], bridge.validate(topology)),
            Objective::MinStressBridge {
                bridge,
                load,
                material_limit,
            } => ([*load, *material_limit], bridge.validate(topology)),
            Objective::MaxLoadBridge {
                bridge,
                stress_limit,
                material_limit,
            } => ([*stress_limit, *material_limit], bridge.validate(topology)),
            Objective::MaxHeightTower {
                tower,
                stress_limit,
                material_limit,
            } => ([*stress_limit, *material_limit], tower.validate(topology)),
        };
        if limits.iter().any(|v| !(*v > 0.0)) {
            return Err(EvolutionConfigError::InvalidObjective(format!(
                "{} loads and limits must be positive",
                self.name()
            )));
        }
        layout?;
        Ok(())
    }
}

/// Complete run description, as read by the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub topology: TopologyConfig,
    #[serde(default)]
    pub evolution: EvolutionConfig,
    #[serde(default)]
    pub objective: Objective,
    /// Directory for JSON artifacts. Log-only reporting when absent.
    #[serde(default)]
    pub output_dir: Option<String>,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.topology.validate()?;
        self.evolution.validate()?;
        self.objective.validate(&self.topology)
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// One (generation, value) sample of a statistics series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatPoint {
    pub generation: usize,
    pub value: f64,
}

/// Evolution history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best fitness, recorded whenever it improves.
    pub best_fitness: Vec<StatPoint>,
    /// Mean fitness of the top slice, every generation.
    pub top_mean: Vec<StatPoint>,
    /// Population standard deviation of the top slice, every generation.
    pub top_std_dev: Vec<StatPoint>,
}

impl EvolutionHistory {
    /// Best-fitness series extended with a flat point at `generation`, so a
    /// plot reaches the current generation.
    pub fn best_fitness_through(&self, generation: usize) -> Vec<StatPoint> {
        let mut series = self.best_fitness.clone();
        if let Some(last) = series.last().copied() {
            if last.generation != generation {
                series.push(StatPoint {
                    generation,
                    value: last.value,
                });
            }
        }
        series
    }

    /// Digest of the series; `None` before anything was recorded.
    pub fn summary(&self) -> Option<HistorySummary> {
        let best_fitness = *self.best_fitness.last()?;
        let best_mean = *self
            .top_mean
            .iter()
            .max_by(|a, b| a.value.total_cmp(&b.value))?;
        let final_mean = *self.top_mean.last()?;
        let min_std_dev = *self
            .top_std_dev
            .iter()
            .min_by(|a, b| a.value.total_cmp(&b.value))?;
        let final_std_dev = *self.top_std_dev.last()?;
        Some(HistorySummary {
            best_fitness,
            best_mean,
            final_mean,
            min_std_dev,
            final_std_dev,
        })
    }
}

/// Key points of a run's statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HistorySummary {
    pub best_fitness: StatPoint,
    pub best_mean: StatPoint,
    pub final_mean: StatPoint,
    pub min_std_dev: StatPoint,
    pub final_std_dev: StatPoint,
}

/// Progress update emitted after the initial evaluation and every generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Current generation number (0 = initial population).
    pub generation: usize,
    /// Total generations planned.
    pub total_generations: usize,
    /// Individuals in the population after this generation.
    pub population_size: usize,
    /// Best fitness seen so far.
    pub best_fitness: f64,
    /// Material mass of the best individual, in kg.
    pub best_material: f64,
    /// Max stress of the best individual, in Pa.
    pub best_max_stress: f64,
    /// Fitnesses of the first few individuals of the sorted population.
    pub top_fitnesses: Vec<f64>,
    /// Mean fitness of the top slice.
    pub top_mean: f64,
    /// Standard deviation of the top slice.
    pub top_std_dev: f64,
    /// Whether this generation produced a new best individual.
    pub improved: bool,
}

/// Final result of evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    pub generations: usize,
    pub best_fitness: f64,
    pub best_material: f64,
    pub best_max_stress: f64,
    pub history: EvolutionHistory,
    pub summary: Option<HistorySummary>,
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Replacement leaves {survivors} survivors, at least 2 are needed")]
    TooFewSurvivors { survivors: usize },
    #[error("Invalid probability: {0}")]
    InvalidProbability(String),
    #[error("Statistics interval must be non-zero")]
    InvalidInterval,
    #[error("Invalid mutation weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid objective: {0}")]
    InvalidObjective(String),
    #[error("Topology config validation failed: {0}")]
    TopologyConfigError(#[from] ConfigError),
    #[error("Archetype validation failed: {0}")]
    ArchetypeError(#[from] ArchetypeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.evolution.replaced_count(), 36);
        assert_eq!(config.evolution.top_count(), 24);
    }

    #[test]
    fn test_population_checks() {
        let tiny = EvolutionConfig {
            population_size: 1,
            ..Default::default()
        };
        assert!(matches!(tiny.validate(), Err(EvolutionConfigError::PopulationTooSmall)));

        let drained = EvolutionConfig {
            population_size: 4,
            replacement_percentage: 0.9,
            ..Default::default()
        };
        assert!(matches!(
            drained.validate(),
            Err(EvolutionConfigError::InvalidProbability(_) | EvolutionConfigError::TooFewSurvivors { .. })
        ));

        let small = EvolutionConfig {
            population_size: 3,
            replacement_percentage: 0.5,
            ..Default::default()
        };
        // round(1.5) = 2 replaced, leaving one survivor.
        assert!(matches!(
            small.validate(),
            Err(EvolutionConfigError::TooFewSurvivors { survivors: 1 })
        ));
        assert_eq!(small.top_count(), 1);
    }

    #[test]
    fn test_weights_validation() {
        let only_area = MutationWeights {
            remove_vertex: 0.0,
            add_vertex: 0.0,
            remove_edge: 0.0,
            add_edge: 0.0,
            move_vertex: 0.0,
            combined: 0.0,
            vary_area: 1.0,
        };
        let config = EvolutionConfig {
            mutation_weights: only_area,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EvolutionConfigError::InvalidWeight(_))));
    }

    #[test]
    fn test_objective_validation() {
        let topology = TopologyConfig::default();
        let bad_bridge = Objective::MinMaterialBridge {
            bridge: BridgeSpec::new(vec![crate::compute::Vec2::new(0.0, 0.0)]),
            load: 6e6,
            stress_limit: 300e6,
        };
        assert!(matches!(
            bad_bridge.validate(&topology),
            Err(EvolutionConfigError::ArchetypeError(ArchetypeError::TooFewSupports(1)))
        ));

        let bad_limit = Objective::MaxLoadBridge {
            bridge: BridgeSpec::default(),
            stress_limit: 0.0,
            material_limit: 1.0,
        };
        assert!(matches!(
            bad_limit.validate(&topology),
            Err(EvolutionConfigError::InvalidObjective(_))
        ));
    }

    #[test]
    fn test_history_summary() {
        let mut history = EvolutionHistory::default();
        assert!(history.summary().is_none());

        let point = |generation, value| StatPoint { generation, value };
        history.best_fitness = vec![point(0, -10.0), point(3, -6.0)];
        history.top_mean = vec![point(0, -20.0), point(1, -12.0), point(2, -15.0)];
        history.top_std_dev = vec![point(0, 4.0), point(1, 1.0), point(2, 2.0)];

        let summary = history.summary().unwrap();
        assert_eq!(summary.best_fitness, point(3, -6.0));
        assert_eq!(summary.best_mean, point(1, -12.0));
        assert_eq!(summary.final_mean, point(2, -15.0));
        assert_eq!(summary.min_std_dev, point(1, 1.0));
        assert_eq!(summary.final_std_dev, point(2, 2.0));

        let through = history.best_fitness_through(5);
        assert_eq!(through.last(), Some(&point(5, -6.0)));
        assert_eq!(history.best_fitness_through(3).len(), 2);
    }

    #[test]
    fn test_serialization() {
        let config = RunConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.evolution.population_size, config.evolution.population_size);

        let parsed: RunConfig = serde_json::from_str(
            r#"{"objective": {"type": "MaxLoadBridge", "material_limit": 5000}}"#,
        )
        .unwrap();
        match parsed.objective {
            Objective::MaxLoadBridge {
                stress_limit,
                material_limit,
                ..
            } => {
                assert_eq!(stress_limit, 300e6);
                assert_eq!(material_limit, 5000.0);
            }
            other => panic!("unexpected objective {other:?}"),
        }
    }
}
