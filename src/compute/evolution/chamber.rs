//! The generational loop.

use std::sync::Arc;

use log::info;
use rand::distributions::{WeightedError, WeightedIndex};
use rayon::prelude::*;

use crate::compute::graph::{BoundingBox, mean_bounding_box};
use crate::compute::random::TrussRng;
use crate::compute::topology::{SynthesisError, Topology};
use crate::schema::{
    EvolutionConfig, EvolutionConfigError, EvolutionHistory, EvolutionProgress, EvolutionResult,
    MutationKind, Objective, RunConfig, StatPoint, TopologyConfig,
};

use super::fitness::{Evolvable, MaxHeightTower, MaxLoadBridge, MinMaterialBridge, MinStressBridge};
use super::report::{LogReporter, RenderOptions, Reporter, SeriesOptions};

/// Number of leading fitnesses included in progress reports.
const REPORTED_TOP: usize = 5;

/// Frame margin and aspect ratio for fixed-frame artifacts.
const FRAME_MARGIN: f64 = 1.1;
const FRAME_RATIO: f64 = 16.0 / 9.0;

/// Builds one initial individual.
pub type Factory<E> = Box<dyn FnMut(&mut TrussRng) -> Result<E, SynthesisError>>;

/// Errors that prevent a run from starting.
#[derive(Debug, thiserror::Error)]
pub enum ChamberError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] EvolutionConfigError),
    #[error("Failed to synthesize an initial design: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error("Invalid mutation weights: {0}")]
    Weights(#[from] WeightedError),
}

/// Evolution chamber driving a population of `E`.
pub struct EvolutionChamber<E: Evolvable> {
    config: EvolutionConfig,
    rng: TrussRng,
    factory: Factory<E>,
    mutations: WeightedIndex<f64>,
    reporter: Box<dyn Reporter>,
    population: Vec<E>,
    best: Option<E>,
    best_fitness: f64,
    history: EvolutionHistory,
    generation: usize,
    frame: Option<BoundingBox>,
}

impl<E: Evolvable> EvolutionChamber<E> {
    /// Create a chamber. `topology` decides whether area mutations apply.
    pub fn new<F>(
        config: EvolutionConfig,
        topology: &TopologyConfig,
        factory: F,
    ) -> Result<Self, ChamberError>
    where
        F: FnMut(&mut TrussRng) -> Result<E, SynthesisError> + 'static,
    {
        config.validate()?;
        let fixed_area = topology.edge_area_range.is_degenerate();
        let weights = MutationKind::ALL.map(|kind| {
            if fixed_area && kind == MutationKind::VaryArea {
                0.0
            } else {
                config.mutation_weights.weight(kind)
            }
        });
        let mutations = WeightedIndex::new(weights)?;

        let seed = config.random_seed.unwrap_or_else(rand::random);
        info!("Evolution seed: {seed}");

        Ok(Self {
            config,
            rng: TrussRng::new(seed),
            factory: Box::new(factory),
            mutations,
            reporter: Box::new(LogReporter),
            population: Vec::new(),
            best: None,
            best_fitness: f64::NEG_INFINITY,
            history: EvolutionHistory::default(),
            generation: 0,
            frame: None,
        })
    }

    /// Replace the default [`LogReporter`].
    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn population(&self) -> &[E] {
        &self.population
    }

    /// Best individual recorded so far.
    pub fn best(&self) -> Option<&E> {
        self.best.as_ref()
    }

    pub fn history(&self) -> &EvolutionHistory {
        &self.history
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Fill the population through the factory.
    pub fn initialize(&mut self) -> Result<(), ChamberError> {
        self.population.clear();
        self.best = None;
        self.best_fitness = f64::NEG_INFINITY;
        self.history = EvolutionHistory::default();
        self.generation = 0;

        for _ in 0..self.config.population_size {
            let individual = (self.factory)(&mut self.rng)?;
            self.population.push(individual);
        }
        self.frame = mean_bounding_box(
            self.population.iter().map(|e| e.topology().graph()),
            FRAME_MARGIN,
            FRAME_RATIO,
        );
        Ok(())
    }

    /// Evaluate every individual without a cached fitness.
    fn evaluate_population(&mut self) {
        self.population
            .par_iter_mut()
            .filter(|individual| individual.evaluation().is_none())
            .for_each(|individual| {
                individual.fitness();
            });
    }

    /// Sort by fitness, descending. Stable, so ties keep their order.
    fn sort_population(&mut self) {
        self.population
            .sort_by(|a, b| fitness_of(b).total_cmp(&fitness_of(a)));
    }

    fn mutate_population(&mut self) {
        for individual in &mut self.population {
            let kind = MutationKind::ALL[self.rng.weighted(&self.mutations)];
            mutate(individual.topology_mut(), kind, &mut self.rng);
        }
    }

    /// Drop the worst individuals and refill from the top of the ranking.
    fn replace_worst(&mut self) {
        let replaced = self.config.replaced_count();
        let survivors = self.config.population_size - replaced;
        self.population.truncate(survivors);

        let pool = ((1.5 * replaced as f64).round() as usize).min(survivors);
        let elite = replaced.clamp(1, survivors);
        for _ in 0..replaced {
            let child = if pool >= 2 && self.rng.chance(self.config.crossover_probability) {
                let i = self.rng.index(pool);
                let mut j = self.rng.index(pool - 1);
                if j >= i {
                    j += 1;
                }
                let mut child = self.population[i].clone();
                let donor = self.population[j].topology().graph();
                child.topology_mut().crossover(donor, &mut self.rng);
                child
            } else {
                self.population[self.rng.index(elite)].clone()
            };
            self.population.push(child);
        }
    }

    /// Record the leader if it beats the best by more than the epsilon.
    fn record_best(&mut self) -> bool {
        let Some(leader) = self.population.first() else {
            return false;
        };
        let fitness = fitness_of(leader);
        if self.best.is_some() && fitness <= self.best_fitness + self.config.improvement_epsilon {
            return false;
        }
        self.best = Some(leader.clone());
        self.best_fitness = fitness;
        self.history.best_fitness.push(StatPoint {
            generation: self.generation,
            value: fitness,
        });
        self.report_best();
        true
    }

    fn report_best(&mut self) {
        let Some(best) = &self.best else {
            return;
        };
        let graph = best.topology().graph();
        let tag = format!("best_{:05}", self.generation);

        let model = RenderOptions {
            show_forces: true,
            ..Default::default()
        };
        self.reporter.truss(&format!("{tag}_model"), graph, None, &model);

        if let Some(solution) = best.analyze() {
            let deformed = RenderOptions {
                deformation_factor: Some(1.0),
                stress_coloring: true,
                ..Default::default()
            };
            self.reporter.truss(
                &format!("{tag}_deformed"),
                &solution.deformed(graph, 1.0),
                Some(&solution),
                &deformed,
            );
        }

        let mut unloaded = graph.clone();
        unloaded.reset_forces();
        let fixed = RenderOptions {
            frame: self.frame,
            ..Default::default()
        };
        self.reporter
            .truss(&format!("{tag}_unloaded"), &unloaded, None, &fixed);
    }

    fn top_fitnesses(&self) -> Vec<f64> {
        let top = self.config.top_count().min(self.population.len());
        self.population[..top].iter().map(fitness_of).collect()
    }

    fn record_statistics(&mut self) {
        let (mean, std_dev) = mean_and_std_dev(&self.top_fitnesses());
        let generation = self.generation;
        self.history.top_mean.push(StatPoint {
            generation,
            value: mean,
        });
        self.history.top_std_dev.push(StatPoint {
            generation,
            value: std_dev,
        });
    }

    fn report_statistics(&mut self) {
        let series = [
            (
                "best_fitness",
                "Best fitness",
                self.history.best_fitness_through(self.generation),
            ),
            ("top_mean", "Top mean fitness", self.history.top_mean.clone()),
            (
                "top_std_dev",
                "Top fitness standard deviation",
                self.history.top_std_dev.clone(),
            ),
        ];
        for (name, title, points) in series {
            let options = SeriesOptions {
                title: title.to_string(),
                y_label: "fitness".to_string(),
                markers: true,
            };
            self.reporter.series(name, &points, &options);
        }
        if let Some(summary) = self.history.summary() {
            self.reporter.summary(self.generation, &summary);
        }
    }

    fn progress(&self, improved: bool) -> EvolutionProgress {
        let top = self.top_fitnesses();
        let (top_mean, top_std_dev) = mean_and_std_dev(&top);
        EvolutionProgress {
            generation: self.generation,
            total_generations: self.config.generation_limit,
            population_size: self.population.len(),
            best_fitness: self.best_fitness,
            best_material: self.best.as_ref().map_or(0.0, |b| b.used_material()),
            best_max_stress: self
                .best
                .as_ref()
                .and_then(|b| b.evaluation())
                .map_or(0.0, |e| e.max_stress),
            top_fitnesses: top.into_iter().take(REPORTED_TOP).collect(),
            top_mean,
            top_std_dev,
            improved,
        }
    }

    /// Run one generation: mutate, evaluate, replace, re-rank, record.
    /// Returns whether a new best was recorded.
    pub fn step(&mut self) -> bool {
        self.generation += 1;

        self.mutate_population();
        self.evaluate_population();
        self.sort_population();

        self.replace_worst();
        self.evaluate_population();
        self.sort_population();

        let improved = self.record_best();
        self.record_statistics();
        if self.generation % self.config.statistics_interval == 0 {
            self.report_statistics();
        }
        improved
    }

    /// Run evolution with progress callback.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<EvolutionResult, ChamberError>
    where
        F: FnMut(&EvolutionProgress),
    {
        self.initialize()?;
        self.evaluate_population();
        self.sort_population();
        self.record_best();
        self.record_statistics();

        let progress = self.progress(true);
        self.reporter.progress(&progress);
        callback(&progress);

        while self.generation < self.config.generation_limit {
            let improved = self.step();
            let progress = self.progress(improved);
            self.reporter.progress(&progress);
            callback(&progress);
        }
        if self.generation % self.config.statistics_interval != 0 {
            self.report_statistics();
        }

        let result = EvolutionResult {
            generations: self.generation,
            best_fitness: self.best_fitness,
            best_material: self.best.as_ref().map_or(0.0, |b| b.used_material()),
            best_max_stress: self
                .best
                .as_ref()
                .and_then(|b| b.evaluation())
                .map_or(0.0, |e| e.max_stress),
            history: self.history.clone(),
            summary: self.history.summary(),
        };
        self.reporter.finished(&result);
        Ok(result)
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> Result<EvolutionResult, ChamberError> {
        self.run_with_callback(|_| {})
    }
}

fn fitness_of<E: Evolvable>(individual: &E) -> f64 {
    individual.cached_fitness().unwrap_or(f64::NEG_INFINITY)
}

/// Mean and population standard deviation; zeros for an empty slice.
fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

type Operator = fn(&mut Topology, &mut TrussRng) -> bool;

const STRUCTURAL_OPERATORS: [Operator; 5] = [
    Topology::remove_random_vertex,
    Topology::add_random_vertex,
    Topology::remove_random_edge,
    Topology::add_random_edge,
    Topology::move_random_vertex,
];

/// Apply one composite mutation.
fn mutate(topology: &mut Topology, kind: MutationKind, rng: &mut TrussRng) {
    let operator: Operator = match kind {
        MutationKind::RemoveVertex => Topology::remove_random_vertex,
        MutationKind::AddVertex => Topology::add_random_vertex,
        MutationKind::RemoveEdge => Topology::remove_random_edge,
        MutationKind::AddEdge => Topology::add_random_edge,
        MutationKind::MoveVertex => Topology::move_random_vertex,
        MutationKind::VaryArea => Topology::vary_random_edge_area,
        MutationKind::Combined => {
            for operator in STRUCTURAL_OPERATORS {
                for _ in 0..repetitions(rng) {
                    operator(topology, rng);
                }
            }
            topology.vary_random_edge_area(rng);
            return;
        }
    };
    for _ in 0..repetitions(rng) {
        operator(topology, rng);
    }
}

/// How many times a mutation operator is applied in one step.
fn repetitions(rng: &mut TrussRng) -> usize {
    rng.int(1..=3)
}

/// Build the individuals `config.objective` asks for and run a chamber.
pub fn run_objective(
    config: &RunConfig,
    reporter: Box<dyn Reporter>,
) -> Result<EvolutionResult, ChamberError> {
    config.validate()?;
    let shared = Arc::new(config.topology.clone());
    info!("Running {} evolution", config.objective.name());

    match config.objective.clone() {
        Objective::MinMaterialBridge {
            bridge,
            load,
            stress_limit,
        } => {
            let floor_y = bridge.floor_y().unwrap_or(0.0);
            run_chamber(config, reporter, move |rng| {
                let topology = Topology::bridge(&bridge, Arc::clone(&shared), rng)?;
                Ok(MinMaterialBridge::new(topology, floor_y, load, stress_limit))
            })
        }
        Objective::MinStressBridge {
            bridge,
            load,
            material_limit,
        } => {
            let floor_y = bridge.floor_y().unwrap_or(0.0);
            run_chamber(config, reporter, move |rng| {
                let topology = Topology::bridge(&bridge, Arc::clone(&shared), rng)?;
                Ok(MinStressBridge::new(topology, floor_y, load, material_limit))
            })
        }
        Objective::MaxLoadBridge {
            bridge,
            stress_limit,
            material_limit,
        } => {
            let floor_y = bridge.floor_y().unwrap_or(0.0);
            run_chamber(config, reporter, move |rng| {
                let topology = Topology::bridge(&bridge, Arc::clone(&shared), rng)?;
                Ok(MaxLoadBridge::new(topology, floor_y, stress_limit, material_limit))
            })
        }
        Objective::MaxHeightTower {
            tower,
            stress_limit,
            material_limit,
        } => run_chamber(config, reporter, move |rng| {
            let topology = Topology::tower(&tower, Arc::clone(&shared), rng)?;
            Ok(MaxHeightTower::new(topology, stress_limit, material_limit))
        }),
    }
}

fn run_chamber<E, F>(
    config: &RunConfig,
    reporter: Box<dyn Reporter>,
    factory: F,
) -> Result<EvolutionResult, ChamberError>
where
    E: Evolvable + 'static,
    F: FnMut(&mut TrussRng) -> Result<E, SynthesisError> + 'static,
{
    EvolutionChamber::new(config.evolution.clone(), &config.topology, factory)?
        .with_reporter(reporter)
        .run()
}
