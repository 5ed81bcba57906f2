//! Fitness variants.
//!
//! Every variant wraps a [`Topology`] together with the scalars of its
//! objective and implements [`Evolvable`], the capability the chamber
//! drives: evaluate, cache, and deep-copy through `Clone`.

use log::debug;

use crate::compute::geometry::Vec2;
use crate::compute::graph::Graph;
use crate::compute::solver::TrussSolution;
use crate::compute::topology::Topology;

/// Subtracted from the score of a design that breaks a limit.
pub const PENALTY: f64 = 1e11;

/// Joints within this distance of the floor line carry floor load.
const FLOOR_TOLERANCE: f64 = 1e-4;

/// Number of stresses averaged by the minimum-stress variant.
const STRESS_SAMPLE: usize = 3;

// Load search constants, in N.
const INITIAL_LOAD_JUMP: f64 = 400_000.0;
const INITIAL_LOAD: f64 = 800_000.0;
const LOAD_ACCURACY: f64 = 25_000.0;
const MAX_LOAD_ITERATIONS: usize = 200;

/// Score and peak stress of the last evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub fitness: f64,
    pub max_stress: f64,
}

/// A design the evolution chamber can mutate, evaluate and copy.
pub trait Evolvable: Clone + Send + Sync {
    fn topology(&self) -> &Topology;

    /// Mutable access for operators. Drops the cached evaluation.
    fn topology_mut(&mut self) -> &mut Topology;

    /// Apply this variant's forces, analyse, score and cache the result.
    fn fitness(&mut self) -> f64;

    /// Result of the last [`fitness`](Self::fitness) call since the last
    /// mutation.
    fn evaluation(&self) -> Option<Evaluation>;

    fn cached_fitness(&self) -> Option<f64> {
        self.evaluation().map(|e| e.fitness)
    }

    /// Total member mass, in kg.
    fn used_material(&self) -> f64 {
        self.topology().used_material()
    }

    /// Analysis under the forces left by the last evaluation.
    fn analyze(&self) -> Option<TrussSolution> {
        self.topology().solve().ok()
    }
}

/// Spread `total_load` downward over the non-support joints on the floor
/// line. No-op when there are none.
pub fn add_load_forces(graph: &mut Graph, floor_y: f64, total_load: f64) {
    let floor: Vec<_> = graph
        .vertices()
        .filter(|(_, v)| !v.is_support() && (v.position.y - floor_y).abs() < FLOOR_TOLERANCE)
        .map(|(id, _)| id)
        .collect();
    if floor.is_empty() {
        return;
    }
    let share = Vec2::new(0.0, -total_load / floor.len() as f64);
    for v in floor {
        graph.add_force(v, share);
    }
}

/// Reset forces, then apply self-weight plus `load` on the floor line.
fn load_floor(topology: &mut Topology, floor_y: f64, load: f64) {
    topology.graph_mut().reset_forces();
    topology.add_weight_forces();
    add_load_forces(topology.graph_mut(), floor_y, load);
}

/// Analysis under the current forces; `None` (logged) when it fails.
fn analysis(topology: &Topology) -> Option<TrussSolution> {
    match topology.solve() {
        Ok(solution) => Some(solution),
        Err(e) => {
            debug!("analysis failed: {e}");
            None
        }
    }
}

macro_rules! evolvable_accessors {
    () => {
        fn topology(&self) -> &Topology {
            &self.topology
        }

        fn topology_mut(&mut self) -> &mut Topology {
            self.evaluation = None;
            &mut self.topology
        }

        fn evaluation(&self) -> Option<Evaluation> {
            self.evaluation
        }
    };
}

// ============================================================================
// Minimum material
// ============================================================================

/// Lightest bridge that carries a fixed floor load within a stress limit.
#[derive(Debug, Clone)]
pub struct MinMaterialBridge {
    topology: Topology,
    floor_y: f64,
    load: f64,
    stress_limit: f64,
    evaluation: Option<Evaluation>,
}

impl MinMaterialBridge {
    pub fn new(topology: Topology, floor_y: f64, load: f64, stress_limit: f64) -> Self {
        Self {
            topology,
            floor_y,
            load,
            stress_limit,
            evaluation: None,
        }
    }
}

impl Evolvable for MinMaterialBridge {
    evolvable_accessors!();

    fn fitness(&mut self) -> f64 {
        load_floor(&mut self.topology, self.floor_y, self.load);
        let mut fitness = -self.topology.used_material();
        let max_stress = analysis(&self.topology)
            .map(|s| s.max_stress())
            .unwrap_or(f64::INFINITY);
        if max_stress > self.stress_limit {
            fitness -= PENALTY;
        }
        self.evaluation = Some(Evaluation {
            fitness,
            max_stress,
        });
        fitness
    }
}

// ============================================================================
// Minimum stress
// ============================================================================

/// Bridge with the lowest peak stresses under a fixed floor load and a
/// material budget.
#[derive(Debug, Clone)]
pub struct MinStressBridge {
    topology: Topology,
    floor_y: f64,
    load: f64,
    material_limit: f64,
    evaluation: Option<Evaluation>,
}

impl MinStressBridge {
    pub fn new(topology: Topology, floor_y: f64, load: f64, material_limit: f64) -> Self {
        Self {
            topology,
            floor_y,
            load,
            material_limit,
            evaluation: None,
        }
    }
}

impl Evolvable for MinStressBridge {
    evolvable_accessors!();

    fn fitness(&mut self) -> f64 {
        load_floor(&mut self.topology, self.floor_y, self.load);
        let (mut fitness, max_stress) = match analysis(&self.topology) {
            Some(solution) => (
                -solution.max_stresses_mean(STRESS_SAMPLE),
                solution.max_stress(),
            ),
            None => (-PENALTY, f64::INFINITY),
        };
        if self.topology.used_material() > self.material_limit {
            fitness -= PENALTY;
        }
        self.evaluation = Some(Evaluation {
            fitness,
            max_stress,
        });
        fitness
    }
}

// ============================================================================
// Maximum load
// ============================================================================

/// Outcome of the load search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSearch {
    /// Largest total load that kept stresses within the limit, in N.
    pub load: f64,
    /// Peak stress at that load.
    pub max_stress: f64,
    pub iterations: usize,
}

/// Bridge that carries the largest floor load within a stress limit and a
/// material budget.
#[derive(Debug, Clone)]
pub struct MaxLoadBridge {
    topology: Topology,
    floor_y: f64,
    stress_limit: f64,
    material_limit: f64,
    evaluation: Option<Evaluation>,
}

impl MaxLoadBridge {
    pub fn new(topology: Topology, floor_y: f64, stress_limit: f64, material_limit: f64) -> Self {
        Self {
            topology,
            floor_y,
            stress_limit,
            material_limit,
            evaluation: None,
        }
    }

    /// Grow the load by a doubling jump until the stress limit is first
    /// exceeded, then bisect between the last success and the first failure
    /// until they are within the accuracy. `None` when the truss cannot be
    /// analysed.
    pub fn search_load(&mut self) -> Option<LoadSearch> {
        let mut jump = INITIAL_LOAD_JUMP;
        let mut load = INITIAL_LOAD;
        let mut best = LoadSearch {
            load: 0.0,
            max_stress: 0.0,
            iterations: 0,
        };
        // `best.load` is the highest passing load, `failing` the lowest failing one.
        let mut failing = f64::INFINITY;

        while failing - best.load > LOAD_ACCURACY && best.iterations < MAX_LOAD_ITERATIONS {
            best.iterations += 1;
            load_floor(&mut self.topology, self.floor_y, load);
            let stress = analysis(&self.topology)?.max_stress();
            if stress <= self.stress_limit {
                best.load = load;
                best.max_stress = stress;
                if failing.is_infinite() {
                    jump *= 2.0;
                } else {
                    jump /= 2.0;
                }
                load += jump;
            } else {
                failing = load;
                jump /= 2.0;
                load = best.load + jump;
            }
        }

        // Leave the winning load case on the graph for reporting.
        load_floor(&mut self.topology, self.floor_y, best.load);
        if best.load == 0.0 {
            best.max_stress = analysis(&self.topology)?.max_stress();
        }
        Some(best)
    }
}

impl Evolvable for MaxLoadBridge {
    evolvable_accessors!();

    fn fitness(&mut self) -> f64 {
        let (mut fitness, max_stress) = match self.search_load() {
            Some(search) => (search.load, search.max_stress),
            None => (-PENALTY, f64::INFINITY),
        };
        if self.topology.used_material() > self.material_limit {
            fitness -= PENALTY;
        }
        self.evaluation = Some(Evaluation {
            fitness,
            max_stress,
        });
        fitness
    }
}

// ============================================================================
// Maximum height
// ============================================================================

/// Tallest self-supporting tower within stress and material limits.
#[derive(Debug, Clone)]
pub struct MaxHeightTower {
    topology: Topology,
    stress_limit: f64,
    material_limit: f64,
    evaluation: Option<Evaluation>,
}

impl MaxHeightTower {
    pub fn new(topology: Topology, stress_limit: f64, material_limit: f64) -> Self {
        Self {
            topology,
            stress_limit,
            material_limit,
            evaluation: None,
        }
    }
}

impl Evolvable for MaxHeightTower {
    evolvable_accessors!();

    fn fitness(&mut self) -> f64 {
        self.topology.graph_mut().reset_forces();
        self.topology.add_weight_forces();

        let height = self
            .topology
            .graph()
            .vertices()
            .map(|(_, v)| v.position.y)
            .fold(0.0, f64::max);
        let max_stress = analysis(&self.topology)
            .map(|s| s.max_stress())
            .unwrap_or(f64::INFINITY);

        let mut fitness = height;
        if self.topology.used_material() > self.material_limit {
            fitness -= PENALTY;
        }
        if max_stress > self.stress_limit {
            fitness -= PENALTY;
        }
        self.evaluation = Some(Evaluation {
            fitness,
            max_stress,
        });
        fitness
    }
}
