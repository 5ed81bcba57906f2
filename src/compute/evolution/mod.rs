//! Evolutionary search over truss topologies.
//!
//! # Overview
//!
//! - **Fitness** (`fitness`): the [`Evolvable`] capability and the four
//!   objective variants (minimum material, minimum stress, maximum load,
//!   maximum height).
//! - **Chamber** (`chamber`): the generational loop. Each generation
//!   mutates every individual, re-ranks, replaces the worst fraction by
//!   crossover or duplication of the leaders, and records statistics.
//! - **Reporting** (`report`): where progress, best designs and statistics
//!   series go.
//!
//! # Example
//!
//! ```rust,no_run
//! use truss_evolution::compute::evolution::{LogReporter, run_objective};
//! use truss_evolution::schema::RunConfig;
//!
//! let config = RunConfig::default();
//! let result = run_objective(&config, Box::new(LogReporter)).unwrap();
//! println!("best fitness {:.3e} after {} generations",
//!     result.best_fitness, result.generations);
//! ```
//!
//! Fitness is always maximized. Variants that minimize a quantity return
//! its negation, and every violated limit subtracts [`PENALTY`].

mod chamber;
mod fitness;
mod report;

pub use chamber::{ChamberError, EvolutionChamber, Factory, run_objective};
pub use fitness::{
    Evaluation, Evolvable, LoadSearch, MaxHeightTower, MaxLoadBridge, MinMaterialBridge,
    MinStressBridge, PENALTY, add_load_forces,
};
pub use report::{
    JointSnapshot, JsonReporter, LogReporter, MemberSnapshot, RenderOptions, Reporter,
    SeriesOptions, TrussSnapshot,
};
