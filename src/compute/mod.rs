//! Compute module - Truss geometry, analysis and evolutionary search.

mod geometry;
mod graph;
mod random;
mod solver;
mod topology;

pub mod evolution;

pub use geometry::*;
pub use graph::*;
pub use random::*;
pub use solver::*;
pub use topology::{GRAVITY, SynthesisError, Topology};
