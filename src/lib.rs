//! Truss Evolution - Genetic search over 2D truss topologies.
//!
//! This crate evolves pin-jointed plane trusses (bridges and towers) with a
//! genetic algorithm. Every candidate is analysed with a linear-elastic
//! direct-stiffness solver and scored by one of several objectives.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration types (topology rules, evolution parameters,
//!   objectives, bridge and tower layouts) and run statistics
//! - `compute`: Truss graph, solver, topology operators and the evolution
//!   chamber
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use truss_evolution::{
//!     compute::{Topology, TrussRng, evolution::{EvolutionChamber, MinMaterialBridge}},
//!     schema::{BridgeSpec, EvolutionConfig, TopologyConfig},
//! };
//!
//! let topology = Arc::new(TopologyConfig::default());
//! let spec = BridgeSpec::default();
//! let shared = Arc::clone(&topology);
//! let mut chamber = EvolutionChamber::new(
//!     EvolutionConfig::default(),
//!     &topology,
//!     move |rng: &mut TrussRng| {
//!         let truss = Topology::bridge(&spec, Arc::clone(&shared), rng)?;
//!         Ok(MinMaterialBridge::new(truss, 0.0, 6e6, 300e6))
//!     },
//! )
//! .unwrap();
//!
//! let result = chamber.run().unwrap();
//! println!("Lightest design: {:.1} kg", result.best_material);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EvolutionChamber, Evolvable, run_objective};
pub use compute::{Graph, Topology, TrussModel, TrussRng};
pub use schema::{EvolutionConfig, Objective, RunConfig, TopologyConfig};
