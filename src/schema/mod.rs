//! Schema module - Configuration types for truss evolution runs.

mod archetype;
mod config;
mod evolution;

pub use archetype::*;
pub use config::*;
pub use evolution::*;
