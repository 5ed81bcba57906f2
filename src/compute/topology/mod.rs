//! Truss topology: a graph plus the shared configuration its operators obey.
//!
//! # Overview
//!
//! A [`Topology`] owns one [`Graph`] and an `Arc` of the run's
//! [`TopologyConfig`]. Every stochastic edit lives here:
//!
//! - **Mutation** (`mutation`): add/remove/move joints, add/remove/resize
//!   members. Each operator retries up to `tryout_limit` candidates and
//!   returns whether one was committed.
//! - **Crossover** (`crossover`): splice a circular region of a donor graph
//!   into this one.
//! - **Archetypes** (`archetype`): bridge and tower synthesis for the
//!   initial population.
//!
//! Candidates are built on a copy of the graph and only swapped in once they
//! pass the geometric, rigidity, triangulation and solvability checks, so a
//! failed edit never leaves a half-applied graph behind.

mod archetype;
mod crossover;
mod mutation;

use std::sync::Arc;

use crate::schema::{ArchetypeError, TopologyConfig};

use super::geometry::Vec2;
use super::graph::{EdgeId, Graph, VertexId};
use super::random::TrussRng;
use super::solver::{SolverError, TrussModel, TrussSolution};

/// Standard gravity, in m/s².
pub const GRAVITY: f64 = 9.80665;

/// Failures while building an initial structure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SynthesisError {
    #[error("invalid layout: {0}")]
    Archetype(#[from] ArchetypeError),
    #[error("support walk did not close within {iterations} iterations")]
    WalkExhausted { iterations: usize },
    #[error("structure still not solvable after {iterations} repair iterations")]
    RepairExhausted { iterations: usize },
}

/// A candidate truss design.
#[derive(Debug, Clone)]
pub struct Topology {
    graph: Graph,
    config: Arc<TopologyConfig>,
}

impl Topology {
    /// Empty topology.
    pub fn new(config: Arc<TopologyConfig>) -> Self {
        Self {
            graph: Graph::new(),
            config,
        }
    }

    /// Wrap an existing graph.
    pub fn from_graph(graph: Graph, config: Arc<TopologyConfig>) -> Self {
        Self { graph, config }
    }

    #[inline]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    #[inline]
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    #[inline]
    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    /// Handle to the shared configuration.
    pub fn shared_config(&self) -> Arc<TopologyConfig> {
        Arc::clone(&self.config)
    }

    pub fn is_solvable(&self) -> bool {
        TrussModel::new(&self.graph).is_solvable()
    }

    /// Analyse the graph under its current forces.
    pub fn solve(&self) -> Result<TrussSolution, SolverError> {
        TrussModel::new(&self.graph).solve()
    }

    /// Total member mass, in kg.
    pub fn used_material(&self) -> f64 {
        self.graph.total_volume() * self.config.density
    }

    /// Add each member's weight, split evenly over its two joints.
    pub fn add_weight_forces(&mut self) {
        let scale = self.config.density * GRAVITY * self.config.weight_multiplier;
        let loads: Vec<(VertexId, VertexId, f64)> = self
            .graph
            .edges()
            .map(|(e, edge)| {
                let (a, b) = edge.vertices();
                (a, b, self.graph.edge_volume(e) * scale / 2.0)
            })
            .collect();
        for (a, b, half) in loads {
            let force = Vec2::new(0.0, -half);
            self.graph.add_force(a, force);
            self.graph.add_force(b, force);
        }
    }

    // ------------------------------------------------------------------
    // Shared helpers for the operators
    // ------------------------------------------------------------------

    fn in_connection_range(&self, distance: f64) -> bool {
        self.config.connection_range().contains(&distance)
    }

    /// Joints of `graph` that `point` could be connected to, nearest first.
    fn connectable(&self, graph: &Graph, point: Vec2) -> Vec<VertexId> {
        let mut found: Vec<(VertexId, f64)> = graph
            .vertices()
            .map(|(id, v)| (id, v.position.distance(point)))
            .filter(|&(_, d)| self.in_connection_range(d))
            .collect();
        found.sort_by(|a, b| a.1.total_cmp(&b.1));
        found.into_iter().map(|(id, _)| id).collect()
    }

    /// Any joint of `graph` closer than the minimum spacing to `point`.
    fn crowds(&self, graph: &Graph, point: Vec2) -> bool {
        graph
            .vertices()
            .any(|(_, v)| v.position.distance(point) < self.config.min_vertex_distance)
    }

    /// First member of `graph` passing within split distance of `point`.
    fn member_near(&self, graph: &Graph, point: Vec2) -> Option<EdgeId> {
        let limit = self.config.max_distance_to_split_edge();
        graph.edges().map(|(e, _)| e).find(|&e| {
            graph
                .edge_positions(e)
                .is_some_and(|(p, q)| point.distance_to_segment(p, q) < limit)
        })
    }

    fn random_area(&self, rng: &mut TrussRng) -> f64 {
        rng.uniform(self.config.edge_area_range.range())
    }

    fn connect(&self, graph: &mut Graph, a: VertexId, b: VertexId, area: f64) -> EdgeId {
        graph.add_edge(a, b, self.config.elasticity, area)
    }

    fn random_vertex(&self, rng: &mut TrussRng) -> Option<VertexId> {
        rng.choose(&self.graph.vertex_ids()).copied()
    }
}

/// Every listed joint that still exists is triangulated.
fn all_triangulated(graph: &Graph, vertices: impl IntoIterator<Item = VertexId>) -> bool {
    vertices
        .into_iter()
        .filter(|&v| graph.contains_vertex(v))
        .all(|v| graph.is_vertex_triangulated(v))
}

/// `vertices` plus all their neighbors in `graph`.
fn with_neighbors(graph: &Graph, vertices: &[VertexId]) -> Vec<VertexId> {
    let mut out = vertices.to_vec();
    for &v in vertices {
        out.extend(graph.neighbors(v));
    }
    out.sort();
    out.dedup();
    out
}


#[cfg(test)]
mod tests {
    use super::fixtures::pratt_bridge;
    use super::*;

    #[test]
    fn test_pratt_fixture_is_valid() {
        let topology = pratt_bridge(Arc::new(TopologyConfig::default()), 0.01);
        let graph = topology.graph();
        assert_eq!(graph.vertex_count(), 8);
        assert_eq!(graph.edge_count(), 13);
        assert!(graph.is_triangulated());
        assert!(!graph.is_unstable());
        assert!(topology.is_solvable());
    }

    #[test]
    fn test_used_material() {
        let topology = pratt_bridge(Arc::new(TopologyConfig::default()), 0.01);
        // 10 members of 4 m and 3 diagonals of 4√2 m.
        let length = 40.0 + 3.0 * 4.0 * 2f64.sqrt();
        let expected = length * 0.01 * 7850.0;
        assert!((topology.used_material() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_weight_forces_balance_mass() {
        let mut topology = pratt_bridge(Arc::new(TopologyConfig::default()), 0.01);
        topology.add_weight_forces();
        let total: f64 = topology
            .graph()
            .vertices()
            .filter_map(|(_, v)| v.force)
            .map(|f| f.y)
            .sum();
        let expected = -topology.used_material() * GRAVITY;
        assert!((total - expected).abs() < 1e-6 * expected.abs());

        topology.graph_mut().reset_forces();
        assert!(topology.graph().vertices().all(|(_, v)| v.force.is_none()));
    }

    #[test]
    fn test_weight_multiplier_scales_forces() {
        let config = TopologyConfig {
            weight_multiplier: 0.0,
            ..Default::default()
        };
        let mut topology = pratt_bridge(Arc::new(config), 0.01);
        topology.add_weight_forces();
        assert!(
            topology
                .graph()
                .vertices()
                .filter_map(|(_, v)| v.force)
                .all(|f| f.y == 0.0)
        );
    }

    #[test]
    fn test_helpers() {
        let topology = pratt_bridge(Arc::new(TopologyConfig::default()), 0.01);
        let graph = topology.graph();

        // (2, 2) lies on the first diagonal and 2√2 from four joints.
        let near = topology.connectable(graph, Vec2::new(2.0, 2.0));
        assert_eq!(near.len(), 8 - 2);
        assert!(topology.member_near(graph, Vec2::new(2.0, 2.0)).is_some());
        assert!(topology.member_near(graph, Vec2::new(2.0, 1.0)).is_none());

        assert!(topology.crowds(graph, Vec2::new(0.5, 0.0)));
        assert!(!topology.crowds(graph, Vec2::new(2.0, 1.0)));
    }
}
