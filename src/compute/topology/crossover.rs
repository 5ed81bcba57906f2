//! Subgraph splice between two topologies.

use std::collections::HashMap;

use log::debug;

use super::Topology;
use crate::compute::geometry::Vec2;
use crate::compute::graph::{Graph, VertexId};
use crate::compute::random::TrussRng;
use crate::compute::solver::TrussModel;

impl Topology {
    /// Replace a random circular region of this topology with the same
    /// region of `donor`. Returns whether a valid child was committed.
    pub fn crossover(&mut self, donor: &Graph, rng: &mut TrussRng) -> bool {
        for _ in 0..self.config.tryout_limit {
            if let Some(child) = self.try_crossover(donor, rng) {
                self.graph = child;
                return true;
            }
        }
        debug!(
            "crossover: no valid splice in {} attempts",
            self.config.tryout_limit
        );
        false
    }

    fn try_crossover(&self, donor: &Graph, rng: &mut TrussRng) -> Option<Graph> {
        let anchor = self.random_vertex(rng)?;
        let center = self.graph[anchor].position;
        let radius =
            rng.normal_in(self.config.min_vertex_distance..=self.config.max_crossover_radius);
        let inside = |graph: &Graph, v: VertexId| graph[v].position.distance(center) <= radius;

        let donated: Vec<VertexId> = donor
            .vertex_ids()
            .into_iter()
            .filter(|&v| inside(donor, v))
            .collect();
        if donated.is_empty() {
            return None;
        }

        let mut child = self.graph.clone();
        for v in self.graph.vertex_ids() {
            if inside(&self.graph, v) {
                child.remove_vertex(v);
            }
        }
        let survivors = child.vertex_ids();
        let surviving_members: Vec<_> = child.edge_ids();

        // Splice the induced donor subgraph.
        let mut spliced: HashMap<VertexId, VertexId> = HashMap::with_capacity(donated.len());
        for &v in &donated {
            let mut vertex = donor[v].clone();
            vertex.force = None;
            spliced.insert(v, child.create_vertex(vertex));
        }
        for (_, edge) in donor.edges() {
            let (a, b) = edge.vertices();
            if let (Some(&na), Some(&nb)) = (spliced.get(&a), spliced.get(&b)) {
                child.add_edge(na, nb, edge.elasticity, edge.area);
            }
        }

        let split_distance = self.config.max_distance_to_split_edge();
        let mut kept = Vec::with_capacity(donated.len());
        for &v in &donated {
            let id = spliced[&v];
            let position = child[id].position;
            let crowded = survivors
                .iter()
                .any(|&s| child[s].position.distance(position) < self.config.min_vertex_distance);
            let on_member = surviving_members.iter().any(|&e| {
                child
                    .edge_positions(e)
                    .is_some_and(|(p, q)| position.distance_to_segment(p, q) < split_distance)
            });
            if crowded || on_member {
                child.remove_vertex(id);
            } else {
                kept.push(id);
            }
        }
        if kept.is_empty() {
            return None;
        }

        for &v in &kept {
            let position = child[v].position;
            let mut near: Vec<(VertexId, f64)> = survivors
                .iter()
                .map(|&s| (s, child[s].position.distance(position)))
                .filter(|&(_, d)| self.in_connection_range(d))
                .collect();
            near.sort_by(|a, b| a.1.total_cmp(&b.1));
            let count = rng.int(1..=3);
            for &(s, _) in near.iter().take(count) {
                let area = rng.normal_in(self.config.edge_area_range.range());
                self.connect(&mut child, v, s, area);
            }
        }

        let supports = |g: &Graph| g.vertices().filter(|(_, v)| v.is_support()).count();
        let valid = supports(&child) == supports(&self.graph)
            && has_continuous_fixed_lines(&child)
            && !child.is_unstable()
            && TrussModel::new(&child).is_solvable();
        valid.then_some(child)
    }
}

/// Every joint fixed on exactly one evolution axis sits between two joints
/// fixed on the same axis, one on each side along the free axis.
fn has_continuous_fixed_lines(graph: &Graph) -> bool {
    graph
        .vertices()
        .filter(|(_, v)| v.evolution_fixed.single())
        .all(|(id, vertex)| {
            let free = |p: Vec2| if vertex.evolution_fixed.y { p.x } else { p.y };
            let own = free(vertex.position);
            let (mut below, mut above) = (false, false);
            for n in graph.neighbors(id) {
                let other = &graph[n];
                if !other.evolution_fixed.shares_axis(vertex.evolution_fixed) {
                    continue;
                }
                let c = free(other.position);
                below |= c < own;
                above |= c > own;
            }
            below && above
        })
}
