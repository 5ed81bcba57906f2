//! Bounded-retry mutation operators.

use log::debug;

use super::{Topology, all_triangulated, with_neighbors};
use crate::compute::geometry::Vec2;
use crate::compute::graph::{AxisFlags, EdgeId, Graph, Vertex, VertexId};
use crate::compute::random::TrussRng;
use crate::compute::solver::TrussModel;

impl Topology {
    /// Run `attempt` until it yields a graph or the retry budget runs out.
    fn retry(
        &mut self,
        operator: &str,
        rng: &mut TrussRng,
        mut attempt: impl FnMut(&Topology, &mut TrussRng) -> Option<Graph>,
    ) -> bool {
        for _ in 0..self.config.tryout_limit {
            if let Some(graph) = attempt(self, rng) {
                self.graph = graph;
                return true;
            }
        }
        debug!(
            "{operator}: no valid candidate in {} attempts",
            self.config.tryout_limit
        );
        false
    }

    /// Insert a joint near a random existing one, splitting a member when
    /// the new point lands on it.
    pub fn add_random_vertex(&mut self, rng: &mut TrussRng) -> bool {
        self.retry("add vertex", rng, |t, rng| t.try_add_vertex(rng, true))
    }

    /// [`add_random_vertex`](Self::add_random_vertex) without the rigidity,
    /// triangulation and solvability checks. Used to bulk up bare layouts.
    pub fn add_random_vertex_unchecked(&mut self, rng: &mut TrussRng) -> bool {
        self.retry("add vertex", rng, |t, rng| t.try_add_vertex(rng, false))
    }

    pub fn remove_random_vertex(&mut self, rng: &mut TrussRng) -> bool {
        self.retry("remove vertex", rng, Topology::try_remove_vertex)
    }

    /// Connect two unconnected joints in range. Pairs fixed on a common
    /// evolution axis are skipped.
    pub fn add_random_edge(&mut self, rng: &mut TrussRng) -> bool {
        self.add_random_edge_with(rng, false)
    }

    /// [`add_random_edge`](Self::add_random_edge) with control over pairs
    /// that share an evolution-fixed axis.
    pub fn add_random_edge_with(&mut self, rng: &mut TrussRng, allow_fixed_pairs: bool) -> bool {
        self.retry("add edge", rng, |t, rng| t.try_add_edge(rng, allow_fixed_pairs))
    }

    pub fn remove_random_edge(&mut self, rng: &mut TrussRng) -> bool {
        self.retry("remove edge", rng, Topology::try_remove_edge)
    }

    pub fn move_random_vertex(&mut self, rng: &mut TrussRng) -> bool {
        self.retry("move vertex", rng, Topology::try_move_vertex)
    }

    /// Resample one member's area. No-op for a single-valued area range.
    pub fn vary_random_edge_area(&mut self, rng: &mut TrussRng) -> bool {
        let range = self.config.edge_area_range;
        if range.is_degenerate() {
            return false;
        }
        let Some(&e) = rng.choose(&self.graph.edge_ids()) else {
            return false;
        };
        let area = rng.half_normal_in(range.range());
        match self.graph.edge_mut(e) {
            Some(edge) => {
                edge.area = area;
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Candidates
    // ------------------------------------------------------------------

    fn try_add_vertex(&self, rng: &mut TrussRng, checked: bool) -> Option<Graph> {
        let anchor = self.random_vertex(rng)?;
        let radius = rng.uniform(self.config.connection_range());
        let point = self.graph[anchor].position + Vec2::from_polar(radius, rng.angle());

        let mut candidate = self.graph.clone();
        let (vertex, touched) = match self.member_near(&candidate, point) {
            Some(e) => {
                let (p, q) = candidate.edge_positions(e)?;
                let on_member = point.closest_point_on_segment(p, q);
                if self.crowds(&candidate, on_member) {
                    return None;
                }
                self.split_member(&mut candidate, e, on_member, rng)?
            }
            None => {
                if self.crowds(&candidate, point) {
                    return None;
                }
                (self.attach_vertex(&mut candidate, point, rng)?, Vec::new())
            }
        };

        if !checked {
            return Some(candidate);
        }
        let valid = !candidate.is_unstable()
            && candidate.is_vertex_triangulated(vertex)
            && all_triangulated(&candidate, touched)
            && TrussModel::new(&candidate).is_solvable();
        valid.then_some(candidate)
    }

    /// Joint at `point` tied to its two nearest in-range joints plus a
    /// normally distributed number of further ones.
    fn attach_vertex(&self, graph: &mut Graph, point: Vec2, rng: &mut TrussRng) -> Option<VertexId> {
        let near = self.connectable(graph, point);
        if near.len() < 2 {
            return None;
        }
        let extra = rng.normal_int(0..=near.len() - 2);
        let v = graph.create_vertex(Vertex::new(point));
        for &n in &near[..2 + extra] {
            let area = self.random_area(rng);
            self.connect(graph, v, n, area);
        }
        Some(v)
    }

    /// Replace member `e` by two members through a new joint at `point` and
    /// tie that joint to every other joint in range. Returns the joint and
    /// the joints whose triangulation the split may have broken.
    fn split_member(
        &self,
        graph: &mut Graph,
        e: EdgeId,
        point: Vec2,
        rng: &mut TrussRng,
    ) -> Option<(VertexId, Vec<VertexId>)> {
        let edge = graph.edge(e)?.clone();
        let (a, b) = edge.vertices();
        let others: Vec<VertexId> = self
            .connectable(graph, point)
            .into_iter()
            .filter(|&n| n != a && n != b)
            .collect();
        if others.is_empty() {
            return None;
        }

        let fixed_a = graph[a].evolution_fixed;
        let fixed_b = graph[b].evolution_fixed;
        let shared = AxisFlags {
            x: fixed_a.x && fixed_b.x,
            y: fixed_a.y && fixed_b.y,
        };

        graph.remove_edge(e);
        let v = graph.create_vertex(Vertex::new(point).with_evolution_fixed(shared));
        graph.add_edge(v, a, edge.elasticity, edge.area);
        graph.add_edge(v, b, edge.elasticity, edge.area);
        for n in others {
            let area = self.random_area(rng);
            self.connect(graph, v, n, area);
        }
        Some((v, with_neighbors(graph, &[a, b])))
    }

    fn try_remove_vertex(&self, rng: &mut TrussRng) -> Option<Graph> {
        let v = self.random_vertex(rng)?;
        let vertex = &self.graph[v];
        if vertex.simulation_fixed.any() || vertex.evolution_fixed.all() {
            return None;
        }
        let neighbors = self.graph.neighbors(v);

        let mut candidate = self.graph.clone();
        if vertex.evolution_fixed.single() {
            let line: Vec<VertexId> = neighbors
                .iter()
                .copied()
                .filter(|&n| {
                    self.graph[n]
                        .evolution_fixed
                        .shares_axis(vertex.evolution_fixed)
                })
                .collect();
            let &[first, second, ..] = line.as_slice() else {
                return None;
            };
            let area = [first, second]
                .iter()
                .filter_map(|&n| self.graph.edge_between(v, n))
                .map(|e| self.graph[e].area)
                .sum::<f64>()
                / 2.0;
            candidate.remove_vertex(v);
            let span = candidate[first].position.distance(candidate[second].position);
            if span > self.config.max_edge_length {
                return None;
            }
            if !candidate.are_neighbors(first, second) {
                self.connect(&mut candidate, first, second, area);
            }
        } else {
            candidate.remove_vertex(v);
        }

        let valid = !candidate.is_unstable()
            && all_triangulated(&candidate, neighbors)
            && TrussModel::new(&candidate).is_solvable();
        valid.then_some(candidate)
    }

    fn try_add_edge(&self, rng: &mut TrussRng, allow_fixed_pairs: bool) -> Option<Graph> {
        let a = self.random_vertex(rng)?;
        let anchor = &self.graph[a];
        let options: Vec<VertexId> = self
            .connectable(&self.graph, anchor.position)
            .into_iter()
            .filter(|&b| b != a && !self.graph.are_neighbors(a, b))
            .filter(|&b| {
                allow_fixed_pairs
                    || !anchor
                        .evolution_fixed
                        .shares_axis(self.graph[b].evolution_fixed)
            })
            .collect();
        let &b = rng.choose(&options)?;

        let area = rng.half_normal_in(self.config.edge_area_range.range());
        let mut candidate = self.graph.clone();
        self.connect(&mut candidate, a, b, area);
        // The new member must close a triangle on both ends.
        all_triangulated(&candidate, [a, b]).then_some(candidate)
    }

    fn try_remove_edge(&self, rng: &mut TrussRng) -> Option<Graph> {
        let &e = rng.choose(&self.graph.edge_ids())?;
        let (a, b) = self.graph[e].vertices();
        if self.graph[a]
            .evolution_fixed
            .shares_axis(self.graph[b].evolution_fixed)
        {
            return None;
        }

        let mut candidate = self.graph.clone();
        candidate.remove_edge(e);
        let valid = !candidate.is_unstable()
            && all_triangulated(&candidate, with_neighbors(&self.graph, &[a, b]))
            && TrussModel::new(&candidate).is_solvable();
        valid.then_some(candidate)
    }

    fn try_move_vertex(&self, rng: &mut TrussRng) -> Option<Graph> {
        let v = self.random_vertex(rng)?;
        let fixed = self.graph[v].evolution_fixed;
        if fixed.all() {
            return None;
        }

        let radius = rng.half_normal_in(0.0..=self.config.max_edge_length);
        let mut offset = Vec2::from_polar(radius, rng.angle());
        if fixed.x {
            offset.x = 0.0;
        }
        if fixed.y {
            offset.y = 0.0;
        }
        let target = self.graph[v].position + offset;

        let neighbors_in_range = self
            .graph
            .neighbors(v)
            .iter()
            .all(|&n| self.in_connection_range(self.graph[n].position.distance(target)));
        let crowded = self.graph.vertices().any(|(id, other)| {
            id != v && other.position.distance(target) < self.config.min_vertex_distance
        });
        if !neighbors_in_range || crowded {
            return None;
        }

        let mut candidate = self.graph.clone();
        candidate[v].position = target;
        TrussModel::new(&candidate)
            .is_solvable()
            .then_some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::fixtures::pratt_bridge;
    use super::*;
    use crate::schema::{AreaRange, TopologyConfig};

    fn assert_valid(topology: &Topology, context: &str) {
        let graph = topology.graph();
        assert!(graph.is_triangulated(), "not triangulated after {context}");
        assert!(!graph.is_unstable(), "unstable after {context}");
    }

    #[test]
    fn test_mutations_preserve_invariants() {
        let config = Arc::new(TopologyConfig::default());
        for seed in 0..1000 {
            let mut rng = TrussRng::new(seed);
            let mut topology = pratt_bridge(Arc::clone(&config), 0.01);
            for step in 0..6 {
                let (name, accepted) = match rng.index(6) {
                    0 => ("add vertex", topology.add_random_vertex(&mut rng)),
                    1 => ("remove vertex", topology.remove_random_vertex(&mut rng)),
                    2 => ("add edge", topology.add_random_edge(&mut rng)),
                    3 => ("remove edge", topology.remove_random_edge(&mut rng)),
                    4 => ("move vertex", topology.move_random_vertex(&mut rng)),
                    _ => ("vary area", topology.vary_random_edge_area(&mut rng)),
                };
                if accepted {
                    assert_valid(&topology, &format!("{name} (seed {seed}, step {step})"));
                }
            }
        }
    }

    #[test]
    fn test_supports_survive_mutation() {
        let config = Arc::new(TopologyConfig::default());
        let mut rng = TrussRng::new(11);
        let mut topology = pratt_bridge(config, 0.01);
        for _ in 0..200 {
            topology.remove_random_vertex(&mut rng);
            topology.move_random_vertex(&mut rng);
        }
        let graph = topology.graph();
        assert!(graph.contains_vertex(VertexId(0)));
        assert!(graph.contains_vertex(VertexId(3)));
        assert_eq!(graph[VertexId(0)].position, Vec2::new(0.0, 0.0));
        assert_eq!(graph[VertexId(3)].position, Vec2::new(12.0, 0.0));
    }

    #[test]
    fn test_floor_joints_stay_on_floor() {
        let config = Arc::new(TopologyConfig::default());
        let mut rng = TrussRng::new(3);
        let mut topology = pratt_bridge(config, 0.01);
        for _ in 0..100 {
            topology.move_random_vertex(&mut rng);
            topology.add_random_vertex(&mut rng);
        }
        for (_, v) in topology.graph().vertices() {
            if v.evolution_fixed.y {
                assert_eq!(v.position.y, 0.0);
            }
        }
    }

    #[test]
    fn test_vary_area_respects_range() {
        let mut rng = TrussRng::new(5);
        let fixed = Arc::new(TopologyConfig::default());
        let mut topology = pratt_bridge(fixed, 0.01);
        assert!(!topology.vary_random_edge_area(&mut rng));

        let ranged = Arc::new(TopologyConfig {
            edge_area_range: AreaRange {
                min: 0.005,
                max: 0.02,
            },
            ..Default::default()
        });
        let mut topology = pratt_bridge(ranged, 0.01);
        for _ in 0..50 {
            assert!(topology.vary_random_edge_area(&mut rng));
        }
        assert!(
            topology
                .graph()
                .edges()
                .all(|(_, e)| (0.005..=0.02).contains(&e.area))
        );
    }

    #[test]
    fn test_split_keeps_member_area() {
        let config = Arc::new(TopologyConfig::default());
        let mut topology = pratt_bridge(Arc::clone(&config), 0.01);
        let graph = topology.graph().clone();
        let floor = graph
            .edge_between(VertexId(1), VertexId(2))
            .unwrap_or_else(|| panic!("fixture lacks floor member"));

        let mut rng = TrussRng::new(1);
        let mut candidate = graph.clone();
        let (v, _) = topology
            .split_member(&mut candidate, floor, Vec2::new(6.0, 0.0), &mut rng)
            .unwrap();
        assert!(!candidate.are_neighbors(VertexId(1), VertexId(2)));
        assert!(candidate[v].evolution_fixed.y);
        assert!(!candidate[v].evolution_fixed.x);
        for n in [VertexId(1), VertexId(2)] {
            let e = candidate.edge_between(v, n).unwrap();
            assert_eq!(candidate[e].area, 0.01);
        }
        // Tied to more than just the two former endpoints.
        assert!(candidate.neighbors(v).len() >= 3);

        *topology.graph_mut() = candidate;
        assert_eq!(topology.graph().vertex_count(), 9);
    }

    #[test]
    fn test_remove_floor_vertex_bridges_line() {
        let config = Arc::new(TopologyConfig::default());
        let mut graph = Graph::new();
        let left = graph.create_vertex(
            Vertex::new(Vec2::new(0.0, 0.0))
                .with_simulation_fixed(AxisFlags::BOTH)
                .with_evolution_fixed(AxisFlags::BOTH),
        );
        let middle =
            graph.create_vertex(Vertex::new(Vec2::new(4.0, 0.0)).with_evolution_fixed(AxisFlags::Y));
        let right = graph.create_vertex(
            Vertex::new(Vec2::new(8.0, 0.0))
                .with_simulation_fixed(AxisFlags::Y)
                .with_evolution_fixed(AxisFlags::BOTH),
        );
        let top = graph.create_vertex(Vertex::new(Vec2::new(4.0, 3.0)));
        graph.add_edge(left, middle, 210e9, 0.01);
        graph.add_edge(middle, right, 210e9, 0.03);
        for v in [left, middle, right] {
            graph.add_edge(v, top, 210e9, 0.01);
        }
        let topology = Topology::from_graph(graph, config);

        let mut rng = TrussRng::new(0);
        let candidate = (0..100)
            .find_map(|_| topology.try_remove_vertex(&mut rng))
            .expect("the floor joint is removable");
        assert!(!candidate.contains_vertex(middle));
        let bridge = candidate.edge_between(left, right).expect("floor is bridged");
        assert!((candidate[bridge].area - 0.02).abs() < 1e-12);
        assert!(candidate.is_triangulated());
    }

    #[test]
    fn test_remove_floor_vertex_rejected_when_gap_too_long() {
        let config = Arc::new(TopologyConfig {
            max_edge_length: 10.0,
            ..TopologyConfig::default()
        });
        let mut graph = Graph::new();
        let left = graph.create_vertex(
            Vertex::new(Vec2::new(0.0, 0.0))
                .with_simulation_fixed(AxisFlags::BOTH)
                .with_evolution_fixed(AxisFlags::BOTH),
        );
        let middle =
            graph.create_vertex(Vertex::new(Vec2::new(6.0, 0.0)).with_evolution_fixed(AxisFlags::Y));
        let right = graph.create_vertex(
            Vertex::new(Vec2::new(12.0, 0.0))
                .with_simulation_fixed(AxisFlags::Y)
                .with_evolution_fixed(AxisFlags::BOTH),
        );
        let top_left = graph.create_vertex(Vertex::new(Vec2::new(3.0, 4.0)));
        let top_right = graph.create_vertex(Vertex::new(Vec2::new(9.0, 4.0)));
        graph.add_edge(left, middle, 210e9, 0.01);
        graph.add_edge(middle, right, 210e9, 0.01);
        graph.add_edge(top_left, top_right, 210e9, 0.01);
        for top in [top_left, top_right] {
            for v in [left, middle, right] {
                graph.add_edge(v, top, 210e9, 0.01);
            }
        }
        let topology = Topology::from_graph(graph, config);

        // Without the middle joint the frame still stands, but the floor
        // gap of 12 m cannot be spanned by a single member.
        let mut rng = TrussRng::new(0);
        for _ in 0..200 {
            if let Some(candidate) = topology.try_remove_vertex(&mut rng) {
                assert!(candidate.contains_vertex(middle));
            }
        }
    }

    #[test]
    fn test_add_edge_skips_fixed_pairs() {
        let config = Arc::new(TopologyConfig::default());
        let topology = pratt_bridge(config, 0.01);
        let mut rng = TrussRng::new(9);
        for _ in 0..200 {
            if let Some(candidate) = topology.try_add_edge(&mut rng, false) {
                for (_, edge) in candidate.edges() {
                    let (a, b) = edge.vertices();
                    if !topology.graph().are_neighbors(a, b) {
                        assert!(
                            !candidate[a]
                                .evolution_fixed
                                .shares_axis(candidate[b].evolution_fixed)
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_unchecked_add_on_bare_supports() {
        let config = Arc::new(TopologyConfig::default());
        let mut topology = Topology::new(config);
        let graph = topology.graph_mut();
        for x in [-4.0, 4.0] {
            graph.create_vertex(
                Vertex::new(Vec2::new(x, 0.0))
                    .with_simulation_fixed(AxisFlags::BOTH)
                    .with_evolution_fixed(AxisFlags::BOTH),
            );
        }
        let mut rng = TrussRng::new(2);
        assert!(topology.add_random_vertex_unchecked(&mut rng));
        assert_eq!(topology.graph().vertex_count(), 3);
        assert_eq!(topology.graph().edge_count(), 2);
    }
}
