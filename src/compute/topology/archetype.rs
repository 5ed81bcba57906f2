//! Initial structures: bridges over a floor line and towers on the ground.
//!
//! Synthesis is randomized but bounded: every walk and the final repair
//! loop stop after `synthesis_limit` iterations and report a
//! [`SynthesisError`] instead of spinning forever.

use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use log::{debug, trace};

use super::{SynthesisError, Topology};
use crate::compute::geometry::Vec2;
use crate::compute::graph::{AxisFlags, EdgeId, Vertex, VertexId};
use crate::compute::random::TrussRng;
use crate::schema::{BridgeSpec, TopologyConfig, TowerSpec};

/// Largest deviation from the target direction during a support walk.
const WALK_ANGLE_TOLERANCE: f64 = 0.1;

/// Segments flatter than this count as horizontal.
const HORIZONTAL_TOLERANCE: f64 = 1e-5;

impl Topology {
    /// Synthesize a bridge: floor line between the floor supports, walks
    /// from each extra support, one triangle per skeleton member, then
    /// random joints until the structure is solvable.
    pub fn bridge(
        spec: &BridgeSpec,
        config: Arc<TopologyConfig>,
        rng: &mut TrussRng,
    ) -> Result<Self, SynthesisError> {
        spec.validate(&config)?;
        let mut topology = Topology::new(config);

        topology.build_floor(spec, rng)?;
        for &support in &spec.extra_supports {
            topology.walk_from_extra_support(support, rng)?;
        }

        let skeleton_vertices = topology.graph.vertex_ids();
        let skeleton_members = topology.graph.edge_ids();
        topology.triangulate_skeleton(&skeleton_members, rng);
        topology.repair(&skeleton_vertices, rng)?;

        debug!(
            "bridge synthesized: {} joints, {} members",
            topology.graph.vertex_count(),
            topology.graph.edge_count()
        );
        Ok(topology)
    }

    /// Synthesize a tower: fully fixed ground supports bulked up with
    /// unchecked joint additions, then repaired until solvable.
    pub fn tower(
        spec: &TowerSpec,
        config: Arc<TopologyConfig>,
        rng: &mut TrussRng,
    ) -> Result<Self, SynthesisError> {
        spec.validate(&config)?;
        let mut topology = Topology::new(config);

        let mut xs = spec.support_xs.clone();
        xs.sort_by(f64::total_cmp);
        for x in xs {
            topology.graph.create_vertex(
                Vertex::new(Vec2::new(x, 0.0))
                    .with_simulation_fixed(AxisFlags::BOTH)
                    .with_evolution_fixed(AxisFlags::BOTH),
            );
        }
        for _ in 0..3 * spec.support_xs.len() {
            topology.add_random_vertex_unchecked(rng);
        }

        let anchors = topology.graph.vertex_ids();
        topology.repair(&anchors, rng)?;

        debug!(
            "tower synthesized: {} joints, {} members",
            topology.graph.vertex_count(),
            topology.graph.edge_count()
        );
        Ok(topology)
    }

    fn skeleton_area(&self) -> f64 {
        self.config.edge_area_range.min
    }

    /// Floor supports plus intermediate floor joints between each pair.
    fn build_floor(&mut self, spec: &BridgeSpec, rng: &mut TrussRng) -> Result<(), SynthesisError> {
        let mut floor = spec.floor_supports.clone();
        floor.sort_by(|a, b| a.x.total_cmp(&b.x));

        let supports: Vec<VertexId> = floor
            .iter()
            .enumerate()
            .map(|(i, &position)| {
                let simulation_fixed = if i == 0 { AxisFlags::BOTH } else { AxisFlags::Y };
                self.graph.create_vertex(
                    Vertex::new(position)
                        .with_simulation_fixed(simulation_fixed)
                        .with_evolution_fixed(AxisFlags::BOTH),
                )
            })
            .collect();

        for pair in supports.windows(2) {
            self.walk_floor(pair[0], pair[1], rng)?;
        }
        Ok(())
    }

    /// Step from `from` towards `to` along the floor line.
    fn walk_floor(
        &mut self,
        from: VertexId,
        to: VertexId,
        rng: &mut TrussRng,
    ) -> Result<(), SynthesisError> {
        let target = self.graph[to].position;
        let area = self.skeleton_area();
        let mut path = vec![from];

        for _ in 0..self.config.synthesis_limit {
            let last = *path.last().unwrap_or(&from);
            let position = self.graph[last].position;
            let step = rng.reversed_half_normal_in(self.config.connection_range());

            if position.x + step < target.x {
                let next = self.graph.create_vertex(
                    Vertex::new(Vec2::new(position.x + step, target.y))
                        .with_evolution_fixed(AxisFlags::Y),
                );
                self.graph.add_edge(last, next, self.config.elasticity, area);
                path.push(next);
                continue;
            }

            if target.x - position.x >= self.config.min_vertex_distance || path.len() == 1 {
                self.graph.add_edge(last, to, self.config.elasticity, area);
                return Ok(());
            }
            // Too tight to close: drop the last speculative joint.
            trace!("floor walk backtracks at x = {:.3}", position.x);
            self.graph.remove_vertex(last);
            path.pop();
        }
        Err(SynthesisError::WalkExhausted {
            iterations: self.config.synthesis_limit,
        })
    }

    /// Walk from an extra support towards the nearest existing joint.
    fn walk_from_extra_support(
        &mut self,
        support: Vec2,
        rng: &mut TrussRng,
    ) -> Result<(), SynthesisError> {
        let Some(target) = self.graph.nearest_vertex(support, |_| true) else {
            return Err(SynthesisError::WalkExhausted { iterations: 0 });
        };
        let start = self.graph.create_vertex(
            Vertex::new(support)
                .with_simulation_fixed(AxisFlags::Y)
                .with_evolution_fixed(AxisFlags::BOTH),
        );
        let target_position = self.graph[target].position;
        let area = self.skeleton_area();
        let mut path = vec![start];

        for _ in 0..self.config.synthesis_limit {
            let last = *path.last().unwrap_or(&start);
            let position = self.graph[last].position;
            let distance = position.distance(target_position);

            if self.in_connection_range(distance) {
                self.graph.add_edge(last, target, self.config.elasticity, area);
                return Ok(());
            }

            let heading = (target_position - position).angle();
            let angle = heading + rng.uniform(-WALK_ANGLE_TOLERANCE..=WALK_ANGLE_TOLERANCE);
            let step = rng.reversed_half_normal_in(self.config.connection_range());
            let next = position + Vec2::from_polar(step, angle);

            let stalled = next.distance(target_position) < self.config.min_vertex_distance
                || self.crowds(&self.graph, next);
            if stalled {
                if path.len() > 1 {
                    trace!("support walk backtracks at ({:.3}, {:.3})", position.x, position.y);
                    self.graph.remove_vertex(last);
                    path.pop();
                }
                continue;
            }

            let id = self.graph.create_vertex(Vertex::new(next));
            self.graph.add_edge(last, id, self.config.elasticity, area);
            path.push(id);
        }
        Err(SynthesisError::WalkExhausted {
            iterations: self.config.synthesis_limit,
        })
    }

    /// Add one joint beside each skeleton member, all on the same side.
    fn triangulate_skeleton(&mut self, members: &[EdgeId], rng: &mut TrussRng) {
        let up = rng.coin();
        let left = rng.coin();
        let area = self.skeleton_area();
        let max_height = self.config.max_edge_length * 3f64.sqrt() / 2.0;

        for &e in members {
            let Some((p, q)) = self.graph.edge_positions(e) else {
                continue;
            };
            let (p, q) = if (p.x, p.y) <= (q.x, q.y) { (p, q) } else { (q, p) };
            let direction = (q - p).angle();
            let height = rng.reversed_half_normal_in(self.config.min_vertex_distance..=max_height);
            let side = if direction.abs() < HORIZONTAL_TOLERANCE { up } else { left };
            let normal = direction + if side { FRAC_PI_2 } else { -FRAC_PI_2 };
            let point = (p + q) / 2.0 + Vec2::from_polar(height, normal);

            if self.crowds(&self.graph, point) {
                continue;
            }
            let near = self.connectable(&self.graph, point);
            if near.len() < 2 {
                continue;
            }
            let v = self.graph.create_vertex(Vertex::new(point));
            for n in near {
                self.graph.add_edge(v, n, self.config.elasticity, area);
            }
        }
    }

    /// Add random joints around `anchors` until the structure is solvable.
    fn repair(&mut self, anchors: &[VertexId], rng: &mut TrussRng) -> Result<(), SynthesisError> {
        let limit = self.config.synthesis_limit;
        let mut iterations = 0;
        while !self.is_solvable() {
            loop {
                if iterations >= limit {
                    return Err(SynthesisError::RepairExhausted { iterations });
                }
                iterations += 1;
                if self.try_repair_joint(anchors, rng) {
                    break;
                }
            }
        }
        trace!("repair finished after {iterations} iterations");
        Ok(())
    }

    fn try_repair_joint(&mut self, anchors: &[VertexId], rng: &mut TrussRng) -> bool {
        let Some(&anchor) = rng.choose(anchors) else {
            return false;
        };
        let Some(origin) = self.graph.vertex(anchor).map(|v| v.position) else {
            return false;
        };
        let radius = rng.uniform(self.config.connection_range());
        let point = origin + Vec2::from_polar(radius, rng.angle());
        if self.crowds(&self.graph, point) || self.member_near(&self.graph, point).is_some() {
            return false;
        }
        let near = self.connectable(&self.graph, point);
        if near.len() < 2 {
            return false;
        }
        let v = self.graph.create_vertex(Vertex::new(point));
        for n in near {
            let area = self.skeleton_area();
            self.graph.add_edge(v, n, self.config.elasticity, area);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ArchetypeError;

    fn floor_joints(topology: &Topology) -> Vec<Vec2> {
        let mut xs: Vec<Vec2> = topology
            .graph()
            .vertices()
            .filter(|(_, v)| v.evolution_fixed.y && v.position.y == 0.0)
            .map(|(_, v)| v.position)
            .collect();
        xs.sort_by(|a, b| a.x.total_cmp(&b.x));
        xs
    }

    #[test]
    fn test_bridge_is_solvable_and_spans_floor() {
        let config = Arc::new(TopologyConfig::default());
        for seed in 0..20 {
            let mut rng = TrussRng::new(seed);
            let bridge = Topology::bridge(&BridgeSpec::default(), Arc::clone(&config), &mut rng)
                .expect("default bridge synthesizes");
            assert!(bridge.is_solvable());

            let floor = floor_joints(&bridge);
            assert_eq!(floor.first().map(|p| p.x), Some(-40.0));
            assert_eq!(floor.last().map(|p| p.x), Some(40.0));
            for pair in floor.windows(2) {
                let gap = pair[1].x - pair[0].x;
                assert!(gap >= config.min_vertex_distance - 1e-9, "gap {gap}");
                assert!(gap <= config.max_edge_length + 1e-9, "gap {gap}");
            }
        }
    }

    #[test]
    fn test_bridge_supports() {
        let config = Arc::new(TopologyConfig::default());
        let mut rng = TrussRng::new(4);
        let bridge = Topology::bridge(&BridgeSpec::default(), config, &mut rng).unwrap();
        let supports: Vec<&Vertex> = bridge
            .graph()
            .vertices()
            .map(|(_, v)| v)
            .filter(|v| v.is_support())
            .collect();
        assert_eq!(supports.len(), 2);
        let pinned = supports
            .iter()
            .find(|v| v.position.x == -40.0)
            .expect("left support");
        assert_eq!(pinned.simulation_fixed, AxisFlags::BOTH);
        assert!(supports.iter().all(|v| v.evolution_fixed == AxisFlags::BOTH));
    }

    #[test]
    fn test_bridge_with_extra_support() {
        let config = Arc::new(TopologyConfig::default());
        let spec = BridgeSpec::new(vec![Vec2::new(-20.0, 0.0), Vec2::new(20.0, 0.0)])
            .with_extra_supports(vec![Vec2::new(0.0, -15.0)]);
        let mut rng = TrussRng::new(8);
        let bridge = Topology::bridge(&spec, config, &mut rng).unwrap();
        let extra = bridge
            .graph()
            .vertices()
            .find(|(_, v)| v.position == Vec2::new(0.0, -15.0))
            .map(|(id, _)| id)
            .expect("extra support joint");
        assert!(!bridge.graph().neighbors(extra).is_empty());
        assert!(bridge.is_solvable());
    }

    #[test]
    fn test_support_walk_reaches_target_within_small_limit() {
        let config = Arc::new(TopologyConfig {
            synthesis_limit: 50,
            ..TopologyConfig::default()
        });
        let spec = BridgeSpec::new(vec![Vec2::new(-20.0, 0.0), Vec2::new(20.0, 0.0)]);
        let range = config.connection_range();
        for seed in 0..20 {
            let mut rng = TrussRng::new(seed);
            let mut topology = Topology::new(config.clone());
            topology.build_floor(&spec, &mut rng).unwrap();
            topology
                .walk_from_extra_support(Vec2::new(0.0, -25.0), &mut rng)
                .unwrap_or_else(|e| panic!("seed {seed}: {e}"));

            let graph = topology.graph();
            let (extra, _) = graph
                .vertices()
                .find(|(_, v)| v.position == Vec2::new(0.0, -25.0))
                .expect("extra support joint");
            assert!(!graph.neighbors(extra).is_empty());
            for (_, edge) in graph.edges() {
                let (a, b) = edge.vertices();
                let length = graph[a].position.distance(graph[b].position);
                assert!(range.contains(&length), "seed {seed}: member of {length:.3} m");
            }
        }
    }

    #[test]
    fn test_invalid_layout_is_rejected() {
        let config = Arc::new(TopologyConfig::default());
        let mut rng = TrussRng::new(0);
        let spec = BridgeSpec::new(vec![Vec2::new(0.0, 0.0)]);
        assert_eq!(
            Topology::bridge(&spec, config, &mut rng).err(),
            Some(SynthesisError::Archetype(ArchetypeError::TooFewSupports(1)))
        );
    }

    #[test]
    fn test_repair_limit_aborts() {
        // Nothing fits between joints 1 m apart with 1 m members.
        let config = Arc::new(TopologyConfig {
            max_edge_length: 1.0,
            max_crossover_radius: 1.0,
            synthesis_limit: 50,
            ..Default::default()
        });
        let spec = TowerSpec {
            support_xs: vec![0.0, 1.0],
        };
        let mut rng = TrussRng::new(1);
        // Two fully fixed joints are solvable on their own; add a loose one.
        let mut topology = Topology::tower(&spec, Arc::clone(&config), &mut rng).unwrap();
        topology
            .graph_mut()
            .create_vertex(Vertex::new(Vec2::new(30.0, 30.0)));
        let anchors = topology.graph().vertex_ids();
        assert_eq!(
            topology.repair(&anchors, &mut rng),
            Err(SynthesisError::RepairExhausted { iterations: 50 })
        );
    }

    #[test]
    fn test_tower_is_solvable() {
        let config = Arc::new(TopologyConfig::default());
        for seed in 0..10 {
            let mut rng = TrussRng::new(seed);
            let tower = Topology::tower(&TowerSpec::default(), Arc::clone(&config), &mut rng)
                .expect("default tower synthesizes");
            assert!(tower.is_solvable());
            assert!(tower.graph().vertex_count() > 2);
        }
    }

    #[test]
    fn test_same_seed_same_bridge() {
        let config = Arc::new(TopologyConfig::default());
        let spec = BridgeSpec::default();
        let a = Topology::bridge(&spec, Arc::clone(&config), &mut TrussRng::new(21)).unwrap();
        let b = Topology::bridge(&spec, config, &mut TrussRng::new(21)).unwrap();
        assert_eq!(a.graph(), b.graph());
    }
}
