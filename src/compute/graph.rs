//! Arena-backed truss graph.
//!
//! Joints and members live in dense slot arrays addressed by [`VertexId`] and
//! [`EdgeId`]. Adjacency is stored as per-joint member id lists, kept
//! symmetric. Freed slots are recycled, so ids stay small across long runs,
//! and `Clone` preserves every id.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use super::geometry::Vec2;

/// Identifier of a joint within one graph (and its clones).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub usize);

/// Identifier of a member within one graph (and its clones).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub usize);

/// Independent per-axis flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AxisFlags {
    pub x: bool,
    pub y: bool,
}

impl AxisFlags {
    pub const NONE: AxisFlags = AxisFlags { x: false, y: false };
    pub const X: AxisFlags = AxisFlags { x: true, y: false };
    pub const Y: AxisFlags = AxisFlags { x: false, y: true };
    pub const BOTH: AxisFlags = AxisFlags { x: true, y: true };

    #[inline]
    pub fn any(self) -> bool {
        self.x || self.y
    }

    #[inline]
    pub fn all(self) -> bool {
        self.x && self.y
    }

    /// Exactly one axis set.
    #[inline]
    pub fn single(self) -> bool {
        self.x != self.y
    }

    /// True when both flag sets have at least one axis in common.
    #[inline]
    pub fn shares_axis(self, other: AxisFlags) -> bool {
        (self.x && other.x) || (self.y && other.y)
    }

    #[inline]
    pub fn count(self) -> usize {
        self.x as usize + self.y as usize
    }
}

/// A truss joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Vec2,
    /// Support axes during structural analysis.
    pub simulation_fixed: AxisFlags,
    /// Axes that genetic edits must not change.
    pub evolution_fixed: AxisFlags,
    /// Accumulated external force, if any.
    pub force: Option<Vec2>,
}

impl Vertex {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            simulation_fixed: AxisFlags::NONE,
            evolution_fixed: AxisFlags::NONE,
            force: None,
        }
    }

    pub fn with_simulation_fixed(mut self, flags: AxisFlags) -> Self {
        self.simulation_fixed = flags;
        self
    }

    pub fn with_evolution_fixed(mut self, flags: AxisFlags) -> Self {
        self.evolution_fixed = flags;
        self
    }

    pub fn with_force(mut self, force: Vec2) -> Self {
        self.force = Some(force);
        self
    }

    #[inline]
    pub fn is_support(&self) -> bool {
        self.simulation_fixed.any()
    }
}

/// A two-force member between two distinct joints.
///
/// Endpoints are stored in ascending id order, so two members over the same
/// pair compare equal regardless of construction order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    a: VertexId,
    b: VertexId,
    /// Young's modulus, in Pa.
    pub elasticity: f64,
    /// Cross-sectional area, in m².
    pub area: f64,
}

impl Edge {
    #[inline]
    pub fn vertices(&self) -> (VertexId, VertexId) {
        (self.a, self.b)
    }

    #[inline]
    pub fn contains(&self, v: VertexId) -> bool {
        self.a == v || self.b == v
    }

    /// The endpoint that is not `v`.
    #[inline]
    pub fn other(&self, v: VertexId) -> VertexId {
        if self.a == v { self.b } else { self.a }
    }
}

/// Axis-aligned frame around a structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Structural invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("member endpoints must differ (joint {0:?})")]
    SelfLoop(VertexId),
    #[error("joint {0:?} does not exist")]
    MissingVertex(VertexId),
    #[error("joints {0:?} and {1:?} are already connected")]
    DuplicateEdge(VertexId, VertexId),
}

#[derive(Debug, Clone, PartialEq)]
struct VertexSlot {
    vertex: Vertex,
    edges: Vec<EdgeId>,
}

/// Undirected, loop-free, multi-edge-free joint/member graph.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Graph {
    vertices: Vec<Option<VertexSlot>>,
    edges: Vec<Option<Edge>>,
    free_vertices: Vec<usize>,
    free_edges: Vec<usize>,
    vertex_count: usize,
    edge_count: usize,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Insert a joint with an empty adjacency list.
    pub fn create_vertex(&mut self, vertex: Vertex) -> VertexId {
        let slot = VertexSlot {
            vertex,
            edges: Vec::new(),
        };
        self.vertex_count += 1;
        match self.free_vertices.pop() {
            Some(index) => {
                self.vertices[index] = Some(slot);
                VertexId(index)
            }
            None => {
                self.vertices.push(Some(slot));
                VertexId(self.vertices.len() - 1)
            }
        }
    }

    /// Connect two joints.
    ///
    /// # Panics
    ///
    /// On a self-loop, a missing endpoint or an already connected pair.
    pub fn add_edge(&mut self, a: VertexId, b: VertexId, elasticity: f64, area: f64) -> EdgeId {
        match self.try_add_edge(a, b, elasticity, area) {
            Ok(id) => id,
            Err(e) => panic!("invalid member: {e}"),
        }
    }

    /// Checked form of [`add_edge`](Self::add_edge).
    pub fn try_add_edge(
        &mut self,
        a: VertexId,
        b: VertexId,
        elasticity: f64,
        area: f64,
    ) -> Result<EdgeId, GraphError> {
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        for v in [a, b] {
            if !self.contains_vertex(v) {
                return Err(GraphError::MissingVertex(v));
            }
        }
        if self.are_neighbors(a, b) {
            return Err(GraphError::DuplicateEdge(a, b));
        }

        let edge = Edge {
            a: a.min(b),
            b: a.max(b),
            elasticity,
            area,
        };
        let id = match self.free_edges.pop() {
            Some(index) => {
                self.edges[index] = Some(edge);
                EdgeId(index)
            }
            None => {
                self.edges.push(Some(edge));
                EdgeId(self.edges.len() - 1)
            }
        };
        self.edge_count += 1;
        for v in [a, b] {
            if let Some(slot) = self.vertices[v.0].as_mut() {
                slot.edges.push(id);
            }
        }
        Ok(id)
    }

    /// Remove a joint and every member incident to it.
    pub fn remove_vertex(&mut self, v: VertexId) -> Option<Vertex> {
        let incident = self.slot(v)?.edges.clone();
        for e in incident {
            self.remove_edge(e);
        }
        let slot = self.vertices.get_mut(v.0)?.take()?;
        self.free_vertices.push(v.0);
        self.vertex_count -= 1;
        Some(slot.vertex)
    }

    /// Remove a member from both endpoint lists. No-op if absent.
    pub fn remove_edge(&mut self, e: EdgeId) -> Option<Edge> {
        let edge = self.edges.get_mut(e.0)?.take()?;
        for v in [edge.a, edge.b] {
            if let Some(slot) = self.vertices[v.0].as_mut() {
                slot.edges.retain(|&x| x != e);
            }
        }
        self.free_edges.push(e.0);
        self.edge_count -= 1;
        Some(edge)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    #[inline]
    fn slot(&self, v: VertexId) -> Option<&VertexSlot> {
        self.vertices.get(v.0).and_then(Option::as_ref)
    }

    #[inline]
    pub fn contains_vertex(&self, v: VertexId) -> bool {
        self.slot(v).is_some()
    }

    #[inline]
    pub fn vertex(&self, v: VertexId) -> Option<&Vertex> {
        self.slot(v).map(|s| &s.vertex)
    }

    #[inline]
    pub fn vertex_mut(&mut self, v: VertexId) -> Option<&mut Vertex> {
        self.vertices
            .get_mut(v.0)
            .and_then(Option::as_mut)
            .map(|s| &mut s.vertex)
    }

    #[inline]
    pub fn edge(&self, e: EdgeId) -> Option<&Edge> {
        self.edges.get(e.0).and_then(Option::as_ref)
    }

    #[inline]
    pub fn edge_mut(&mut self, e: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(e.0).and_then(Option::as_mut)
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }

    /// Live joints in slot order.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (VertexId(i), &s.vertex)))
    }

    pub fn vertex_ids(&self) -> Vec<VertexId> {
        self.vertices().map(|(id, _)| id).collect()
    }

    /// Live members in slot order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (EdgeId(i), e)))
    }

    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges().map(|(id, _)| id).collect()
    }

    /// Members incident to `v`; empty for an unknown joint.
    pub fn edges_of(&self, v: VertexId) -> &[EdgeId] {
        self.slot(v).map(|s| s.edges.as_slice()).unwrap_or(&[])
    }

    pub fn neighbors(&self, v: VertexId) -> Vec<VertexId> {
        self.edges_of(v)
            .iter()
            .filter_map(|&e| self.edge(e).map(|edge| edge.other(v)))
            .collect()
    }

    pub fn are_neighbors(&self, a: VertexId, b: VertexId) -> bool {
        self.edge_between(a, b).is_some()
    }

    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.edges_of(a)
            .iter()
            .copied()
            .find(|&e| self.edge(e).is_some_and(|edge| edge.other(a) == b))
    }

    /// Endpoint positions of a member.
    pub fn edge_positions(&self, e: EdgeId) -> Option<(Vec2, Vec2)> {
        let edge = self.edge(e)?;
        Some((self[edge.a].position, self[edge.b].position))
    }

    pub fn edge_length(&self, e: EdgeId) -> f64 {
        self.edge_positions(e)
            .map(|(p, q)| p.distance(q))
            .unwrap_or(0.0)
    }

    /// Area × length, in m³.
    pub fn edge_volume(&self, e: EdgeId) -> f64 {
        self.edge(e)
            .map(|edge| edge.area * self.edge_length(e))
            .unwrap_or(0.0)
    }

    pub fn total_volume(&self) -> f64 {
        self.edges().map(|(e, _)| self.edge_volume(e)).sum()
    }

    /// Closest joint to `point` among those accepted by `filter`.
    pub fn nearest_vertex(
        &self,
        point: Vec2,
        mut filter: impl FnMut(VertexId) -> bool,
    ) -> Option<VertexId> {
        self.vertices()
            .filter(|&(id, _)| filter(id))
            .min_by(|(_, a), (_, b)| {
                a.position
                    .distance(point)
                    .total_cmp(&b.position.distance(point))
            })
            .map(|(id, _)| id)
    }

    // ------------------------------------------------------------------
    // Forces
    // ------------------------------------------------------------------

    /// Clear every accumulated force.
    pub fn reset_forces(&mut self) {
        for slot in self.vertices.iter_mut().flatten() {
            slot.vertex.force = None;
        }
    }

    /// Accumulate `force` on joint `v`.
    pub fn add_force(&mut self, v: VertexId, force: Vec2) {
        if let Some(vertex) = self.vertex_mut(v) {
            *vertex.force.get_or_insert(Vec2::ZERO) += force;
        }
    }

    // ------------------------------------------------------------------
    // Shape
    // ------------------------------------------------------------------

    /// Minimal box around all joints, expanded to `ratio` (width / height)
    /// and then scaled by `margin` around its centre. `None` when empty.
    pub fn bounding_box(&self, margin: f64, ratio: f64) -> Option<BoundingBox> {
        let mut positions = self.vertices().map(|(_, v)| v.position);
        let first = positions.next()?;
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
        for p in positions {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }

        let mut dx = max_x - min_x;
        let mut dy = max_y - min_y;
        if dy == 0.0 || dx / dy > ratio {
            dy = dx / ratio;
        } else {
            dx = dy * ratio;
        }
        dx *= margin;
        dy *= margin;

        let mid_x = (min_x + max_x) / 2.0;
        let mid_y = (min_y + max_y) / 2.0;
        Some(BoundingBox {
            min_x: mid_x - dx / 2.0,
            max_x: mid_x + dx / 2.0,
            min_y: mid_y - dy / 2.0,
            max_y: mid_y + dy / 2.0,
        })
    }

    // ------------------------------------------------------------------
    // Rigidity heuristics
    // ------------------------------------------------------------------

    /// Necessary rigidity condition, assuming three reaction components.
    ///
    /// `true` means definitely unstable; `false` is inconclusive.
    pub fn is_unstable(&self) -> bool {
        const REACTIONS: usize = 3;
        self.edge_count + REACTIONS < 2 * self.vertex_count
    }

    /// Every neighbor of `v` shares another neighbor with `v`.
    pub fn is_vertex_triangulated(&self, v: VertexId) -> bool {
        let neighbors = self.neighbors(v);
        if neighbors.is_empty() {
            return false;
        }
        neighbors.iter().all(|&n| {
            self.edges_of(n).iter().any(|&e| {
                self.edge(e)
                    .map(|edge| edge.other(n))
                    .is_some_and(|w| w != v && self.are_neighbors(w, v))
            })
        })
    }

    /// All joints triangulated; `false` for an empty graph.
    pub fn is_triangulated(&self) -> bool {
        !self.is_empty() && self.vertices().all(|(v, _)| self.is_vertex_triangulated(v))
    }
}

impl Index<VertexId> for Graph {
    type Output = Vertex;

    fn index(&self, v: VertexId) -> &Vertex {
        match self.vertex(v) {
            Some(vertex) => vertex,
            None => panic!("joint {v:?} does not exist"),
        }
    }
}

impl IndexMut<VertexId> for Graph {
    fn index_mut(&mut self, v: VertexId) -> &mut Vertex {
        match self.vertex_mut(v) {
            Some(vertex) => vertex,
            None => panic!("joint {v:?} does not exist"),
        }
    }
}

impl Index<EdgeId> for Graph {
    type Output = Edge;

    fn index(&self, e: EdgeId) -> &Edge {
        match self.edge(e) {
            Some(edge) => edge,
            None => panic!("member {e:?} does not exist"),
        }
    }
}

/// Component-wise mean of the frames of several structures.
pub fn mean_bounding_box<'a>(
    graphs: impl IntoIterator<Item = &'a Graph>,
    margin: f64,
    ratio: f64,
) -> Option<BoundingBox> {
    let boxes: Vec<BoundingBox> = graphs
        .into_iter()
        .filter_map(|g| g.bounding_box(margin, ratio))
        .collect();
    if boxes.is_empty() {
        return None;
    }
    let n = boxes.len() as f64;
    Some(BoundingBox {
        min_x: boxes.iter().map(|b| b.min_x).sum::<f64>() / n,
        max_x: boxes.iter().map(|b| b.max_x).sum::<f64>() / n,
        min_y: boxes.iter().map(|b| b.min_y).sum::<f64>() / n,
        max_y: boxes.iter().map(|b| b.max_y).sum::<f64>() / n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const E: f64 = 210e9;
    const A: f64 = 0.01;

    fn at(x: f64, y: f64) -> Vertex {
        Vertex::new(Vec2::new(x, y))
    }

    fn triangle() -> (Graph, [VertexId; 3]) {
        let mut g = Graph::new();
        let a = g.create_vertex(at(0.0, 0.0));
        let b = g.create_vertex(at(4.0, 0.0));
        let c = g.create_vertex(at(2.0, 3.0));
        g.add_edge(a, b, E, A);
        g.add_edge(b, c, E, A);
        g.add_edge(c, a, E, A);
        (g, [a, b, c])
    }

    #[test]
    fn test_triangle_is_triangulated() {
        let (g, ids) = triangle();
        assert!(g.is_triangulated());
        for v in ids {
            assert!(g.is_vertex_triangulated(v));
        }
    }

    #[test]
    fn test_path_is_not_triangulated() {
        let mut g = Graph::new();
        let a = g.create_vertex(at(0.0, 0.0));
        let b = g.create_vertex(at(4.0, 0.0));
        let c = g.create_vertex(at(8.0, 0.0));
        g.add_edge(a, b, E, A);
        g.add_edge(b, c, E, A);
        assert!(!g.is_triangulated());
        assert!(!g.is_vertex_triangulated(b));
    }

    #[test]
    fn test_empty_and_isolated() {
        let mut g = Graph::new();
        assert!(!g.is_triangulated());
        let v = g.create_vertex(at(0.0, 0.0));
        assert!(!g.is_vertex_triangulated(v));
        assert!(g.bounding_box(1.0, 1.0).is_some());
        assert!(Graph::new().bounding_box(1.0, 1.0).is_none());
    }

    #[test]
    fn test_edge_endpoints_normalized() {
        let (g, [a, b, _]) = triangle();
        let e = g.edge_between(b, a).unwrap();
        assert_eq!(g[e].vertices(), (a.min(b), a.max(b)));
        assert_eq!(g.edge_between(a, b), Some(e));
        assert!((g.edge_length(e) - 4.0).abs() < 1e-12);
        assert!((g.edge_volume(e) - 4.0 * A).abs() < 1e-12);
    }

    #[test]
    fn test_copy_independence() {
        let (g, [a, b, c]) = triangle();
        let mut copy = g.clone();
        assert_eq!(copy, g);

        copy.remove_vertex(c);
        copy[a].position = Vec2::new(-1.0, -1.0);
        if let Some(e) = copy.edge_between(a, b) {
            copy.edge_mut(e).unwrap().area = 1.0;
        }

        assert_eq!(g.vertex_count(), 3);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g[a].position, Vec2::new(0.0, 0.0));
        assert_eq!(g[g.edge_between(a, b).unwrap()].area, A);
        assert!(g.is_triangulated());
    }

    #[test]
    fn test_removal_cascade() {
        let (mut g, [a, b, c]) = triangle();
        let removed = g.remove_vertex(c);
        assert!(removed.is_some());
        assert!(!g.contains_vertex(c));
        assert_eq!(g.edge_count(), 1);
        for (_, edge) in g.edges() {
            assert!(!edge.contains(c));
        }
        assert_eq!(g.neighbors(a), vec![b]);
        assert_eq!(g.neighbors(b), vec![a]);
    }

    #[test]
    fn test_remove_missing_edge_is_noop() {
        let (mut g, [a, b, _]) = triangle();
        let e = g.edge_between(a, b).unwrap();
        assert!(g.remove_edge(e).is_some());
        assert!(g.remove_edge(e).is_none());
        assert_eq!(g.edge_count(), 2);
        assert!(!g.are_neighbors(a, b));
    }

    #[test]
    fn test_slot_reuse_keeps_ids_valid() {
        let (mut g, [a, b, c]) = triangle();
        g.remove_vertex(c);
        let d = g.create_vertex(at(2.0, -3.0));
        assert!(g.neighbors(d).is_empty());
        g.add_edge(a, d, E, A);
        g.add_edge(b, d, E, A);
        assert!(g.is_triangulated());
        assert_eq!(g.vertex_count(), 3);
    }

    #[test]
    fn test_try_add_edge_errors() {
        let (mut g, [a, b, c]) = triangle();
        assert_eq!(g.try_add_edge(a, a, E, A), Err(GraphError::SelfLoop(a)));
        assert_eq!(g.try_add_edge(a, b, E, A), Err(GraphError::DuplicateEdge(a, b)));
        g.remove_vertex(c);
        assert_eq!(g.try_add_edge(a, c, E, A), Err(GraphError::MissingVertex(c)));
    }

    #[test]
    #[should_panic]
    fn test_self_loop_panics() {
        let (mut g, [a, _, _]) = triangle();
        g.add_edge(a, a, E, A);
    }

    #[test]
    #[should_panic]
    fn test_missing_vertex_panics() {
        let (mut g, [a, _, _]) = triangle();
        g.add_edge(a, VertexId(99), E, A);
    }

    #[test]
    #[should_panic]
    fn test_duplicate_edge_panics() {
        let (mut g, [a, b, _]) = triangle();
        g.add_edge(b, a, E, A);
    }

    #[test]
    fn test_forces_accumulate_and_reset() {
        let (mut g, [a, b, _]) = triangle();
        g.add_force(a, Vec2::new(0.0, -1.0));
        g.add_force(a, Vec2::new(1.0, -2.0));
        assert_eq!(g[a].force, Some(Vec2::new(1.0, -3.0)));
        assert_eq!(g[b].force, None);
        g.reset_forces();
        assert_eq!(g[a].force, None);
    }

    #[test]
    fn test_bounding_box_ratio_and_margin() {
        let mut g = Graph::new();
        g.create_vertex(at(0.0, 0.0));
        g.create_vertex(at(10.0, 2.0));
        let bb = g.bounding_box(2.0, 2.0).unwrap();
        // 10 x 2 widened to height 5, then doubled
        assert!((bb.width() - 20.0).abs() < 1e-12);
        assert!((bb.height() - 10.0).abs() < 1e-12);
        assert!((bb.min_x + bb.max_x - 10.0).abs() < 1e-12);
        assert!((bb.min_y + bb.max_y - 2.0).abs() < 1e-12);

        let mean = mean_bounding_box([&g, &g], 2.0, 2.0).unwrap();
        assert_eq!(mean, bb);
    }

    proptest! {
        #[test]
        fn prop_is_unstable_matches_count_rule(
            n in 1usize..12,
            pairs in proptest::collection::vec((0usize..12, 0usize..12), 0..40),
        ) {
            let mut g = Graph::new();
            let ids: Vec<_> = (0..n)
                .map(|i| g.create_vertex(at(i as f64, (i * i) as f64)))
                .collect();
            for (i, j) in pairs {
                let (i, j) = (i % n, j % n);
                let _ = g.try_add_edge(ids[i], ids[j], E, A);
            }
            let v = g.vertex_count();
            let e = g.edge_count();
            prop_assert_eq!(g.is_unstable(), e + 3 < 2 * v);
        }

        #[test]
        fn prop_adjacency_stays_symmetric(
            ops in proptest::collection::vec((0usize..8, 0usize..8, proptest::bool::ANY), 0..60),
        ) {
            let mut g = Graph::new();
            let ids: Vec<_> = (0..8).map(|i| g.create_vertex(at(i as f64, 0.0))).collect();
            for (i, j, add) in ops {
                if add {
                    let _ = g.try_add_edge(ids[i], ids[j], E, A);
                } else if let Some(e) = g.edge_between(ids[i], ids[j]) {
                    g.remove_edge(e);
                }
            }
            for (e, edge) in g.edges() {
                let (a, b) = edge.vertices();
                prop_assert!(g.edges_of(a).contains(&e));
                prop_assert!(g.edges_of(b).contains(&e));
            }
            let listed: usize = ids.iter().map(|&v| g.edges_of(v).len()).sum();
            prop_assert_eq!(listed, 2 * g.edge_count());
        }
    }
}
