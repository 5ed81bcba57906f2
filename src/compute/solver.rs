//! Linear-elastic direct-stiffness analysis of a pin-jointed plane truss.
//!
//! [`TrussModel`] takes a snapshot of a [`Graph`]: joint positions, forces and
//! support axes, plus member elasticity and area. Two degrees of freedom per
//! joint; supported axes are removed before the system is factored.

use std::collections::HashMap;

use ndarray::{Array1, Array2};

use super::geometry::Vec2;
use super::graph::{EdgeId, Graph, VertexId};

/// Members shorter than this are treated as degenerate.
const MIN_MEMBER_LENGTH: f64 = 1e-12;

/// Solver failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolverError {
    #[error("reduced stiffness matrix is singular")]
    Singular,
    #[error("member {0:?} has zero length")]
    DegenerateMember(EdgeId),
    #[error("analysis produced non-finite displacements")]
    NonFinite,
}

#[derive(Debug, Clone)]
struct Member {
    edge: EdgeId,
    a: usize,
    b: usize,
    elasticity: f64,
    area: f64,
    length: f64,
    cos: f64,
    sin: f64,
}

/// Immutable analysis snapshot of a truss graph.
#[derive(Debug, Clone)]
pub struct TrussModel {
    nodes: Vec<VertexId>,
    members: Vec<Member>,
    /// Full-length load vector, two entries per node.
    loads: Array1<f64>,
    /// Unconstrained DOF indices, ascending.
    free_dofs: Vec<usize>,
}

impl TrussModel {
    /// Snapshot the current state of `graph`.
    pub fn new(graph: &Graph) -> Self {
        let mut nodes = Vec::with_capacity(graph.vertex_count());
        let mut index = HashMap::with_capacity(graph.vertex_count());
        let mut loads = Array1::zeros(2 * graph.vertex_count());
        let mut free_dofs = Vec::new();

        for (i, (id, vertex)) in graph.vertices().enumerate() {
            nodes.push(id);
            index.insert(id, i);
            if let Some(force) = vertex.force {
                loads[2 * i] = force.x;
                loads[2 * i + 1] = force.y;
            }
            if !vertex.simulation_fixed.x {
                free_dofs.push(2 * i);
            }
            if !vertex.simulation_fixed.y {
                free_dofs.push(2 * i + 1);
            }
        }

        let members = graph
            .edges()
            .map(|(edge, e)| {
                let (va, vb) = e.vertices();
                let (pa, pb) = (graph[va].position, graph[vb].position);
                let d = pb - pa;
                let length = d.length();
                let (cos, sin) = if length > MIN_MEMBER_LENGTH {
                    (d.x / length, d.y / length)
                } else {
                    (0.0, 0.0)
                };
                Member {
                    edge,
                    a: index[&va],
                    b: index[&vb],
                    elasticity: e.elasticity,
                    area: e.area,
                    length,
                    cos,
                    sin,
                }
            })
            .collect();

        Self {
            nodes,
            members,
            loads,
            free_dofs,
        }
    }

    pub fn free_dof_count(&self) -> usize {
        self.free_dofs.len()
    }

    fn degenerate_member(&self) -> Option<EdgeId> {
        self.members
            .iter()
            .find(|m| m.length <= MIN_MEMBER_LENGTH)
            .map(|m| m.edge)
    }

    /// Global stiffness matrix restricted to unconstrained DOFs.
    fn reduced_stiffness(&self) -> Array2<f64> {
        let n = self.free_dofs.len();
        let mut reduced_index = vec![usize::MAX; 2 * self.nodes.len()];
        for (r, &dof) in self.free_dofs.iter().enumerate() {
            reduced_index[dof] = r;
        }

        let mut k = Array2::zeros((n, n));
        for m in &self.members {
            let stiffness = m.elasticity * m.area / m.length;
            let dofs = [2 * m.a, 2 * m.a + 1, 2 * m.b, 2 * m.b + 1];
            let dir = [m.cos, m.sin, -m.cos, -m.sin];
            for i in 0..4 {
                let ri = reduced_index[dofs[i]];
                if ri == usize::MAX {
                    continue;
                }
                for j in 0..4 {
                    let rj = reduced_index[dofs[j]];
                    if rj == usize::MAX {
                        continue;
                    }
                    k[[ri, rj]] += stiffness * dir[i] * dir[j];
                }
            }
        }
        k
    }

    /// Whether the constraint/connectivity layout gives a well-posed system:
    /// the reduced stiffness matrix's 1-norm condition number is below
    /// `1 / f64::EPSILON`.
    pub fn is_solvable(&self) -> bool {
        if self.degenerate_member().is_some() {
            return false;
        }
        if self.free_dofs.is_empty() {
            return true;
        }
        let k = self.reduced_stiffness();
        let norm = one_norm(&k);
        let Some(lu) = Lu::factor(k) else {
            return false;
        };
        let inverse_norm = lu.inverse_one_norm();
        let condition = norm * inverse_norm;
        condition.is_finite() && condition < 1.0 / f64::EPSILON
    }

    /// Run the analysis.
    pub fn solve(&self) -> Result<TrussSolution, SolverError> {
        if let Some(edge) = self.degenerate_member() {
            return Err(SolverError::DegenerateMember(edge));
        }

        let mut displacement = Array1::zeros(2 * self.nodes.len());
        if !self.free_dofs.is_empty() {
            let k = self.reduced_stiffness();
            let lu = Lu::factor(k).ok_or(SolverError::Singular)?;
            let rhs = Array1::from_iter(self.free_dofs.iter().map(|&d| self.loads[d]));
            let reduced = lu.solve(&rhs);
            if reduced.iter().any(|u| !u.is_finite()) {
                return Err(SolverError::NonFinite);
            }
            for (r, &dof) in self.free_dofs.iter().enumerate() {
                displacement[dof] = reduced[r];
            }
        }

        let stresses = self
            .members
            .iter()
            .map(|m| {
                let du = displacement[2 * m.b] - displacement[2 * m.a];
                let dv = displacement[2 * m.b + 1] - displacement[2 * m.a + 1];
                let stress = m.elasticity / m.length * (m.cos * du + m.sin * dv);
                (m.edge, stress)
            })
            .collect();

        let displacements = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, Vec2::new(displacement[2 * i], displacement[2 * i + 1])))
            .collect();

        Ok(TrussSolution {
            stresses,
            displacements,
        })
    }
}

/// Result of a successful analysis.
#[derive(Debug, Clone)]
pub struct TrussSolution {
    stresses: Vec<(EdgeId, f64)>,
    displacements: Vec<(VertexId, Vec2)>,
}

impl TrussSolution {
    /// Axial stress of a member in Pa, tension positive.
    pub fn stress(&self, edge: EdgeId) -> Option<f64> {
        self.stresses
            .iter()
            .find(|(e, _)| *e == edge)
            .map(|&(_, s)| s)
    }

    pub fn displacement(&self, vertex: VertexId) -> Option<Vec2> {
        self.displacements
            .iter()
            .find(|(v, _)| *v == vertex)
            .map(|&(_, d)| d)
    }

    /// Largest absolute member stress, 0 when there are no members.
    pub fn max_stress(&self) -> f64 {
        self.stresses
            .iter()
            .map(|(_, s)| s.abs())
            .fold(0.0, f64::max)
    }

    /// Mean of the `n` largest absolute member stresses (fewer if the truss
    /// has fewer members).
    pub fn max_stresses_mean(&self, n: usize) -> f64 {
        let mut magnitudes: Vec<f64> = self.stresses.iter().map(|(_, s)| s.abs()).collect();
        magnitudes.sort_by(|a, b| b.total_cmp(a));
        let take = n.min(magnitudes.len());
        if take == 0 {
            return 0.0;
        }
        magnitudes[..take].iter().sum::<f64>() / take as f64
    }

    /// Copy of `graph` with joints moved by `factor` × displacement.
    pub fn deformed(&self, graph: &Graph, factor: f64) -> Graph {
        let mut deformed = graph.clone();
        for &(v, d) in &self.displacements {
            if let Some(vertex) = deformed.vertex_mut(v) {
                vertex.position += d * factor;
            }
        }
        deformed
    }
}

fn one_norm(m: &Array2<f64>) -> f64 {
    m.columns()
        .into_iter()
        .map(|col| col.iter().map(|x| x.abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

/// LU factorization with partial pivoting, `P·A = L·U` stored in place.
///
/// ndarray only factorizes through a LAPACK backend; reduced stiffness
/// systems are small and dense, so plain elimination is enough.
struct Lu {
    lu: Array2<f64>,
    perm: Vec<usize>,
}

impl Lu {
    /// `None` when a pivot vanishes relative to the largest entry.
    fn factor(mut a: Array2<f64>) -> Option<Self> {
        let n = a.nrows();
        let mut perm: Vec<usize> = (0..n).collect();
        let scale = a.iter().fold(0.0f64, |m, x| m.max(x.abs()));
        let tolerance = scale * f64::EPSILON * n as f64;

        for k in 0..n {
            let (pivot_row, pivot) = (k..n)
                .map(|r| (r, a[[r, k]].abs()))
                .max_by(|x, y| x.1.total_cmp(&y.1))?;
            if pivot <= tolerance || !pivot.is_finite() {
                return None;
            }
            if pivot_row != k {
                for c in 0..n {
                    a.swap([k, c], [pivot_row, c]);
                }
                perm.swap(k, pivot_row);
            }
            let diag = a[[k, k]];
            for r in (k + 1)..n {
                let factor = a[[r, k]] / diag;
                a[[r, k]] = factor;
                if factor == 0.0 {
                    continue;
                }
                for c in (k + 1)..n {
                    a[[r, c]] -= factor * a[[k, c]];
                }
            }
        }
        Some(Self { lu: a, perm })
    }

    fn solve(&self, b: &Array1<f64>) -> Array1<f64> {
        let n = self.lu.nrows();
        let mut x = Array1::from_iter(self.perm.iter().map(|&p| b[p]));
        for r in 0..n {
            let mut sum = x[r];
            for c in 0..r {
                sum -= self.lu[[r, c]] * x[c];
            }
            x[r] = sum;
        }
        for r in (0..n).rev() {
            let mut sum = x[r];
            for c in (r + 1)..n {
                sum -= self.lu[[r, c]] * x[c];
            }
            x[r] = sum / self.lu[[r, r]];
        }
        x
    }

    /// ‖A⁻¹‖₁, column by column.
    fn inverse_one_norm(&self) -> f64 {
        let n = self.lu.nrows();
        let mut unit = Array1::zeros(n);
        let mut norm = 0.0f64;
        for j in 0..n {
            unit[j] = 1.0;
            let column = self.solve(&unit);
            unit[j] = 0.0;
            norm = norm.max(column.iter().map(|x| x.abs()).sum());
        }
        norm
    }
}
