pub mod patch1d;
pub mod patch_nd;

use serde::{Deserialize, Serialize};

use crate::disc::mesh::staggered::StaggeredAxis;
use crate::disc::sparse::SparseMatrix;
use crate::error::Result;

/// Boundary condition applied as an additive patch to a square operator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundaryCondition {
    /// `alpha u + beta du/dn` on the boundary rows.
    Robin { alpha: f64, beta: f64 },
    Dirichlet,
    Neumann,
    Periodic,
}

impl BoundaryCondition {
    /// `(alpha, beta)` of the Robin form, `None` for periodic.
    pub fn robin_coefficients(&self) -> Option<(f64, f64)> {
        match *self {
            BoundaryCondition::Robin { alpha, beta } => Some((alpha, beta)),
            BoundaryCondition::Dirichlet => Some((1.0, 0.0)),
            BoundaryCondition::Neumann => Some((0.0, 1.0)),
            BoundaryCondition::Periodic => None,
        }
    }
    /// `(m+2) x (m+2)` patch for a single axis.
    pub fn patch(&self, order: usize, axis: &StaggeredAxis) -> Result<SparseMatrix> {
        match self.robin_coefficients() {
            Some((alpha, beta)) => patch1d::robin(order, axis.cells, axis.dx(), alpha, beta),
            None => patch1d::periodic(axis.cells),
        }
    }
    /// Patch for the flattened node field of a staggered grid.
    pub fn patch_nd(&self, order: usize, axes: &[StaggeredAxis]) -> Result<SparseMatrix> {
        patch_nd::lift_patches(axes, |axis| self.patch(order, axis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_condition_from_json() {
        let bc: BoundaryCondition =
            serde_json::from_str(r#"{"type": "robin", "alpha": 2.0, "beta": 0.5}"#).unwrap();
        assert_eq!(bc.robin_coefficients(), Some((2.0, 0.5)));
        let bc: BoundaryCondition = serde_json::from_str(r#"{"type": "neumann"}"#).unwrap();
        assert_eq!(bc, BoundaryCondition::Neumann);
        let bc: BoundaryCondition = serde_json::from_str(r#"{"type": "periodic"}"#).unwrap();
        assert_eq!(bc.robin_coefficients(), None);
    }

    #[test]
    fn test_periodic_patch_dispatch() {
        let axis = StaggeredAxis::new(6, 0.0, 1.0).unwrap();
        let patch = BoundaryCondition::Periodic.patch(2, &axis).unwrap();
        assert_eq!(patch, patch1d::periodic(6).unwrap());
        let dirichlet = BoundaryCondition::Dirichlet.patch(2, &axis).unwrap();
        assert_eq!(dirichlet.get(0, 0), 1.0);
        assert_eq!(dirichlet.get(7, 7), 1.0);
        assert_eq!(dirichlet.nnz(), 2);
    }
}
