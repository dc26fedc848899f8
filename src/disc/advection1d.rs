use ndarray::{Array1, ArrayView1};

use crate::disc::SpatialDisc;
use crate::disc::boundary::patch1d::{periodic_closure, periodic_wrap_pairs};
use crate::disc::mesh::staggered::StaggeredAxis;
use crate::disc::mimetic1d;
use crate::disc::sparse::SparseMatrix;
use crate::disc::stencil::OperatorKind;
use crate::error::{MimeticError, Result};

/// Periodic advection `u_t + a u_x = 0` on a staggered axis.
pub struct Advection1d {
    pub order: usize,
    pub axis: StaggeredAxis,
    pub velocity: f64,
    /// `-a D_p I_p`, ghost rows empty.
    operator: SparseMatrix,
}

impl Advection1d {
    pub fn new(order: usize, axis: StaggeredAxis, velocity: f64) -> Result<Self> {
        if !velocity.is_finite() {
            return Err(MimeticError::InvalidParameter {
                name: "velocity",
                reason: format!("advection velocity must be finite, got {}", velocity),
            });
        }
        let (cells, dx) = (axis.cells, axis.dx());
        let div = mimetic1d::divergence(order, cells, dx)?
            .add(&periodic_closure(OperatorKind::Divergence, order, cells, dx)?)?;
        let interp = mimetic1d::interpolation(order, cells, dx)?
            .add(&periodic_closure(OperatorKind::Interpolation, order, cells, dx)?)?;
        let operator = div.matmul(&interp)?.scaled(-velocity);
        log::debug!(
            "periodic advection operator: order {}, {} cells, {} nonzeros",
            order,
            cells,
            operator.nnz()
        );
        Ok(Self {
            order,
            axis,
            velocity,
            operator,
        })
    }
    pub fn operator(&self) -> &SparseMatrix {
        &self.operator
    }
    /// Leapfrog propagation matrix `-2 a dt D_p I_p`.
    pub fn propagator(&self, dt: f64) -> SparseMatrix {
        self.operator.scaled(2.0 * dt)
    }
    /// Largest stable step `dx / |a|`; unbounded for a still field.
    pub fn cfl_time_step(&self) -> f64 {
        if self.velocity == 0.0 {
            f64::INFINITY
        } else {
            self.axis.dx() / self.velocity.abs()
        }
    }
}

impl SpatialDisc for Advection1d {
    fn compute_rhs(&self, u: ArrayView1<f64>) -> Result<Array1<f64>> {
        self.operator.dot(u)
    }
    fn apply_bc(&self, u: &mut Array1<f64>) {
        for (ghost, source) in periodic_wrap_pairs(self.axis.cells) {
            u[ghost] = u[source];
        }
    }
}
