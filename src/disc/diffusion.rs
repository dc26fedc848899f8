use ndarray::{Array1, ArrayView1};

use crate::disc::flux::Flux;
use crate::disc::{FluxOperators, SpatialDisc};
use crate::error::{MimeticError, Result, check_len};

/// `u_t = -div F` with `F = -K grad u`, fixed values on the listed nodes.
pub struct Diffusion<O: FluxOperators> {
    pub operators: O,
    pub flux: Flux,
    fixed_nodes: Vec<usize>,
    fixed_values: Vec<f64>,
}

impl<O: FluxOperators> Diffusion<O> {
    pub fn new(
        operators: O,
        flux: Flux,
        fixed_nodes: Vec<usize>,
        fixed_values: Vec<f64>,
    ) -> Result<Self> {
        check_len("fixed values", fixed_nodes.len(), fixed_values.len())?;
        let n = operators.node_count();
        if let Some(&bad) = fixed_nodes.iter().find(|&&i| i >= n) {
            return Err(MimeticError::DimensionMismatch {
                context: "fixed node index",
                expected: n,
                found: bad,
            });
        }
        Ok(Self {
            operators,
            flux,
            fixed_nodes,
            fixed_values,
        })
    }
    /// Homogeneous Dirichlet condition on `boundary`.
    pub fn with_zero_dirichlet(operators: O, flux: Flux, boundary: Vec<usize>) -> Result<Self> {
        let values = vec![0.0; boundary.len()];
        Self::new(operators, flux, boundary, values)
    }
    pub fn fixed_nodes(&self) -> &[usize] {
        &self.fixed_nodes
    }
    /// `h_min^2 / (4 d kappa_max)`.
    pub fn stable_time_step(&self) -> f64 {
        let h = self.operators.min_spacing();
        let kappa = self.flux.max_coefficient();
        h * h / (4.0 * self.operators.dim() as f64 * kappa)
    }
}

impl<O: FluxOperators> SpatialDisc for Diffusion<O> {
    fn compute_rhs(&self, u: ArrayView1<f64>) -> Result<Array1<f64>> {
        let gradient = self.operators.gradient(u)?;
        let fluxes = self.flux.compute(&gradient)?;
        Ok(-self.operators.divergence(&fluxes)?)
    }
    fn apply_bc(&self, u: &mut Array1<f64>) {
        for (&i, &v) in self.fixed_nodes.iter().zip(self.fixed_values.iter()) {
            u[i] = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::mesh::staggered::{StaggeredAxis, StaggeredGrid};
    use crate::disc::tensor::StaggeredOperators;
    use approx::assert_relative_eq;

    fn setup(kappa: f64) -> (StaggeredGrid, Diffusion<StaggeredOperators>) {
        let axes = vec![
            StaggeredAxis::new(8, 0.0, 1.0).unwrap(),
            StaggeredAxis::new(10, 0.0, 1.0).unwrap(),
        ];
        let grid = StaggeredGrid::new(axes.clone()).unwrap();
        let ops = StaggeredOperators::new(2, &axes).unwrap();
        let disc =
            Diffusion::with_zero_dirichlet(ops, Flux::Isotropic(kappa), grid.boundary_indices())
                .unwrap();
        (grid, disc)
    }

    #[test]
    fn test_rhs_sign_is_positive_laplacian() {
        let (grid, disc) = setup(0.5);
        let u = grid.sample(|p| p[0] * p[0] + p[1] * p[1]);
        let rhs = disc.compute_rhs(u.view()).unwrap();
        for idx in grid.interior_indices() {
            assert_relative_eq!(rhs[idx], 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_boundary_hook_and_time_step() {
        let (grid, disc) = setup(2.0);
        let mut u = Array1::ones(grid.node_count());
        disc.apply_bc(&mut u);
        for idx in grid.boundary_indices() {
            assert_eq!(u[idx], 0.0);
        }
        assert_relative_eq!(disc.stable_time_step(), 0.01 / 16.0);
        let (_, disc) = setup(1.0);
        assert!(Diffusion::new(disc.operators, Flux::Isotropic(1.0), vec![999], vec![0.0]).is_err());
    }
}
