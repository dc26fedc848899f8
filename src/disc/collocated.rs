use ndarray::{Array1, ArrayView1};

use crate::disc::FluxOperators;
use crate::disc::mesh::collocated::CollocatedGrid;
use crate::disc::mimetic1d;
use crate::disc::sparse::SparseMatrix;
use crate::disc::tensor::{KroneckerOperator, lift_axis};
use crate::error::{MimeticError, Result, check_len};

/// Nodal derivative along each axis of a collocated grid, lifted with
/// identities on the other axes.
fn nodal_derivatives(order: usize, grid: &CollocatedGrid) -> Result<Vec<KroneckerOperator>> {
    (0..grid.dim())
        .map(|a| {
            let op = mimetic1d::nodal(order, grid.cells(a), grid.spacing[a])?;
            let others: Vec<SparseMatrix> = (0..grid.dim())
                .filter(|&b| b != a)
                .map(|b| SparseMatrix::identity(grid.shape[b]))
                .collect();
            lift_axis(&op, &others, a)
        })
        .collect()
}

/// Gradient and divergence on a rectilinear collocated grid.
#[derive(Clone, Debug)]
pub struct RectilinearOperators {
    pub order: usize,
    derivatives: Vec<KroneckerOperator>,
    min_spacing: f64,
}

impl RectilinearOperators {
    pub fn new(order: usize, grid: &CollocatedGrid) -> Result<Self> {
        let derivatives = nodal_derivatives(order, grid)?;
        log::debug!(
            "rectilinear collocated operators of order {} on {:?} nodes",
            order,
            grid.shape
        );
        Ok(Self {
            order,
            derivatives,
            min_spacing: grid.spacing.iter().copied().fold(f64::INFINITY, f64::min),
        })
    }
}

impl FluxOperators for RectilinearOperators {
    fn dim(&self) -> usize {
        self.derivatives.len()
    }
    fn node_count(&self) -> usize {
        self.derivatives[0].ncols()
    }
    fn min_spacing(&self) -> f64 {
        self.min_spacing
    }
    fn gradient(&self, u: ArrayView1<f64>) -> Result<Vec<Array1<f64>>> {
        self.derivatives.iter().map(|d| d.apply(u)).collect()
    }
    fn divergence(&self, fluxes: &[Array1<f64>]) -> Result<Array1<f64>> {
        check_len("flux components", self.derivatives.len(), fluxes.len())?;
        let mut div = Array1::zeros(self.node_count());
        for (d, flux) in self.derivatives.iter().zip(fluxes.iter()) {
            div += &d.apply(flux.view())?;
        }
        Ok(div)
    }
}

/// Collocated operators on a curvilinear 2D grid.
///
/// Metric terms come from the same nodal derivatives that act on the
/// fields, so linear fields get exact gradients and constant fluxes have
/// zero divergence.
#[derive(Clone, Debug)]
pub struct CurvilinearOperators2d {
    pub order: usize,
    d_xi: KroneckerOperator,
    d_eta: KroneckerOperator,
    pub x_xi: Array1<f64>,
    pub x_eta: Array1<f64>,
    pub y_xi: Array1<f64>,
    pub y_eta: Array1<f64>,
    pub jacobian: Array1<f64>,
    min_spacing: f64,
}

impl CurvilinearOperators2d {
    pub fn new(order: usize, grid: &CollocatedGrid) -> Result<Self> {
        if grid.dim() != 2 {
            return Err(MimeticError::DimensionMismatch {
                context: "curvilinear grid dimension",
                expected: 2,
                found: grid.dim(),
            });
        }
        let mut derivatives = nodal_derivatives(order, grid)?.into_iter();
        let (d_xi, d_eta) = match (derivatives.next(), derivatives.next()) {
            (Some(d_xi), Some(d_eta)) => (d_xi, d_eta),
            _ => {
                return Err(MimeticError::DimensionMismatch {
                    context: "curvilinear derivatives",
                    expected: 2,
                    found: grid.dim(),
                });
            }
        };
        let x = grid.coords[0].view();
        let y = grid.coords[1].view();
        let x_xi = d_xi.apply(x)?;
        let x_eta = d_eta.apply(x)?;
        let y_xi = d_xi.apply(y)?;
        let y_eta = d_eta.apply(y)?;
        let jacobian = &x_xi * &y_eta - &x_eta * &y_xi;
        if let Some((node, &j)) = jacobian
            .iter()
            .enumerate()
            .find(|&(_, &j)| !(j.is_finite() && j > 0.0))
        {
            return Err(MimeticError::DegenerateMetric { node, jacobian: j });
        }
        log::debug!(
            "curvilinear operators of order {} on {:?} nodes",
            order,
            grid.shape
        );
        Ok(Self {
            order,
            d_xi,
            d_eta,
            x_xi,
            x_eta,
            y_xi,
            y_eta,
            jacobian,
            min_spacing: grid.min_spacing(),
        })
    }
}

impl FluxOperators for CurvilinearOperators2d {
    fn dim(&self) -> usize {
        2
    }
    fn node_count(&self) -> usize {
        self.jacobian.len()
    }
    fn min_spacing(&self) -> f64 {
        self.min_spacing
    }
    fn gradient(&self, u: ArrayView1<f64>) -> Result<Vec<Array1<f64>>> {
        let u_xi = self.d_xi.apply(u)?;
        let u_eta = self.d_eta.apply(u)?;
        let u_x = (&self.y_eta * &u_xi - &self.y_xi * &u_eta) / &self.jacobian;
        let u_y = (&self.x_xi * &u_eta - &self.x_eta * &u_xi) / &self.jacobian;
        Ok(vec![u_x, u_y])
    }
    fn divergence(&self, fluxes: &[Array1<f64>]) -> Result<Array1<f64>> {
        check_len("flux components", 2, fluxes.len())?;
        let (fx, fy) = (&fluxes[0], &fluxes[1]);
        check_len("x flux", self.node_count(), fx.len())?;
        check_len("y flux", self.node_count(), fy.len())?;
        // contravariant fluxes scaled by the Jacobian
        let f_xi = &self.y_eta * fx - &self.x_eta * fy;
        let f_eta = &self.x_xi * fy - &self.y_xi * fx;
        let div = self.d_xi.apply(f_xi.view())? + self.d_eta.apply(f_eta.view())?;
        Ok(div / &self.jacobian)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn wavy_grid(n: usize) -> CollocatedGrid {
        CollocatedGrid::from_mapping([n, n + 3], |xi, eta| {
            (
                (1.0 + 0.05 * (2.0 * PI * eta).sin()) * xi,
                (1.0 + 0.05 * (2.0 * PI * xi).cos()) * eta,
            )
        })
        .unwrap()
    }

    #[test]
    fn test_linear_field_has_exact_gradient() {
        for order in [2, 4, 6] {
            let grid = wavy_grid(21);
            let ops = CurvilinearOperators2d::new(order, &grid).unwrap();
            let u = grid.sample(|p| 3.0 * p[0] - 2.0 * p[1] + 1.0);
            let grad = ops.gradient(u.view()).unwrap();
            for (gx, gy) in grad[0].iter().zip(grad[1].iter()) {
                assert_relative_eq!(*gx, 3.0, epsilon = 1e-9);
                assert_relative_eq!(*gy, -2.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_constant_flux_is_divergence_free() {
        let grid = wavy_grid(17);
        let ops = CurvilinearOperators2d::new(4, &grid).unwrap();
        let n = grid.node_count();
        let fluxes = vec![Array1::from_elem(n, 0.7), Array1::from_elem(n, -1.3)];
        let div = ops.divergence(&fluxes).unwrap();
        for d in div.iter() {
            assert_relative_eq!(*d, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_folded_mapping_is_rejected() {
        let grid = CollocatedGrid::from_mapping([11, 11], |xi, eta| (1.0 - xi, eta)).unwrap();
        assert!(matches!(
            CurvilinearOperators2d::new(2, &grid),
            Err(MimeticError::DegenerateMetric { .. })
        ));
    }

    #[test]
    fn test_rectilinear_3d_divergence_of_linear_flux() {
        let grid =
            CollocatedGrid::uniform(&[6, 7, 8], &[(0.0, 1.0), (0.0, 2.0), (-1.0, 1.0)]).unwrap();
        let ops = RectilinearOperators::new(2, &grid).unwrap();
        assert_eq!(ops.node_count(), 336);
        let fluxes = vec![
            grid.sample(|p| 2.0 * p[0]),
            grid.sample(|p| p[1] + p[0]),
            grid.sample(|p| -0.5 * p[2]),
        ];
        let div = ops.divergence(&fluxes).unwrap();
        for d in div.iter() {
            assert_relative_eq!(*d, 2.5, epsilon = 1e-10);
        }
        let grad = ops.gradient(grid.sample(|p| p[2] * p[2]).view()).unwrap();
        let expected = grid.sample(|p| 2.0 * p[2]);
        for (g, e) in grad[2].iter().zip(expected.iter()) {
            assert_relative_eq!(*g, *e, epsilon = 1e-10);
        }
    }
}
