use faer::sparse::{SparseColMat, Triplet};
use faer::{Col, c64, prelude::Solve};
use hashbrown::HashSet;
use ndarray::{Array1, ArrayView1};

use crate::disc::boundary::BoundaryCondition;
use crate::disc::mesh::staggered::{StaggeredAxis, StaggeredGrid};
use crate::disc::sparse::SparseMatrix;
use crate::disc::tensor::StaggeredOperators;
use crate::error::{MimeticError, Result, check_len};

const RESIDUAL_TOLERANCE: f64 = 1e-8;

/// Wave number and wall response of `c = wn^2 / (1 + (r + i a) wall)^2`.
#[derive(Clone, Copy, Debug)]
pub struct HelmholtzCoefficient {
    pub wave_number: f64,
    pub reflection: f64,
    pub absorption: f64,
}

impl HelmholtzCoefficient {
    /// `(re, im)` of the coefficient at a node with wall indicator `wall`.
    pub fn evaluate(&self, wall: f64) -> (f64, f64) {
        let p = 1.0 + self.reflection * wall;
        let q = self.absorption * wall;
        // 1 / (p + i q)^2 = (p^2 - q^2 - 2 i p q) / |p + i q|^4
        let re2 = p * p - q * q;
        let im2 = 2.0 * p * q;
        let norm = re2 * re2 + im2 * im2;
        let k2 = self.wave_number * self.wave_number;
        (k2 * re2 / norm, -k2 * im2 / norm)
    }
}

/// Complex node field stored as real and imaginary parts.
#[derive(Clone, Debug)]
pub struct ComplexField {
    pub re: Array1<f64>,
    pub im: Array1<f64>,
}

impl ComplexField {
    pub fn real(re: Array1<f64>) -> Self {
        let im = Array1::zeros(re.len());
        Self { re, im }
    }
    pub fn from_walls(coefficient: &HelmholtzCoefficient, wall: ArrayView1<f64>) -> Self {
        let (re, im): (Vec<f64>, Vec<f64>) = wall.iter().map(|&w| coefficient.evaluate(w)).unzip();
        Self {
            re: Array1::from_vec(re),
            im: Array1::from_vec(im),
        }
    }
}

/// `(L + diag(c) + patch) u = 0` on a 2D staggered grid.
#[derive(Clone, Debug)]
pub struct Helmholtz2d {
    pub grid: StaggeredGrid,
    pub real: SparseMatrix,
    pub imag: SparseMatrix,
}

#[derive(Clone, Debug)]
pub struct HelmholtzSolution {
    pub re: Array1<f64>,
    pub im: Array1<f64>,
    pub free_nodes: Vec<usize>,
    pub fixed: Vec<usize>,
}

impl HelmholtzSolution {
    pub fn magnitude(&self) -> Array1<f64> {
        ndarray::Zip::from(&self.re)
            .and(&self.im)
            .map_collect(|&re, &im| re.hypot(im))
    }
}

impl Helmholtz2d {
    /// `diag(c)` covers every node, so a boundary row reads `c u` plus its
    /// closure from `bc`.
    pub fn assemble(
        order: usize,
        x_axis: StaggeredAxis,
        y_axis: StaggeredAxis,
        coefficient: &ComplexField,
        bc: BoundaryCondition,
    ) -> Result<Self> {
        let axes = [x_axis, y_axis];
        let grid = StaggeredGrid::new(axes.to_vec())?;
        let n = grid.node_count();
        check_len("helmholtz coefficient (re)", n, coefficient.re.len())?;
        check_len("helmholtz coefficient (im)", n, coefficient.im.len())?;
        let laplacian = StaggeredOperators::new(order, &axes)?.laplacian_matrix()?;
        let diag_re = SparseMatrix::from_diagonal(&coefficient.re.to_vec());
        let imag = SparseMatrix::from_diagonal(&coefficient.im.to_vec());
        let real = laplacian
            .add(&diag_re)?
            .add(&bc.patch_nd(order, &axes)?)?;
        log::debug!(
            "assembled helmholtz operator on {} nodes: {} + {} nonzeros",
            n,
            real.nnz(),
            imag.nnz()
        );
        Ok(Self { grid, real, imag })
    }

    /// Fixes `u = value` on `fixed` and solves for every other node.
    pub fn solve_with_fixed(&self, fixed: &[usize], value: f64) -> Result<HelmholtzSolution> {
        let n = self.grid.node_count();
        let fixed_set: HashSet<usize> = fixed.iter().copied().collect();
        let mut fixed: Vec<usize> = fixed_set.iter().copied().collect();
        fixed.sort_unstable();
        if let Some(&bad) = fixed.iter().find(|&&i| i >= n) {
            return Err(MimeticError::DimensionMismatch {
                context: "fixed node index",
                expected: n,
                found: bad,
            });
        }
        let free_nodes: Vec<usize> = (0..n).filter(|i| !fixed_set.contains(i)).collect();
        let nf = free_nodes.len();
        let singular = |reason: String| MimeticError::SingularSystem {
            size: nf,
            fixed: fixed.clone(),
            reason,
        };
        if nf == 0 {
            return Err(singular("no free nodes remain".to_string()));
        }

        let mut x_fixed = Array1::<f64>::zeros(n);
        for &i in fixed.iter() {
            x_fixed[i] = value;
        }
        let b_re = -self.real.dot(x_fixed.view())?;
        let b_im = -self.imag.dot(x_fixed.view())?;

        let a_re = self.real.select(&free_nodes, &free_nodes)?;
        let a_im = self.imag.select(&free_nodes, &free_nodes)?;
        if let Some(row) = (0..nf).find(|&r| a_re.row_nnz(r) == 0 && a_im.row_nnz(r) == 0) {
            return Err(singular(format!("empty row for node {}", free_nodes[row])));
        }

        let entries: Vec<Triplet<usize, usize, c64>> = a_re
            .triplets()
            .map(|(i, j, v)| Triplet::new(i, j, c64::new(v, 0.0)))
            .chain(
                a_im.triplets()
                    .map(|(i, j, v)| Triplet::new(i, j, c64::new(0.0, v))),
            )
            .collect();
        let a = SparseColMat::<usize, c64>::try_new_from_triplets(nf, nf, &entries)
            .map_err(|e| singular(format!("could not assemble reduced matrix: {}", e)))?;
        let lu = a
            .sp_lu()
            .map_err(|e| singular(format!("sparse lu failed: {}", e)))?;
        let b = Col::<c64>::from_fn(nf, |r| c64::new(b_re[free_nodes[r]], b_im[free_nodes[r]]));
        let sol = lu.solve(&b);
        let sol_re = Array1::from_iter(sol.iter().map(|z| z.re));
        let sol_im = Array1::from_iter(sol.iter().map(|z| z.im));
        if sol_re.iter().chain(sol_im.iter()).any(|v| !v.is_finite()) {
            return Err(singular("solution is not finite".to_string()));
        }

        // (A_re + i A_im)(x_re + i x_im) - b, split into parts
        let r_re = a_re.dot(sol_re.view())? - a_im.dot(sol_im.view())?;
        let r_im = a_re.dot(sol_im.view())? + a_im.dot(sol_re.view())?;
        let mut residual = 0.0_f64;
        let mut scale = 0.0_f64;
        for (r, &node) in free_nodes.iter().enumerate() {
            residual = residual
                .max((r_re[r] - b_re[node]).abs())
                .max((r_im[r] - b_im[node]).abs());
            scale = scale.max(b_re[node].abs()).max(b_im[node].abs());
        }
        if residual > RESIDUAL_TOLERANCE * (1.0 + scale) {
            return Err(singular(format!("residual {:.3e} above tolerance", residual)));
        }

        let mut re = x_fixed;
        let mut im = Array1::<f64>::zeros(n);
        for (r, &node) in free_nodes.iter().enumerate() {
            re[node] = sol_re[r];
            im[node] = sol_im[r];
        }
        log::info!(
            "solved helmholtz system: {} free nodes, {} fixed, residual {:.3e}",
            nf,
            fixed.len(),
            residual
        );
        Ok(HelmholtzSolution {
            re,
            im,
            free_nodes,
            fixed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(cells: usize) -> (StaggeredAxis, StaggeredAxis) {
        (
            StaggeredAxis::new(cells, 0.0, 1.0).unwrap(),
            StaggeredAxis::new(cells, 0.0, 1.0).unwrap(),
        )
    }

    #[test]
    fn test_coefficient_without_wall_is_wave_number_squared() {
        let c = HelmholtzCoefficient {
            wave_number: 6.0,
            reflection: 0.7,
            absorption: 0.45,
        };
        assert_eq!(c.evaluate(0.0), (36.0, 0.0));
        let (re, im) = c.evaluate(1.0);
        // 36 / (1.7 + 0.45 i)^2
        let (p, q) = (1.7_f64, 0.45_f64);
        let d = (p * p + q * q).powi(2);
        assert_relative_eq!(re, 36.0 * (p * p - q * q) / d, epsilon = 1e-12);
        assert_relative_eq!(im, -36.0 * 2.0 * p * q / d, epsilon = 1e-12);
    }

    #[test]
    fn test_coefficient_on_every_diagonal_entry() {
        let (x, y) = square(6);
        let n = 64;
        let field = ComplexField {
            re: Array1::from_shape_fn(n, |i| 4.0 + 0.01 * i as f64),
            im: Array1::from_shape_fn(n, |i| 1.0 + 0.02 * i as f64),
        };
        for bc in [BoundaryCondition::Dirichlet, BoundaryCondition::Neumann] {
            let h = Helmholtz2d::assemble(2, x, y, &field, bc).unwrap();
            let patch = bc.patch_nd(2, &[x, y]).unwrap();
            let laplacian = StaggeredOperators::new(2, &[x, y])
                .unwrap()
                .laplacian_matrix()
                .unwrap();
            for idx in h.grid.boundary_indices() {
                assert_relative_eq!(
                    h.real.get(idx, idx),
                    field.re[idx] + patch.get(idx, idx),
                    epsilon = 1e-12
                );
                assert_eq!(h.imag.get(idx, idx), field.im[idx]);
                assert_eq!(h.imag.row_nnz(idx), 1);
            }
            for idx in h.grid.interior_indices() {
                assert_relative_eq!(
                    h.real.get(idx, idx),
                    laplacian.get(idx, idx) + field.re[idx],
                    epsilon = 1e-12
                );
                assert_eq!(h.imag.get(idx, idx), field.im[idx]);
            }
        }
        let dirichlet = Helmholtz2d::assemble(2, x, y, &field, BoundaryCondition::Dirichlet).unwrap();
        assert_relative_eq!(dirichlet.real.get(0, 0), 5.0, epsilon = 1e-12);
        assert_eq!(dirichlet.real.row_nnz(0), 1);
        let short = ComplexField::real(Array1::zeros(3));
        assert!(Helmholtz2d::assemble(2, x, y, &short, BoundaryCondition::Dirichlet).is_err());
    }

    #[test]
    fn test_complex_solve_satisfies_equations() {
        let (x, y) = square(8);
        let n = 100;
        let field = ComplexField {
            re: Array1::from_elem(n, 9.0),
            im: Array1::from_elem(n, 2.0),
        };
        let h = Helmholtz2d::assemble(2, x, y, &field, BoundaryCondition::Neumann).unwrap();
        let solution = h.solve_with_fixed(&[44], 1.0).unwrap();
        assert_eq!(solution.fixed, vec![44]);
        assert_eq!(solution.free_nodes.len(), n - 1);
        assert_eq!(solution.re[44], 1.0);
        assert_eq!(solution.im[44], 0.0);
        let r_re = h.real.dot(solution.re.view()).unwrap() - h.imag.dot(solution.im.view()).unwrap();
        let r_im = h.real.dot(solution.im.view()).unwrap() + h.imag.dot(solution.re.view()).unwrap();
        for &i in solution.free_nodes.iter() {
            assert_relative_eq!(r_re[i], 0.0, epsilon = 1e-8);
            assert_relative_eq!(r_im[i], 0.0, epsilon = 1e-8);
        }
        assert!(solution.im.iter().any(|v| v.abs() > 1e-6));
    }

    #[test]
    fn test_singular_reports_fixed_nodes() {
        let (x, y) = square(4);
        let field = ComplexField::real(Array1::zeros(36));
        let h = Helmholtz2d::assemble(2, x, y, &field, BoundaryCondition::Dirichlet).unwrap();
        let all: Vec<usize> = (0..36).collect();
        match h.solve_with_fixed(&all, 1.0) {
            Err(MimeticError::SingularSystem { size, fixed, .. }) => {
                assert_eq!(size, 0);
                assert_eq!(fixed.len(), 36);
            }
            other => panic!("expected SingularSystem, got {:?}", other.map(|s| s.fixed)),
        }
        assert!(matches!(
            h.solve_with_fixed(&[99], 0.0),
            Err(MimeticError::DimensionMismatch { found: 99, .. })
        ));
    }
}
