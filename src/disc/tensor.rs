use ndarray::{Array1, ArrayD, ArrayView1, Axis, IxDyn, Zip};

use crate::disc::FluxOperators;
use crate::disc::mesh::staggered::StaggeredAxis;
use crate::disc::mimetic1d;
use crate::disc::sparse::SparseMatrix;
use crate::error::{MimeticError, Result, check_len};

/// Kronecker product of per-axis factors; `factors[a]` acts along axis `a`.
///
/// The materialised matrix is `F_{d-1} (x) ... (x) F_0`, matching the
/// flattening with axis 0 varying fastest.
#[derive(Clone, Debug)]
pub struct KroneckerOperator {
    factors: Vec<SparseMatrix>,
}

impl KroneckerOperator {
    pub fn new(factors: Vec<SparseMatrix>) -> Result<Self> {
        if factors.is_empty() {
            return Err(MimeticError::InvalidParameter {
                name: "factors",
                reason: "a Kronecker operator needs at least one factor".to_string(),
            });
        }
        Ok(Self { factors })
    }
    pub fn factors(&self) -> &[SparseMatrix] {
        &self.factors
    }
    pub fn nrows(&self) -> usize {
        self.factors.iter().map(|f| f.nrows()).product()
    }
    pub fn ncols(&self) -> usize {
        self.factors.iter().map(|f| f.ncols()).product()
    }
    /// Applies the operator one axis at a time on the reshaped state.
    pub fn apply(&self, x: ArrayView1<f64>) -> Result<Array1<f64>> {
        check_len("kronecker operator input", self.ncols(), x.len())?;
        let dim = self.factors.len();
        let shape: Vec<usize> = self.factors.iter().rev().map(|f| f.ncols()).collect();
        let mut state: ArrayD<f64> = x
            .to_owned()
            .into_shape_with_order(IxDyn(&shape))
            .map_err(|_| MimeticError::DimensionMismatch {
                context: "kronecker operator reshape",
                expected: self.ncols(),
                found: x.len(),
            })?;
        for (axis, factor) in self.factors.iter().enumerate() {
            if factor.is_identity() {
                continue;
            }
            let lane_axis = Axis(dim - 1 - axis);
            let mut out_shape = state.shape().to_vec();
            out_shape[lane_axis.index()] = factor.nrows();
            let mut out = ArrayD::<f64>::zeros(IxDyn(&out_shape));
            Zip::from(out.lanes_mut(lane_axis))
                .and(state.lanes(lane_axis))
                .for_each(|o, i| factor.dot_lane(i, o));
            state = out;
        }
        Ok(Array1::from_iter(state.iter().copied()))
    }
    pub fn to_sparse(&self) -> SparseMatrix {
        let mut factors = self.factors.iter().rev();
        let mut matrix = match factors.next() {
            Some(slowest) => slowest.clone(),
            None => return SparseMatrix::zeros(1, 1),
        };
        for factor in factors {
            matrix = matrix.kron(factor);
        }
        matrix
    }
}

/// Places `op` at `axis`, with `others` filling the remaining axes in order.
pub fn lift_axis(
    op: &SparseMatrix,
    others: &[SparseMatrix],
    axis: usize,
) -> Result<KroneckerOperator> {
    if axis > others.len() {
        return Err(MimeticError::InvalidParameter {
            name: "axis",
            reason: format!("axis {} out of range for {} axes", axis, others.len() + 1),
        });
    }
    let mut factors = others.to_vec();
    factors.insert(axis, op.clone());
    KroneckerOperator::new(factors)
}

/// Staggered gradient and divergence on 1 to 3 axes.
///
/// The gradient along axis `a` maps all nodes to the faces of `a` crossed
/// with the cell centres of every other axis; the divergence maps those
/// points back to the nodes, leaving every boundary node row empty.
#[derive(Clone, Debug)]
pub struct StaggeredOperators {
    pub order: usize,
    pub axes: Vec<StaggeredAxis>,
    gradients: Vec<KroneckerOperator>,
    divergences: Vec<KroneckerOperator>,
}

impl StaggeredOperators {
    pub fn new(order: usize, axes: &[StaggeredAxis]) -> Result<Self> {
        let mut gradients = Vec::with_capacity(axes.len());
        let mut divergences = Vec::with_capacity(axes.len());
        for (a, axis) in axes.iter().enumerate() {
            let g = mimetic1d::gradient(order, axis.cells, axis.dx())?;
            let d = mimetic1d::divergence(order, axis.cells, axis.dx())?;
            let restrictions: Vec<SparseMatrix> = axes
                .iter()
                .enumerate()
                .filter(|&(b, _)| b != a)
                .map(|(_, other)| SparseMatrix::interior_embedding(other.cells).transpose())
                .collect::<Result<_>>()?;
            let embeddings: Vec<SparseMatrix> = axes
                .iter()
                .enumerate()
                .filter(|&(b, _)| b != a)
                .map(|(_, other)| SparseMatrix::interior_embedding(other.cells))
                .collect();
            gradients.push(lift_axis(&g, &restrictions, a)?);
            divergences.push(lift_axis(&d, &embeddings, a)?);
        }
        log::debug!(
            "staggered operators of order {} on {} axes, {} nodes",
            order,
            axes.len(),
            axes.iter().map(|a| a.node_count()).product::<usize>()
        );
        Ok(Self {
            order,
            axes: axes.to_vec(),
            gradients,
            divergences,
        })
    }
    pub fn gradient_operator(&self, axis: usize) -> &KroneckerOperator {
        &self.gradients[axis]
    }
    pub fn divergence_operator(&self, axis: usize) -> &KroneckerOperator {
        &self.divergences[axis]
    }
    /// Points carrying the gradient component along `axis`.
    pub fn face_count(&self, axis: usize) -> usize {
        self.gradients[axis].nrows()
    }
    /// `sum_a D_a G_a`, boundary rows empty.
    pub fn laplacian_matrix(&self) -> Result<SparseMatrix> {
        let n = self.node_count();
        let mut laplacian = SparseMatrix::zeros(n, n);
        for (g, d) in self.gradients.iter().zip(self.divergences.iter()) {
            laplacian = laplacian.add(&d.to_sparse().matmul(&g.to_sparse())?)?;
        }
        Ok(laplacian)
    }
}

impl FluxOperators for StaggeredOperators {
    fn dim(&self) -> usize {
        self.axes.len()
    }
    fn node_count(&self) -> usize {
        self.axes.iter().map(|a| a.node_count()).product()
    }
    fn min_spacing(&self) -> f64 {
        self.axes.iter().map(|a| a.dx()).fold(f64::INFINITY, f64::min)
    }
    fn gradient(&self, u: ArrayView1<f64>) -> Result<Vec<Array1<f64>>> {
        self.gradients.iter().map(|g| g.apply(u)).collect()
    }
    fn divergence(&self, fluxes: &[Array1<f64>]) -> Result<Array1<f64>> {
        check_len("flux components", self.divergences.len(), fluxes.len())?;
        let mut div = Array1::zeros(self.node_count());
        for (d, flux) in self.divergences.iter().zip(fluxes.iter()) {
            div += &d.apply(flux.view())?;
        }
        Ok(div)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::mesh::staggered::StaggeredGrid;
    use approx::assert_relative_eq;

    fn axes2d() -> Vec<StaggeredAxis> {
        vec![
            StaggeredAxis::new(6, 0.0, 1.0).unwrap(),
            StaggeredAxis::new(5, -1.0, 1.0).unwrap(),
        ]
    }

    #[test]
    fn test_structured_apply_matches_materialised() {
        let a = mimetic1d::gradient(2, 4, 0.25).unwrap();
        let b = mimetic1d::divergence(2, 5, 0.2).unwrap();
        let c = SparseMatrix::identity(3);
        let op = lift_axis(&b, &[a, c], 1).unwrap();
        assert_eq!(op.nrows(), 5 * 7 * 3);
        assert_eq!(op.ncols(), 6 * 6 * 3);
        let x = Array1::from_iter((0..op.ncols()).map(|i| ((i * 7 % 11) as f64).sin()));
        let structured = op.apply(x.view()).unwrap();
        let materialised = op.to_sparse().dot(x.view()).unwrap();
        for (s, m) in structured.iter().zip(materialised.iter()) {
            assert_relative_eq!(*s, *m, epsilon = 1e-12);
        }
        assert!(op.apply(Array1::zeros(3).view()).is_err());
    }

    #[test]
    fn test_separable_field_reduces_to_1d() {
        let axes = axes2d();
        let grid = StaggeredGrid::new(axes.clone()).unwrap();
        let ops = StaggeredOperators::new(2, &axes).unwrap();
        // u(x, y) = x^2, constant along y
        let u = grid.sample(|p| p[0] * p[0]);
        let grad = ops.gradient(u.view()).unwrap();
        assert_eq!(grad[0].len(), grid.face_count(0));
        let expected = grid.sample_faces(0, |p| 2.0 * p[0]);
        for (g, e) in grad[0].iter().zip(expected.iter()) {
            assert_relative_eq!(*g, *e, epsilon = 1e-10);
        }
        for g in grad[1].iter() {
            assert_relative_eq!(*g, 0.0, epsilon = 1e-10);
        }
    }

    /// Gradient component of `prod_b fields[b](x_b)` along `axis`, built from
    /// the 1D gradient of that factor and the other factors at cell centres.
    fn factored_component(
        order: usize,
        axes: &[StaggeredAxis],
        fields: &[fn(f64) -> f64],
        axis: usize,
    ) -> Array1<f64> {
        let mut out = Array1::ones(1);
        for b in (0..axes.len()).rev() {
            let ax = axes[b];
            let factor = if b == axis {
                mimetic1d::gradient(order, ax.cells, ax.dx())
                    .unwrap()
                    .dot(ax.nodes().mapv(fields[b]).view())
                    .unwrap()
            } else {
                ax.centres().mapv(fields[b])
            };
            let n = factor.len();
            out = Array1::from_shape_fn(out.len() * n, |idx| out[idx / n] * factor[idx % n]);
        }
        out
    }

    #[test]
    fn test_product_field_gradient_2d() {
        let axes = axes2d();
        let grid = StaggeredGrid::new(axes.clone()).unwrap();
        let ops = StaggeredOperators::new(2, &axes).unwrap();
        let fields: [fn(f64) -> f64; 2] = [f64::sin, |y: f64| y.powi(3)];
        let u = grid.sample(|p| fields[0](p[0]) * fields[1](p[1]));
        let grad = ops.gradient(u.view()).unwrap();
        for axis in 0..2 {
            let expected = factored_component(2, &axes, &fields, axis);
            assert_eq!(grad[axis].len(), expected.len());
            for (g, e) in grad[axis].iter().zip(expected.iter()) {
                assert_relative_eq!(*g, *e, epsilon = 1e-12, max_relative = 1e-12);
            }
        }
        // y component: x centre 2, y face 0
        let ay = axes[1];
        let gy = mimetic1d::gradient(2, ay.cells, ay.dx())
            .unwrap()
            .dot(ay.nodes().mapv(|y| y.powi(3)).view())
            .unwrap();
        assert_relative_eq!(
            grad[1][2],
            axes[0].centres()[2].sin() * gy[0],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_product_field_gradient_3d() {
        let axes = vec![
            StaggeredAxis::new(10, 0.0, 1.0).unwrap(),
            StaggeredAxis::new(11, -1.0, 1.0).unwrap(),
            StaggeredAxis::new(12, 0.5, 2.0).unwrap(),
        ];
        let grid = StaggeredGrid::new(axes.clone()).unwrap();
        let ops = StaggeredOperators::new(4, &axes).unwrap();
        let fields: [fn(f64) -> f64; 3] = [f64::sin, |y: f64| y.powi(3), f64::exp];
        let u = grid.sample(|p| fields[0](p[0]) * fields[1](p[1]) * fields[2](p[2]));
        let grad = ops.gradient(u.view()).unwrap();
        for axis in 0..3 {
            let expected = factored_component(4, &axes, &fields, axis);
            assert_eq!(grad[axis].len(), grid.face_count(axis));
            assert_eq!(grad[axis].len(), expected.len());
            for (g, e) in grad[axis].iter().zip(expected.iter()) {
                assert_relative_eq!(*g, *e, epsilon = 1e-11, max_relative = 1e-12);
            }
        }
        // fourth order is exact on the cubic factor
        let expected_dy = grid.sample_faces(1, |p| p[0].sin() * 3.0 * p[1] * p[1] * p[2].exp());
        for (g, e) in grad[1].iter().zip(expected_dy.iter()) {
            assert_relative_eq!(*g, *e, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_laplacian_matrix_matches_structured() {
        let axes = axes2d();
        let grid = StaggeredGrid::new(axes.clone()).unwrap();
        let ops = StaggeredOperators::new(2, &axes).unwrap();
        let u = grid.sample(|p| p[0] * p[0] + 3.0 * p[1] * p[1]);
        let lap = ops.laplacian_matrix().unwrap();
        let lu = lap.dot(u.view()).unwrap();
        let structured = ops
            .divergence(&ops.gradient(u.view()).unwrap())
            .unwrap();
        for idx in grid.interior_indices() {
            assert_relative_eq!(lu[idx], 8.0, epsilon = 1e-9);
            assert_relative_eq!(structured[idx], 8.0, epsilon = 1e-9);
        }
        for idx in grid.boundary_indices() {
            assert_eq!(lap.row_nnz(idx), 0);
        }
    }

    #[test]
    fn test_divergence_flux_count() {
        let ops = StaggeredOperators::new(2, &axes2d()).unwrap();
        let one = vec![Array1::zeros(ops.face_count(0))];
        assert!(matches!(
            ops.divergence(&one),
            Err(MimeticError::DimensionMismatch { expected: 2, found: 1, .. })
        ));
    }
}
