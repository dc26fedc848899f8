use crate::disc::mesh::staggered::StaggeredAxis;
use crate::disc::sparse::SparseMatrix;
use crate::disc::tensor::KroneckerOperator;
use crate::error::Result;

/// Sums the per-axis 1D patches over a staggered node grid.
///
/// The patch of axis `a` is crossed with full identities on the faster axes
/// and with end-zeroed identities on the slower ones, so a corner node takes
/// the closure of its slowest boundary axis only.
pub fn lift_patches<F>(axes: &[StaggeredAxis], patch_for: F) -> Result<SparseMatrix>
where
    F: Fn(&StaggeredAxis) -> Result<SparseMatrix>,
{
    let n: usize = axes.iter().map(|a| a.node_count()).product();
    let mut total = SparseMatrix::zeros(n, n);
    for (a, axis) in axes.iter().enumerate() {
        let factors = axes
            .iter()
            .enumerate()
            .map(|(b, other)| {
                if b == a {
                    patch_for(axis)
                } else if b < a {
                    Ok(SparseMatrix::identity(other.node_count()))
                } else {
                    Ok(SparseMatrix::end_zeroed_identity(other.node_count()))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        total = total.add(&KroneckerOperator::new(factors)?.to_sparse())?;
    }
    Ok(total)
}

/// Robin patch `alpha u + beta du/dn` on every boundary node of the grid.
pub fn robin_nd(
    order: usize,
    axes: &[StaggeredAxis],
    alpha: f64,
    beta: f64,
) -> Result<SparseMatrix> {
    lift_patches(axes, |axis| {
        super::patch1d::robin(order, axis.cells, axis.dx(), alpha, beta)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::mesh::staggered::StaggeredGrid;
    use approx::assert_relative_eq;

    #[test]
    fn test_each_boundary_node_gets_one_row() {
        let axes = vec![
            StaggeredAxis::new(4, 0.0, 1.0).unwrap(),
            StaggeredAxis::new(5, 0.0, 2.0).unwrap(),
        ];
        let grid = StaggeredGrid::new(axes.clone()).unwrap();
        let patch = robin_nd(2, &axes, 1.0, 0.0).unwrap();
        assert_eq!(patch.shape(), (grid.node_count(), grid.node_count()));
        for idx in grid.boundary_indices() {
            assert_eq!(patch.row_nnz(idx), 1);
            assert_relative_eq!(patch.get(idx, idx), 1.0);
        }
        for idx in grid.interior_indices() {
            assert_eq!(patch.row_nnz(idx), 0);
        }
    }

    #[test]
    fn test_corner_takes_slowest_axis() {
        let axes = vec![
            StaggeredAxis::new(4, 0.0, 1.0).unwrap(),
            StaggeredAxis::new(4, 0.0, 1.0).unwrap(),
        ];
        let patch = robin_nd(2, &axes, 0.0, 1.0).unwrap();
        let y_patch = super::super::patch1d::neumann(2, 4, 0.25).unwrap();
        // node (0, 0): its row is the y closure acting along columns of stride 6
        for j in 0..6 {
            assert_relative_eq!(patch.get(0, 6 * j), y_patch.get(0, j), epsilon = 1e-12);
        }
        assert_eq!(patch.get(0, 1), 0.0);
        // node (0, 2) lies on the west edge only
        let x_patch = super::super::patch1d::neumann(2, 4, 0.25).unwrap();
        for i in 0..6 {
            assert_relative_eq!(patch.get(12, 12 + i), x_patch.get(0, i), epsilon = 1e-12);
        }
    }
}
