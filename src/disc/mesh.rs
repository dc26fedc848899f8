pub mod collocated;
pub mod staggered;

use ndarray::{Array1, ArrayD, IxDyn};

/// Samples `f` on the tensor product of per-axis coordinates.
///
/// The result is flattened with axis 0 varying fastest, the layout shared by
/// every operator in the crate.
pub fn sample_tensor<F>(coords: &[Array1<f64>], f: F) -> Array1<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let dim = coords.len();
    let shape: Vec<usize> = coords.iter().rev().map(|c| c.len()).collect();
    let mut point = vec![0.0; dim];
    let field = ArrayD::from_shape_fn(IxDyn(&shape), |ix| {
        for (axis, c) in coords.iter().enumerate() {
            point[axis] = c[ix[dim - 1 - axis]];
        }
        f(&point)
    });
    Array1::from_iter(field.iter().copied())
}

/// Multi-index of the flattened index `idx`, axis 0 first.
pub fn unravel(mut idx: usize, shape: &[usize]) -> Vec<usize> {
    shape
        .iter()
        .map(|&n| {
            let i = idx % n;
            idx /= n;
            i
        })
        .collect()
}

/// Flattened indices touching either end of any axis.
pub fn boundary_indices(shape: &[usize]) -> Vec<usize> {
    let total: usize = shape.iter().product();
    (0..total)
        .filter(|&idx| {
            unravel(idx, shape)
                .iter()
                .zip(shape.iter())
                .any(|(&i, &n)| i == 0 || i + 1 == n)
        })
        .collect()
}
