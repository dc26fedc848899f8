use ndarray::{Array1, ArrayView1, s};
use ndarray_stats::QuantileExt;

use crate::error::{MimeticError, Result, check_len};

/// Full `d x d` diffusion tensor, one coefficient field per entry, stored row
/// by row. Every field lives on the same points.
#[derive(Clone, Debug)]
pub struct DiffusionTensor {
    dim: usize,
    components: Vec<Array1<f64>>,
}

impl DiffusionTensor {
    pub fn new(dim: usize, components: Vec<Array1<f64>>) -> Result<Self> {
        check_len("diffusion tensor entries", dim * dim, components.len())?;
        if let Some(first) = components.first() {
            for c in components.iter() {
                check_len("diffusion tensor field", first.len(), c.len())?;
            }
        }
        Ok(Self { dim, components })
    }
    /// Same coefficient matrix at each of `points` points.
    pub fn uniform(matrix: &[Vec<f64>], points: usize) -> Result<Self> {
        let dim = matrix.len();
        let mut components = Vec::with_capacity(dim * dim);
        for row in matrix.iter() {
            check_len("diffusion tensor row", dim, row.len())?;
            components.extend(row.iter().map(|&k| Array1::from_elem(points, k)));
        }
        Self::new(dim, components)
    }
    pub fn dim(&self) -> usize {
        self.dim
    }
    pub fn component(&self, i: usize, j: usize) -> &Array1<f64> {
        &self.components[i * self.dim + j]
    }
    /// Largest row sum of absolute entries over all points, an upper bound
    /// on the spectral radius.
    pub fn max_row_sum(&self) -> f64 {
        let mut bound = f64::NAN;
        for i in 0..self.dim {
            let mut row_sum = Array1::<f64>::zeros(self.component(i, 0).len());
            for j in 0..self.dim {
                row_sum += &self.component(i, j).mapv(f64::abs);
            }
            bound = bound.max(*row_sum.max_skipnan());
        }
        bound
    }
}

/// Flux model `F = -K grad u`.
#[derive(Clone, Debug)]
pub enum Flux {
    Isotropic(f64),
    /// One coefficient field per axis, sampled where that gradient component
    /// lives.
    Diagonal(Vec<Array1<f64>>),
    /// Full tensor; all gradient components must share their points.
    Anisotropic(DiffusionTensor),
}

impl Flux {
    pub fn compute(&self, gradient: &[Array1<f64>]) -> Result<Vec<Array1<f64>>> {
        match self {
            Flux::Isotropic(kappa) => Ok(gradient.iter().map(|g| g * -*kappa).collect()),
            Flux::Diagonal(fields) => {
                check_len("diagonal flux components", fields.len(), gradient.len())?;
                fields
                    .iter()
                    .zip(gradient.iter())
                    .map(|(k, g)| {
                        check_len("diagonal flux field", g.len(), k.len())?;
                        Ok(-(k * g))
                    })
                    .collect()
            }
            Flux::Anisotropic(tensor) => {
                check_len("anisotropic flux components", tensor.dim(), gradient.len())?;
                let mut fluxes = Vec::with_capacity(tensor.dim());
                for i in 0..tensor.dim() {
                    let mut f = Array1::<f64>::zeros(gradient[i].len());
                    for (j, g) in gradient.iter().enumerate() {
                        let k = tensor.component(i, j);
                        check_len("anisotropic flux field", k.len(), g.len())?;
                        f.scaled_add(-1.0, &(k * g));
                    }
                    fluxes.push(f);
                }
                Ok(fluxes)
            }
        }
    }
    /// Bound on the diffusivity used by the explicit time step.
    pub fn max_coefficient(&self) -> f64 {
        match self {
            Flux::Isotropic(kappa) => kappa.abs(),
            Flux::Diagonal(fields) => fields
                .iter()
                .map(|k| *k.mapv(f64::abs).max_skipnan())
                .fold(f64::NAN, f64::max),
            Flux::Anisotropic(tensor) => tensor.max_row_sum(),
        }
    }
}

/// Concatenates per-axis components into `[Fx; Fy; Fz]`.
pub fn stack(components: &[Array1<f64>]) -> Array1<f64> {
    let total: usize = components.iter().map(|c| c.len()).sum();
    let mut stacked = Array1::zeros(total);
    let mut start = 0;
    for c in components.iter() {
        stacked.slice_mut(s![start..start + c.len()]).assign(c);
        start += c.len();
    }
    stacked
}

/// Splits a stacked vector at exactly the given component lengths.
pub fn split(stacked: ArrayView1<f64>, lengths: &[usize]) -> Result<Vec<Array1<f64>>> {
    let total: usize = lengths.iter().sum();
    if total != stacked.len() {
        return Err(MimeticError::DimensionMismatch {
            context: "stacked flux",
            expected: total,
            found: stacked.len(),
        });
    }
    let mut start = 0;
    Ok(lengths
        .iter()
        .map(|&n| {
            let part = stacked.slice(s![start..start + n]).to_owned();
            start += n;
            part
        })
        .collect())
}
