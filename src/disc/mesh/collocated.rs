use ndarray::Array1;

use super::{boundary_indices, sample_tensor};
use crate::error::{MimeticError, Result};

/// Nodes uniformly spaced in the computational coordinates, with physical
/// coordinates stored per node.
#[derive(Clone, Debug)]
pub struct CollocatedGrid {
    pub shape: Vec<usize>,
    /// Computational spacing per axis.
    pub spacing: Vec<f64>,
    /// Physical coordinates, one flattened array per dimension.
    pub coords: Vec<Array1<f64>>,
}

impl CollocatedGrid {
    /// Rectilinear grid with `nodes[a]` nodes on `bounds[a]`; computational and
    /// physical coordinates coincide.
    pub fn uniform(nodes: &[usize], bounds: &[(f64, f64)]) -> Result<Self> {
        if nodes.len() != bounds.len() || nodes.is_empty() || nodes.len() > 3 {
            return Err(MimeticError::InvalidParameter {
                name: "nodes",
                reason: format!(
                    "need 1 to 3 axes with matching bounds, got {} node counts and {} bounds",
                    nodes.len(),
                    bounds.len()
                ),
            });
        }
        let mut lines = Vec::with_capacity(nodes.len());
        for (&n, &(lo, hi)) in nodes.iter().zip(bounds.iter()) {
            if n < 2 || !(lo.is_finite() && hi.is_finite() && hi > lo) {
                return Err(MimeticError::InvalidParameter {
                    name: "bounds",
                    reason: format!("cannot place {} nodes on [{}, {}]", n, lo, hi),
                });
            }
            lines.push(Array1::linspace(lo, hi, n));
        }
        let spacing = lines.iter().map(|l| l[1] - l[0]).collect();
        let coords = (0..nodes.len())
            .map(|axis| sample_tensor(&lines, |p| p[axis]))
            .collect();
        Ok(Self {
            shape: nodes.to_vec(),
            spacing,
            coords,
        })
    }
    /// Curvilinear 2D grid: the unit square of computational coordinates
    /// `(xi, eta)` sent through `mapping`.
    pub fn from_mapping<F>(nodes: [usize; 2], mapping: F) -> Result<Self>
    where
        F: Fn(f64, f64) -> (f64, f64),
    {
        let mut grid = Self::uniform(&nodes, &[(0.0, 1.0), (0.0, 1.0)])?;
        let (xi, eta) = (grid.coords[0].clone(), grid.coords[1].clone());
        for idx in 0..grid.node_count() {
            let (x, y) = mapping(xi[idx], eta[idx]);
            if !(x.is_finite() && y.is_finite()) {
                return Err(MimeticError::InvalidParameter {
                    name: "mapping",
                    reason: format!("non-finite image at node {}", idx),
                });
            }
            grid.coords[0][idx] = x;
            grid.coords[1][idx] = y;
        }
        Ok(grid)
    }
    pub fn dim(&self) -> usize {
        self.shape.len()
    }
    pub fn node_count(&self) -> usize {
        self.shape.iter().product()
    }
    /// Cells along `axis` in the computational grid.
    pub fn cells(&self, axis: usize) -> usize {
        self.shape[axis] - 1
    }
    pub fn sample<F: Fn(&[f64]) -> f64>(&self, f: F) -> Array1<f64> {
        let mut point = vec![0.0; self.dim()];
        Array1::from_iter((0..self.node_count()).map(|idx| {
            for (axis, c) in self.coords.iter().enumerate() {
                point[axis] = c[idx];
            }
            f(&point)
        }))
    }
    pub fn boundary_indices(&self) -> Vec<usize> {
        boundary_indices(&self.shape)
    }
    /// Smallest physical distance between neighbouring nodes along any axis.
    pub fn min_spacing(&self) -> f64 {
        let mut h = f64::INFINITY;
        let mut stride = 1;
        for &n in self.shape.iter() {
            for idx in 0..self.node_count() {
                if (idx / stride) % n + 1 == n {
                    continue;
                }
                let d2: f64 = self
                    .coords
                    .iter()
                    .map(|c| (c[idx + stride] - c[idx]).powi(2))
                    .sum();
                h = h.min(d2.sqrt());
            }
            stride *= n;
        }
        h
    }
}
