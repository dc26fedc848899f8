use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::{boundary_indices, sample_tensor};
use crate::error::{MimeticError, Result};

/// One axis of a staggered grid: `cells` cells of equal width on
/// `[west, east]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaggeredAxis {
    pub cells: usize,
    pub west: f64,
    pub east: f64,
}

impl StaggeredAxis {
    pub fn new(cells: usize, west: f64, east: f64) -> Result<Self> {
        let axis = Self { cells, west, east };
        axis.validate()?;
        Ok(axis)
    }
    pub fn validate(&self) -> Result<()> {
        if self.cells == 0 {
            return Err(MimeticError::InvalidParameter {
                name: "cells",
                reason: "an axis needs at least one cell".to_string(),
            });
        }
        if !(self.west.is_finite() && self.east.is_finite() && self.east > self.west) {
            return Err(MimeticError::InvalidParameter {
                name: "bounds",
                reason: format!("need west < east, got [{}, {}]", self.west, self.east),
            });
        }
        Ok(())
    }
    pub fn dx(&self) -> f64 {
        (self.east - self.west) / self.cells as f64
    }
    pub fn node_count(&self) -> usize {
        self.cells + 2
    }
    pub fn face_count(&self) -> usize {
        self.cells + 1
    }
    /// Domain edges and cell centres: `west`, `west + (i - 1/2) dx`, `east`.
    pub fn nodes(&self) -> Array1<f64> {
        let dx = self.dx();
        let mut nodes = Array1::zeros(self.node_count());
        nodes[0] = self.west;
        for i in 1..=self.cells {
            nodes[i] = self.west + (i as f64 - 0.5) * dx;
        }
        nodes[self.cells + 1] = self.east;
        nodes
    }
    pub fn centres(&self) -> Array1<f64> {
        let dx = self.dx();
        Array1::from_iter((0..self.cells).map(|i| self.west + (i as f64 + 0.5) * dx))
    }
    pub fn faces(&self) -> Array1<f64> {
        let dx = self.dx();
        Array1::from_iter((0..self.face_count()).map(|i| self.west + i as f64 * dx))
    }
}

#[derive(Clone, Debug)]
pub struct StaggeredGrid {
    pub axes: Vec<StaggeredAxis>,
}

impl StaggeredGrid {
    pub fn new(axes: Vec<StaggeredAxis>) -> Result<Self> {
        if axes.is_empty() || axes.len() > 3 {
            return Err(MimeticError::InvalidParameter {
                name: "axes",
                reason: format!("expected 1 to 3 axes, got {}", axes.len()),
            });
        }
        for axis in axes.iter() {
            axis.validate()?;
        }
        Ok(Self { axes })
    }
    pub fn dim(&self) -> usize {
        self.axes.len()
    }
    pub fn node_shape(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.node_count()).collect()
    }
    pub fn node_count(&self) -> usize {
        self.node_shape().iter().product()
    }
    /// Number of points carrying the gradient component along `axis`: faces
    /// along it, cell centres along every other axis.
    pub fn face_count(&self, axis: usize) -> usize {
        self.axes
            .iter()
            .enumerate()
            .map(|(b, a)| if b == axis { a.face_count() } else { a.cells })
            .product()
    }
    pub fn sample<F: Fn(&[f64]) -> f64>(&self, f: F) -> Array1<f64> {
        let coords: Vec<Array1<f64>> = self.axes.iter().map(|a| a.nodes()).collect();
        sample_tensor(&coords, f)
    }
    pub fn sample_faces<F: Fn(&[f64]) -> f64>(&self, axis: usize, f: F) -> Array1<f64> {
        let coords: Vec<Array1<f64>> = self
            .axes
            .iter()
            .enumerate()
            .map(|(b, a)| if b == axis { a.faces() } else { a.centres() })
            .collect();
        sample_tensor(&coords, f)
    }
    /// Coordinates of every node, one flattened array per axis.
    pub fn node_coordinates(&self) -> Vec<Array1<f64>> {
        (0..self.dim())
            .map(|axis| self.sample(|p| p[axis]))
            .collect()
    }
    pub fn boundary_indices(&self) -> Vec<usize> {
        boundary_indices(&self.node_shape())
    }
    pub fn interior_indices(&self) -> Vec<usize> {
        let boundary = self.boundary_indices();
        let mut interior = Vec::with_capacity(self.node_count() - boundary.len());
        let mut next = boundary.iter().peekable();
        for idx in 0..self.node_count() {
            if next.peek() == Some(&&idx) {
                next.next();
            } else {
                interior.push(idx);
            }
        }
        interior
    }
    pub fn cell_volume(&self) -> f64 {
        self.axes.iter().map(|a| a.dx()).product()
    }
    pub fn min_spacing(&self) -> f64 {
        self.axes.iter().map(|a| a.dx()).fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_axis_points() {
        let axis = StaggeredAxis::new(4, 0.0, 1.0).unwrap();
        assert_relative_eq!(axis.dx(), 0.25);
        let nodes = axis.nodes();
        assert_eq!(nodes.len(), 6);
        assert_relative_eq!(nodes[1], 0.125);
        assert_relative_eq!(nodes[5], 1.0);
        assert_eq!(axis.faces().len(), 5);
        assert!(StaggeredAxis::new(0, 0.0, 1.0).is_err());
        assert!(StaggeredAxis::new(3, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_grid_counts() {
        let grid = StaggeredGrid::new(vec![
            StaggeredAxis::new(3, 0.0, 1.0).unwrap(),
            StaggeredAxis::new(4, 0.0, 2.0).unwrap(),
        ])
        .unwrap();
        assert_eq!(grid.node_count(), 30);
        assert_eq!(grid.face_count(0), 16);
        assert_eq!(grid.face_count(1), 15);
        assert_eq!(grid.sample_faces(1, |p| p[1]).len(), 15);
        assert_eq!(grid.interior_indices().len(), 12);
        assert_eq!(grid.boundary_indices().len() + 12, 30);
        let y = &grid.node_coordinates()[1];
        assert_relative_eq!(y[5], 0.25);
        assert!(StaggeredGrid::new(vec![]).is_err());
    }
}
