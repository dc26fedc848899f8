use crate::disc::sparse::SparseMatrix;
use crate::disc::stencil::{self, OperatorKind};
use crate::error::{MimeticError, Result};

/// Assembles the single-axis operator of `kind` and `order` on `cells` cells
/// of width `dx`.
pub fn build(kind: OperatorKind, order: usize, cells: usize, dx: f64) -> Result<SparseMatrix> {
    let stencil = stencil::lookup(kind, order)?;
    if cells < stencil.min_cells {
        return Err(MimeticError::InvalidGridSize {
            kind,
            order,
            cells,
            required: stencil.min_cells,
        });
    }
    if !(dx.is_finite() && dx > 0.0) {
        return Err(MimeticError::InvalidParameter {
            name: "dx",
            reason: format!("grid spacing must be finite and positive, got {}", dx),
        });
    }
    let scale = dx.powi(-kind.spacing_power());
    let (nrows, ncols) = stencil.shape(cells);
    let triplets = (0..nrows).flat_map(|row| {
        stencil
            .row_entries(row, cells)
            .into_iter()
            .map(move |(col, weight)| (row, col, weight * scale))
    });
    let matrix = SparseMatrix::from_triplets(nrows, ncols, triplets)?;
    log::debug!(
        "built {} operator: order {}, {} cells, shape {}x{}, {} nonzeros",
        kind,
        order,
        cells,
        nrows,
        ncols,
        matrix.nnz()
    );
    Ok(matrix)
}

pub fn gradient(order: usize, cells: usize, dx: f64) -> Result<SparseMatrix> {
    build(OperatorKind::Gradient, order, cells, dx)
}
pub fn divergence(order: usize, cells: usize, dx: f64) -> Result<SparseMatrix> {
    build(OperatorKind::Divergence, order, cells, dx)
}
pub fn laplacian(order: usize, cells: usize, dx: f64) -> Result<SparseMatrix> {
    build(OperatorKind::Laplacian, order, cells, dx)
}
pub fn interpolation(order: usize, cells: usize, dx: f64) -> Result<SparseMatrix> {
    build(OperatorKind::Interpolation, order, cells, dx)
}
/// First derivative on `cells + 1` equally spaced nodes.
pub fn nodal(order: usize, cells: usize, dx: f64) -> Result<SparseMatrix> {
    build(OperatorKind::Nodal, order, cells, dx)
}
