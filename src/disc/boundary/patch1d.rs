use crate::disc::mimetic1d;
use crate::disc::sparse::SparseMatrix;
use crate::disc::stencil::{self, OperatorKind};
use crate::error::Result;

/// `A + B G`: row 0 and row `m+1` become `alpha u + beta du/dn` with the
/// outward normal derivative taken from the gradient closures.
pub fn robin(order: usize, cells: usize, dx: f64, alpha: f64, beta: f64) -> Result<SparseMatrix> {
    let n = cells + 2;
    let gradient = mimetic1d::gradient(order, cells, dx)?;
    let a = SparseMatrix::from_triplets(n, n, [(0, 0, alpha), (n - 1, n - 1, alpha)])?;
    let b = SparseMatrix::from_triplets(n, cells + 1, [(0, 0, -beta), (n - 1, cells, beta)])?;
    a.add(&b.matmul(&gradient)?)
}

pub fn dirichlet(order: usize, cells: usize, dx: f64) -> Result<SparseMatrix> {
    robin(order, cells, dx, 1.0, 0.0)
}

pub fn neumann(order: usize, cells: usize, dx: f64) -> Result<SparseMatrix> {
    robin(order, cells, dx, 0.0, 1.0)
}

/// Ghost rows of a periodic node field: `(ghost, source)` pairs.
pub fn periodic_wrap_pairs(cells: usize) -> [(usize, usize); 2] {
    [(0, cells), (cells + 1, 1)]
}

/// Square patch whose ghost rows copy the opposite interior node.
pub fn periodic(cells: usize) -> Result<SparseMatrix> {
    let n = cells + 2;
    let triplets = periodic_wrap_pairs(cells).map(|(ghost, source)| (ghost, source, 1.0));
    SparseMatrix::from_triplets(n, n, triplets)
}

/// Correction turning the one-sided closure rows of a `kind` operator into
/// the interior stencil with wrapped indices.
///
/// Node-valued columns wrap onto the cells `1..=m`; face and nodal columns
/// wrap modulo `m`. Structurally empty rows stay empty.
pub fn periodic_closure(
    kind: OperatorKind,
    order: usize,
    cells: usize,
    dx: f64,
) -> Result<SparseMatrix> {
    let base = mimetic1d::build(kind, order, cells, dx)?;
    let table = stencil::lookup(kind, order)?;
    let (nrows, ncols) = table.shape(cells);
    let scale = dx.powi(-kind.spacing_power());
    let interior = table.interior_rows(cells);
    let mut triplets = Vec::new();
    for row in table.empty_rows..nrows - table.empty_rows {
        if interior.contains(&row) {
            continue;
        }
        triplets.extend(base.row(row).map(|(col, w)| (row, col, -w)));
        let first = row as isize + table.interior_offset;
        for (j, &w) in table.interior.iter().enumerate() {
            let col = wrap_column(kind, first + j as isize, cells);
            triplets.push((row, col, w * scale));
        }
    }
    SparseMatrix::from_triplets(nrows, ncols, triplets)
}

fn wrap_column(kind: OperatorKind, col: isize, cells: usize) -> usize {
    let m = cells as isize;
    match kind {
        OperatorKind::Gradient | OperatorKind::Interpolation | OperatorKind::Laplacian => {
            ((col - 1).rem_euclid(m) + 1) as usize
        }
        OperatorKind::Divergence | OperatorKind::Nodal => col.rem_euclid(m) as usize,
    }
}
