use std::fmt;

use hashbrown::HashMap;
use ndarray::Array2;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{MimeticError, Result};

pub const SUPPORTED_ORDERS: [usize; 3] = [2, 4, 6];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    /// Cell centres and boundary nodes to faces.
    Gradient,
    /// Faces to cell centres; the two boundary rows are left empty.
    Divergence,
    /// Cell centres and boundary nodes to faces.
    Interpolation,
    /// Divergence of the gradient; the two boundary rows are left empty.
    Laplacian,
    /// First derivative on a collocated (nodal) grid.
    Nodal,
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatorKind::Gradient => "gradient",
            OperatorKind::Divergence => "divergence",
            OperatorKind::Interpolation => "interpolation",
            OperatorKind::Laplacian => "laplacian",
            OperatorKind::Nodal => "nodal",
        };
        f.write_str(name)
    }
}

impl OperatorKind {
    /// Matrix shape for a grid of `cells` cells.
    pub fn shape(self, cells: usize) -> (usize, usize) {
        match self {
            OperatorKind::Gradient | OperatorKind::Interpolation => (cells + 1, cells + 2),
            OperatorKind::Divergence => (cells + 2, cells + 1),
            OperatorKind::Laplacian => (cells + 2, cells + 2),
            OperatorKind::Nodal => (cells + 1, cells + 1),
        }
    }
    /// Power of `1/dx` applied to the unscaled weights.
    pub fn spacing_power(self) -> i32 {
        match self {
            OperatorKind::Interpolation => 0,
            OperatorKind::Laplacian => 2,
            OperatorKind::Gradient | OperatorKind::Divergence | OperatorKind::Nodal => 1,
        }
    }
    /// Sign relating the closure at the far boundary to the mirrored near one.
    pub fn parity(self) -> f64 {
        match self {
            OperatorKind::Interpolation | OperatorKind::Laplacian => 1.0,
            OperatorKind::Gradient | OperatorKind::Divergence | OperatorKind::Nodal => -1.0,
        }
    }
}

/// Coefficients of one operator kind at one order of accuracy.
///
/// Rows are laid out as `empty_rows` structurally empty rows, the boundary
/// closures, interior rows, the mirrored closures and the trailing empty
/// rows. Boundary closures always start at column 0; the far boundary uses
/// the same weights reversed in column order and multiplied by
/// [`OperatorKind::parity`].
#[derive(Clone, Debug)]
pub struct Stencil {
    pub kind: OperatorKind,
    pub order: usize,
    pub interior: Vec<f64>,
    /// Column of the first interior weight relative to the row index.
    pub interior_offset: isize,
    pub boundary: Vec<Vec<f64>>,
    pub empty_rows: usize,
    pub min_cells: usize,
}

impl Stencil {
    pub fn shape(&self, cells: usize) -> (usize, usize) {
        self.kind.shape(cells)
    }
    /// Index range of the rows filled from the interior weights.
    pub fn interior_rows(&self, cells: usize) -> std::ops::Range<usize> {
        let (nrows, _) = self.shape(cells);
        let skipped = self.empty_rows + self.boundary.len();
        skipped..nrows.saturating_sub(skipped)
    }
    /// Unscaled `(column, weight)` pairs of `row` on a grid of `cells` cells.
    pub fn row_entries(&self, row: usize, cells: usize) -> Vec<(usize, f64)> {
        let (nrows, ncols) = self.shape(cells);
        let nboundary = self.boundary.len();
        if row < self.empty_rows || row + self.empty_rows >= nrows {
            return Vec::new();
        }
        if row < self.empty_rows + nboundary {
            return self.boundary[row - self.empty_rows]
                .iter()
                .copied()
                .enumerate()
                .collect();
        }
        let mirrored = nrows - 1 - self.empty_rows - row;
        if mirrored < nboundary {
            let parity = self.kind.parity();
            return self.boundary[mirrored]
                .iter()
                .enumerate()
                .map(|(j, &w)| (ncols - 1 - j, parity * w))
                .collect();
        }
        let first = row as isize + self.interior_offset;
        self.interior
            .iter()
            .enumerate()
            .map(|(j, &w)| ((first + j as isize) as usize, w))
            .collect()
    }
}

static STENCIL_TABLE: Lazy<HashMap<(OperatorKind, usize), Stencil>> = Lazy::new(build_table);

pub fn lookup(kind: OperatorKind, order: usize) -> Result<&'static Stencil> {
    STENCIL_TABLE
        .get(&(kind, order))
        .ok_or(MimeticError::UnsupportedOrder { kind, order })
}

fn build_table() -> HashMap<(OperatorKind, usize), Stencil> {
    let mut table = HashMap::new();
    for order in SUPPORTED_ORDERS {
        let gradient = gradient_stencil(order);
        let divergence = divergence_stencil(order);
        let laplacian = compose_laplacian(&divergence, &gradient);
        table.insert((OperatorKind::Gradient, order), gradient);
        table.insert((OperatorKind::Divergence, order), divergence);
        table.insert((OperatorKind::Laplacian, order), laplacian);
        table.insert((OperatorKind::Interpolation, order), interpolation_stencil(order));
        table.insert((OperatorKind::Nodal, order), nodal_stencil(order));
    }
    table
}

fn gradient_stencil(order: usize) -> Stencil {
    let (interior, boundary) = match order {
        2 => (vec![-1.0, 1.0], vec![vec![-8.0 / 3.0, 3.0, -1.0 / 3.0]]),
        4 => (
            vec![1.0 / 24.0, -9.0 / 8.0, 9.0 / 8.0, -1.0 / 24.0],
            vec![
                vec![-352.0 / 105.0, 35.0 / 8.0, -35.0 / 24.0, 21.0 / 40.0, -5.0 / 56.0],
                vec![16.0 / 105.0, -31.0 / 24.0, 29.0 / 24.0, -3.0 / 40.0, 1.0 / 168.0],
            ],
        ),
        6 => (
            vec![
                -3.0 / 640.0,
                25.0 / 384.0,
                -75.0 / 64.0,
                75.0 / 64.0,
                -25.0 / 384.0,
                3.0 / 640.0,
            ],
            vec![
                vec![
                    -13016.0 / 3465.0,
                    693.0 / 128.0,
                    -385.0 / 128.0,
                    693.0 / 320.0,
                    -495.0 / 448.0,
                    385.0 / 1152.0,
                    -63.0 / 1408.0,
                ],
                vec![
                    496.0 / 3465.0,
                    -811.0 / 640.0,
                    449.0 / 384.0,
                    -29.0 / 960.0,
                    -11.0 / 448.0,
                    13.0 / 1152.0,
                    -37.0 / 21120.0,
                ],
                vec![
                    -8.0 / 385.0,
                    179.0 / 1920.0,
                    -153.0 / 128.0,
                    381.0 / 320.0,
                    -101.0 / 1344.0,
                    1.0 / 128.0,
                    -3.0 / 7040.0,
                ],
            ],
        ),
        _ => unreachable!("orders come from SUPPORTED_ORDERS"),
    };
    Stencil {
        kind: OperatorKind::Gradient,
        order,
        interior,
        interior_offset: 1 - (order / 2) as isize,
        boundary,
        empty_rows: 0,
        min_cells: order,
    }
}

fn divergence_stencil(order: usize) -> Stencil {
    let (interior, boundary) = match order {
        2 => (vec![-1.0, 1.0], vec![]),
        4 => (
            vec![1.0 / 24.0, -9.0 / 8.0, 9.0 / 8.0, -1.0 / 24.0],
            vec![vec![-11.0 / 12.0, 17.0 / 24.0, 3.0 / 8.0, -5.0 / 24.0, 1.0 / 24.0]],
        ),
        6 => (
            vec![
                -3.0 / 640.0,
                25.0 / 384.0,
                -75.0 / 64.0,
                75.0 / 64.0,
                -25.0 / 384.0,
                3.0 / 640.0,
            ],
            vec![
                vec![
                    -1627.0 / 1920.0,
                    211.0 / 640.0,
                    59.0 / 48.0,
                    -235.0 / 192.0,
                    91.0 / 128.0,
                    -443.0 / 1920.0,
                    31.0 / 960.0,
                ],
                vec![
                    31.0 / 960.0,
                    -687.0 / 640.0,
                    129.0 / 128.0,
                    19.0 / 192.0,
                    -3.0 / 32.0,
                    21.0 / 640.0,
                    -3.0 / 640.0,
                ],
            ],
        ),
        _ => unreachable!("orders come from SUPPORTED_ORDERS"),
    };
    Stencil {
        kind: OperatorKind::Divergence,
        order,
        interior,
        interior_offset: -((order / 2) as isize),
        boundary,
        empty_rows: 1,
        min_cells: order,
    }
}

fn interpolation_stencil(order: usize) -> Stencil {
    // the first face coincides with the boundary node
    let (interior, boundary) = match order {
        2 => (vec![0.5, 0.5], vec![vec![1.0]]),
        4 => (
            vec![-1.0 / 16.0, 9.0 / 16.0, 9.0 / 16.0, -1.0 / 16.0],
            vec![vec![1.0], vec![-1.0 / 5.0, 3.0 / 4.0, 1.0 / 2.0, -1.0 / 20.0]],
        ),
        6 => (
            vec![
                3.0 / 256.0,
                -25.0 / 256.0,
                75.0 / 128.0,
                75.0 / 128.0,
                -25.0 / 256.0,
                3.0 / 256.0,
            ],
            vec![
                vec![1.0],
                vec![
                    -1.0 / 9.0,
                    35.0 / 64.0,
                    35.0 / 48.0,
                    -7.0 / 32.0,
                    1.0 / 16.0,
                    -5.0 / 576.0,
                ],
                vec![
                    1.0 / 21.0,
                    -5.0 / 32.0,
                    5.0 / 8.0,
                    9.0 / 16.0,
                    -5.0 / 56.0,
                    1.0 / 96.0,
                ],
            ],
        ),
        _ => unreachable!("orders come from SUPPORTED_ORDERS"),
    };
    Stencil {
        kind: OperatorKind::Interpolation,
        order,
        interior,
        interior_offset: 1 - (order / 2) as isize,
        boundary,
        empty_rows: 0,
        min_cells: order,
    }
}

fn nodal_stencil(order: usize) -> Stencil {
    let (interior, boundary) = match order {
        2 => (vec![-0.5, 0.0, 0.5], vec![vec![-1.5, 2.0, -0.5]]),
        4 => (
            vec![1.0 / 12.0, -2.0 / 3.0, 0.0, 2.0 / 3.0, -1.0 / 12.0],
            vec![
                vec![-25.0 / 12.0, 4.0, -3.0, 4.0 / 3.0, -1.0 / 4.0],
                vec![-1.0 / 4.0, -5.0 / 6.0, 3.0 / 2.0, -1.0 / 2.0, 1.0 / 12.0],
            ],
        ),
        6 => (
            vec![
                -1.0 / 60.0,
                3.0 / 20.0,
                -3.0 / 4.0,
                0.0,
                3.0 / 4.0,
                -3.0 / 20.0,
                1.0 / 60.0,
            ],
            vec![
                vec![-49.0 / 20.0, 6.0, -15.0 / 2.0, 20.0 / 3.0, -15.0 / 4.0, 6.0 / 5.0, -1.0 / 6.0],
                vec![-1.0 / 6.0, -77.0 / 60.0, 5.0 / 2.0, -5.0 / 3.0, 5.0 / 6.0, -1.0 / 4.0, 1.0 / 30.0],
                vec![1.0 / 30.0, -2.0 / 5.0, -7.0 / 12.0, 4.0 / 3.0, -1.0 / 2.0, 2.0 / 15.0, -1.0 / 60.0],
            ],
        ),
        _ => unreachable!("orders come from SUPPORTED_ORDERS"),
    };
    Stencil {
        kind: OperatorKind::Nodal,
        order,
        interior,
        interior_offset: -((order / 2) as isize),
        boundary,
        empty_rows: 0,
        min_cells: order,
    }
}

fn dense_reference(stencil: &Stencil, cells: usize) -> Array2<f64> {
    let mut dense = Array2::zeros(stencil.shape(cells));
    for row in 0..dense.nrows() {
        for (col, weight) in stencil.row_entries(row, cells) {
            dense[(row, col)] = weight;
        }
    }
    dense
}

/// Laplacian closures as the product of the divergence and gradient tables.
///
/// Rows `1..order` of `D G` are the boundary closures and row `order` the
/// first interior row, `2 order - 1` weights wide. The reference grid is
/// large enough that neither end of the product sees the other.
fn compose_laplacian(divergence: &Stencil, gradient: &Stencil) -> Stencil {
    let order = divergence.order;
    let cells = 4 * order;
    let product = dense_reference(divergence, cells).dot(&dense_reference(gradient, cells));
    let width = 2 * order - 1;
    let boundary = (1..order)
        .map(|row| product.row(row).iter().take(width).copied().collect())
        .collect();
    let interior = product
        .row(order)
        .iter()
        .skip(1)
        .take(width)
        .copied()
        .collect();
    Stencil {
        kind: OperatorKind::Laplacian,
        order,
        interior,
        interior_offset: 1 - order as isize,
        boundary,
        empty_rows: 1,
        min_cells: order.max(2 * order - 2),
    }
}
