use faer::Par;
use faer::sparse::linalg::matmul::sparse_sparse_matmul;
use faer::sparse::{
    CreationError, SparseRowMat, SparseRowMatRef, SymbolicSparseRowMat, Triplet, ops,
};
use hashbrown::HashMap;
use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1};

use crate::error::{MimeticError, Result, check_len};

/// Row-major sparse matrix backed by `faer`.
///
/// Column indices are sorted inside each row and never repeated. Entries that
/// sum to exactly zero are not stored.
#[derive(Clone, Debug)]
pub struct SparseMatrix {
    inner: SparseRowMat<usize, f64>,
}

impl SparseMatrix {
    /// Builds from compressed rows that are already sorted and zero free.
    fn from_compressed(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<f64>,
    ) -> Self {
        let symbolic = SymbolicSparseRowMat::new_checked(nrows, ncols, row_ptr, None, col_idx);
        Self {
            inner: SparseRowMat::new(symbolic, values),
        }
    }
    /// Drops stored zeros and unsorted rows left over by faer kernels.
    fn from_faer(inner: SparseRowMat<usize, f64>) -> Result<Self> {
        let clean = (0..inner.nrows()).all(|i| {
            let cols = inner.symbolic().col_idx_of_row_raw(i);
            cols.windows(2).all(|w| w[0] < w[1]) && inner.val_of_row(i).iter().all(|&v| v != 0.0)
        });
        if clean {
            return Ok(Self { inner });
        }
        let (nrows, ncols) = (inner.nrows(), inner.ncols());
        let nonzero: Vec<Triplet<usize, usize, f64>> = (0..nrows)
            .flat_map(|i| {
                let cols = inner.symbolic().col_idx_of_row_raw(i);
                cols.iter()
                    .zip(inner.val_of_row(i))
                    .filter(|&(_, &v)| v != 0.0)
                    .map(move |(&j, &v)| Triplet::new(i, j, v))
            })
            .collect();
        Ok(Self {
            inner: SparseRowMat::try_new_from_triplets(nrows, ncols, &nonzero)
                .map_err(creation_error)?,
        })
    }
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::from_compressed(nrows, ncols, vec![0; nrows + 1], Vec::new(), Vec::new())
    }
    pub fn identity(n: usize) -> Self {
        Self::from_diagonal(&vec![1.0; n])
    }
    pub fn from_diagonal(diagonal: &[f64]) -> Self {
        let n = diagonal.len();
        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for (i, &d) in diagonal.iter().enumerate() {
            if d != 0.0 {
                col_idx.push(i);
                values.push(d);
            }
            row_ptr.push(col_idx.len());
        }
        Self::from_compressed(n, n, row_ptr, col_idx, values)
    }
    /// `(n+2) x n` matrix placing `n` interior values between two zero ends.
    pub fn interior_embedding(n: usize) -> Self {
        let mut row_ptr = vec![0, 0];
        row_ptr.extend(1..=n);
        row_ptr.push(n);
        Self::from_compressed(n + 2, n, row_ptr, (0..n).collect(), vec![1.0; n])
    }
    /// Identity of size `n` with the first and last diagonal entries removed.
    pub fn end_zeroed_identity(n: usize) -> Self {
        let diagonal: Vec<f64> = (0..n)
            .map(|i| if i == 0 || i + 1 == n { 0.0 } else { 1.0 })
            .collect();
        Self::from_diagonal(&diagonal)
    }
    /// Assembles a matrix from `(row, col, value)` triplets, summing duplicates.
    pub fn from_triplets<I>(nrows: usize, ncols: usize, triplets: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut entries = Vec::new();
        for (row, col, value) in triplets {
            if row >= nrows {
                return Err(MimeticError::DimensionMismatch {
                    context: "triplet row index",
                    expected: nrows,
                    found: row,
                });
            }
            if col >= ncols {
                return Err(MimeticError::DimensionMismatch {
                    context: "triplet column index",
                    expected: ncols,
                    found: col,
                });
            }
            entries.push(Triplet::new(row, col, value));
        }
        let summed =
            SparseRowMat::try_new_from_triplets(nrows, ncols, &entries).map_err(creation_error)?;
        Self::from_faer(summed)
    }
    pub fn nrows(&self) -> usize {
        self.inner.nrows()
    }
    pub fn ncols(&self) -> usize {
        self.inner.ncols()
    }
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }
    pub fn nnz(&self) -> usize {
        (0..self.nrows()).map(|i| self.row_nnz(i)).sum()
    }
    pub fn get(&self, row: usize, col: usize) -> f64 {
        if row >= self.nrows() || col >= self.ncols() {
            return 0.0;
        }
        self.inner.get(row, col).copied().unwrap_or(0.0)
    }
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.inner
            .symbolic()
            .col_idx_of_row_raw(row)
            .iter()
            .copied()
            .zip(self.inner.val_of_row(row).iter().copied())
    }
    pub fn row_nnz(&self, row: usize) -> usize {
        self.inner.val_of_row(row).len()
    }
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.nrows()).flat_map(move |i| self.row(i).map(move |(j, v)| (i, j, v)))
    }
    pub fn is_identity(&self) -> bool {
        self.nrows() == self.ncols()
            && self.nnz() == self.nrows()
            && self.triplets().all(|(i, j, v)| i == j && v == 1.0)
    }
    pub fn as_faer(&self) -> SparseRowMatRef<'_, usize, f64> {
        self.inner.as_ref()
    }
    pub fn dot(&self, x: ArrayView1<f64>) -> Result<Array1<f64>> {
        check_len("sparse matrix-vector product", self.ncols(), x.len())?;
        let mut y = Array1::zeros(self.nrows());
        self.dot_lane(x, y.view_mut());
        Ok(y)
    }
    /// `y = A x` without length checks; callers guarantee the lane lengths.
    pub fn dot_lane(&self, x: ArrayView1<f64>, mut y: ArrayViewMut1<f64>) {
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = self.row(i).map(|(j, v)| v * x[j]).sum();
        }
    }
    pub fn matmul(&self, other: &SparseMatrix) -> Result<SparseMatrix> {
        check_len("sparse matrix product", self.ncols(), other.nrows())?;
        // (AB)^T = B^T A^T, and the transpose of a row-major matrix is column-major
        let product = sparse_sparse_matmul(
            other.inner.transpose(),
            self.inner.transpose(),
            1.0,
            Par::Seq,
        )?;
        Self::from_faer(product.into_transpose())
    }
    pub fn add(&self, other: &SparseMatrix) -> Result<SparseMatrix> {
        check_len("sparse sum rows", self.nrows(), other.nrows())?;
        check_len("sparse sum columns", self.ncols(), other.ncols())?;
        let sum = ops::add(self.inner.transpose(), other.inner.transpose())?;
        Self::from_faer(sum.into_transpose())
    }
    pub fn scaled(&self, factor: f64) -> SparseMatrix {
        if factor == 0.0 {
            return Self::zeros(self.nrows(), self.ncols());
        }
        let mut scaled = self.clone();
        scaled.inner.val_mut().iter_mut().for_each(|v| *v *= factor);
        scaled
    }
    /// Kronecker product `self (x) other`.
    pub fn kron(&self, other: &SparseMatrix) -> SparseMatrix {
        let nrows = self.nrows() * other.nrows();
        let ncols = self.ncols() * other.ncols();
        let mut row_ptr = Vec::with_capacity(nrows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for ia in 0..self.nrows() {
            for ib in 0..other.nrows() {
                for (ja, a) in self.row(ia) {
                    for (jb, b) in other.row(ib) {
                        let v = a * b;
                        if v != 0.0 {
                            col_idx.push(ja * other.ncols() + jb);
                            values.push(v);
                        }
                    }
                }
                row_ptr.push(col_idx.len());
            }
        }
        Self::from_compressed(nrows, ncols, row_ptr, col_idx, values)
    }
    pub fn transpose(&self) -> Result<SparseMatrix> {
        Ok(Self {
            inner: self.inner.transpose().to_row_major()?,
        })
    }
    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros(self.shape());
        for (i, j, v) in self.triplets() {
            dense[(i, j)] = v;
        }
        dense
    }
    /// Submatrix restricted to the given rows and columns, in the given order.
    pub fn select(&self, rows: &[usize], cols: &[usize]) -> Result<SparseMatrix> {
        let col_map: HashMap<usize, usize> =
            cols.iter().enumerate().map(|(new, &old)| (old, new)).collect();
        let entries = rows.iter().enumerate().flat_map(|(new_row, &old_row)| {
            let col_map = &col_map;
            self.row(old_row)
                .filter_map(move |(j, v)| col_map.get(&j).map(|&nj| (new_row, nj, v)))
        });
        Self::from_triplets(rows.len(), cols.len(), entries)
    }
}

fn creation_error(e: CreationError) -> MimeticError {
    match e {
        CreationError::Generic(err) => MimeticError::Sparse(err),
        CreationError::OutOfBounds { row, col } => MimeticError::InvalidParameter {
            name: "triplets",
            reason: format!("entry ({}, {}) outside the matrix", row, col),
        },
    }
}
