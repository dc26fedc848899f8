use std::path::Path;

use csv::Writer;
use ndarray::ArrayView2;

use crate::error::Result;

/// Writes `matrix` row by row, no header.
pub fn write_matrix_csv<P: AsRef<Path>>(path: P, matrix: ArrayView2<f64>) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = Writer::from_path(path.as_ref())?;
    for row in matrix.rows() {
        writer.serialize(row.to_vec())?;
    }
    writer.flush()?;
    log::debug!(
        "wrote {} x {} matrix to {}",
        matrix.nrows(),
        matrix.ncols(),
        path.as_ref().display()
    );
    Ok(())
}
