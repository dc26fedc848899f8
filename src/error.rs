use crate::disc::stencil::OperatorKind;

#[derive(thiserror::Error, Debug)]
pub enum MimeticError {
    #[error("no {kind} stencil of order {order} (supported orders: 2, 4, 6)")]
    UnsupportedOrder { kind: OperatorKind, order: usize },
    #[error("{cells} cells cannot hold a {kind} stencil of order {order} (need at least {required})")]
    InvalidGridSize {
        kind: OperatorKind,
        order: usize,
        cells: usize,
        required: usize,
    },
    #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("singular reduced system with {size} unknowns (fixed nodes {fixed:?}): {reason}")]
    SingularSystem {
        size: usize,
        fixed: Vec<usize>,
        reason: String,
    },
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("degenerate grid metric at node {node} (jacobian {jacobian})")]
    DegenerateMetric { node: usize, jacobian: f64 },
    #[error("sparse storage failed: {0}")]
    Sparse(#[from] faer::sparse::FaerError),
    #[error("An io error occured: `{0}`")]
    Io(#[from] std::io::Error),
    #[error("Could not parse parameter file: `{0}`")]
    Json(#[from] serde_json::Error),
    #[error("Could not write csv output: `{0}`")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, MimeticError>;

/// Shorthand for the length checks done at every operator seam.
pub fn check_len(context: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(MimeticError::DimensionMismatch {
            context,
            expected,
            found,
        })
    }
}
