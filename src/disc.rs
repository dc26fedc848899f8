pub mod advection1d;
pub mod boundary;
pub mod collocated;
pub mod diffusion;
pub mod flux;
pub mod linear_elliptic;
pub mod mesh;
pub mod mimetic1d;
pub mod sparse;
pub mod stencil;
pub mod tensor;

use ndarray::{Array1, ArrayView1};

use crate::error::Result;

/// Gradient and divergence pair acting on a flattened node field.
///
/// `gradient` returns one component per axis; `divergence` takes one flux per
/// axis, laid out like the matching gradient component.
pub trait FluxOperators {
    fn dim(&self) -> usize;
    fn node_count(&self) -> usize;
    /// Smallest physical node spacing, used for explicit time step bounds.
    fn min_spacing(&self) -> f64;
    fn gradient(&self, u: ArrayView1<f64>) -> Result<Vec<Array1<f64>>>;
    fn divergence(&self, fluxes: &[Array1<f64>]) -> Result<Array1<f64>>;
}

/// Semi-discrete right-hand side `du/dt = rhs(u)` with its boundary hook.
pub trait SpatialDisc {
    fn compute_rhs(&self, u: ArrayView1<f64>) -> Result<Array1<f64>>;
    /// Restores boundary values after every step.
    fn apply_bc(&self, u: &mut Array1<f64>);
}
