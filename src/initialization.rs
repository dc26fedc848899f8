use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::disc::boundary::BoundaryCondition;
use crate::disc::stencil::SUPPORTED_ORDERS;
use crate::error::{MimeticError, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolverParameters {
    #[serde(default = "default_order")]
    pub order: usize,
    /// Directory receiving the text dumps and CSV exports.
    #[serde(default = "default_output")]
    pub output: String,
    /// Number of evenly spaced checkpoints written during time marching.
    #[serde(default = "default_checkpoints")]
    pub checkpoints: usize,
    pub example: ExampleParameters,
}

fn default_order() -> usize {
    2
}
fn default_output() -> String {
    "output".to_string()
}
fn default_checkpoints() -> usize {
    10
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExampleParameters {
    #[serde(rename = "hyperbolic_1d")]
    Hyperbolic1d(Hyperbolic1dParameters),
    #[serde(rename = "parabolic")]
    Parabolic(ParabolicParameters),
    #[serde(rename = "flux_operator_2d")]
    FluxOperator2d(FluxOperator2dParameters),
    #[serde(rename = "flux_operator_3d")]
    FluxOperator3d(FluxOperator3dParameters),
    #[serde(rename = "helmholtz_2d")]
    Helmholtz2d(Helmholtz2dParameters),
}

impl ExampleParameters {
    pub fn name(&self) -> &'static str {
        match self {
            ExampleParameters::Hyperbolic1d(_) => "hyperbolic_1d",
            ExampleParameters::Parabolic(_) => "parabolic",
            ExampleParameters::FluxOperator2d(_) => "flux_operator_2d",
            ExampleParameters::FluxOperator3d(_) => "flux_operator_3d",
            ExampleParameters::Helmholtz2d(_) => "helmholtz_2d",
        }
    }
}

/// Periodic advection of `sin(2 pi x)` over one period.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperbolic1dParameters {
    pub cells: usize,
    pub west: f64,
    pub east: f64,
    pub velocity: f64,
    /// `dt = cfl * dx / |a|`.
    pub cfl: f64,
    pub final_time: f64,
}

impl Default for Hyperbolic1dParameters {
    fn default() -> Self {
        Self {
            cells: 50,
            west: 0.0,
            east: 1.0,
            velocity: 1.0,
            cfl: 0.5,
            final_time: 1.0,
        }
    }
}

/// Staggered diffusion of a Gaussian with `K = diag(1 + x_a)` and zero
/// Dirichlet walls, in 2D or 3D.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ParabolicParameters {
    /// Cells per axis; the length selects the dimension.
    pub cells: Vec<usize>,
    pub west: f64,
    pub east: f64,
    pub sigma: f64,
    pub final_time: f64,
    /// Overrides the stable step when set.
    pub dt: Option<f64>,
}

impl Default for ParabolicParameters {
    fn default() -> Self {
        Self {
            cells: vec![50, 50],
            west: 0.0,
            east: 1.0,
            sigma: 0.1,
            final_time: 0.1,
            dt: None,
        }
    }
}

/// Anisotropic diffusion on the curvilinear grid
/// `x = (1 + ax sin(2 pi eta)) xi`, `y = (1 + ay cos(2 pi xi)) eta`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FluxOperator2dParameters {
    pub nodes: [usize; 2],
    pub amplitude_x: f64,
    pub amplitude_y: f64,
    pub tensor: Vec<Vec<f64>>,
    pub sigma: f64,
    pub final_time: f64,
    pub dt: Option<f64>,
}

impl Default for FluxOperator2dParameters {
    fn default() -> Self {
        Self {
            nodes: [50, 50],
            amplitude_x: 0.05,
            amplitude_y: 0.05,
            tensor: vec![vec![1.0, 0.1], vec![0.1, 2.0]],
            sigma: 0.1,
            final_time: 0.1,
            dt: None,
        }
    }
}

/// Anisotropic diffusion on a collocated unit cube.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FluxOperator3dParameters {
    pub nodes: [usize; 3],
    pub tensor: Vec<Vec<f64>>,
    pub sigma: f64,
    pub final_time: f64,
    pub dt: Option<f64>,
}

impl Default for FluxOperator3dParameters {
    fn default() -> Self {
        Self {
            nodes: [20, 20, 20],
            tensor: vec![
                vec![1.0, 0.1, 0.05],
                vec![0.1, 2.0, 0.05],
                vec![0.05, 0.05, 0.5],
            ],
            sigma: 0.1,
            final_time: 0.05,
            dt: None,
        }
    }
}

/// Axis-aligned wall box `[[x_min, x_max], [y_min, y_max]]`.
pub type WallBox = [[f64; 2]; 2];

/// Helmholtz problem on a square room with absorbing walls and a hotspot.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Helmholtz2dParameters {
    pub cells: [usize; 2],
    /// Side length of the square domain `[0, extent]^2`.
    pub extent: f64,
    pub wave_number: f64,
    pub reflection: f64,
    pub absorption: f64,
    pub hotspot: [f64; 2],
    pub hotspot_radius: f64,
    pub hotspot_value: f64,
    pub walls: Vec<WallBox>,
    /// Width of the wall band along the domain edges.
    pub wall_margin: f64,
    pub boundary: BoundaryCondition,
}

impl Default for Helmholtz2dParameters {
    fn default() -> Self {
        Self {
            cells: [500, 500],
            extent: 40.0,
            wave_number: 6.0,
            reflection: 0.7,
            absorption: 0.45,
            hotspot: [2.0, 10.0],
            hotspot_radius: 1.0,
            hotspot_value: 1.0,
            walls: vec![[[10.0, 39.0], [20.0, 21.0]], [[30.0, 31.0], [1.0, 16.0]]],
            wall_margin: 0.5,
            boundary: BoundaryCondition::Neumann,
        }
    }
}

fn invalid(name: &'static str, reason: String) -> MimeticError {
    MimeticError::InvalidParameter { name, reason }
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(name, format!("must be finite and positive, got {}", value)))
    }
}

fn optional_positive(name: &'static str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) => positive(name, v),
        None => Ok(()),
    }
}

fn square_tensor(tensor: &[Vec<f64>], dim: usize) -> Result<()> {
    if tensor.len() != dim || tensor.iter().any(|row| row.len() != dim) {
        return Err(invalid("tensor", format!("expected a {0} x {0} matrix", dim)));
    }
    if tensor.iter().flatten().any(|k| !k.is_finite()) {
        return Err(invalid("tensor", "entries must be finite".to_string()));
    }
    Ok(())
}

impl SolverParameters {
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_ORDERS.contains(&self.order) {
            return Err(invalid(
                "order",
                format!("{} is not one of {:?}", self.order, SUPPORTED_ORDERS),
            ));
        }
        match &self.example {
            ExampleParameters::Hyperbolic1d(p) => {
                positive("cfl", p.cfl)?;
                positive("final_time", p.final_time)?;
                if !p.velocity.is_finite() || p.velocity == 0.0 {
                    return Err(invalid(
                        "velocity",
                        format!("must be finite and non-zero, got {}", p.velocity),
                    ));
                }
            }
            ExampleParameters::Parabolic(p) => {
                if !(2..=3).contains(&p.cells.len()) {
                    return Err(invalid(
                        "cells",
                        format!("parabolic runs are 2D or 3D, got {} axes", p.cells.len()),
                    ));
                }
                positive("sigma", p.sigma)?;
                positive("final_time", p.final_time)?;
                optional_positive("dt", p.dt)?;
            }
            ExampleParameters::FluxOperator2d(p) => {
                square_tensor(&p.tensor, 2)?;
                positive("sigma", p.sigma)?;
                positive("final_time", p.final_time)?;
                optional_positive("dt", p.dt)?;
            }
            ExampleParameters::FluxOperator3d(p) => {
                square_tensor(&p.tensor, 3)?;
                positive("sigma", p.sigma)?;
                positive("final_time", p.final_time)?;
                optional_positive("dt", p.dt)?;
            }
            ExampleParameters::Helmholtz2d(p) => {
                positive("extent", p.extent)?;
                positive("hotspot_radius", p.hotspot_radius)?;
                if !p.wave_number.is_finite() {
                    return Err(invalid("wave_number", "must be finite".to_string()));
                }
                if p.boundary == BoundaryCondition::Periodic {
                    return Err(invalid(
                        "boundary",
                        "the Helmholtz room needs a Robin-type wall condition".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

pub fn initialize_params_by_file<P: AsRef<Path>>(path: P) -> Result<SolverParameters> {
    let file_content = fs::read_to_string(path.as_ref())?;
    let params: SolverParameters = serde_json::from_str(&file_content)?;
    params.validate()?;
    log::info!(
        "loaded {} parameters from {} (order {})",
        params.example.name(),
        path.as_ref().display(),
        params.order
    );
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let params: SolverParameters =
            serde_json::from_str(r#"{"example": {"type": "hyperbolic_1d", "cells": 64}}"#).unwrap();
        assert_eq!(params.order, 2);
        assert_eq!(params.output, "output");
        assert_eq!(params.checkpoints, 10);
        match params.example {
            ExampleParameters::Hyperbolic1d(p) => {
                assert_eq!(p.cells, 64);
                assert_eq!(p.cfl, 0.5);
                assert_eq!(p.velocity, 1.0);
            }
            other => panic!("parsed the wrong example: {}", other.name()),
        }
    }

    #[test]
    fn test_helmholtz_parameters() {
        let params: SolverParameters = serde_json::from_str(
            r#"{"order": 4, "example": {"type": "helmholtz_2d",
                "boundary": {"type": "robin", "alpha": 1.0, "beta": 0.25}}}"#,
        )
        .unwrap();
        params.validate().unwrap();
        match &params.example {
            ExampleParameters::Helmholtz2d(p) => {
                assert_eq!(p.walls.len(), 2);
                assert_eq!(p.cells, [500, 500]);
                assert_eq!(p.boundary.robin_coefficients(), Some((1.0, 0.25)));
            }
            other => panic!("parsed the wrong example: {}", other.name()),
        }
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let params: SolverParameters =
            serde_json::from_str(r#"{"order": 3, "example": {"type": "parabolic"}}"#).unwrap();
        assert!(matches!(
            params.validate(),
            Err(MimeticError::InvalidParameter { name: "order", .. })
        ));
        let params: SolverParameters = serde_json::from_str(
            r#"{"example": {"type": "flux_operator_2d", "tensor": [[1.0, 0.0]]}}"#,
        )
        .unwrap();
        assert!(params.validate().is_err());
        let params: SolverParameters =
            serde_json::from_str(r#"{"example": {"type": "parabolic", "cells": [10]}}"#).unwrap();
        assert!(params.validate().is_err());
        assert!(serde_json::from_str::<SolverParameters>(r#"{"example": {"type": "euler"}}"#).is_err());
    }

    #[test]
    fn test_initialize_params_by_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"checkpoints": 3, "example": {{"type": "flux_operator_3d"}}}}"#).unwrap();
        let params = initialize_params_by_file(file.path()).unwrap();
        assert_eq!(params.checkpoints, 3);
        assert_eq!(params.example.name(), "flux_operator_3d");
        assert!(matches!(
            initialize_params_by_file("does/not/exist.json"),
            Err(MimeticError::Io(_))
        ));
    }
}
